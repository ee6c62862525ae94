//! Terrain classification and slope validation.
//!
//! Pure predicates over the world terrain service. The segment checks are
//! only meaningful over short, near-linear segments; they are applied
//! per-step during smoothing and shortening, never to a whole path.

use glam::Vec3;

use crate::{Agent, AgentKind, LiquidKind, NavTerrain, WorldTerrain};

/// Classifies the terrain at a position into a navigation flag.
///
/// No liquid maps to ground; water and ocean map to water; magma and slime
/// map to magma. Anything else defaults to ground.
pub fn nav_terrain_at(world: &dyn WorldTerrain, pos: Vec3, collision_height: f32) -> NavTerrain {
    let liquid = world.liquid_at(pos, collision_height);
    if liquid.status.is_empty() {
        return NavTerrain::GROUND;
    }

    match liquid.kind {
        Some(LiquidKind::Water) | Some(LiquidKind::Ocean) => NavTerrain::WATER,
        Some(LiquidKind::Magma) | Some(LiquidKind::Slime) => NavTerrain::MAGMA,
        _ => NavTerrain::GROUND,
    }
}

/// Predicts whether a short segment can be swum.
///
/// True only when both endpoints are inside liquid and, if `check_swim` is
/// set, the agent can actually swim. Generic agents are assumed able.
pub fn is_swimmable_segment(
    world: &dyn WorldTerrain,
    agent: &dyn Agent,
    from: Vec3,
    to: Vec3,
    check_swim: bool,
) -> bool {
    let height = agent.collision_height();
    world.is_in_liquid(from, height)
        && world.is_in_liquid(to, height)
        && (!check_swim || agent.kind() == AgentKind::Generic || agent.can_swim())
}

/// Absolute slope angle of a segment, in radians.
///
/// A vertical segment yields `PI / 2`.
pub fn slope_angle_abs(from: Vec3, to: Vec3) -> f32 {
    let dx = to.x - from.x;
    let dz = to.z - from.z;
    let horizontal = (dx * dx + dz * dz).sqrt();
    let dy = (to.y - from.y).abs();
    if horizontal <= f32::EPSILON {
        return std::f32::consts::FRAC_PI_2;
    }
    (dy / horizontal).atan()
}

/// Height budget an agent of the given height can climb over this segment.
///
/// The climbable height de-rates linearly with the slope angle in degrees:
/// `height * (1 - degrees / 100)`.
pub fn required_height_to_climb(from: Vec3, to: Vec3, agent_height: f32) -> f32 {
    let slope_degrees = slope_angle_abs(from, to).to_degrees();
    agent_height - agent_height * (slope_degrees / 100.0)
}

/// Checks whether the vertical delta of a short segment is climbable for an
/// agent of the given height.
pub fn is_walkable_climb(from: Vec3, to: Vec3, agent_height: f32) -> bool {
    let diff_height = (to.y - from.y).abs();
    diff_height <= required_height_to_climb(from, to, agent_height)
}

/// Whether every point of a path sits in water or magma.
///
/// Used to decide if a mesh-bypassing shortcut is safe for a swimming
/// agent.
pub fn is_water_path(world: &dyn WorldTerrain, collision_height: f32, points: &[Vec3]) -> bool {
    points.iter().all(|&p| {
        let terrain = nav_terrain_at(world, p, collision_height);
        terrain == NavTerrain::WATER || terrain == NavTerrain::MAGMA
    })
}

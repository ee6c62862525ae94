//! World terrain service and agent snapshot boundaries.

use bitflags::bitflags;
use glam::Vec3;

bitflags! {
    /// How a position relates to a liquid volume.
    ///
    /// The empty set means no liquid at the position.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LiquidStatus: u8 {
        /// Above the surface, not touching it
        const ABOVE_SURFACE = 0x01;
        /// On the surface (water walking)
        const SURFACE_WALK = 0x02;
        /// Partially submerged
        const IN_LIQUID = 0x04;
        /// Fully submerged
        const UNDER_LIQUID = 0x08;
        /// Any contact with the liquid volume
        const IN_CONTACT =
            Self::SURFACE_WALK.bits() | Self::IN_LIQUID.bits() | Self::UNDER_LIQUID.bits();
    }
}

/// Kind of liquid volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiquidKind {
    Water,
    Ocean,
    Magma,
    Slime,
}

/// Liquid classification at a position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiquidData {
    pub status: LiquidStatus,
    /// Present whenever `status` is non-empty
    pub kind: Option<LiquidKind>,
}

impl LiquidData {
    /// No liquid at the position
    pub const NONE: LiquidData = LiquidData {
        status: LiquidStatus::empty(),
        kind: None,
    };
}

/// Terrain and collision queries against the world the agent moves in.
pub trait WorldTerrain {
    /// Liquid classification at `pos` for an agent of the given collision
    /// height.
    fn liquid_at(&self, pos: Vec3, collision_height: f32) -> LiquidData;

    /// Whether `pos` is inside a liquid volume for an agent of the given
    /// collision height.
    fn is_in_liquid(&self, pos: Vec3, collision_height: f32) -> bool {
        self.liquid_at(pos, collision_height)
            .status
            .intersects(LiquidStatus::IN_LIQUID | LiquidStatus::UNDER_LIQUID)
    }

    /// Line-of-sight test between two points
    fn line_of_sight(&self, from: Vec3, to: Vec3) -> bool;

    /// Snaps `pos` to the closest allowed standing height and returns the
    /// corrected Y.
    fn walkable_height(&self, pos: Vec3) -> f32;
}

/// Whether an agent carries an explicit capability profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    /// Broad capability is assumed (player-like)
    Generic,
    /// Capability flags are authoritative (creature-like)
    Creature,
}

/// Read-only snapshot of the agent a path is planned for.
///
/// One planner instance is owned by exactly one agent; the planner reads
/// this state at the start of every planning call.
pub trait Agent {
    fn position(&self) -> Vec3;

    fn collision_height(&self) -> f32;

    fn kind(&self) -> AgentKind;

    fn can_walk(&self) -> bool;

    fn can_swim(&self) -> bool;

    /// Whether the agent may enter water and magma volumes at all
    fn can_enter_water(&self) -> bool;

    fn can_fly(&self) -> bool;

    fn is_in_liquid(&self) -> bool;

    fn is_under_liquid(&self) -> bool;

    fn is_falling(&self) -> bool;

    /// Agents flagged this way always receive straight shortcuts
    fn ignores_pathfinding(&self) -> bool;

    fn map_id(&self) -> u32;

    fn instance_id(&self) -> u32 {
        0
    }

    /// Point on the agent's collision volume facing `dest`, used as the
    /// line-of-sight anchor when shortening paths.
    fn hit_sphere_point_toward(&self, dest: Vec3) -> Vec3 {
        let _ = dest;
        let mut pos = self.position();
        pos.y += self.collision_height();
        pos
    }
}

//! Reference backends for tests and benches.
//!
//! A navigation world reduced to one straight lane of square cells along +X:
//! cell `i` spans `x ∈ [i * CELL_SIZE, (i + 1) * CELL_SIZE)` and
//! `z ∈ [0, CELL_SIZE]`, with a flat per-cell height. Cells can be removed
//! (mesh holes), retagged (water, magma), or covered by an unloaded span.
//! Simple enough to predict every query result by hand, rich enough to
//! exercise every planner branch.

use std::cell::Cell;

use glam::Vec3;

use crate::{
    Agent, AgentKind, Error, LiquidData, LiquidKind, LiquidStatus, NavMesh, NavMeshProvider,
    NavMeshQuery, NavTerrain, PolyRef, QueryFilter, RaycastHit, Result, StraightPath,
    StraightPathFlags, WorldTerrain,
};

/// Side length of one lane cell
pub const CELL_SIZE: f32 = 10.0;

/// One walkable cell of the lane
#[derive(Debug, Clone, Copy)]
pub struct LaneCell {
    pub height: f32,
    pub terrain: NavTerrain,
}

impl LaneCell {
    pub fn ground(height: f32) -> Self {
        Self {
            height,
            terrain: NavTerrain::GROUND,
        }
    }
}

/// A row of square cells acting as navigation mesh and query engine.
pub struct LaneMesh {
    cells: Vec<Option<LaneCell>>,
    /// X spans with no tile data loaded
    unloaded: Vec<(f32, f32)>,
    find_path_calls: Cell<u32>,
}

impl LaneMesh {
    /// A flat all-ground lane of `count` cells at height zero
    pub fn flat(count: usize) -> Self {
        Self {
            cells: vec![Some(LaneCell::ground(0.0)); count],
            unloaded: Vec::new(),
            find_path_calls: Cell::new(0),
        }
    }

    /// A lane with the given per-cell heights
    pub fn with_heights(heights: &[f32]) -> Self {
        Self {
            cells: heights.iter().map(|&h| Some(LaneCell::ground(h))).collect(),
            unloaded: Vec::new(),
            find_path_calls: Cell::new(0),
        }
    }

    /// Removes a cell, leaving a hole in the mesh
    pub fn remove_cell(&mut self, index: usize) {
        self.cells[index] = None;
    }

    pub fn set_terrain(&mut self, index: usize, terrain: NavTerrain) {
        if let Some(cell) = self.cells[index].as_mut() {
            cell.terrain = terrain;
        }
    }

    /// Marks an X span as having no loaded tile
    pub fn set_unloaded(&mut self, x_min: f32, x_max: f32) {
        self.unloaded.push((x_min, x_max));
    }

    /// Number of corridor searches issued so far
    pub fn find_path_calls(&self) -> u32 {
        self.find_path_calls.get()
    }

    fn poly_of(&self, index: usize) -> PolyRef {
        PolyRef::new(index as u64 + 1)
    }

    fn index_of(&self, poly: PolyRef) -> Option<usize> {
        if !poly.is_valid() {
            return None;
        }
        let index = poly.0 as usize - 1;
        if index < self.cells.len() {
            Some(index)
        } else {
            None
        }
    }

    fn cell(&self, index: usize) -> Option<LaneCell> {
        self.cells.get(index).copied().flatten()
    }

    fn cell_passes(&self, index: usize, filter: &QueryFilter) -> Option<LaneCell> {
        self.cell(index).filter(|cell| filter.passes(cell.terrain))
    }

    fn closest_point_in_cell(&self, index: usize, cell: LaneCell, pos: Vec3) -> Vec3 {
        let x_min = index as f32 * CELL_SIZE;
        Vec3::new(
            pos.x.clamp(x_min, x_min + CELL_SIZE),
            cell.height,
            pos.z.clamp(0.0, CELL_SIZE),
        )
    }
}

impl NavMeshQuery for LaneMesh {
    fn find_nearest_poly(
        &self,
        center: Vec3,
        half_extents: Vec3,
        filter: &QueryFilter,
    ) -> Result<(PolyRef, Vec3)> {
        let mut nearest = PolyRef::INVALID;
        let mut nearest_point = center;
        let mut nearest_dist_sqr = f32::MAX;

        for index in 0..self.cells.len() {
            let cell = match self.cell_passes(index, filter) {
                Some(cell) => cell,
                None => continue,
            };

            let closest = self.closest_point_in_cell(index, cell, center);
            let delta = center - closest;
            if delta.x.abs() > half_extents.x
                || delta.y.abs() > half_extents.y
                || delta.z.abs() > half_extents.z
            {
                continue;
            }

            let dist_sqr = center.distance_squared(closest);
            if dist_sqr < nearest_dist_sqr {
                nearest_dist_sqr = dist_sqr;
                nearest = self.poly_of(index);
                nearest_point = closest;
            }
        }

        Ok((nearest, nearest_point))
    }

    fn find_path(
        &self,
        start_ref: PolyRef,
        end_ref: PolyRef,
        _start_pos: Vec3,
        _end_pos: Vec3,
        filter: &QueryFilter,
        max_path: usize,
    ) -> Result<Vec<PolyRef>> {
        self.find_path_calls.set(self.find_path_calls.get() + 1);

        let start = self.index_of(start_ref).ok_or(Error::InvalidPolyRef)?;
        let end = self.index_of(end_ref).ok_or(Error::InvalidPolyRef)?;
        self.cell(start).ok_or(Error::InvalidPolyRef)?;

        let mut path = vec![start_ref];
        let mut current = start;
        while current != end && path.len() < max_path {
            let next = if end > current { current + 1 } else { current - 1 };
            if self.cell_passes(next, filter).is_none() {
                // partial corridor toward the closest reachable polygon
                break;
            }
            path.push(self.poly_of(next));
            current = next;
        }

        Ok(path)
    }

    fn find_straight_path(
        &self,
        start_pos: Vec3,
        end_pos: Vec3,
        corridor: &[PolyRef],
        max_points: usize,
    ) -> Result<StraightPath> {
        if corridor.is_empty() || max_points == 0 {
            return Err(Error::Query("empty corridor".into()));
        }

        // a straight lane has no corners: the straight path is start, end
        let mut path = StraightPath::default();
        path.points.push(start_pos);
        path.flags.push(StraightPathFlags::START);
        path.polys.push(corridor[0]);

        if max_points > 1 {
            path.points.push(end_pos);
            path.flags.push(StraightPathFlags::END);
            path.polys.push(corridor[corridor.len() - 1]);
        }

        Ok(path)
    }

    fn raycast(
        &self,
        start_ref: PolyRef,
        start_pos: Vec3,
        end_pos: Vec3,
        filter: &QueryFilter,
        max_path: usize,
    ) -> Result<RaycastHit> {
        let start = self.index_of(start_ref).ok_or(Error::InvalidPolyRef)?;
        self.cell(start).ok_or(Error::InvalidPolyRef)?;

        let mut path = vec![start_ref];
        let dx = end_pos.x - start_pos.x;
        if dx.abs() < f32::EPSILON {
            return Ok(RaycastHit {
                t: f32::MAX,
                hit_normal: Vec3::ZERO,
                path,
            });
        }

        let direction = dx.signum();
        let mut current = start;
        loop {
            let boundary = if direction > 0.0 {
                (current + 1) as f32 * CELL_SIZE
            } else {
                current as f32 * CELL_SIZE
            };
            let crossing = if direction > 0.0 {
                end_pos.x > boundary
            } else {
                end_pos.x < boundary
            };
            if !crossing || path.len() >= max_path {
                return Ok(RaycastHit {
                    t: f32::MAX,
                    hit_normal: Vec3::ZERO,
                    path,
                });
            }

            let next = if direction > 0.0 {
                current + 1
            } else if current == 0 {
                usize::MAX
            } else {
                current - 1
            };
            if next == usize::MAX || self.cell_passes(next, filter).is_none() {
                return Ok(RaycastHit {
                    t: (boundary - start_pos.x) / dx,
                    hit_normal: Vec3::new(-direction, 0.0, 0.0),
                    path,
                });
            }

            current = next;
            path.push(self.poly_of(current));
        }
    }

    fn move_along_surface(
        &self,
        start_ref: PolyRef,
        start_pos: Vec3,
        end_pos: Vec3,
        filter: &QueryFilter,
        visited: &mut Vec<PolyRef>,
        max_visited: usize,
    ) -> Result<Vec3> {
        let start = self.index_of(start_ref).ok_or(Error::InvalidPolyRef)?;
        let mut cell = self.cell(start).ok_or(Error::InvalidPolyRef)?;

        visited.clear();
        visited.push(start_ref);

        let mut current = start;
        let mut reached_x = end_pos.x;
        loop {
            let x_min = current as f32 * CELL_SIZE;
            let x_max = x_min + CELL_SIZE;
            if end_pos.x >= x_min && end_pos.x < x_max {
                break;
            }

            let forward = end_pos.x >= x_max;
            let next = if forward {
                current + 1
            } else if current == 0 {
                usize::MAX
            } else {
                current - 1
            };

            let next_cell = if next == usize::MAX {
                None
            } else {
                self.cell_passes(next, filter)
            };
            match next_cell {
                Some(next_cell) if visited.len() < max_visited => {
                    current = next;
                    cell = next_cell;
                    visited.push(self.poly_of(current));
                }
                _ => {
                    // constrained by a wall edge: stop at the boundary
                    reached_x = if forward { x_max - 1e-3 } else { x_min + 1e-3 };
                    break;
                }
            }
        }

        Ok(Vec3::new(
            reached_x,
            cell.height,
            end_pos.z.clamp(0.0, CELL_SIZE),
        ))
    }

    fn closest_point_on_poly(&self, poly: PolyRef, pos: Vec3) -> Result<Vec3> {
        let index = self.index_of(poly).ok_or(Error::InvalidPolyRef)?;
        let cell = self.cell(index).ok_or(Error::InvalidPolyRef)?;
        Ok(self.closest_point_in_cell(index, cell, pos))
    }

    fn closest_point_on_poly_boundary(&self, poly: PolyRef, pos: Vec3) -> Result<Vec3> {
        self.closest_point_on_poly(poly, pos)
    }

    fn poly_height(&self, poly: PolyRef, pos: Vec3) -> Result<f32> {
        let index = self.index_of(poly).ok_or(Error::InvalidPolyRef)?;
        let cell = self.cell(index).ok_or(Error::InvalidPolyRef)?;
        let _ = pos;
        Ok(cell.height)
    }
}

impl NavMesh for LaneMesh {
    fn has_tile_at(&self, pos: Vec3) -> bool {
        !self
            .unloaded
            .iter()
            .any(|&(x_min, x_max)| pos.x >= x_min && pos.x <= x_max)
    }

    fn off_mesh_connection_endpoints(&self, _prev: PolyRef, _poly: PolyRef) -> Result<(Vec3, Vec3)> {
        Err(Error::Unsupported)
    }
}

impl NavMeshProvider for LaneMesh {
    fn mesh(&self, _map_id: u32) -> Option<&dyn NavMesh> {
        Some(self)
    }

    fn query(&self, _map_id: u32, _instance_id: u32) -> Option<&dyn NavMeshQuery> {
        Some(self)
    }
}

/// Provider for maps with no navigation data at all
pub struct NoNavigation;

impl NavMeshProvider for NoNavigation {
    fn mesh(&self, _map_id: u32) -> Option<&dyn NavMesh> {
        None
    }

    fn query(&self, _map_id: u32, _instance_id: u32) -> Option<&dyn NavMeshQuery> {
        None
    }
}

/// A liquid volume covering an X span of the lane up to a surface height.
#[derive(Debug, Clone, Copy)]
pub struct WaterVolume {
    pub x_min: f32,
    pub x_max: f32,
    pub surface: f32,
    pub kind: LiquidKind,
}

/// Terrain service over the lane: optional water volume, optional blocked
/// sight, identity height snapping.
#[derive(Default)]
pub struct LaneWorld {
    pub water: Option<WaterVolume>,
    pub sight_blocked: bool,
    /// Sight to any point with a smaller X fails (a wall across the lane)
    pub sight_blocked_below_x: Option<f32>,
}

impl LaneWorld {
    pub fn dry() -> Self {
        Self::default()
    }

    pub fn flooded(volume: WaterVolume) -> Self {
        Self {
            water: Some(volume),
            ..Self::default()
        }
    }
}

impl WorldTerrain for LaneWorld {
    fn liquid_at(&self, pos: Vec3, collision_height: f32) -> LiquidData {
        let volume = match self.water {
            Some(volume) if pos.x >= volume.x_min && pos.x <= volume.x_max => volume,
            _ => return LiquidData::NONE,
        };

        if pos.y + collision_height <= volume.surface {
            LiquidData {
                status: LiquidStatus::UNDER_LIQUID,
                kind: Some(volume.kind),
            }
        } else if pos.y < volume.surface {
            LiquidData {
                status: LiquidStatus::IN_LIQUID,
                kind: Some(volume.kind),
            }
        } else {
            LiquidData::NONE
        }
    }

    fn line_of_sight(&self, _from: Vec3, to: Vec3) -> bool {
        !self.sight_blocked && self.sight_blocked_below_x.map_or(true, |x| to.x >= x)
    }

    fn walkable_height(&self, pos: Vec3) -> f32 {
        pos.y
    }
}

/// Agent snapshot with every field writable by tests.
pub struct TestAgent {
    pub position: Vec3,
    pub collision_height: f32,
    pub kind: AgentKind,
    pub can_walk: bool,
    pub can_swim: bool,
    pub can_enter_water: bool,
    pub can_fly: bool,
    pub in_liquid: bool,
    pub under_liquid: bool,
    pub falling: bool,
    pub ignore_pathfinding: bool,
}

impl TestAgent {
    /// A plain walking creature standing on the first lane cell
    pub fn creature() -> Self {
        Self {
            position: Vec3::new(5.0, 0.0, 5.0),
            collision_height: 2.0,
            kind: AgentKind::Creature,
            can_walk: true,
            can_swim: false,
            can_enter_water: false,
            can_fly: false,
            in_liquid: false,
            under_liquid: false,
            falling: false,
            ignore_pathfinding: false,
        }
    }

    /// A player-like agent with broad assumed capability
    pub fn generic() -> Self {
        Self {
            kind: AgentKind::Generic,
            can_swim: true,
            can_enter_water: true,
            ..Self::creature()
        }
    }
}

impl Agent for TestAgent {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn collision_height(&self) -> f32 {
        self.collision_height
    }

    fn kind(&self) -> AgentKind {
        self.kind
    }

    fn can_walk(&self) -> bool {
        self.can_walk
    }

    fn can_swim(&self) -> bool {
        self.can_swim
    }

    fn can_enter_water(&self) -> bool {
        self.can_enter_water
    }

    fn can_fly(&self) -> bool {
        self.can_fly
    }

    fn is_in_liquid(&self) -> bool {
        self.in_liquid
    }

    fn is_under_liquid(&self) -> bool {
        self.under_liquid
    }

    fn is_falling(&self) -> bool {
        self.falling
    }

    fn ignores_pathfinding(&self) -> bool {
        self.ignore_pathfinding
    }

    fn map_id(&self) -> u32 {
        0
    }
}

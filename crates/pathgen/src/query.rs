//! Navigation mesh query boundary.
//!
//! The planner does not own a polygon search; it orchestrates one. These
//! traits describe the mesh query engine, the mesh itself, and the per-map
//! provider the planner resolves them from. Every method returns a
//! [`Result`](crate::Result); a failure is never fatal to a planning call,
//! it selects a fallback branch instead.

use bitflags::bitflags;
use glam::Vec3;

use crate::{QueryFilter, Result};

/// Opaque handle to a polygon in the navigation mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PolyRef(pub u64);

impl PolyRef {
    /// The null polygon reference
    pub const INVALID: PolyRef = PolyRef(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl Default for PolyRef {
    fn default() -> Self {
        PolyRef::INVALID
    }
}

bitflags! {
    /// Flags attached to straight-path corner points.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StraightPathFlags: u8 {
        /// First point of the straightened path
        const START = 0x01;
        /// Last point of the straightened path
        const END = 0x02;
        /// The point enters an off-mesh connection
        const OFF_MESH_CONNECTION = 0x04;
    }
}

/// Corner points extracted from a polygon corridor.
///
/// The three vectors run in parallel: `flags[i]` and `polys[i]` describe
/// `points[i]`.
#[derive(Debug, Clone, Default)]
pub struct StraightPath {
    pub points: Vec<Vec3>,
    pub flags: Vec<StraightPathFlags>,
    pub polys: Vec<PolyRef>,
}

impl StraightPath {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Result of casting a ray along the mesh surface.
#[derive(Debug, Clone)]
pub struct RaycastHit {
    /// Hit parameter along the segment, as a fraction of its length.
    /// `f32::MAX` when the ray reached the end unobstructed.
    pub t: f32,
    /// Normal of the wall that stopped the ray; zero when unobstructed
    pub hit_normal: Vec3,
    /// Polygons visited by the ray, in order
    pub path: Vec<PolyRef>,
}

impl RaycastHit {
    /// True when no wall stopped the ray
    pub fn is_clear(&self) -> bool {
        self.t == f32::MAX
    }
}

/// Polygon-level queries against a navigation mesh.
///
/// Implementations are shared, read-mostly resources; one instance serves
/// many planners. Thread-safety of concurrent queries is the
/// implementation's concern.
pub trait NavMeshQuery {
    /// Finds the polygon nearest to `center` within the search box given by
    /// `half_extents`, returning the polygon and the closest point on it.
    /// Returns [`PolyRef::INVALID`] when the box contains no polygon that
    /// passes the filter.
    fn find_nearest_poly(
        &self,
        center: Vec3,
        half_extents: Vec3,
        filter: &QueryFilter,
    ) -> Result<(PolyRef, Vec3)>;

    /// Searches a polygon corridor from `start_ref` to `end_ref`, at most
    /// `max_path` polygons long. A partial corridor toward the closest
    /// reachable polygon is a success.
    fn find_path(
        &self,
        start_ref: PolyRef,
        end_ref: PolyRef,
        start_pos: Vec3,
        end_pos: Vec3,
        filter: &QueryFilter,
        max_path: usize,
    ) -> Result<Vec<PolyRef>>;

    /// Extracts at most `max_points` straightened corner points along the
    /// corridor.
    fn find_straight_path(
        &self,
        start_pos: Vec3,
        end_pos: Vec3,
        corridor: &[PolyRef],
        max_points: usize,
    ) -> Result<StraightPath>;

    /// Casts a walkability ray from `start_pos` toward `end_pos` along the
    /// mesh surface, visiting at most `max_path` polygons.
    fn raycast(
        &self,
        start_ref: PolyRef,
        start_pos: Vec3,
        end_pos: Vec3,
        filter: &QueryFilter,
        max_path: usize,
    ) -> Result<RaycastHit>;

    /// Moves from `start_pos` toward `end_pos` constrained to the mesh
    /// surface. Fills `visited` with the polygons crossed (at most
    /// `max_visited`) and returns the reached position.
    fn move_along_surface(
        &self,
        start_ref: PolyRef,
        start_pos: Vec3,
        end_pos: Vec3,
        filter: &QueryFilter,
        visited: &mut Vec<PolyRef>,
        max_visited: usize,
    ) -> Result<Vec3>;

    /// Closest point on the polygon to `pos`. Fails for polygon kinds with
    /// no surface, e.g. off-mesh connections.
    fn closest_point_on_poly(&self, poly: PolyRef, pos: Vec3) -> Result<Vec3>;

    /// Closest point on or inside the polygon boundary to `pos`
    fn closest_point_on_poly_boundary(&self, poly: PolyRef, pos: Vec3) -> Result<Vec3>;

    /// Mesh surface height on the polygon at `pos`
    fn poly_height(&self, poly: PolyRef, pos: Vec3) -> Result<f32>;
}

/// Tile-level view of a navigation mesh.
pub trait NavMesh {
    /// Whether a mesh tile is loaded at the given world position
    fn has_tile_at(&self, pos: Vec3) -> bool;

    /// Entry and exit points of the off-mesh connection `poly`, oriented by
    /// the polygon `prev` it was entered from.
    fn off_mesh_connection_endpoints(&self, prev: PolyRef, poly: PolyRef) -> Result<(Vec3, Vec3)>;
}

/// Resolves the mesh and query engine for a map/instance.
///
/// `None` means no navigation data is available there; the planner degrades
/// to straight shortcuts in that case.
pub trait NavMeshProvider {
    fn mesh(&self, map_id: u32) -> Option<&dyn NavMesh>;

    fn query(&self, map_id: u32, instance_id: u32) -> Option<&dyn NavMeshQuery>;
}

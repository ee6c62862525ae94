//! Per-agent path planning on tiled navigation meshes.
//!
//! This crate turns a start/end position pair into a validated, smoothed
//! sequence of 3D waypoints for moving a single agent across a navigation
//! mesh. It owns corridor reuse, fallback handling for mesh holes and
//! off-mesh endpoints, point-path smoothing, and locomotion rules (swim,
//! fly, climbable slopes). The low-level polygon search, raycast, and
//! surface-walk primitives live behind the [`NavMeshQuery`] trait and are
//! supplied by the embedding application, as are the terrain service
//! ([`WorldTerrain`]) and the agent snapshot ([`Agent`]).
//!
//! All positions are in world space with +Y up. Horizontal range checks use
//! the XZ plane; slope and height checks use Y.

mod filter;
mod generator;
mod path_type;
mod query;
mod terrain;
mod world;

pub mod test_backends;

#[cfg(test)]
mod path_generator_tests;

pub use filter::{NavTerrain, QueryFilter};
pub use generator::{
    PathGenerator, MAX_PATH_LENGTH, MAX_POINT_PATH_LENGTH, SMOOTH_PATH_SLOP,
    SMOOTH_PATH_STEP_SIZE,
};
pub use path_type::PathType;
pub use query::{
    NavMesh, NavMeshProvider, NavMeshQuery, PolyRef, RaycastHit, StraightPath, StraightPathFlags,
};
pub use terrain::{
    is_swimmable_segment, is_walkable_climb, is_water_path, nav_terrain_at,
    required_height_to_climb, slope_angle_abs,
};
pub use world::{Agent, AgentKind, LiquidData, LiquidKind, LiquidStatus, WorldTerrain};

/// Represents a 3D position
pub type Vec3 = glam::Vec3;

/// Error types for the library
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("navigation mesh query failed: {0}")]
    Query(String),

    #[error("no polygon found near point")]
    PolyNotFound,

    #[error("invalid polygon reference")]
    InvalidPolyRef,

    #[error("operation not supported by this backend")]
    Unsupported,
}

/// Result type for planner and backend operations
pub type Result<T> = std::result::Result<T, Error>;

//! Terrain-capability flags and the polygon query filter.
//!
//! Every polygon in the navigation mesh is tagged with the terrain it
//! represents. The [`QueryFilter`] holds the include/exclude masks consulted
//! by every mesh query for the current agent.

use bitflags::bitflags;

bitflags! {
    /// Terrain-capability flags carried by navigation mesh polygons.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NavTerrain: u16 {
        /// Ordinary walkable ground
        const GROUND = 0x01;
        /// Ground steeper than the build-time walkable slope
        const GROUND_STEEP = 0x02;
        /// Water and ocean surfaces
        const WATER = 0x04;
        /// Magma and slime
        const MAGMA = 0x08;
    }
}

/// Include/exclude terrain mask applied to every polygon query.
///
/// A polygon passes when it intersects the include mask and does not
/// intersect the exclude mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryFilter {
    include_flags: NavTerrain,
    exclude_flags: NavTerrain,
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self {
            include_flags: NavTerrain::all(),
            exclude_flags: NavTerrain::empty(),
        }
    }
}

impl QueryFilter {
    /// Creates a filter with the given include mask and no exclusions
    pub fn new(include_flags: NavTerrain) -> Self {
        Self {
            include_flags,
            exclude_flags: NavTerrain::empty(),
        }
    }

    pub fn include_flags(&self) -> NavTerrain {
        self.include_flags
    }

    pub fn set_include_flags(&mut self, flags: NavTerrain) {
        self.include_flags = flags;
    }

    pub fn exclude_flags(&self) -> NavTerrain {
        self.exclude_flags
    }

    pub fn set_exclude_flags(&mut self, flags: NavTerrain) {
        self.exclude_flags = flags;
    }

    /// Checks whether a polygon with the given flags passes the filter
    pub fn passes(&self, poly_flags: NavTerrain) -> bool {
        poly_flags.intersects(self.include_flags) && !poly_flags.intersects(self.exclude_flags)
    }
}

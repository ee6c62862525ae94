//! Outcome classification for a planning call.

use bitflags::bitflags;

bitflags! {
    /// Classification of the last planning attempt.
    ///
    /// `NORMAL`, `NO_PATH`, and `SHORTCUT` are the terminal kinds; the
    /// remaining bits are modifiers composed onto them. The empty set is
    /// [`PathType::BLANK`]: no path has been planned yet.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PathType: u16 {
        /// Full corridor path to the destination
        const NORMAL = 0x01;
        /// Straight two-point path, mesh bypassed
        const SHORTCUT = 0x02;
        /// Reached a degraded waypoint, not the true destination
        const INCOMPLETE = 0x04;
        /// No traversable path was found
        const NO_PATH = 0x08;
        /// Shortcut taken despite a usable mesh (flight, swimming, forced destination)
        const NOT_USING_PATH = 0x10;
        /// Truncated because the point limit was hit
        const SHORT = 0x20;
        /// Resolved start polygon is farther than the tolerance from the requested start
        const FAR_FROM_POLY_START = 0x40;
        /// Resolved end polygon is farther than the tolerance from the requested end
        const FAR_FROM_POLY_END = 0x80;
        /// Both endpoints resolved far from their polygons
        const FAR_FROM_POLY = Self::FAR_FROM_POLY_START.bits() | Self::FAR_FROM_POLY_END.bits();
    }
}

impl PathType {
    /// No planning call has completed yet
    pub const BLANK: PathType = PathType::empty();
}

impl Default for PathType {
    fn default() -> Self {
        PathType::BLANK
    }
}

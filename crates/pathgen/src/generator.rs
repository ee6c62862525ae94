//! The per-agent path planner.
//!
//! [`PathGenerator`] owns one agent's polygon corridor and point path across
//! planning calls. A planning call resolves the endpoint polygons, reuses or
//! recomputes the corridor, smooths it into a point sequence, and classifies
//! the outcome as a [`PathType`]. Mesh query failures never escape a
//! planning call; they select fallback branches instead.

use glam::Vec3;

use crate::terrain::{is_swimmable_segment, is_walkable_climb, is_water_path, nav_terrain_at};
use crate::{
    Agent, AgentKind, LiquidStatus, NavMesh, NavMeshProvider, NavMeshQuery, NavTerrain, PathType,
    PolyRef, QueryFilter, StraightPathFlags, WorldTerrain,
};

/// Maximum number of polygons in a corridor
pub const MAX_PATH_LENGTH: usize = 74;

/// Hard cap on the number of points in a point path
pub const MAX_POINT_PATH_LENGTH: usize = 74;

/// Step length of one smoothing iteration
pub const SMOOTH_PATH_STEP_SIZE: f32 = 4.0;

/// Tolerance for reaching a steering point
pub const SMOOTH_PATH_SLOP: f32 = 0.3;

/// Corners requested per steering query
const MAX_STEER_POINTS: usize = 3;

/// Polygons a single surface move may visit
const MAX_VISIT_POLYS: usize = 16;

const DEFAULT_FAR_POLY_DISTANCE: f32 = 7.0;
const DEFAULT_REUSE_PREFIX_RATIO: f32 = 0.8;

/// Result of turning a corridor into a point sequence.
enum PointPathOutcome {
    /// The walk completed; points are ready for post-processing
    Complete(Vec<Vec3>),
    /// A segment failed the slope/swim check; the points walked so far
    SlopeTooSteep(Vec<Vec3>),
    /// No usable point sequence could be produced
    Failed,
}

/// A corner chosen to steer toward during smoothing.
struct SteerTarget {
    pos: Vec3,
    flags: StraightPathFlags,
    poly: PolyRef,
}

/// Plans and maintains the path of a single agent.
///
/// One instance per agent, invoked synchronously from that agent's movement
/// update. The corridor persists between calls to enable reuse; the point
/// path is rebuilt by every successful call.
pub struct PathGenerator<'a> {
    agent: &'a dyn Agent,
    world: &'a dyn WorldTerrain,
    nav_mesh: Option<&'a dyn NavMesh>,
    query: Option<&'a dyn NavMeshQuery>,

    filter: QueryFilter,
    path_polys: [PolyRef; MAX_PATH_LENGTH],
    poly_length: usize,
    path_points: Vec<Vec3>,
    path_type: PathType,

    use_straight_path: bool,
    use_raycast: bool,
    slope_check: bool,
    force_destination: bool,
    point_path_limit: usize,
    far_poly_distance: f32,
    reuse_prefix_ratio: f32,

    start_position: Vec3,
    end_position: Vec3,
    actual_end_position: Vec3,
}

impl<'a> PathGenerator<'a> {
    /// Creates a planner for the agent, resolving the navigation mesh and
    /// query engine for the agent's current map and instance.
    pub fn new(
        agent: &'a dyn Agent,
        world: &'a dyn WorldTerrain,
        provider: &'a dyn NavMeshProvider,
    ) -> Self {
        let mut generator = Self {
            agent,
            world,
            nav_mesh: provider.mesh(agent.map_id()),
            query: provider.query(agent.map_id(), agent.instance_id()),
            filter: QueryFilter::default(),
            path_polys: [PolyRef::INVALID; MAX_PATH_LENGTH],
            poly_length: 0,
            path_points: Vec::new(),
            path_type: PathType::BLANK,
            use_straight_path: false,
            use_raycast: false,
            slope_check: false,
            force_destination: false,
            point_path_limit: MAX_POINT_PATH_LENGTH,
            far_poly_distance: DEFAULT_FAR_POLY_DISTANCE,
            reuse_prefix_ratio: DEFAULT_REUSE_PREFIX_RATIO,
            start_position: Vec3::ZERO,
            end_position: Vec3::ZERO,
            actual_end_position: Vec3::ZERO,
        };
        generator.create_filter();
        generator
    }

    /// Plans a path from the agent's current position to `dest`.
    ///
    /// Returns `false` only for non-finite coordinates; any other outcome
    /// completes with a classification and a best-effort point path.
    pub fn calculate_path(&mut self, dest: Vec3, force_dest: bool) -> bool {
        self.calculate_path_from(self.agent.position(), dest, force_dest)
    }

    /// Plans a path between two explicit positions.
    pub fn calculate_path_from(&mut self, start: Vec3, dest: Vec3, force_dest: bool) -> bool {
        if !start.is_finite() || !dest.is_finite() {
            return false;
        }

        self.start_position = start;
        self.end_position = dest;
        self.actual_end_position = dest;
        self.force_destination = force_dest;

        // planning needs a query engine and loaded tiles under both
        // endpoints; anything else gets a straight shortcut
        let tiles_loaded = self
            .nav_mesh
            .map_or(false, |mesh| mesh.has_tile_at(start) && mesh.has_tile_at(dest));
        if self.query.is_none() || self.agent.ignores_pathfinding() || !tiles_loaded {
            self.build_shortcut();
            self.path_type = PathType::NORMAL | PathType::NOT_USING_PATH;
            return true;
        }

        self.update_filter();
        self.build_poly_path(start, dest);
        true
    }

    /// The classification of the last planning attempt
    pub fn path_type(&self) -> PathType {
        self.path_type
    }

    /// The planned point sequence
    pub fn path_points(&self) -> &[Vec3] {
        &self.path_points
    }

    /// The current polygon corridor
    pub fn path_polys(&self) -> &[PolyRef] {
        &self.path_polys[..self.poly_length]
    }

    pub fn start_position(&self) -> Vec3 {
        self.start_position
    }

    /// The requested destination
    pub fn end_position(&self) -> Vec3 {
        self.end_position
    }

    /// The destination the path actually reaches
    pub fn actual_end_position(&self) -> Vec3 {
        self.actual_end_position
    }

    /// The terrain filter currently applied to mesh queries
    pub fn filter(&self) -> &QueryFilter {
        &self.filter
    }

    /// Whether the reached end sits too far below the target's height
    pub fn is_invalid_destination_z(&self, target: Vec3) -> bool {
        (target.y - self.actual_end_position.y) > 5.0
    }

    /// Requests plain corner extraction instead of iterative smoothing
    pub fn set_use_straight_path(&mut self, value: bool) {
        self.use_straight_path = value;
    }

    /// Requests raycast-only planning (two-point walkability probes)
    pub fn set_use_raycast(&mut self, value: bool) {
        self.use_raycast = value;
    }

    /// Enables per-segment slope and swim validation
    pub fn set_slope_check(&mut self, value: bool) {
        self.slope_check = value;
    }

    /// Bounds the point path, clamped to [`MAX_POINT_PATH_LENGTH`]
    pub fn set_path_length_limit(&mut self, limit: usize) {
        self.point_path_limit = limit.min(MAX_POINT_PATH_LENGTH);
    }

    /// Distance beyond which an endpoint counts as far from its polygon
    pub fn set_far_poly_distance(&mut self, distance: f32) {
        self.far_poly_distance = distance;
    }

    /// Fraction of a reused corridor kept as prefix when the target moves
    pub fn set_reuse_prefix_ratio(&mut self, ratio: f32) {
        self.reuse_prefix_ratio = ratio.clamp(0.0, 1.0);
    }

    /// Builds the include mask from the agent's capabilities.
    fn create_filter(&mut self) {
        let mut include = NavTerrain::empty();
        match self.agent.kind() {
            AgentKind::Creature => {
                if self.agent.can_walk() {
                    include |= NavTerrain::GROUND;
                }
                // creatures take no environmental damage from magma
                if self.agent.can_enter_water() {
                    include |= NavTerrain::WATER | NavTerrain::MAGMA;
                }
            }
            AgentKind::Generic => {
                // perfect support is not possible, stay permissive
                include = NavTerrain::GROUND | NavTerrain::WATER | NavTerrain::MAGMA;
            }
        }

        self.filter.set_include_flags(include);
        self.filter.set_exclude_flags(NavTerrain::empty());

        self.update_filter();
    }

    /// Refreshes the include mask from the agent's current surroundings.
    ///
    /// An agent forced into terrain it cannot normally enter still needs a
    /// way out of it.
    fn update_filter(&mut self) {
        if self.agent.is_in_liquid() || self.agent.is_under_liquid() {
            let terrain = nav_terrain_at(
                self.world,
                self.agent.position(),
                self.agent.collision_height(),
            );
            self.filter
                .set_include_flags(self.filter.include_flags() | terrain);
        }
    }

    /// Searches the stored corridor for a polygon close to `point`.
    ///
    /// Returns the squared-distance-closest polygon when it lies within the
    /// acceptance bound, along with its distance.
    fn poly_in_corridor(&self, point: Vec3) -> (PolyRef, f32) {
        let query = match self.query {
            Some(query) => query,
            None => return (PolyRef::INVALID, f32::MAX),
        };

        let mut nearest = PolyRef::INVALID;
        let mut min_dist_sqr = f32::MAX;

        for &poly in &self.path_polys[..self.poly_length] {
            let closest = match query.closest_point_on_poly(poly, point) {
                Ok(closest) => closest,
                Err(_) => continue,
            };

            let dist_sqr = point.distance_squared(closest);
            if dist_sqr < min_dist_sqr {
                min_dist_sqr = dist_sqr;
                nearest = poly;
            }

            // close enough for us
            if min_dist_sqr < 1.0 {
                break;
            }
        }

        if min_dist_sqr < 3.0 {
            (nearest, min_dist_sqr.sqrt())
        } else {
            (PolyRef::INVALID, f32::MAX)
        }
    }

    /// Resolves the polygon under a point.
    ///
    /// The stored corridor is checked first; the expensive nearest-polygon
    /// search runs only on a miss, with a low search box and then a taller
    /// fallback box.
    fn poly_by_location(&self, point: Vec3) -> (PolyRef, f32) {
        let (poly, distance) = self.poly_in_corridor(point);
        if poly.is_valid() {
            return (poly, distance);
        }

        let query = match self.query {
            Some(query) => query,
            None => return (PolyRef::INVALID, f32::MAX),
        };

        for extents in [Vec3::new(3.0, 5.0, 3.0), Vec3::new(3.0, 50.0, 3.0)] {
            if let Ok((poly, closest)) = query.find_nearest_poly(point, extents, &self.filter) {
                if poly.is_valid() {
                    return (poly, point.distance(closest));
                }
            }
        }

        (PolyRef::INVALID, f32::MAX)
    }

    /// The corridor state machine: resolve endpoint polygons, then reuse,
    /// recompute, raycast, or shortcut.
    fn build_poly_path(&mut self, start_pos: Vec3, end_pos: Vec3) {
        let query = match self.query {
            Some(query) => query,
            None => {
                self.build_shortcut();
                self.path_type = PathType::NORMAL | PathType::NOT_USING_PATH;
                return;
            }
        };

        let (start_poly, dist_to_start_poly) = self.poly_by_location(start_pos);
        let (end_poly, dist_to_end_poly) = self.poly_by_location(end_pos);

        // the end point may be clamped onto the end polygon below
        let mut end_point = end_pos;

        self.path_type = PathType::NORMAL;

        // a hole in the mesh: shortcut and let the caller decide, unless
        // the agent can fly or swim across
        if !start_poly.is_valid() || !end_poly.is_valid() {
            self.build_shortcut();

            let can_fly = self.agent.kind() == AgentKind::Generic || self.agent.can_fly();
            let can_swim = self.agent.kind() == AgentKind::Generic || self.agent.can_swim();
            let water_path = is_water_path(
                self.world,
                self.agent.collision_height(),
                &self.path_points,
            );
            if can_fly || (water_path && can_swim) {
                self.path_type = PathType::NORMAL | PathType::NOT_USING_PATH;
                return;
            }

            // raycast handling below does not need the end polygon
            if !self.use_raycast {
                self.path_type = PathType::NO_PATH;
                return;
            }
        }

        let start_far_from_poly = dist_to_start_poly > self.far_poly_distance;
        let end_far_from_poly = dist_to_end_poly > self.far_poly_distance;

        if start_far_from_poly || end_far_from_poly {
            // a swimming agent must leave the water along a proper path, so
            // only flyers, fallers, and swimmers staying submerged may cut
            // straight across
            let height = self.agent.collision_height();
            let liquid_start = self.world.liquid_at(start_pos, height);
            let liquid_end = self.world.liquid_at(end_pos, height);

            let start_under_end_in = liquid_start.status == LiquidStatus::UNDER_LIQUID
                && liquid_end.status.intersects(LiquidStatus::IN_CONTACT);
            let start_in_end_under = liquid_start.status.intersects(LiquidStatus::IN_CONTACT)
                && liquid_end.status == LiquidStatus::UNDER_LIQUID;
            let water_path = start_under_end_in || start_in_end_under;

            let falling_down = self.agent.is_falling() && end_pos.y < start_pos.y;
            if (self.agent.can_swim() && water_path) || self.agent.can_fly() || falling_down {
                self.build_shortcut();
                self.path_type = PathType::NORMAL | PathType::NOT_USING_PATH;
                self.add_far_from_poly_flags(start_far_from_poly, end_far_from_poly);
                return;
            }

            // otherwise aim for the closest reachable spot on the end
            // polygon instead of the requested point
            if let Ok(closest) = query.closest_point_on_poly(end_poly, end_point) {
                end_point = closest;
                self.actual_end_position = closest;
            }

            self.path_type = PathType::INCOMPLETE;
            self.add_far_from_poly_flags(start_far_from_poly, end_far_from_poly);
        }

        // both ends on the same polygon: the corridor is that polygon
        if start_poly == end_poly && !self.use_raycast {
            self.path_polys[0] = start_poly;
            self.poly_length = 1;

            if start_far_from_poly || end_far_from_poly {
                self.path_type = PathType::INCOMPLETE;
                self.add_far_from_poly_flags(start_far_from_poly, end_far_from_poly);
            } else {
                self.path_type = PathType::NORMAL;
            }

            self.build_point_path(start_pos, end_point);
            return;
        }

        // look for both endpoint polygons in the stored corridor: forward
        // for the start, backward for the end
        let mut start_poly_found = false;
        let mut end_poly_found = false;
        let mut path_start_index = 0;
        let mut path_end_index = 0;

        if self.poly_length > 0 {
            while path_start_index < self.poly_length {
                // stale entries end the scan
                if !self.path_polys[path_start_index].is_valid() {
                    break;
                }
                if self.path_polys[path_start_index] == start_poly {
                    start_poly_found = true;
                    break;
                }
                path_start_index += 1;
            }

            path_end_index = self.poly_length - 1;
            while path_end_index > path_start_index {
                if self.path_polys[path_end_index] == end_poly {
                    end_poly_found = true;
                    break;
                }
                path_end_index -= 1;
            }
        }

        if start_poly_found && end_poly_found {
            // both endpoints still on the old corridor: the sub-range of an
            // optimal corridor is optimal, just cut it out
            self.poly_length = path_end_index - path_start_index + 1;
            self.path_polys
                .copy_within(path_start_index..path_start_index + self.poly_length, 0);
        } else if start_poly_found {
            // the target moved off the corridor: keep most of the known
            // part and query a fresh suffix toward the new end polygon
            self.poly_length -= path_start_index;

            let mut prefix_poly_length = ((self.poly_length as f32 * self.reuse_prefix_ratio
                + 0.5) as usize)
                .clamp(1, self.poly_length);
            self.path_polys
                .copy_within(path_start_index..path_start_index + prefix_poly_length, 0);

            let mut suffix_start_poly = self.path_polys[prefix_poly_length - 1];

            // any point on the suffix start polygon will do as the suffix
            // query origin
            let suffix_point = match query.closest_point_on_poly(suffix_start_poly, end_point) {
                Ok(point) => Some(point),
                Err(_) => {
                    // the prefix may end on an off-mesh connection, which
                    // has no closest point; retry one polygon earlier
                    if prefix_poly_length >= 2 {
                        prefix_poly_length -= 1;
                        suffix_start_poly = self.path_polys[prefix_poly_length - 1];
                        query.closest_point_on_poly(suffix_start_poly, end_point).ok()
                    } else {
                        None
                    }
                }
            };

            let suffix_point = match suffix_point {
                Some(point) => point,
                None => {
                    self.build_shortcut();
                    self.path_type = PathType::NO_PATH;
                    return;
                }
            };

            if self.use_raycast {
                self.build_shortcut();
                self.path_type = PathType::NO_PATH;
                return;
            }

            let suffix = query.find_path(
                suffix_start_poly,
                end_poly,
                suffix_point,
                end_point,
                &self.filter,
                MAX_PATH_LENGTH - prefix_poly_length,
            );

            match suffix {
                Ok(suffix) if !suffix.is_empty() => {
                    // new corridor = prefix + suffix, overlapping by the
                    // shared suffix-start polygon
                    let copy_len = suffix
                        .len()
                        .min(MAX_PATH_LENGTH - (prefix_poly_length - 1));
                    self.path_polys
                        [prefix_poly_length - 1..prefix_poly_length - 1 + copy_len]
                        .copy_from_slice(&suffix[..copy_len]);
                    self.poly_length = prefix_poly_length - 1 + copy_len;
                }
                _ => {
                    log::error!("build_poly_path: suffix corridor query failed");
                    self.build_shortcut();
                    self.path_type = PathType::NO_PATH;
                    return;
                }
            }
        } else {
            // first plan, or the agent left the stored corridor entirely
            self.clear();

            if self.use_raycast {
                let hit = match query.raycast(
                    start_poly,
                    start_pos,
                    end_point,
                    &self.filter,
                    MAX_PATH_LENGTH,
                ) {
                    Ok(hit) if !hit.path.is_empty() => hit,
                    _ => {
                        self.build_shortcut();
                        self.path_type = PathType::NO_PATH;
                        self.add_far_from_poly_flags(start_far_from_poly, end_far_from_poly);
                        return;
                    }
                };

                let copy_len = hit.path.len().min(MAX_PATH_LENGTH);
                self.path_polys[..copy_len].copy_from_slice(&hit.path[..copy_len]);
                self.poly_length = copy_len;
                let last_poly = self.path_polys[self.poly_length - 1];

                if !hit.is_clear() {
                    // stop just short of the obstruction; float error can
                    // put the exact hit point outside the mesh
                    let mut hit_pos = start_pos.lerp(end_point, hit.t * 0.99);
                    match query.poly_height(last_poly, hit_pos) {
                        Ok(height) => hit_pos.y = height,
                        Err(_) => {
                            if let Ok(clamped) =
                                query.closest_point_on_poly_boundary(last_poly, hit_pos)
                            {
                                hit_pos = clamped;
                            }
                        }
                    }

                    self.path_points = vec![self.start_position, hit_pos];
                    self.normalize_path();
                    self.path_type = PathType::INCOMPLETE;
                    self.add_far_from_poly_flags(start_far_from_poly, false);
                } else {
                    let mut ray_end = end_point;
                    match query.poly_height(last_poly, ray_end) {
                        Ok(height) => ray_end.y = height,
                        Err(_) => {
                            if let Ok(clamped) =
                                query.closest_point_on_poly_boundary(last_poly, ray_end)
                            {
                                ray_end = clamped;
                            }
                        }
                    }

                    self.path_points = vec![self.start_position, ray_end];
                    self.normalize_path();
                    if start_far_from_poly || end_far_from_poly {
                        self.path_type = PathType::INCOMPLETE;
                        self.add_far_from_poly_flags(start_far_from_poly, end_far_from_poly);
                    } else {
                        self.path_type = PathType::NORMAL;
                    }
                }
                return;
            }

            let corridor = query.find_path(
                start_poly,
                end_poly,
                start_pos,
                end_point,
                &self.filter,
                MAX_PATH_LENGTH,
            );

            match corridor {
                Ok(corridor) if !corridor.is_empty() => {
                    let copy_len = corridor.len().min(MAX_PATH_LENGTH);
                    self.path_polys[..copy_len].copy_from_slice(&corridor[..copy_len]);
                    self.poly_length = copy_len;
                }
                _ => {
                    // bad input, or broken mesh data
                    log::error!("build_poly_path: corridor query returned no polygons");
                    self.build_shortcut();
                    self.path_type = PathType::NO_PATH;
                    return;
                }
            }
        }

        if self.poly_length == 0 {
            log::error!("build_poly_path: corridor query returned no polygons");
            self.build_shortcut();
            self.path_type = PathType::NO_PATH;
            return;
        }

        // by now we know what kind of path this is
        if self.path_polys[self.poly_length - 1] == end_poly
            && !self.path_type.contains(PathType::INCOMPLETE)
        {
            self.path_type = PathType::NORMAL;
        } else {
            self.path_type = PathType::INCOMPLETE;
        }
        self.add_far_from_poly_flags(start_far_from_poly, end_far_from_poly);

        self.build_point_path(start_pos, end_point);
    }

    /// Turns the resolved corridor into the final point sequence.
    fn build_point_path(&mut self, start_point: Vec3, end_point: Vec3) {
        let query = match self.query {
            Some(query) => query,
            None => {
                self.build_shortcut();
                self.path_type |= PathType::NO_PATH;
                return;
            }
        };

        if self.use_raycast {
            // raycast planning emits its two-point result during corridor
            // building and never reaches here
            log::error!("build_point_path called in raycast mode");
            self.build_shortcut();
            self.path_type = PathType::NO_PATH;
            return;
        }

        let outcome = if self.use_straight_path {
            match query.find_straight_path(
                start_point,
                end_point,
                &self.path_polys[..self.poly_length],
                self.point_path_limit,
            ) {
                Ok(straight) => PointPathOutcome::Complete(straight.points),
                Err(_) => PointPathOutcome::Failed,
            }
        } else {
            self.find_smooth_path(query, start_point, end_point)
        };

        let mut failed = false;
        let mut slope_too_steep = false;
        let mut points = match outcome {
            PointPathOutcome::Complete(points) => points,
            PointPathOutcome::SlopeTooSteep(points) => {
                failed = true;
                slope_too_steep = true;
                points
            }
            PointPathOutcome::Failed => {
                failed = true;
                Vec::new()
            }
        };

        if self.poly_length == 1 && points.len() == 1 && !slope_too_steep {
            // start and end right next to each other on one polygon: the
            // single corner is the start, append the end
            points.push(end_point);
        } else if points.len() < 2 || failed {
            if !points.is_empty() && slope_too_steep {
                // too steep mid-walk: keep the partial path up to the last
                // accepted point
                self.path_points = points;
                self.normalize_path();
                if let Some(&last) = self.path_points.last() {
                    self.actual_end_position = last;
                }
                self.path_type |= PathType::INCOMPLETE;
                return;
            }

            // bad data handed to the corner extraction, or a broken mesh
            self.build_shortcut();
            self.path_type |= PathType::NO_PATH;
            return;
        } else if points.len() >= self.point_path_limit {
            self.build_shortcut();
            self.path_type |= PathType::SHORT;
            return;
        }

        self.path_points = points;
        self.normalize_path();
        if let Some(&last) = self.path_points.last() {
            self.actual_end_position = last;
        }

        // force the requested destination if the path stopped short of it
        if self.force_destination
            && (!self.path_type.contains(PathType::NORMAL)
                || !in_range(self.end_position, self.actual_end_position, 1.0, 1.0))
        {
            if self.actual_end_position.distance_squared(self.end_position)
                < 0.3 * self.start_position.distance_squared(self.end_position)
            {
                // the partial path ends close to the target: keep it and
                // snap only the final point
                self.actual_end_position = self.end_position;
                if let Some(last) = self.path_points.last_mut() {
                    *last = self.end_position;
                }
            } else {
                self.actual_end_position = self.end_position;
                self.build_shortcut();
            }

            self.path_type = PathType::NORMAL | PathType::NOT_USING_PATH;
        }
    }

    /// Walks the corridor in bounded steps, steering toward extracted
    /// corners and splicing the visited polygons back into the corridor.
    fn find_smooth_path(
        &self,
        query: &dyn NavMeshQuery,
        start_point: Vec3,
        end_point: Vec3,
    ) -> PointPathOutcome {
        let mut polys: Vec<PolyRef> = self.path_polys[..self.poly_length].to_vec();

        let (mut iter_pos, target_pos) = if polys.len() > 1 {
            // pick the closest points on the polygon borders
            let iter = match query.closest_point_on_poly_boundary(polys[0], start_point) {
                Ok(point) => point,
                Err(_) => return PointPathOutcome::Failed,
            };
            let target = match query.closest_point_on_poly_boundary(polys[polys.len() - 1], end_point)
            {
                Ok(point) => point,
                Err(_) => return PointPathOutcome::Failed,
            };
            (iter, target)
        } else {
            (start_point, end_point)
        };

        let mut smooth_path = Vec::with_capacity(self.point_path_limit);
        smooth_path.push(iter_pos);

        // advance a small bounded step at a time until the target is
        // reached or the point budget runs out
        while !polys.is_empty() && smooth_path.len() < self.point_path_limit {
            let steer = match self.steer_target(query, iter_pos, target_pos, SMOOTH_PATH_SLOP, &polys)
            {
                Some(steer) => steer,
                None => break,
            };

            let end_of_path = steer.flags.contains(StraightPathFlags::END);
            let off_mesh_connection = steer.flags.contains(StraightPathFlags::OFF_MESH_CONNECTION);

            // never move past a path end or an off-mesh link
            let delta = steer.pos - iter_pos;
            let mut len = delta.length();
            if (end_of_path || off_mesh_connection) && len < SMOOTH_PATH_STEP_SIZE {
                len = 1.0;
            } else {
                len = SMOOTH_PATH_STEP_SIZE / len;
            }
            let move_target = iter_pos + delta * len;

            let mut visited = Vec::with_capacity(MAX_VISIT_POLYS);
            let mut result = match query.move_along_surface(
                polys[0],
                iter_pos,
                move_target,
                &self.filter,
                &mut visited,
                MAX_VISIT_POLYS,
            ) {
                Ok(position) => position,
                Err(_) => return PointPathOutcome::Failed,
            };

            fixup_corridor(&mut polys, MAX_PATH_LENGTH, &visited);

            let first_poly = match polys.first() {
                Some(&poly) => poly,
                None => return PointPathOutcome::Failed,
            };
            match query.poly_height(first_poly, result) {
                Ok(height) => result.y = height,
                Err(_) => {
                    log::debug!("find_smooth_path: no surface height at {result:?}");
                }
            }
            result.y += 0.5;
            iter_pos = result;

            let can_check_slope = self.slope_check
                && !self.path_type.difference(PathType::NOT_USING_PATH).is_empty();
            if can_check_slope
                && !is_swimmable_segment(self.world, self.agent, iter_pos, steer.pos, true)
                && !is_walkable_climb(iter_pos, steer.pos, self.agent.collision_height())
            {
                // reject the segment and report what was walked so far
                smooth_path.pop();
                return PointPathOutcome::SlopeTooSteep(smooth_path);
            }

            if end_of_path && in_range(iter_pos, steer.pos, SMOOTH_PATH_SLOP, 1.0) {
                // reached the end of the path
                iter_pos = target_pos;
                if smooth_path.len() < self.point_path_limit {
                    smooth_path.push(iter_pos);
                }
                break;
            } else if off_mesh_connection && in_range(iter_pos, steer.pos, SMOOTH_PATH_SLOP, 1.0) {
                // advance the corridor up to and over the connection
                let mut prev_ref = PolyRef::INVALID;
                let mut poly_ref = polys[0];
                let mut npos = 0;
                while npos < polys.len() && poly_ref != steer.poly {
                    prev_ref = poly_ref;
                    poly_ref = polys[npos];
                    npos += 1;
                }
                polys.drain(..npos);

                let nav_mesh = match self.nav_mesh {
                    Some(nav_mesh) => nav_mesh,
                    None => return PointPathOutcome::Failed,
                };
                match nav_mesh.off_mesh_connection_endpoints(prev_ref, poly_ref) {
                    Ok((connection_start, connection_end)) => {
                        if smooth_path.len() < self.point_path_limit {
                            smooth_path.push(connection_start);
                        }
                        // continue from the far side of the link
                        iter_pos = connection_end;
                        let first_poly = match polys.first() {
                            Some(&poly) => poly,
                            None => return PointPathOutcome::Failed,
                        };
                        match query.poly_height(first_poly, iter_pos) {
                            Ok(height) => iter_pos.y = height + 0.5,
                            Err(_) => return PointPathOutcome::Failed,
                        }
                    }
                    Err(_) => {
                        log::debug!("find_smooth_path: off-mesh connection endpoints not found");
                        return PointPathOutcome::Failed;
                    }
                }
            }

            if smooth_path.len() < self.point_path_limit {
                smooth_path.push(iter_pos);
            }
        }

        // filling the whole buffer means the walk never converged
        if smooth_path.len() < MAX_POINT_PATH_LENGTH {
            PointPathOutcome::Complete(smooth_path)
        } else {
            PointPathOutcome::Failed
        }
    }

    /// Picks the corner to steer toward: the first extracted corner beyond
    /// the slop tolerance, stopping at off-mesh links.
    fn steer_target(
        &self,
        query: &dyn NavMeshQuery,
        start_pos: Vec3,
        end_pos: Vec3,
        min_target_dist: f32,
        polys: &[PolyRef],
    ) -> Option<SteerTarget> {
        let steer_path = query
            .find_straight_path(start_pos, end_pos, polys, MAX_STEER_POINTS)
            .ok()?;
        if steer_path.is_empty() {
            return None;
        }

        let mut index = 0;
        while index < steer_path.len() {
            let flags = steer_path.flags.get(index).copied()?;
            if flags.contains(StraightPathFlags::OFF_MESH_CONNECTION)
                || !in_range(steer_path.points[index], start_pos, min_target_dist, 1000.0)
            {
                break;
            }
            index += 1;
        }

        // every corner is within the slop: nothing to steer to
        if index >= steer_path.len() {
            return None;
        }

        let mut pos = steer_path.points[index];
        pos.y = start_pos.y;
        Some(SteerTarget {
            pos,
            flags: steer_path.flags.get(index).copied()?,
            poly: steer_path.polys.get(index).copied()?,
        })
    }

    /// Replaces the current path with a straight two-point shortcut.
    fn build_shortcut(&mut self) {
        self.clear();

        self.path_points = vec![self.start_position, self.actual_end_position];
        self.normalize_path();
        self.path_type = PathType::SHORTCUT;
    }

    /// Snaps every point to the allowed walkable height.
    fn normalize_path(&mut self) {
        for point in &mut self.path_points {
            point.y = self.world.walkable_height(*point);
        }
    }

    fn add_far_from_poly_flags(&mut self, start_far_from_poly: bool, end_far_from_poly: bool) {
        if start_far_from_poly {
            self.path_type |= PathType::FAR_FROM_POLY_START;
        }
        if end_far_from_poly {
            self.path_type |= PathType::FAR_FROM_POLY_END;
        }
    }

    fn clear(&mut self) {
        self.poly_length = 0;
        self.path_points.clear();
    }

    /// Trims the point path to stop `dist` away from `target`, re-checking
    /// line of sight and walkability for every segment walked back.
    pub fn shorten_path_until_dist(&mut self, target: Vec3, dist: f32) {
        if self.path_type == PathType::BLANK || self.path_points.len() < 2 {
            log::error!("shorten_path_until_dist called before a path was built");
            return;
        }

        let dist_sq = dist * dist;

        // the first point of the path must be outside the requested range
        if self.path_points[0].distance_squared(target) < dist_sq {
            return;
        }

        // nothing to do when the tail already keeps its distance
        if self.path_points[self.path_points.len() - 1].distance_squared(target) >= dist_sq {
            return;
        }

        let collision_height = self.agent.collision_height();
        let mut i = self.path_points.len() - 1;

        // find the first i where points[i] is still too close and
        // points[i - 1] is far enough: the boundary lies between them
        loop {
            // points[i] is known to be too close from the previous turn
            if self.path_points[i - 1].distance_squared(target) >= dist_sq {
                break;
            }

            let candidate = self.path_points[i - 1];
            let raised = Vec3::new(candidate.x, candidate.y + collision_height, candidate.z);
            let eye = self.agent.hit_sphere_point_toward(raised);

            let can_check_slope = self.slope_check
                && !self.path_type.difference(PathType::NOT_USING_PATH).is_empty();
            let blocked = !self.world.line_of_sight(eye, raised)
                || (can_check_slope
                    && !is_swimmable_segment(
                        self.world,
                        self.agent,
                        self.agent.position(),
                        candidate,
                        true,
                    )
                    && !is_walkable_climb(self.agent.position(), candidate, collision_height));

            if blocked {
                // keep the last tail that was still valid
                self.path_points.truncate(i + 1);
                return;
            }

            i -= 1;
            if i == 0 {
                // no point far enough from the target
                self.path_points[0] = self.path_points[1];
                self.path_points.truncate(2);
                return;
            }
        }

        // settle the exact boundary point between the two
        let too_close = self.path_points[i];
        let far_enough = self.path_points[i - 1];
        let direction = (far_enough - too_close).normalize_or_zero();
        self.path_points[i] = too_close + direction * (dist - too_close.distance(target));
        self.path_points.truncate(i + 1);
    }
}

/// Horizontal-radius plus height-band range check.
fn in_range(from: Vec3, to: Vec3, radius: f32, height: f32) -> bool {
    let delta = to - from;
    delta.x * delta.x + delta.z * delta.z < radius * radius && delta.y.abs() < height
}

/// Splices the polygons visited by a surface move into a corridor.
///
/// Finds the furthest polygon common to both sequences, then rebuilds the
/// corridor as the visited tail (reversed) followed by whatever of the
/// original corridor lay beyond the common polygon, truncated to
/// `max_path`. Disjoint sequences leave the corridor unchanged.
fn fixup_corridor(path: &mut Vec<PolyRef>, max_path: usize, visited: &[PolyRef]) {
    let mut furthest_path = None;
    let mut furthest_visited = None;

    for i in (0..path.len()).rev() {
        let mut found = false;
        for j in (0..visited.len()).rev() {
            if path[i] == visited[j] {
                furthest_path = Some(i);
                furthest_visited = Some(j);
                found = true;
            }
        }
        if found {
            break;
        }
    }

    let (furthest_path, furthest_visited) = match (furthest_path, furthest_visited) {
        (Some(path_index), Some(visited_index)) => (path_index, visited_index),
        _ => return,
    };

    let req = visited.len() - furthest_visited;
    let orig = (furthest_path + 1).min(path.len());
    let mut tail: Vec<PolyRef> = path[orig..].to_vec();
    tail.truncate(max_path.saturating_sub(req));

    path.clear();
    path.extend(visited[furthest_visited..].iter().rev());
    path.extend(tail);
}

//! Planning scenario tests on the single-lane reference backend.
//!
//! Each test builds a small lane world, plans against it, and checks the
//! resulting classification, point path, and corridor.

#[cfg(test)]
mod tests {
    use crate::test_backends::{
        LaneWorld, LaneMesh, NoNavigation, TestAgent, WaterVolume, CELL_SIZE,
    };
    use crate::{LiquidKind, NavTerrain, PathType, PolyRef, Vec3};
    use approx::assert_relative_eq;

    fn refs(values: &[u64]) -> Vec<PolyRef> {
        values.iter().map(|&v| PolyRef::new(v)).collect()
    }

    /// Center of lane cell `i`, on the cell surface
    fn cell_center(i: usize, height: f32) -> Vec3 {
        Vec3::new(i as f32 * CELL_SIZE + 5.0, height, 5.0)
    }

    #[test]
    fn starts_blank() {
        let mesh = LaneMesh::flat(3);
        let world = LaneWorld::dry();
        let agent = TestAgent::creature();

        let generator = crate::PathGenerator::new(&agent, &world, &mesh);
        assert_eq!(generator.path_type(), PathType::BLANK);
        assert!(generator.path_points().is_empty());
    }

    #[test]
    fn rejects_non_finite_coordinates() {
        let mesh = LaneMesh::flat(3);
        let world = LaneWorld::dry();
        let agent = TestAgent::creature();

        let mut generator = crate::PathGenerator::new(&agent, &world, &mesh);
        assert!(!generator.calculate_path(Vec3::new(f32::NAN, 0.0, 0.0), false));
        assert_eq!(generator.path_type(), PathType::BLANK);
    }

    #[test]
    fn same_polygon_yields_two_point_normal_path() {
        let mesh = LaneMesh::flat(3);
        let world = LaneWorld::dry();
        let agent = TestAgent::creature();

        let mut generator = crate::PathGenerator::new(&agent, &world, &mesh);
        assert!(generator.calculate_path(Vec3::new(8.0, 0.0, 5.0), false));

        assert_eq!(generator.path_type(), PathType::NORMAL);
        assert_eq!(generator.path_points().len(), 2);
        assert_eq!(generator.path_polys(), refs(&[1]).as_slice());
    }

    #[test]
    fn degenerate_start_equals_end() {
        let mesh = LaneMesh::flat(3);
        let world = LaneWorld::dry();
        let agent = TestAgent::creature();

        let mut generator = crate::PathGenerator::new(&agent, &world, &mesh);
        let here = agent.position;
        assert!(generator.calculate_path(here, false));

        assert_eq!(generator.path_type(), PathType::NORMAL);
        assert_eq!(generator.path_points().len(), 2);
        assert_eq!(generator.path_points()[0], generator.path_points()[1]);
    }

    #[test]
    fn missing_engine_yields_shortcut() {
        let world = LaneWorld::dry();
        let agent = TestAgent::creature();

        let mut generator = crate::PathGenerator::new(&agent, &world, &NoNavigation);
        assert!(generator.calculate_path(cell_center(2, 0.0), false));

        assert_eq!(
            generator.path_type(),
            PathType::NORMAL | PathType::NOT_USING_PATH
        );
        assert_eq!(generator.path_points().len(), 2);
        assert_eq!(generator.path_points()[0], agent.position);
        assert_eq!(generator.path_points()[1], cell_center(2, 0.0));
    }

    #[test]
    fn unloaded_tile_yields_shortcut() {
        let mut mesh = LaneMesh::flat(6);
        mesh.set_unloaded(40.0, 60.0);
        let world = LaneWorld::dry();
        let agent = TestAgent::creature();

        let mut generator = crate::PathGenerator::new(&agent, &world, &mesh);
        assert!(generator.calculate_path(cell_center(5, 0.0), false));

        assert_eq!(
            generator.path_type(),
            PathType::NORMAL | PathType::NOT_USING_PATH
        );
        assert_eq!(generator.path_points().len(), 2);
    }

    #[test]
    fn pathfinding_ignoring_agent_gets_shortcut() {
        let mesh = LaneMesh::flat(6);
        let world = LaneWorld::dry();
        let mut agent = TestAgent::creature();
        agent.ignore_pathfinding = true;

        let mut generator = crate::PathGenerator::new(&agent, &world, &mesh);
        assert!(generator.calculate_path(cell_center(5, 0.0), false));

        assert_eq!(
            generator.path_type(),
            PathType::NORMAL | PathType::NOT_USING_PATH
        );
    }

    #[test]
    fn full_lane_walk_is_normal_and_monotone() {
        let mesh = LaneMesh::flat(6);
        let world = LaneWorld::dry();
        let agent = TestAgent::creature();

        let mut generator = crate::PathGenerator::new(&agent, &world, &mesh);
        let dest = cell_center(5, 0.0);
        assert!(generator.calculate_path(dest, false));

        assert_eq!(generator.path_type(), PathType::NORMAL);
        let points = generator.path_points();
        assert!(points.len() >= 3, "expected a smoothed multi-point path");
        assert_eq!(points[0], agent.position);
        assert_eq!(*points.last().unwrap(), dest);
        assert!(points.windows(2).all(|pair| pair[0].x < pair[1].x));
        assert_eq!(generator.actual_end_position(), dest);
    }

    #[test]
    fn corridor_reuse_cuts_exact_subrange_without_requery() {
        let mesh = LaneMesh::flat(6);
        let world = LaneWorld::dry();
        let agent = TestAgent::creature();

        let mut generator = crate::PathGenerator::new(&agent, &world, &mesh);
        assert!(generator.calculate_path(cell_center(5, 0.0), false));
        assert_eq!(generator.path_polys(), refs(&[1, 2, 3, 4, 5, 6]).as_slice());
        assert_eq!(mesh.find_path_calls(), 1);

        // the agent advanced into cell 1, the target fell back to cell 4;
        // both still lie on the stored corridor
        assert!(generator.calculate_path_from(
            Vec3::new(15.0, 0.5, 5.0),
            cell_center(4, 0.0),
            false
        ));

        assert_eq!(generator.path_polys(), refs(&[2, 3, 4, 5]).as_slice());
        assert_eq!(mesh.find_path_calls(), 1, "reuse must not issue a new search");
        assert!(generator.path_type().contains(PathType::NORMAL));
    }

    #[test]
    fn replanning_unchanged_request_is_idempotent() {
        let mesh = LaneMesh::flat(6);
        let world = LaneWorld::dry();
        let agent = TestAgent::creature();

        let mut generator = crate::PathGenerator::new(&agent, &world, &mesh);
        let dest = cell_center(5, 0.0);
        assert!(generator.calculate_path(dest, false));
        let first: Vec<Vec3> = generator.path_points().to_vec();
        let first_type = generator.path_type();

        assert!(generator.calculate_path(dest, false));
        assert_eq!(generator.path_points(), first.as_slice());
        assert_eq!(generator.path_type(), first_type);
    }

    #[test]
    fn distant_end_polygon_sets_far_flag() {
        let mesh = LaneMesh::flat(3);
        let world = LaneWorld::dry();
        let agent = TestAgent::creature();

        let mut generator = crate::PathGenerator::new(&agent, &world, &mesh);
        // hovering 12 units above cell 2: resolvable only by the tall
        // search box, and farther than the 7.0 tolerance
        assert!(generator.calculate_path(Vec3::new(25.0, 12.0, 5.0), false));

        assert!(generator.path_type().contains(PathType::INCOMPLETE));
        assert!(generator.path_type().contains(PathType::FAR_FROM_POLY_END));
        // the walk aims for the clamped point on the end polygon instead
        assert_relative_eq!(generator.actual_end_position().y, 0.0, epsilon = 1.0);
    }

    #[test]
    fn hole_in_mesh_yields_no_path_for_walkers() {
        let mut mesh = LaneMesh::flat(4);
        mesh.remove_cell(2);
        let world = LaneWorld::dry();
        let agent = TestAgent::creature();

        let mut generator = crate::PathGenerator::new(&agent, &world, &mesh);
        // the destination sits in the hole, out of reach of both search boxes
        assert!(generator.calculate_path(cell_center(2, 0.0), false));

        assert_eq!(generator.path_type(), PathType::NO_PATH);
        // even a failed plan leaves a usable two-point fallback
        assert_eq!(generator.path_points().len(), 2);
    }

    #[test]
    fn swimmer_crosses_mesh_hole_under_water() {
        let mut mesh = LaneMesh::flat(4);
        mesh.remove_cell(2);
        let world = LaneWorld::flooded(WaterVolume {
            x_min: 0.0,
            x_max: 40.0,
            surface: 10.0,
            kind: LiquidKind::Water,
        });
        let mut agent = TestAgent::creature();
        agent.can_swim = true;
        agent.can_enter_water = true;
        agent.in_liquid = true;

        let mut generator = crate::PathGenerator::new(&agent, &world, &mesh);
        assert!(generator.calculate_path(cell_center(2, 0.0), false));

        assert_eq!(
            generator.path_type(),
            PathType::NORMAL | PathType::NOT_USING_PATH
        );
    }

    #[test]
    fn flyer_crosses_mesh_hole() {
        let mut mesh = LaneMesh::flat(4);
        mesh.remove_cell(2);
        let world = LaneWorld::dry();
        let mut agent = TestAgent::creature();
        agent.can_fly = true;

        let mut generator = crate::PathGenerator::new(&agent, &world, &mesh);
        assert!(generator.calculate_path(cell_center(2, 0.0), false));

        assert_eq!(
            generator.path_type(),
            PathType::NORMAL | PathType::NOT_USING_PATH
        );
    }

    #[test]
    fn blocked_corridor_ends_incomplete_before_the_hole() {
        let mut mesh = LaneMesh::flat(5);
        mesh.remove_cell(2);
        let world = LaneWorld::dry();
        let agent = TestAgent::creature();

        let mut generator = crate::PathGenerator::new(&agent, &world, &mesh);
        // both endpoints resolve, but the corridor search stops at the hole
        assert!(generator.calculate_path(cell_center(4, 0.0), false));

        assert!(generator.path_type().contains(PathType::INCOMPLETE));
        assert!(
            generator.actual_end_position().x <= 2.0 * CELL_SIZE,
            "walk must stop before the hole"
        );
    }

    #[test]
    fn steep_step_truncates_path() {
        // a 5-unit cliff between cells 1 and 2
        let mesh = LaneMesh::with_heights(&[0.0, 0.0, 5.0]);
        let world = LaneWorld::dry();
        let agent = TestAgent::creature();

        let mut generator = crate::PathGenerator::new(&agent, &world, &mesh);
        generator.set_slope_check(true);
        assert!(generator.calculate_path(Vec3::new(25.0, 5.0, 5.0), false));

        assert!(generator.path_type().contains(PathType::INCOMPLETE));
        let points = generator.path_points();
        assert!(!points.is_empty());
        // the rejection also drops the last point produced before the cliff
        assert!(points.last().unwrap().x < 2.0 * CELL_SIZE);
        assert_eq!(*points.last().unwrap(), generator.actual_end_position());
    }

    #[test]
    fn cliff_is_walked_when_slope_check_is_off() {
        let mesh = LaneMesh::with_heights(&[0.0, 0.0, 5.0]);
        let world = LaneWorld::dry();
        let agent = TestAgent::creature();

        let mut generator = crate::PathGenerator::new(&agent, &world, &mesh);
        assert!(generator.calculate_path(Vec3::new(25.0, 5.0, 5.0), false));

        assert_eq!(generator.path_type(), PathType::NORMAL);
        assert_relative_eq!(generator.actual_end_position().x, 25.0);
    }

    #[test]
    fn raycast_stops_short_at_obstruction() {
        let mut mesh = LaneMesh::flat(4);
        mesh.remove_cell(2);
        let world = LaneWorld::dry();
        let agent = TestAgent::creature();

        let mut generator = crate::PathGenerator::new(&agent, &world, &mesh);
        generator.set_use_raycast(true);
        assert!(generator.calculate_path(cell_center(3, 0.0), false));

        assert_eq!(generator.path_type(), PathType::INCOMPLETE);
        let points = generator.path_points();
        assert_eq!(points.len(), 2);
        // stepped back from the hit boundary at x = 20
        assert!(points[1].x < 2.0 * CELL_SIZE);
        assert!(points[1].x > CELL_SIZE);
    }

    #[test]
    fn raycast_clear_line_is_normal() {
        let mesh = LaneMesh::flat(4);
        let world = LaneWorld::dry();
        let agent = TestAgent::creature();

        let mut generator = crate::PathGenerator::new(&agent, &world, &mesh);
        generator.set_use_raycast(true);
        let dest = cell_center(3, 0.0);
        assert!(generator.calculate_path(dest, false));

        assert_eq!(generator.path_type(), PathType::NORMAL);
        let points = generator.path_points();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1], dest);
    }

    #[test]
    fn point_limit_degrades_to_short_shortcut() {
        let mesh = LaneMesh::flat(6);
        let world = LaneWorld::dry();
        let agent = TestAgent::creature();

        let mut generator = crate::PathGenerator::new(&agent, &world, &mesh);
        generator.set_path_length_limit(4);
        assert!(generator.calculate_path(cell_center(5, 0.0), false));

        assert!(generator.path_type().contains(PathType::SHORT));
        assert!(generator.path_type().contains(PathType::SHORTCUT));
        assert_eq!(generator.path_points().len(), 2);
    }

    #[test]
    fn forced_destination_snaps_the_final_point() {
        let mesh = LaneMesh::flat(3);
        let world = LaneWorld::dry();
        let agent = TestAgent::creature();

        let mut generator = crate::PathGenerator::new(&agent, &world, &mesh);
        let dest = Vec3::new(29.0, 12.0, 5.0);
        assert!(generator.calculate_path(dest, true));

        assert_eq!(
            generator.path_type(),
            PathType::NORMAL | PathType::NOT_USING_PATH
        );
        assert_eq!(*generator.path_points().last().unwrap(), dest);
        assert_eq!(generator.actual_end_position(), dest);
    }

    #[test]
    fn straight_path_mode_returns_corner_points() {
        let mesh = LaneMesh::flat(6);
        let world = LaneWorld::dry();
        let agent = TestAgent::creature();

        let mut generator = crate::PathGenerator::new(&agent, &world, &mesh);
        generator.set_use_straight_path(true);
        let dest = cell_center(5, 0.0);
        assert!(generator.calculate_path(dest, false));

        assert_eq!(generator.path_type(), PathType::NORMAL);
        // the lane has no corners: start and end only
        assert_eq!(generator.path_points().len(), 2);
        assert_eq!(generator.path_points()[1], dest);
    }

    #[test]
    fn water_cells_block_creatures_that_cannot_enter_water() {
        let mut mesh = LaneMesh::flat(3);
        mesh.set_terrain(1, NavTerrain::WATER);
        let world = LaneWorld::dry();
        let agent = TestAgent::creature();

        let mut generator = crate::PathGenerator::new(&agent, &world, &mesh);
        assert!(generator.calculate_path(cell_center(2, 0.0), false));

        // the corridor search cannot pass the water cell and the surface
        // walk can make no progress toward the far side
        assert!(generator.path_type().contains(PathType::NO_PATH));
    }

    #[test]
    fn water_cells_pass_creatures_that_can_enter_water() {
        let mut mesh = LaneMesh::flat(3);
        mesh.set_terrain(1, NavTerrain::WATER);
        let world = LaneWorld::dry();
        let mut agent = TestAgent::creature();
        agent.can_enter_water = true;

        let mut generator = crate::PathGenerator::new(&agent, &world, &mesh);
        let dest = cell_center(2, 0.0);
        assert!(generator.calculate_path(dest, false));

        assert_eq!(generator.path_type(), PathType::NORMAL);
        assert_eq!(generator.actual_end_position(), dest);
    }

    #[test]
    fn walking_creature_filter_includes_ground_only() {
        let mesh = LaneMesh::flat(3);
        let world = LaneWorld::dry();
        let agent = TestAgent::creature();

        let generator = crate::PathGenerator::new(&agent, &world, &mesh);
        assert_eq!(generator.filter().include_flags(), NavTerrain::GROUND);
        assert!(generator.filter().exclude_flags().is_empty());
    }

    #[test]
    fn water_capable_creature_filter_includes_liquids() {
        let mesh = LaneMesh::flat(3);
        let world = LaneWorld::dry();
        let mut agent = TestAgent::creature();
        agent.can_enter_water = true;

        let generator = crate::PathGenerator::new(&agent, &world, &mesh);
        assert_eq!(
            generator.filter().include_flags(),
            NavTerrain::GROUND | NavTerrain::WATER | NavTerrain::MAGMA
        );
    }

    #[test]
    fn generic_agent_filter_is_permissive() {
        let mesh = LaneMesh::flat(3);
        let world = LaneWorld::dry();
        let agent = TestAgent::generic();

        let generator = crate::PathGenerator::new(&agent, &world, &mesh);
        assert_eq!(
            generator.filter().include_flags(),
            NavTerrain::GROUND | NavTerrain::WATER | NavTerrain::MAGMA
        );
    }

    #[test]
    fn submerged_agent_gains_its_current_terrain() {
        let mesh = LaneMesh::flat(3);
        let world = LaneWorld::flooded(WaterVolume {
            x_min: 0.0,
            x_max: 30.0,
            surface: 10.0,
            kind: LiquidKind::Water,
        });
        // a walker shoved into deep water still gets water polygons so it
        // can path out
        let mut agent = TestAgent::creature();
        agent.in_liquid = true;

        let generator = crate::PathGenerator::new(&agent, &world, &mesh);
        assert!(generator.filter().include_flags().contains(NavTerrain::WATER));
        assert!(generator.filter().include_flags().contains(NavTerrain::GROUND));
    }
}

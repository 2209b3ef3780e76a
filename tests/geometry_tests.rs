//! Geometry kernel tests

#[cfg(test)]
mod tests {
    use intphys_world::geometry::{
        are_adjacent, footprint, obstructs, overlap, partly_obstructs, point_in_room,
        polygon_distance, rect_in_room, rotate_point, rotated_rectangle_corners,
        visibility_segment, MIN_FORWARD_VISIBILITY_DISTANCE,
    };
    use intphys_world::types::{PerformerPose, Point, Room};

    fn p(x: f64, z: f64) -> Point {
        Point::new(x, z)
    }

    fn make_fixture() -> [Vec<Point>; 4] {
        let a = vec![p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0), p(0.0, 1.0)];
        let b = vec![p(0.25, 0.25), p(0.75, 0.25), p(0.75, 0.75), p(0.25, 0.75)];
        let c = vec![p(0.8, 1.2), p(1.1, 1.8), p(2.0, 1.5), p(1.1, 0.3)];
        let d = vec![p(0.8, 0.2), p(2.0, 1.6), p(3.0, 0.0), p(2.0, -1.5)];
        [a, b, c, d]
    }

    fn close(a: Point, b: Point, tolerance: f64) -> bool {
        (a.x - b.x).abs() <= tolerance && (a.z - b.z).abs() <= tolerance
    }

    // -----------------------------------------------------------------------
    // Rotation
    // -----------------------------------------------------------------------

    #[test]
    fn rotation_is_periodic() {
        for angle in [0.0, 17.0, 45.0, 90.0, 133.5, 270.0, 359.0] {
            let a = rotated_rectangle_corners(1.0, -2.0, 0.6, 1.4, 0.1, -0.2, angle);
            let b = rotated_rectangle_corners(1.0, -2.0, 0.6, 1.4, 0.1, -0.2, angle + 360.0);
            for (x, y) in a.iter().zip(b.iter()) {
                assert!(close(*x, *y, 1e-3), "angle {}: {} vs {}", angle, x, y);
            }
        }
    }

    #[test]
    fn quarter_turns_are_exact() {
        let r = rotate_point(p(1.0, 0.0), 90.0);
        assert_eq!(r, p(0.0, -1.0));
        let r = rotate_point(p(0.0, 1.0), 90.0);
        assert_eq!(r, p(1.0, 0.0));
        let r = rotate_point(p(2.0, 3.0), 180.0);
        assert_eq!(r, p(-2.0, -3.0));
    }

    #[test]
    fn corner_order_before_rotation() {
        let corners = rotated_rectangle_corners(0.0, 0.0, 2.0, 4.0, 0.0, 0.0, 0.0);
        assert_eq!(corners, [p(1.0, 2.0), p(1.0, -2.0), p(-1.0, -2.0), p(-1.0, 2.0)]);
    }

    #[test]
    fn offset_moves_the_center() {
        let corners = rotated_rectangle_corners(1.0, 1.0, 2.0, 2.0, 0.5, -0.5, 0.0);
        let cx = corners.iter().map(|c| c.x).sum::<f64>() / 4.0;
        let cz = corners.iter().map(|c| c.z).sum::<f64>() / 4.0;
        assert!((cx - 1.5).abs() < 1e-9 && (cz - 0.5).abs() < 1e-9);
    }

    // -----------------------------------------------------------------------
    // Overlap
    // -----------------------------------------------------------------------

    #[test]
    fn fixture_overlaps() {
        let [a, b, c, d] = make_fixture();
        assert!(overlap(&a, &b), "A intersects B");
        assert!(overlap(&a, &c), "A intersects C");
        assert!(overlap(&a, &d), "A intersects D");
        assert!(overlap(&c, &d), "C intersects D");
        assert!(!overlap(&b, &c), "B misses C");
        assert!(!overlap(&b, &d), "B misses D");
    }

    #[test]
    fn overlap_is_symmetric() {
        let fixture = make_fixture();
        for x in &fixture {
            for y in &fixture {
                assert_eq!(overlap(x, y), overlap(y, x));
            }
        }
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let a = rotated_rectangle_corners(0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0);
        let b = rotated_rectangle_corners(1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0);
        assert!(!overlap(&a, &b));
        let c = rotated_rectangle_corners(0.99, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0);
        assert!(overlap(&a, &c));
    }

    #[test]
    fn rotated_boxes_overlap() {
        let a = rotated_rectangle_corners(0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 45.0);
        // Axis-aligned box that reaches the diamond's right tip.
        let b = rotated_rectangle_corners(1.1, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0);
        assert!(overlap(&a, &b));
        let far = rotated_rectangle_corners(1.3, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0);
        assert!(!overlap(&a, &far));
    }

    // -----------------------------------------------------------------------
    // Room
    // -----------------------------------------------------------------------

    #[test]
    fn point_in_room_bounds() {
        let room = Room::default();
        assert!(point_in_room(&room, room.centroid()));
        assert!(point_in_room(&room, p(4.95, -4.95)), "bounds are inclusive");
        assert!(!point_in_room(&room, p(5.95, 0.0)));
        assert!(!point_in_room(&room, p(0.0, -5.95)));
    }

    #[test]
    fn straddling_rect_is_outside() {
        let room = Room::default();
        let corners = [p(4.5, 4.5), p(5.5, 4.5), p(5.5, 5.5), p(4.5, 5.5)];
        assert!(!rect_in_room(&room, &corners));
        let inside = [p(4.0, 4.0), p(4.5, 4.0), p(4.5, 4.5), p(4.0, 4.5)];
        assert!(rect_in_room(&room, &inside));
    }

    #[test]
    fn footprint_is_centered_square() {
        let f = footprint(p(1.0, 2.0), 0.05);
        assert!(f.iter().all(|c| (c.x - 1.0).abs() <= 0.05 + 1e-9 && (c.z - 2.0).abs() <= 0.05 + 1e-9));
    }

    // -----------------------------------------------------------------------
    // Visibility
    // -----------------------------------------------------------------------

    #[test]
    fn visibility_segment_starts_past_blind_spot() {
        let room = Room::default();
        let pose = PerformerPose::default();
        let segment = visibility_segment(&room, &pose).expect("default pose sees the room");
        assert!(close(segment.start, p(0.0, -4.5 + MIN_FORWARD_VISIBILITY_DISTANCE), 1e-9));
        assert!(close(segment.end, p(0.0, 4.95), 1e-9));
    }

    #[test]
    fn facing_a_close_wall_has_no_segment() {
        let room = Room::default();
        let pose = PerformerPose::new(0.0, 4.5, 0.0);
        assert!(visibility_segment(&room, &pose).is_none());
    }

    #[test]
    fn wide_wall_obstructs_small_target() {
        let viewer = p(0.0, 0.0);
        let target = rotated_rectangle_corners(0.0, 5.0, 0.2, 0.2, 0.0, 0.0, 0.0);
        let wall = rotated_rectangle_corners(0.0, 2.5, 3.0, 0.2, 0.0, 0.0, 0.0);
        assert!(obstructs(viewer, &target, &wall));

        let post = rotated_rectangle_corners(0.05, 2.5, 0.05, 0.05, 0.0, 0.0, 0.0);
        assert!(!obstructs(viewer, &target, &post));
        assert!(partly_obstructs(viewer, &target, &post));
    }

    #[test]
    fn nearby_boxes_are_adjacent() {
        let a = rotated_rectangle_corners(0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0);
        let b = rotated_rectangle_corners(1.3, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0);
        assert!((polygon_distance(&a, &b) - 0.3).abs() < 1e-9);
        assert!(are_adjacent(&a, &b));
        let c = rotated_rectangle_corners(3.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0);
        assert!(!are_adjacent(&a, &c));
    }
}

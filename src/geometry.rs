//! Floor-plane geometry.
//!
//! Everything here works in the XZ plane: Y only matters for heights, which
//! placement never needs to intersect. Angles are degrees, clockwise-positive
//! about +Y, so yaw 0 faces +Z and yaw 90 faces +X.
//!
//! All functions are pure. Callers own the bounds they test against.

use crate::types::{OrientedBox, PerformerPose, Point, Room, Segment};

/// Tolerance for the separating-axis test. Projections that meet within this
/// distance count as touching, not overlapping.
pub const OVERLAP_EPSILON: f64 = 1e-9;

/// Placements never start closer than this along the performer's sight line.
pub const MIN_FORWARD_VISIBILITY_DISTANCE: f64 = 1.25;

/// Two footprints this close or closer count as adjacent.
pub const MAX_ADJACENT_DISTANCE: f64 = 0.5;

// ---------------------------------------------------------------------------
// Rotation
// ---------------------------------------------------------------------------

/// `(sin, cos)` of a clockwise angle, exact at quarter turns.
fn sin_cos(rotation_deg: f64) -> (f64, f64) {
    let angle = rotation_deg.rem_euclid(360.0);
    if angle == 0.0 {
        (0.0, 1.0)
    } else if angle == 90.0 {
        (1.0, 0.0)
    } else if angle == 180.0 {
        (0.0, -1.0)
    } else if angle == 270.0 {
        (-1.0, 0.0)
    } else {
        angle.to_radians().sin_cos()
    }
}

/// Rotate `p` clockwise about the origin.
pub fn rotate_point(p: Point, rotation_deg: f64) -> Point {
    let (sin, cos) = sin_cos(rotation_deg);
    Point::new(p.x * cos + p.z * sin, -p.x * sin + p.z * cos)
}

/// Corners of a `size_x` by `size_z` box rotated about its own center, then
/// moved to `(cx + offset_x, cz + offset_z)`.
///
/// Corner order before rotation is `(+x,+z)`, `(+x,-z)`, `(-x,-z)`, `(-x,+z)`.
pub fn rotated_rectangle_corners(
    cx: f64,
    cz: f64,
    size_x: f64,
    size_z: f64,
    offset_x: f64,
    offset_z: f64,
    rotation_deg: f64,
) -> [Point; 4] {
    let hx = size_x / 2.0;
    let hz = size_z / 2.0;
    let local = [
        Point::new(hx, hz),
        Point::new(hx, -hz),
        Point::new(-hx, -hz),
        Point::new(-hx, hz),
    ];
    let ox = cx + offset_x;
    let oz = cz + offset_z;
    local.map(|p| {
        let r = rotate_point(p, rotation_deg);
        Point::new(ox + r.x, oz + r.z)
    })
}

// ---------------------------------------------------------------------------
// Room containment
// ---------------------------------------------------------------------------

pub fn point_in_room(room: &Room, p: Point) -> bool {
    p.x >= room.min_x && p.x <= room.max_x && p.z >= room.min_z && p.z <= room.max_z
}

pub fn rect_in_room(room: &Room, corners: &[Point]) -> bool {
    corners.iter().all(|p| point_in_room(room, *p))
}

// ---------------------------------------------------------------------------
// Overlap
// ---------------------------------------------------------------------------

fn project(polygon: &[Point], axis: Point) -> (f64, f64) {
    polygon.iter().fold((f64::MAX, f64::MIN), |(lo, hi), p| {
        let d = p.x * axis.x + p.z * axis.z;
        (lo.min(d), hi.max(d))
    })
}

fn separated_on_edges(edges_of: &[Point], a: &[Point], b: &[Point]) -> bool {
    let n = edges_of.len();
    (0..n).any(|i| {
        let p1 = edges_of[i];
        let p2 = edges_of[(i + 1) % n];
        let axis = Point::new(p1.z - p2.z, p2.x - p1.x);
        if axis.x == 0.0 && axis.z == 0.0 {
            return false;
        }
        let (min_a, max_a) = project(a, axis);
        let (min_b, max_b) = project(b, axis);
        max_a <= min_b + OVERLAP_EPSILON || max_b <= min_a + OVERLAP_EPSILON
    })
}

/// Separating-axis test for two convex polygons.
///
/// Edges that only touch do not overlap.
pub fn overlap(a: &[Point], b: &[Point]) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    !(separated_on_edges(a, a, b) || separated_on_edges(b, a, b))
}

/// Whether `bounds` collides with any entry of `others`.
pub fn overlaps_any(bounds: &OrientedBox, others: &[OrientedBox]) -> bool {
    others.iter().any(|o| overlap(&bounds.corners, &o.corners))
}

// ---------------------------------------------------------------------------
// Performer
// ---------------------------------------------------------------------------

/// Axis-aligned collision square centered on `position`.
pub fn footprint(position: Point, radius: f64) -> [Point; 4] {
    rotated_rectangle_corners(
        position.x,
        position.z,
        radius * 2.0,
        radius * 2.0,
        0.0,
        0.0,
        0.0,
    )
}

/// Clip `segment` to the room rectangle (Liang-Barsky).
pub fn clip_to_room(room: &Room, segment: Segment) -> Option<Segment> {
    let dx = segment.end.x - segment.start.x;
    let dz = segment.end.z - segment.start.z;
    let checks = [
        (-dx, segment.start.x - room.min_x),
        (dx, room.max_x - segment.start.x),
        (-dz, segment.start.z - room.min_z),
        (dz, room.max_z - segment.start.z),
    ];
    let mut t0: f64 = 0.0;
    let mut t1: f64 = 1.0;
    for (p, q) in checks {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }
    Some(Segment::new(segment.lerp(t0), segment.lerp(t1)))
}

/// The part of the performer's line of sight that lies in the room, starting
/// [`MIN_FORWARD_VISIBILITY_DISTANCE`] ahead of it.
///
/// `None` when the performer faces a wall closer than that distance.
pub fn visibility_segment(room: &Room, pose: &PerformerPose) -> Option<Segment> {
    let forward = pose.forward();
    let origin = pose.position.xz();
    let reach = 2.0 * (room.max_x - room.min_x).max(room.max_z - room.min_z);
    let ray = Segment::new(
        Point::new(
            origin.x + forward.x * MIN_FORWARD_VISIBILITY_DISTANCE,
            origin.z + forward.z * MIN_FORWARD_VISIBILITY_DISTANCE,
        ),
        Point::new(origin.x + forward.x * reach, origin.z + forward.z * reach),
    );
    if !point_in_room(room, ray.start) {
        return None;
    }
    clip_to_room(room, ray).filter(|s| s.length() > 0.0)
}

// ---------------------------------------------------------------------------
// Lines and polygons
// ---------------------------------------------------------------------------

fn orientation(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x) * (c.z - a.z) - (b.z - a.z) * (c.x - a.x)
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    p.x >= a.x.min(b.x) - OVERLAP_EPSILON
        && p.x <= a.x.max(b.x) + OVERLAP_EPSILON
        && p.z >= a.z.min(b.z) - OVERLAP_EPSILON
        && p.z <= a.z.max(b.z) + OVERLAP_EPSILON
}

/// Whether segments `a` and `b` share any point.
pub fn segments_intersect(a: Segment, b: Segment) -> bool {
    let d1 = orientation(b.start, b.end, a.start);
    let d2 = orientation(b.start, b.end, a.end);
    let d3 = orientation(a.start, a.end, b.start);
    let d4 = orientation(a.start, a.end, b.end);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    (d1 == 0.0 && on_segment(b.start, b.end, a.start))
        || (d2 == 0.0 && on_segment(b.start, b.end, a.end))
        || (d3 == 0.0 && on_segment(a.start, a.end, b.start))
        || (d4 == 0.0 && on_segment(a.start, a.end, b.end))
}

/// Even-odd point-in-polygon test.
pub fn point_in_polygon(p: Point, polygon: &[Point]) -> bool {
    let n = polygon.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let pi = polygon[i];
        let pj = polygon[j];
        if (pi.z > p.z) != (pj.z > p.z) && p.x < (pj.x - pi.x) * (p.z - pi.z) / (pj.z - pi.z) + pi.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn edges(polygon: &[Point]) -> impl Iterator<Item = Segment> + '_ {
    let n = polygon.len();
    (0..n).map(move |i| Segment::new(polygon[i], polygon[(i + 1) % n]))
}

pub fn segment_intersects_polygon(segment: Segment, polygon: &[Point]) -> bool {
    point_in_polygon(segment.start, polygon)
        || point_in_polygon(segment.end, polygon)
        || edges(polygon).any(|e| segments_intersect(segment, e))
}

/// True if `candidate` blocks every sight line from `viewer` to the corners of
/// `target`.
pub fn obstructs(viewer: Point, target: &[Point], candidate: &[Point]) -> bool {
    !target.is_empty()
        && target
            .iter()
            .all(|corner| segment_intersects_polygon(Segment::new(viewer, *corner), candidate))
}

/// True if `candidate` blocks at least one sight line to `target`.
pub fn partly_obstructs(viewer: Point, target: &[Point], candidate: &[Point]) -> bool {
    target
        .iter()
        .any(|corner| segment_intersects_polygon(Segment::new(viewer, *corner), candidate))
}

fn point_segment_distance(p: Point, s: Segment) -> f64 {
    let dx = s.end.x - s.start.x;
    let dz = s.end.z - s.start.z;
    let len2 = dx * dx + dz * dz;
    if len2 == 0.0 {
        return p.distance(&s.start);
    }
    let t = (((p.x - s.start.x) * dx + (p.z - s.start.z) * dz) / len2).clamp(0.0, 1.0);
    p.distance(&s.lerp(t))
}

/// Shortest distance between two polygons; zero when they overlap.
pub fn polygon_distance(a: &[Point], b: &[Point]) -> f64 {
    if overlap(a, b) {
        return 0.0;
    }
    let a_to_b = a
        .iter()
        .flat_map(|p| edges(b).map(move |e| point_segment_distance(*p, e)));
    let b_to_a = b
        .iter()
        .flat_map(|p| edges(a).map(move |e| point_segment_distance(*p, e)));
    a_to_b.chain(b_to_a).fold(f64::MAX, f64::min)
}

pub fn are_adjacent(a: &[Point], b: &[Point]) -> bool {
    polygon_distance(a, b) <= MAX_ADJACENT_DISTANCE
}

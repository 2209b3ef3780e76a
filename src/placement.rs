//! Spatial placement solver.
//!
//! A placement is a bounded retry loop: sample a candidate location, build its
//! footprint, and accept it only if it is in the room, clear of the performer
//! and every already-placed footprint, and satisfies the caller's
//! [`Predicate`]s.
//!
//! ```text
//! SceneAttempt           ← owns pose + BoundsList for one build attempt
//!   └── PlacementSolver  ← borrows them read-only, never commits
//! ```
//!
//! The solver itself never mutates the bounds. [`SceneAttempt`] commits
//! results, and [`SceneAttempt::place_group`] commits a whole group or
//! nothing.

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SceneError};
use crate::geometry::{
    clip_to_room, footprint, obstructs, overlap, overlaps_any, point_in_room, rect_in_room, rotate_point,
    rotated_rectangle_corners, visibility_segment, MIN_FORWARD_VISIBILITY_DISTANCE,
};
use crate::types::{
    GeneratorConfig, ObjectDefinition, ObjectInstance, OrientedBox, PerformerPose, Point, Room,
    Segment, Vec3,
};

pub const MAX_TRIES: u32 = 100;
pub const POSITION_STEP: f64 = 0.05;
pub const POSITION_DIGITS: i32 = 2;
pub const VALID_ROTATIONS: [f64; 8] = [0.0, 45.0, 90.0, 135.0, 180.0, 225.0, 270.0, 315.0];
/// Clearance between adjacent objects.
pub const MIN_GAP: f64 = 0.05;
/// Keep a regenerated performer this far from the walls.
pub const PERFORMER_WALL_MARGIN: f64 = 0.5;
pub const MAX_POSE_REGENERATIONS: u32 = 10;

// ---------------------------------------------------------------------------
// Sampling helpers
// ---------------------------------------------------------------------------

pub fn round_position(value: f64) -> f64 {
    let factor = 10f64.powi(POSITION_DIGITS);
    (value * factor).round() / factor
}

/// Uniform value on the `step` grid between `min` and `max`, inclusive.
pub fn random_real<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64, step: f64) -> f64 {
    if max <= min {
        return round_position(min);
    }
    let slots = ((max - min) / step + 1e-9).floor() as u32;
    round_position(min + f64::from(rng.gen_range(0..=slots)) * step)
}

/// Redraws allowed when a sampled cell lands on the `avoid` footprint.
const SAMPLE_REDRAWS: u32 = 32;

/// A grid position whose footprint at `rotation` fits inside `area` and
/// stays clear of `avoid` (the performer's square).
fn sample_within<R: Rng + ?Sized>(
    rng: &mut R,
    definition: &ObjectDefinition,
    rotation: f64,
    area: &Room,
    avoid: &[Point],
) -> Option<(f64, f64)> {
    let local = Location::for_definition(definition, 0.0, 0.0, rotation).bounds;
    let (min_x, max_x, min_z, max_z) = local.corners.iter().fold(
        (f64::MAX, f64::MIN, f64::MAX, f64::MIN),
        |(a, b, c, d), p| (a.min(p.x), b.max(p.x), c.min(p.z), d.max(p.z)),
    );
    let lo_x = snap_up(area.min_x - min_x);
    let hi_x = snap_down(area.max_x - max_x);
    let lo_z = snap_up(area.min_z - min_z);
    let hi_z = snap_down(area.max_z - max_z);
    if lo_x > hi_x || lo_z > hi_z {
        return None;
    }
    let mut cell = (lo_x, lo_z);
    for _ in 0..SAMPLE_REDRAWS {
        cell = (
            random_real(rng, lo_x, hi_x, POSITION_STEP),
            random_real(rng, lo_z, hi_z, POSITION_STEP),
        );
        let corners = local.corners.map(|p| Point::new(p.x + cell.0, p.z + cell.1));
        if !overlap(avoid, &corners) {
            return Some(cell);
        }
    }
    // Every redraw hit the footprint; let the caller's check report it.
    Some(cell)
}

fn snap_up(value: f64) -> f64 {
    round_position((value / POSITION_STEP - 1e-9).ceil() * POSITION_STEP)
}

fn snap_down(value: f64) -> f64 {
    round_position((value / POSITION_STEP + 1e-9).floor() * POSITION_STEP)
}

pub fn random_rotation<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    VALID_ROTATIONS[rng.gen_range(0..VALID_ROTATIONS.len())]
}

/// A fresh performer pose away from the walls.
pub fn random_pose<R: Rng + ?Sized>(rng: &mut R, room: &Room) -> PerformerPose {
    let area = room.inset(PERFORMER_WALL_MARGIN);
    PerformerPose::new(
        random_real(rng, area.min_x, area.max_x, POSITION_STEP),
        random_real(rng, area.min_z, area.max_z, POSITION_STEP),
        random_rotation(rng),
    )
}

// ---------------------------------------------------------------------------
// Locations and bounds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub position: Vec3,
    pub rotation_y: f64,
    pub bounds: OrientedBox,
}

impl Location {
    /// Footprint of `definition` placed at `(x, z)` with yaw `rotation_y`.
    pub fn for_definition(definition: &ObjectDefinition, x: f64, z: f64, rotation_y: f64) -> Self {
        let corners = rotated_rectangle_corners(
            x,
            z,
            definition.dimensions.x,
            definition.dimensions.z,
            definition.offset.x,
            definition.offset.z,
            rotation_y,
        );
        Self {
            position: Vec3::new(x, definition.position_y, z),
            rotation_y,
            bounds: OrientedBox::new(corners, definition.dimensions.y),
        }
    }
}

/// Footprints of everything already placed in one attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundsList {
    boxes: Vec<OrientedBox>,
}

impl BoundsList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bounds: OrientedBox) {
        self.boxes.push(bounds);
    }

    pub fn as_slice(&self) -> &[OrientedBox] {
        &self.boxes
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

impl Extend<OrientedBox> for BoundsList {
    fn extend<T: IntoIterator<Item = OrientedBox>>(&mut self, iter: T) {
        self.boxes.extend(iter);
    }
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// Relational constraint a placement must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Somewhere along the performer's line of sight.
    InFrontOfPerformer,
    /// Entirely behind the performer's facing plane.
    BehindPerformer,
    WithinDistance { of: Point, distance: f64 },
    BeyondDistance { of: Point, distance: f64 },
    /// Never hides any of these footprints from the performer.
    NeverObstructs(Vec<OrientedBox>),
    /// Footprint stays inside this rectangle.
    InsideArea(Room),
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Predicate::InFrontOfPerformer => write!(f, "in front of performer"),
            Predicate::BehindPerformer => write!(f, "behind performer"),
            Predicate::WithinDistance { of, distance } => {
                write!(f, "within {:.2} of {}", distance, of)
            }
            Predicate::BeyondDistance { of, distance } => {
                write!(f, "beyond {:.2} of {}", distance, of)
            }
            Predicate::NeverObstructs(targets) => {
                write!(f, "never obstructs {} target(s)", targets.len())
            }
            Predicate::InsideArea(area) => write!(
                f,
                "inside x[{:.2}, {:.2}] z[{:.2}, {:.2}]",
                area.min_x, area.max_x, area.min_z, area.max_z
            ),
        }
    }
}

impl Predicate {
    fn holds(&self, pose: &PerformerPose, location: &Location) -> bool {
        let origin = pose.position.xz();
        let forward = pose.forward();
        let ahead = |p: Point| (p.x - origin.x) * forward.x + (p.z - origin.z) * forward.z;
        let center = location.position.xz();
        match self {
            Predicate::InFrontOfPerformer => {
                ahead(center) >= MIN_FORWARD_VISIBILITY_DISTANCE - 0.01
            }
            Predicate::BehindPerformer => location.bounds.corners.iter().all(|c| ahead(*c) < 0.0),
            Predicate::WithinDistance { of, distance } => center.distance(of) <= *distance,
            Predicate::BeyondDistance { of, distance } => center.distance(of) >= *distance,
            Predicate::NeverObstructs(targets) => targets
                .iter()
                .all(|t| !obstructs(origin, &t.corners, &location.bounds.corners)),
            Predicate::InsideArea(area) => rect_in_room(area, &location.bounds.corners),
        }
    }
}

// ---------------------------------------------------------------------------
// Solver
// ---------------------------------------------------------------------------

/// Read-only view of one attempt's room, pose and bounds.
pub struct PlacementSolver<'a> {
    room: &'a Room,
    pose: &'a PerformerPose,
    performer_radius: f64,
    tries: u32,
}

impl<'a> PlacementSolver<'a> {
    pub fn new(room: &'a Room, pose: &'a PerformerPose) -> Self {
        Self {
            room,
            pose,
            performer_radius: 0.05,
            tries: MAX_TRIES,
        }
    }

    pub fn with_tries(mut self, tries: u32) -> Self {
        self.tries = tries.max(1);
        self
    }

    pub fn with_performer_radius(mut self, radius: f64) -> Self {
        self.performer_radius = radius;
        self
    }

    /// Sample until a valid location for `definition` is found.
    ///
    /// Returns [`SceneError::PlacementExhausted`] naming the last unmet
    /// constraint once the retry bound is spent.
    pub fn place<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        definition: &ObjectDefinition,
        bounds: &BoundsList,
        predicates: &[Predicate],
    ) -> Result<Location> {
        let mut unmet = String::from("no candidate");
        for _ in 0..self.tries {
            let Some(candidate) = self.sample(rng, definition, predicates) else {
                unmet = predicates
                    .first()
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "room bounds".to_string());
                continue;
            };
            match self.check(&candidate, bounds, predicates) {
                Ok(()) => return Ok(candidate),
                Err(reason) => unmet = reason,
            }
        }
        debug!(
            "placement exhausted for {} after {} tries ({})",
            definition.label(),
            self.tries,
            unmet
        );
        Err(SceneError::placement(definition.label(), unmet, self.tries))
    }

    /// Validate a candidate; the error names the first failed constraint.
    pub fn check(
        &self,
        candidate: &Location,
        bounds: &BoundsList,
        predicates: &[Predicate],
    ) -> std::result::Result<(), String> {
        if !rect_in_room(self.room, &candidate.bounds.corners) {
            return Err("room bounds".to_string());
        }
        let performer = footprint(self.pose.position.xz(), self.performer_radius);
        if overlap(&performer, &candidate.bounds.corners) {
            return Err("performer footprint".to_string());
        }
        if overlaps_any(&candidate.bounds, bounds.as_slice()) {
            return Err("existing bounds".to_string());
        }
        match predicates.iter().find(|p| !p.holds(self.pose, candidate)) {
            Some(p) => Err(p.to_string()),
            None => Ok(()),
        }
    }

    fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        definition: &ObjectDefinition,
        predicates: &[Predicate],
    ) -> Option<Location> {
        let rotation = random_rotation(rng);
        let performer = footprint(self.pose.position.xz(), self.performer_radius);
        let directed = predicates.iter().find(|p| {
            matches!(
                p,
                Predicate::InFrontOfPerformer
                    | Predicate::BehindPerformer
                    | Predicate::InsideArea(_)
            )
        });
        let (x, z) = match directed {
            Some(Predicate::InFrontOfPerformer) => {
                let sight = visibility_segment(self.room, self.pose)?;
                let p = sight.lerp(rng.gen_range(0.0..=1.0));
                (round_position(p.x), round_position(p.z))
            }
            Some(Predicate::BehindPerformer) => self.sample_behind(rng, definition)?,
            Some(Predicate::InsideArea(area)) => {
                sample_within(rng, definition, rotation, area, &performer)?
            }
            _ => sample_within(rng, definition, rotation, self.room, &performer)?,
        };
        Some(Location::for_definition(definition, x, z, rotation))
    }

    fn sample_behind<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        definition: &ObjectDefinition,
    ) -> Option<(f64, f64)> {
        let forward = self.pose.forward();
        let origin = self.pose.position.xz();
        let reach = 2.0 * (self.room.max_x - self.room.min_x).max(self.room.max_z - self.room.min_z);
        let back = Segment::new(
            origin,
            Point::new(origin.x - forward.x * reach, origin.z - forward.z * reach),
        );
        let back = clip_to_room(self.room, back)?;
        let half_diagonal = (definition.dimensions.x.powi(2) + definition.dimensions.z.powi(2))
            .sqrt()
            / 2.0;
        let min_distance = half_diagonal + self.performer_radius + MIN_GAP;
        let length = back.length();
        if length < min_distance {
            return None;
        }
        let distance = rng.gen_range(min_distance..=length);
        let lateral = rng.gen_range(-1.0..=1.0);
        let x = origin.x - forward.x * distance + forward.z * lateral;
        let z = origin.z - forward.z * distance - forward.x * lateral;
        let p = Point::new(round_position(x), round_position(z));
        point_in_room(self.room, p).then_some((p.x, p.z))
    }

    /// Place `definition` against one side of `target`, trying the sides in
    /// random order.
    pub fn adjacent_location<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        definition: &ObjectDefinition,
        target: &ObjectInstance,
        bounds: &BoundsList,
        keep_target_visible: bool,
    ) -> Result<Location> {
        let show = target.first_show();
        let anchor = Anchor {
            label: &target.id,
            center: show.position.xz(),
            rotation_y: show.rotation.y,
            width: target.dimensions.x,
            depth: target.dimensions.z,
            bounds: target.bounds().copied(),
        };
        self.beside(rng, definition, &anchor, bounds, keep_target_visible)
    }

    fn beside<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        definition: &ObjectDefinition,
        anchor: &Anchor<'_>,
        bounds: &BoundsList,
        keep_anchor_visible: bool,
    ) -> Result<Location> {
        let mut sides = [
            (Point::new(0.0, 1.0), anchor.depth, definition.dimensions.z),
            (Point::new(0.0, -1.0), anchor.depth, definition.dimensions.z),
            (Point::new(1.0, 0.0), anchor.width, definition.dimensions.x),
            (Point::new(-1.0, 0.0), anchor.width, definition.dimensions.x),
        ];
        sides.shuffle(rng);

        let mut predicates = Vec::new();
        if keep_anchor_visible {
            if let Some(b) = anchor.bounds {
                predicates.push(Predicate::NeverObstructs(vec![b]));
            }
        }

        let mut unmet = format!("adjacent to {}", anchor.label);
        for (direction, anchor_extent, extent) in sides {
            let distance = anchor_extent / 2.0 + extent / 2.0 + MIN_GAP;
            let d = rotate_point(direction, anchor.rotation_y);
            let x = round_position(anchor.center.x + d.x * distance);
            let z = round_position(anchor.center.z + d.z * distance);
            let candidate = Location::for_definition(definition, x, z, anchor.rotation_y);
            match self.check(&candidate, bounds, &predicates) {
                Ok(()) => return Ok(candidate),
                Err(reason) => unmet = format!("adjacent to {} ({})", anchor.label, reason),
            }
        }
        Err(SceneError::placement(definition.label(), unmet, 4))
    }
}

/// Footprint an adjacent placement is measured from.
struct Anchor<'a> {
    label: &'a str,
    center: Point,
    rotation_y: f64,
    width: f64,
    depth: f64,
    bounds: Option<OrientedBox>,
}

/// One entry of a [`SceneAttempt::place_group`] call.
#[derive(Debug, Clone)]
pub enum GroupMember<'a> {
    /// Sampled anywhere the predicates allow.
    Free(&'a ObjectDefinition, Vec<Predicate>),
    /// Against one side of the earlier member at index `of`.
    Beside {
        definition: &'a ObjectDefinition,
        of: usize,
        keep_visible: bool,
    },
}

impl GroupMember<'_> {
    pub fn definition(&self) -> &ObjectDefinition {
        match self {
            GroupMember::Free(definition, _) => definition,
            GroupMember::Beside { definition, .. } => definition,
        }
    }
}

// ---------------------------------------------------------------------------
// Attempt state
// ---------------------------------------------------------------------------

/// Mutable state of one build attempt. Dropped wholesale on retry.
#[derive(Debug, Clone)]
pub struct SceneAttempt {
    room: Room,
    pose: PerformerPose,
    bounds: BoundsList,
    pose_generation: u32,
    performer_radius: f64,
    tries: u32,
}

impl SceneAttempt {
    pub fn new(config: &GeneratorConfig, pose: PerformerPose) -> Self {
        Self {
            room: config.room,
            pose,
            bounds: BoundsList::new(),
            pose_generation: 0,
            performer_radius: config.performer_radius,
            tries: config.placement_tries,
        }
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    pub fn pose(&self) -> &PerformerPose {
        &self.pose
    }

    pub fn bounds(&self) -> &BoundsList {
        &self.bounds
    }

    /// Bumped every time the pose is regenerated.
    pub fn pose_generation(&self) -> u32 {
        self.pose_generation
    }

    pub fn solver(&self) -> PlacementSolver<'_> {
        PlacementSolver::new(&self.room, &self.pose)
            .with_tries(self.tries)
            .with_performer_radius(self.performer_radius)
    }

    pub fn place<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        definition: &ObjectDefinition,
        predicates: &[Predicate],
    ) -> Result<Location> {
        self.solver().place(rng, definition, &self.bounds, predicates)
    }

    pub fn commit(&mut self, bounds: OrientedBox) {
        self.bounds.push(bounds);
    }

    pub fn place_and_commit<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        definition: &ObjectDefinition,
        predicates: &[Predicate],
    ) -> Result<Location> {
        let location = self.place(rng, definition, predicates)?;
        self.commit(location.bounds);
        Ok(location)
    }

    /// Place several objects against a scratch copy of the bounds; commit
    /// only if every one succeeds. A [`GroupMember::Beside`] may only refer
    /// to a member listed before it.
    pub fn place_group<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        group: &[GroupMember<'_>],
    ) -> Result<Vec<Location>> {
        let solver = self.solver();
        let mut working = self.bounds.clone();
        let mut locations: Vec<Location> = Vec::with_capacity(group.len());
        for member in group {
            let location = match member {
                GroupMember::Free(definition, predicates) => {
                    solver.place(rng, definition, &working, predicates)?
                }
                GroupMember::Beside { definition, of, keep_visible } => {
                    let (anchor_definition, anchor_location) = group
                        .get(*of)
                        .map(GroupMember::definition)
                        .zip(locations.get(*of))
                        .ok_or_else(|| {
                            SceneError::placement(definition.label(), format!("beside unplaced member {}", of), 0)
                        })?;
                    let label = anchor_definition.label();
                    let anchor = Anchor {
                        label: &label,
                        center: anchor_location.position.xz(),
                        rotation_y: anchor_definition.rotation.y + anchor_location.rotation_y,
                        width: anchor_definition.dimensions.x,
                        depth: anchor_definition.dimensions.z,
                        bounds: Some(anchor_location.bounds),
                    };
                    solver.beside(rng, definition, &anchor, &working, *keep_visible)?
                }
            };
            working.push(location.bounds);
            locations.push(location);
        }
        debug!("committed a group of {}", locations.len());
        self.bounds = working;
        Ok(locations)
    }

    pub fn adjacent_location<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        definition: &ObjectDefinition,
        target: &ObjectInstance,
        keep_target_visible: bool,
    ) -> Result<Location> {
        self.solver()
            .adjacent_location(rng, definition, target, &self.bounds, keep_target_visible)
    }

    /// Front/back placement. When the current pose leaves no room, a new
    /// pose is drawn and every committed footprint is dropped; callers
    /// compare [`Self::pose_generation`] to detect that.
    pub fn place_around_performer<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        definition: &ObjectDefinition,
        side: Predicate,
    ) -> Result<Location> {
        let mut regenerations = 0;
        loop {
            match self.place(rng, definition, std::slice::from_ref(&side)) {
                Ok(location) => return Ok(location),
                Err(e) if e.is_recoverable() && regenerations < MAX_POSE_REGENERATIONS => {
                    regenerations += 1;
                    self.regenerate_pose(rng);
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub fn regenerate_pose<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.pose = random_pose(rng, &self.room);
        self.bounds = BoundsList::new();
        self.pose_generation += 1;
        debug!(
            "regenerated performer pose at {} yaw {} (generation {})",
            self.pose.position, self.pose.rotation_y, self.pose_generation
        );
    }
}

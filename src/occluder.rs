//! Occluder composition.
//!
//! An occluder is a wall plus the pole that lifts it, created and dropped
//! together. Two templates exist: the normal one raises and turns the wall
//! about Y, the sideways one tilts it about X and pushes the pole in from the
//! side. Both use the same sizing and positioning rules:
//!
//! - scale-X lies in `[MIN_SCALE_X, MAX_SCALE_X]`,
//! - a paired occluder is at least as wide as its target,
//! - `|x| + scale/2 <= MAX_X` so the whole wall is on screen,
//! - no two occluders come closer than `SEPARATION_X`.

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SceneError};
use crate::geometry::OVERLAP_EPSILON;
use crate::ids::IdSource;
use crate::placement::{random_real, round_position, MAX_TRIES, POSITION_STEP};
use crate::trajectory::DepthBand;
use crate::types::{ObjectInstance, Role, ShowEvent, StepVector, Vec3};

pub const MIN_SCALE_X: f64 = 0.25;
pub const MAX_SCALE_X: f64 = 1.0;
pub const SEPARATION_X: f64 = 0.5;
/// Furthest an occluder edge may sit from the screen center.
pub const MAX_X: f64 = 3.0;
pub const MOVEMENT_TIME: u32 = 6;
pub const WALL_Z: f64 = 1.0;
pub const WALL_HEIGHT: f64 = 1.5;
pub const WALL_THICKNESS: f64 = 0.1;
pub const POLE_THICKNESS: f64 = 0.1;

const WALL_MASS: f64 = 100.0;

pub const WALL_MATERIALS: [&str; 4] = [
    "AI2-THOR/Materials/Walls/DrywallBeige",
    "AI2-THOR/Materials/Walls/DrywallGreen",
    "AI2-THOR/Materials/Walls/EggshellDrywall",
    "AI2-THOR/Materials/Walls/RedDrywall",
];

pub const POLE_MATERIALS: [&str; 3] = [
    "AI2-THOR/Materials/Metals/BrushedAluminum_Blue",
    "AI2-THOR/Materials/Metals/GenericStainlessSteel",
    "AI2-THOR/Materials/Wood/DarkWood2",
];

// ---------------------------------------------------------------------------
// Pair type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccluderPair {
    /// Suffix shared by the wall and pole ids.
    pub id: String,
    pub wall: ObjectInstance,
    pub pole: ObjectInstance,
    pub sideways: bool,
}

impl OccluderPair {
    pub fn x(&self) -> f64 {
        self.wall.position().x
    }

    pub fn scale_x(&self) -> f64 {
        self.wall.first_show().scale.x
    }

    /// `[x - scale/2, x + scale/2]`
    pub fn interval(&self) -> (f64, f64) {
        let half = self.scale_x() / 2.0;
        (self.x() - half, self.x() + half)
    }

    pub fn covers(&self, x: f64) -> bool {
        let (lo, hi) = self.interval();
        x >= lo && x <= hi
    }

    pub fn into_instances(self) -> [ObjectInstance; 2] {
        [self.wall, self.pole]
    }
}

/// Gap left between two occluders once the required separation is taken
/// out. Negative means too close.
pub fn separation_distance(x_a: f64, scale_a: f64, x_b: f64, scale_b: f64) -> f64 {
    (x_a - x_b).abs() - ((scale_a + scale_b) / 2.0 + SEPARATION_X)
}

/// Fails with the first existing occluder the interval would crowd.
pub fn check_clear(x: f64, scale: f64, existing: &[OccluderPair]) -> Result<()> {
    match existing
        .iter()
        .find(|o| separation_distance(o.x(), o.scale_x(), x, scale) < -OVERLAP_EPSILON)
    {
        Some(o) => Err(SceneError::OccluderConflict {
            x,
            scale,
            conflicting: o.id.clone(),
        }),
        None => Ok(()),
    }
}

/// Widest occluder that fits at `x` next to `existing` and on screen. The
/// second value names the occluder that imposed the limit, if any.
fn max_scale_at(x: f64, existing: &[OccluderPair]) -> (f64, Option<String>) {
    let mut limit = MAX_SCALE_X.min(2.0 * (MAX_X - x.abs()));
    let mut limiter = None;
    for o in existing {
        let allowed = 2.0 * ((x - o.x()).abs() - SEPARATION_X) - o.scale_x();
        if allowed < limit {
            limit = allowed;
            limiter = Some(o.id.clone());
        }
    }
    // Keep the result on the 0.01 grid without exceeding the limit.
    ((limit * 100.0 + 1e-9).floor() / 100.0, limiter)
}

/// Smallest scale that hides an object `dimensions` wide.
pub fn min_paired_scale(dimensions: Vec3, may_rotate: bool) -> f64 {
    let extent = if may_rotate {
        (dimensions.x.powi(2) + dimensions.z.powi(2)).sqrt()
    } else {
        dimensions.x.max(dimensions.z)
    };
    ((extent * 100.0 - 1e-9).ceil() / 100.0).clamp(MIN_SCALE_X, MAX_SCALE_X)
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

fn steps(ranges: &[(u32, u32)], vector: Vec3) -> Vec<StepVector> {
    ranges
        .iter()
        .enumerate()
        .map(|(i, &(step_begin, step_end))| {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            StepVector {
                step_begin,
                step_end,
                vector: Vec3::new(vector.x * sign, vector.y * sign, vector.z * sign),
            }
        })
        .collect()
}

fn structure(id: String, shape: &str, material: &str, position: Vec3, scale: Vec3) -> ObjectInstance {
    ObjectInstance {
        id,
        shape: shape.to_string(),
        size: "huge".to_string(),
        role: Role::Occluder,
        mass: WALL_MASS,
        dimensions: scale,
        offset: Vec3::zero(),
        resting_y: position.y,
        materials: vec![material.to_string()],
        attributes: Vec::new(),
        kinematic: true,
        structure: true,
        shows: vec![ShowEvent {
            step_begin: 0,
            position,
            rotation: Vec3::zero(),
            scale,
            bounds: None,
        }],
        hides: Vec::new(),
        teleports: Vec::new(),
        moves: Vec::new(),
        rotates: Vec::new(),
        forces: Vec::new(),
        parent: None,
        children: Vec::new(),
        movement: None,
    }
}

/// Build a wall+pole pair from the normal or sideways template.
pub fn create_pair(
    suffix: &str,
    x: f64,
    scale_x: f64,
    sideways: bool,
    wall_material: &str,
    pole_material: &str,
) -> OccluderPair {
    let lift = Vec3::new(0.0, 0.25, 0.0);
    let mut wall = structure(
        format!("occluder_wall_{}", suffix),
        "cube",
        wall_material,
        Vec3::new(x, WALL_HEIGHT / 2.0, WALL_Z),
        Vec3::new(scale_x, WALL_HEIGHT, WALL_THICKNESS),
    );
    let pole = if sideways {
        let move_steps = [(1, 4), (9, 12), (35, 38)];
        wall.moves = steps(&move_steps, lift);
        wall.rotates = steps(&[(5, 6), (7, 8), (39, 40)], Vec3::new(45.0, 0.0, 0.0));

        let pole_x = if x > 0.0 {
            MAX_X + x + scale_x / 2.0
        } else {
            -MAX_X + x - scale_x / 2.0
        };
        let mut pole = structure(
            format!("occluder_pole_{}", suffix),
            "cylinder",
            pole_material,
            Vec3::new(round_position(pole_x), WALL_HEIGHT / 2.0, WALL_Z),
            Vec3::new(POLE_THICKNESS, MAX_X, POLE_THICKNESS),
        );
        pole.first_show_mut().rotation = Vec3::new(0.0, 0.0, 90.0);
        let outward = if x > 0.0 { 0.25 } else { -0.25 };
        pole.moves = steps(&move_steps, Vec3::new(outward, 0.0, 0.0));
        pole
    } else {
        let move_steps = [(1, MOVEMENT_TIME), (7, 12), (55, 60)];
        wall.moves = steps(&move_steps, lift);
        let turn = if x > 0.0 { -45.0 } else { 45.0 };
        wall.rotates = steps(&[(1, 2), (11, 12), (55, 56)], Vec3::new(0.0, turn, 0.0));

        let mut pole = structure(
            format!("occluder_pole_{}", suffix),
            "cylinder",
            pole_material,
            Vec3::new(x, WALL_HEIGHT + 0.75, WALL_Z),
            Vec3::new(POLE_THICKNESS, 1.0, POLE_THICKNESS),
        );
        pole.moves = steps(&move_steps, lift);
        pole
    };

    OccluderPair {
        id: suffix.to_string(),
        wall,
        pole,
        sideways,
    }
}

// ---------------------------------------------------------------------------
// Composer
// ---------------------------------------------------------------------------

/// Sizes and places occluders for one build attempt.
pub struct OccluderComposer<'a> {
    ids: &'a mut IdSource,
    tries: u32,
}

impl<'a> OccluderComposer<'a> {
    pub fn new(ids: &'a mut IdSource) -> Self {
        Self {
            ids,
            tries: MAX_TRIES,
        }
    }

    pub fn with_tries(mut self, tries: u32) -> Self {
        self.tries = tries.max(1);
        self
    }

    fn build<R: Rng + ?Sized>(&mut self, rng: &mut R, x: f64, scale: f64, sideways: bool) -> OccluderPair {
        let suffix = self.ids.next("occ");
        let wall = WALL_MATERIALS[rng.gen_range(0..WALL_MATERIALS.len())];
        let pole = POLE_MATERIALS[rng.gen_range(0..POLE_MATERIALS.len())];
        create_pair(&suffix, x, scale, sideways, wall, pole)
    }

    /// An occluder at exactly `x` and `scale` (clamped).
    pub fn compose_at<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        x: f64,
        scale: f64,
        sideways: bool,
        existing: &[OccluderPair],
    ) -> Result<OccluderPair> {
        let scale = scale.clamp(MIN_SCALE_X, MAX_SCALE_X);
        check_clear(x, scale, existing)?;
        Ok(self.build(rng, x, scale, sideways))
    }

    /// An unpaired occluder anywhere on screen.
    pub fn compose_random<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        sideways: bool,
        existing: &[OccluderPair],
    ) -> Result<OccluderPair> {
        let mut last = None;
        for _ in 0..self.tries {
            let scale = random_real(rng, MIN_SCALE_X, MAX_SCALE_X, POSITION_STEP);
            let max_x = random_limit(scale);
            let x = random_real(rng, -max_x, max_x, POSITION_STEP);
            match check_clear(x, scale, existing) {
                Ok(()) => return Ok(self.build(rng, x, scale, sideways)),
                Err(e) => last = Some(e),
            }
        }
        Err(last.unwrap_or(SceneError::OccluderConflict {
            x: 0.0,
            scale: MIN_SCALE_X,
            conflicting: "screen bounds".to_string(),
        }))
    }

    /// An occluder hiding a moving `target` at one of its trajectory
    /// indices. Returns the pair and the index it hides.
    pub fn compose_for_trajectory<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        target: &ObjectInstance,
        band: DepthBand,
        existing: &[OccluderPair],
    ) -> Result<(OccluderPair, usize)> {
        let Some(movement) = target.movement.as_ref() else {
            return Err(SceneError::OccluderConflict {
                x: target.position().x,
                scale: MIN_SCALE_X,
                conflicting: format!("{} has no trajectory", target.id),
            });
        };
        let min_scale = min_paired_scale(target.dimensions, true);
        let mut indices: Vec<usize> = movement
            .position_by_step
            .iter()
            .enumerate()
            .filter(|(i, p)| {
                !movement.occluder_indices.contains(i)
                    && (*p * band.sight_factor()).abs() <= MAX_X - min_scale / 2.0
            })
            .map(|(i, _)| i)
            .collect();
        indices.shuffle(rng);

        let mut conflict = None;
        for index in indices {
            let x = round_position(movement.position_by_step[index] * band.sight_factor());
            let (max_scale, limiter) = max_scale_at(x, existing);
            if max_scale < min_scale {
                conflict = limiter.or(conflict);
                continue;
            }
            let scale = random_real(rng, min_scale, max_scale, POSITION_STEP);
            debug!(
                "paired occluder for {} at index {} x={:.2} scale={:.2}",
                target.id, index, x, scale
            );
            return Ok((self.build(rng, x, scale, false), index));
        }
        Err(SceneError::OccluderConflict {
            x: target.position().x,
            scale: min_scale,
            conflicting: conflict.unwrap_or_else(|| "visible range".to_string()),
        })
    }

    /// A sideways occluder directly under the fall path of `target`.
    pub fn compose_for_fall<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        target: &ObjectInstance,
        band: DepthBand,
        existing: &[OccluderPair],
    ) -> Result<OccluderPair> {
        let x = round_position(target.position().x * band.sight_factor());
        let min_scale = min_paired_scale(target.dimensions, false);
        let (max_scale, limiter) = max_scale_at(x, existing);
        if max_scale < min_scale {
            return Err(SceneError::OccluderConflict {
                x,
                scale: min_scale,
                conflicting: limiter.unwrap_or_else(|| "visible range".to_string()),
            });
        }
        let scale = random_real(rng, min_scale, max_scale, POSITION_STEP);
        Ok(self.build(rng, x, scale, true))
    }
}

/// Largest `|x|` keeping an occluder of `scale` on screen, on the 0.05 grid.
pub fn random_limit(scale: f64) -> f64 {
    let max_x = MAX_X - scale / 2.0;
    round_position((max_x / POSITION_STEP + 1e-9).floor() * POSITION_STEP)
}

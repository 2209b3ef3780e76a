//! Trajectory selection for moving and falling objects.
//!
//! A move-across object enters from one side of the screen at one of eight
//! [`ScreenPosition`]s and is pushed by a constant force. Its path comes from
//! a precomputed [`MovementOption`] table; this module turns that table into
//! absolute X positions, cuts it where the object leaves the screen, and picks
//! the step at which the push begins.
//!
//! Two objects on the same side and in the same depth band form a
//! leader/trailer pair: the trailer starts further out and must not be faster
//! than the leader, or it would catch up on screen.

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SceneError};
use crate::occluder::MOVEMENT_TIME;
use crate::types::{MovementOption, ObjectDefinition, Vec3};

/// No object moves before the occluders finish rising.
pub const EARLIEST_ACTION_STEP: u32 = 13;
pub const MOVE_ACROSS_LAST_STEP: u32 = 60;
/// Occluders start lowering after this step.
pub const MOVE_ACROSS_LAST_ACTION_STEP: u32 = MOVE_ACROSS_LAST_STEP - MOVEMENT_TIME;
pub const FALL_DOWN_LAST_STEP: u32 = 40;
pub const FALL_DOWN_HEIGHT: f64 = 3.8;
/// Steps a dropped object takes to land.
pub const OBJECT_FALL_TIME: u32 = 7;
pub const LATEST_FALL_START_STEP: u32 = FALL_DOWN_LAST_STEP - MOVEMENT_TIME - 14;
/// Falling objects start between these X limits.
pub const FALL_DOWN_MAX_X: f64 = 2.875;

// ---------------------------------------------------------------------------
// Depth bands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthBand {
    Near,
    Far,
}

impl DepthBand {
    pub const ALL: [DepthBand; 2] = [DepthBand::Near, DepthBand::Far];

    pub fn z(self) -> f64 {
        match self {
            DepthBand::Near => 1.6,
            DepthBand::Far => 2.7,
        }
    }

    /// Camera perspective correction between this band and the occluder
    /// plane.
    pub fn sight_factor(self) -> f64 {
        match self {
            DepthBand::Near => 0.9,
            DepthBand::Far => 0.8,
        }
    }

    pub fn max_x(self) -> f64 {
        match self {
            DepthBand::Near => 3.55,
            DepthBand::Far => 4.2,
        }
    }

    /// Past this `|x|` an object `scale_x` wide is off screen.
    pub fn visible_cutoff(self, scale_x: f64) -> f64 {
        self.max_x() + (scale_x / 2.0) / self.sight_factor()
    }

    pub fn from_z(z: f64) -> DepthBand {
        if (z - DepthBand::Near.z()).abs() <= (z - DepthBand::Far.z()).abs() {
            DepthBand::Near
        } else {
            DepthBand::Far
        }
    }
}

// ---------------------------------------------------------------------------
// Screen positions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenPosition {
    RightFirstNear,
    RightLastNear,
    RightFirstFar,
    RightLastFar,
    LeftFirstNear,
    LeftLastNear,
    LeftFirstFar,
    LeftLastFar,
}

impl ScreenPosition {
    pub const ALL: [ScreenPosition; 8] = [
        ScreenPosition::RightFirstNear,
        ScreenPosition::RightLastNear,
        ScreenPosition::RightFirstFar,
        ScreenPosition::RightLastFar,
        ScreenPosition::LeftFirstNear,
        ScreenPosition::LeftLastNear,
        ScreenPosition::LeftFirstFar,
        ScreenPosition::LeftLastFar,
    ];

    pub fn side(self) -> Side {
        use ScreenPosition::*;
        match self {
            RightFirstNear | RightLastNear | RightFirstFar | RightLastFar => Side::Right,
            _ => Side::Left,
        }
    }

    pub fn band(self) -> DepthBand {
        use ScreenPosition::*;
        match self {
            RightFirstNear | RightLastNear | LeftFirstNear | LeftLastNear => DepthBand::Near,
            _ => DepthBand::Far,
        }
    }

    pub fn is_last(self) -> bool {
        use ScreenPosition::*;
        matches!(self, RightLastNear | RightLastFar | LeftLastNear | LeftLastFar)
    }

    pub fn start_x(self) -> f64 {
        let magnitude = match (self.band(), self.is_last()) {
            (DepthBand::Near, false) => 4.2,
            (DepthBand::Near, true) => 5.3,
            (DepthBand::Far, false) => 4.8,
            (DepthBand::Far, true) => 5.9,
        };
        match self.side() {
            Side::Right => magnitude,
            Side::Left => -magnitude,
        }
    }

    /// Objects in one band all travel the same way.
    pub fn conflicts_with(self, other: ScreenPosition) -> bool {
        self.band() == other.band() && self.side() != other.side()
    }

    /// The other member of this position's leader/trailer pair.
    pub fn partner(self) -> ScreenPosition {
        use ScreenPosition::*;
        match self {
            RightFirstNear => RightLastNear,
            RightLastNear => RightFirstNear,
            RightFirstFar => RightLastFar,
            RightLastFar => RightFirstFar,
            LeftFirstNear => LeftLastNear,
            LeftLastNear => LeftFirstNear,
            LeftFirstFar => LeftLastFar,
            LeftLastFar => LeftFirstFar,
        }
    }
}

/// Pick `count` mutually compatible screen positions.
pub fn choose_positions<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Result<Vec<ScreenPosition>> {
    let mut available: Vec<ScreenPosition> = ScreenPosition::ALL.to_vec();
    let mut chosen = Vec::with_capacity(count);
    for _ in 0..count {
        if available.is_empty() {
            return Err(SceneError::placement(
                "moving object",
                "free screen position",
                count as u32,
            ));
        }
        let position = available.remove(rng.gen_range(0..available.len()));
        available.retain(|p| !p.conflicts_with(position));
        chosen.push(position);
    }
    Ok(chosen)
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// Per-step offsets turned into X positions, travelling toward the center.
pub fn absolute_positions(start_x: f64, offsets: &[f64]) -> Vec<f64> {
    offsets
        .iter()
        .map(|offset| {
            if start_x > 0.0 {
                start_x - offset
            } else {
                start_x + offset
            }
        })
        .collect()
}

/// Drop the tail of `positions` after the object has left the screen.
///
/// Leading off-screen entries stay so that index `i` is still step
/// `step_begin + i`.
pub fn truncate_to_cutoff(positions: &[f64], cutoff: f64) -> Vec<f64> {
    match positions.iter().rposition(|x| x.abs() <= cutoff) {
        Some(last) => positions[..=last].to_vec(),
        None => Vec::new(),
    }
}

/// A move-across object's assigned path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPlan {
    pub position: ScreenPosition,
    pub option: MovementOption,
    /// Absolute, truncated X per step.
    pub positions: Vec<f64>,
    pub step_begin: u32,
}

impl TrajectoryPlan {
    /// Force pointing toward the screen center.
    pub fn force(&self) -> Vec3 {
        let mut force = self.option.force;
        if self.position.side() == Side::Right {
            force.x = -force.x.abs();
        } else {
            force.x = force.x.abs();
        }
        force
    }
}

// ---------------------------------------------------------------------------
// Option selection
// ---------------------------------------------------------------------------

fn satisfies(
    position: ScreenPosition,
    acceleration: f64,
    partner_acceleration: f64,
) -> bool {
    if position.is_last() {
        acceleration <= partner_acceleration
    } else {
        acceleration >= partner_acceleration
    }
}

/// Choose a movement option per object, honoring leader/trailer ordering.
///
/// If no option of an object fits against an already-assigned partner, the
/// two swap screen positions once. A second failure is
/// [`SceneError::PlacementExhausted`].
pub fn assign_options<R: Rng + ?Sized>(
    rng: &mut R,
    definitions: &[&ObjectDefinition],
    positions: &mut [ScreenPosition],
) -> Result<Vec<usize>> {
    let mut chosen: Vec<usize> = Vec::with_capacity(definitions.len());
    for (i, definition) in definitions.iter().enumerate() {
        let count = definition.movement_options.len();
        if count == 0 {
            return Err(SceneError::placement(
                definition.label(),
                "movement option",
                0,
            ));
        }
        let mut order: Vec<usize> = (0..count).collect();
        order.shuffle(rng);

        let partner = (0..i).find(|&j| positions[j] == positions[i].partner());
        let Some(j) = partner else {
            chosen.push(order[0]);
            continue;
        };

        let partner_acc =
            definitions[j].movement_options[chosen[j]].acceleration(definitions[j].mass);
        let fits = |position: ScreenPosition| {
            order.iter().copied().find(|&k| {
                satisfies(
                    position,
                    definition.movement_options[k].acceleration(definition.mass),
                    partner_acc,
                )
            })
        };

        if let Some(k) = fits(positions[i]) {
            chosen.push(k);
            continue;
        }
        positions.swap(i, j);
        debug!(
            "swapped {:?} and {:?} to keep trajectory order",
            positions[j], positions[i]
        );
        match fits(positions[i]) {
            Some(k) => chosen.push(k),
            None => {
                return Err(SceneError::placement(
                    definition.label(),
                    "trajectory order",
                    2,
                ))
            }
        }
    }
    Ok(chosen)
}

/// Turn assignments into scheduled plans. Leaders are scheduled before
/// their trailers, and a leader leaves room for its trailer's table.
pub fn schedule<R: Rng + ?Sized>(
    rng: &mut R,
    definitions: &[&ObjectDefinition],
    positions: &[ScreenPosition],
    options: &[usize],
    last_action_step: u32,
) -> Result<Vec<TrajectoryPlan>> {
    let mut plans: Vec<TrajectoryPlan> = definitions
        .iter()
        .zip(positions)
        .zip(options)
        .map(|((definition, &position), &k)| {
            let option = definition.movement_options[k].clone();
            let cutoff = position.band().visible_cutoff(definition.dimensions.x);
            let positions = truncate_to_cutoff(
                &absolute_positions(position.start_x(), &option.position_by_step),
                cutoff,
            );
            TrajectoryPlan {
                position,
                option,
                positions,
                step_begin: EARLIEST_ACTION_STEP,
            }
        })
        .collect();

    let length_of = |plans: &[TrajectoryPlan], position: ScreenPosition| {
        plans
            .iter()
            .find(|p| p.position == position)
            .map(|p| p.positions.len() as u32)
    };

    let mut order: Vec<usize> = (0..plans.len()).collect();
    order.sort_by_key(|&i| plans[i].position.is_last());
    for i in order {
        let position = plans[i].position;
        let own = plans[i].positions.len() as u32;
        let (min, longest) = if position.is_last() {
            let leader_start = plans
                .iter()
                .find(|p| p.position == position.partner())
                .map(|p| p.step_begin)
                .unwrap_or(EARLIEST_ACTION_STEP);
            (leader_start.max(EARLIEST_ACTION_STEP), own)
        } else {
            let trailer = length_of(&plans, position.partner()).unwrap_or(0);
            (EARLIEST_ACTION_STEP, own.max(trailer))
        };
        let max = last_action_step.saturating_sub(longest);
        if max < min {
            return Err(SceneError::placement(
                format!("{:?} trajectory", position),
                format!("start step in [{}, {}]", min, max),
                1,
            ));
        }
        plans[i].step_begin = rng.gen_range(min..=max);
    }
    Ok(plans)
}

/// Step at which a dropped object is released.
pub fn fall_step_begin<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    rng.gen_range(EARLIEST_ACTION_STEP..=LATEST_FALL_START_STEP)
}

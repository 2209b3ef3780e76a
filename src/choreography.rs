//! Implausible-event transforms.
//!
//! Every event kind is a pure function from a baseline [`SceneVariant`] and
//! the [`EventFacts`] of its target to a new variant. Nothing is shared
//! between the input and the output; the input is never touched.
//!
//! The "event step" is the step at which the target is hidden behind its
//! paired occluder: trajectory index plus push start for objects moving
//! across, landing time for dropped objects.

use crate::error::{Result, SceneError};
use crate::placement::round_position;
use crate::protocol::{Manipulation, MotionShift, Plausibility, SceneVariant, SetupKind, SwapMode};
use crate::trajectory::{EARLIEST_ACTION_STEP, OBJECT_FALL_TIME};
use crate::types::{HideEvent, ObjectInstance, ShowEvent, TeleportEvent, Vec3};

/// Baseline facts an event needs about its target.
#[derive(Debug, Clone, PartialEq)]
pub struct EventFacts {
    pub setup: SetupKind,
    pub target_id: String,
    /// Push start (move-across) or release step (fall-down).
    pub step_begin: u32,
    pub start: Vec3,
    pub resting_y: f64,
    /// Absolute X per step, move-across only.
    pub positions: Vec<f64>,
    /// Trajectory indices hidden by paired occluders, in pairing order.
    pub occluder_indices: Vec<usize>,
    /// X of each paired occluder, in pairing order.
    pub occluder_xs: Vec<f64>,
    pub sight_factor: f64,
    pub last_step: u32,
    /// Push start of the object leading the target on its side and band.
    /// The target may never start before it.
    pub leader_step_begin: Option<u32>,
    /// Push start of the object trailing the target. The target may never
    /// start after it, even when delayed.
    pub trailer_step_begin: Option<u32>,
}

impl EventFacts {
    /// Facts for a moving target, read from its chosen trajectory.
    pub fn for_mover(
        target: &ObjectInstance,
        occluder_xs: Vec<f64>,
        sight_factor: f64,
        last_step: u32,
    ) -> Result<Self> {
        let movement = target
            .movement
            .as_ref()
            .ok_or_else(|| SceneError::event("event facts", format!("{} never moves", target.id)))?;
        let step_begin = target
            .forces
            .first()
            .map(|f| f.step_begin)
            .unwrap_or(EARLIEST_ACTION_STEP);
        Ok(Self {
            setup: SetupKind::MoveAcross,
            target_id: target.id.clone(),
            step_begin,
            start: target.position(),
            resting_y: target.resting_y,
            positions: movement.position_by_step.clone(),
            occluder_indices: movement.occluder_indices.clone(),
            occluder_xs,
            sight_factor,
            last_step,
            leader_step_begin: None,
            trailer_step_begin: None,
        })
    }

    /// Facts for a dropped target.
    pub fn for_drop(
        target: &ObjectInstance,
        occluder_xs: Vec<f64>,
        sight_factor: f64,
        last_step: u32,
    ) -> Self {
        Self {
            setup: SetupKind::FallDown,
            target_id: target.id.clone(),
            step_begin: target.step_begin(),
            start: target.position(),
            resting_y: target.resting_y,
            positions: Vec::new(),
            occluder_indices: Vec::new(),
            occluder_xs,
            sight_factor,
            last_step,
            leader_step_begin: None,
            trailer_step_begin: None,
        }
    }

    /// Record the push starts of the objects sharing the target's lane.
    pub fn with_lane(mut self, leader: Option<u32>, trailer: Option<u32>) -> Self {
        self.leader_step_begin = leader;
        self.trailer_step_begin = trailer;
        self
    }

    /// Step at which the target is first hidden.
    pub fn event_step(&self) -> Result<u32> {
        match self.setup {
            SetupKind::MoveAcross => self
                .occluder_indices
                .first()
                .map(|i| self.step_begin + *i as u32)
                .ok_or_else(|| SceneError::event("event step", "no paired occluder index")),
            SetupKind::FallDown => Ok(self.step_begin + OBJECT_FALL_TIME),
        }
    }

    /// X at the first hidden index (move-across) or the start X.
    fn hidden_x(&self) -> Result<f64> {
        match self.setup {
            SetupKind::MoveAcross => {
                let index = *self
                    .occluder_indices
                    .first()
                    .ok_or_else(|| SceneError::event("hidden position", "no paired occluder index"))?;
                self.position_at(index)
            }
            SetupKind::FallDown => Ok(self.start.x),
        }
    }

    fn position_at(&self, index: usize) -> Result<f64> {
        self.positions.get(index).copied().ok_or_else(|| {
            SceneError::event(
                "trajectory lookup",
                format!("index {} past {} positions", index, self.positions.len()),
            )
        })
    }

    /// The two hidden indices, ordered low to high.
    fn index_pair(&self, event: &str) -> Result<(usize, usize)> {
        match self.occluder_indices.as_slice() {
            [a, b, ..] => Ok(((*a).min(*b), (*a).max(*b))),
            _ => Err(SceneError::event(event, "needs two paired occluder indices")),
        }
    }

    /// Where a dropped object lands behind the second paired occluder.
    fn second_drop_x(&self, event: &str) -> Result<f64> {
        match self.occluder_xs.get(1) {
            Some(x) => Ok(round_position(x / self.sight_factor)),
            None => Err(SceneError::event(event, "needs a second paired occluder")),
        }
    }
}

fn branch(
    baseline: &SceneVariant,
    facts: &EventFacts,
    manipulation: Manipulation,
    answer: Plausibility,
) -> Result<SceneVariant> {
    let mut variant = baseline.snapshot();
    if variant.object(&facts.target_id).is_none() {
        return Err(SceneError::event(
            format!("{:?}", manipulation),
            format!("target {} missing", facts.target_id),
        ));
    }
    variant.manipulation = Some(manipulation);
    variant.answer = answer;
    Ok(variant)
}

fn target_mut<'v>(variant: &'v mut SceneVariant, facts: &EventFacts) -> Result<&'v mut ObjectInstance> {
    variant
        .object_mut(&facts.target_id)
        .ok_or_else(|| SceneError::event("target lookup", format!("{} missing", facts.target_id)))
}

// ---------------------------------------------------------------------------
// Permanence
// ---------------------------------------------------------------------------

/// The target hides behind its occluder and never comes back.
pub fn disappear_behind_occluder(baseline: &SceneVariant, facts: &EventFacts) -> Result<SceneVariant> {
    let step = facts.event_step()?;
    let mut variant = branch(
        baseline,
        facts,
        Manipulation::DisappearBehindOccluder { step },
        Plausibility::Implausible,
    )?;
    target_mut(&mut variant, facts)?
        .hides
        .push(HideEvent { step_begin: step });
    Ok(variant)
}

/// The target first exists behind its occluder at the event step.
pub fn appear_behind_occluder(baseline: &SceneVariant, facts: &EventFacts) -> Result<SceneVariant> {
    let step = facts.event_step()?;
    let x = facts.hidden_x()?;
    let mut variant = branch(
        baseline,
        facts,
        Manipulation::AppearBehindOccluder { step },
        Plausibility::Implausible,
    )?;
    let show = target_mut(&mut variant, facts)?.first_show_mut();
    match facts.setup {
        SetupKind::MoveAcross => show.position.x = x,
        SetupKind::FallDown => show.position.y = facts.resting_y,
    }
    show.step_begin = step;
    Ok(variant)
}

/// The target never exists. Plausible.
pub fn remove_target(baseline: &SceneVariant, facts: &EventFacts) -> Result<SceneVariant> {
    let mut variant = branch(baseline, facts, Manipulation::RemoveTarget, Plausibility::Plausible)?;
    variant.objects.retain(|o| o.id != facts.target_id);
    variant.goal.target_ids.retain(|id| *id != facts.target_id);
    Ok(variant)
}

// ---------------------------------------------------------------------------
// Continuity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeleportMode {
    Instant,
    /// Hide behind the first occluder, reappear behind the second later.
    Delayed,
}

/// The target jumps ahead from the first paired occluder to the second.
pub fn teleport_forward(
    baseline: &SceneVariant,
    facts: &EventFacts,
    mode: TeleportMode,
) -> Result<SceneVariant> {
    match facts.setup {
        SetupKind::MoveAcross => {
            let (start, end) = facts.index_pair("teleport forward")?;
            let step = facts.step_begin + start as u32;
            let x = facts.position_at(end)?;
            let delayed = mode == TeleportMode::Delayed;
            let mut variant = branch(
                baseline,
                facts,
                Manipulation::TeleportForward { step, delayed },
                Plausibility::Implausible,
            )?;
            let target = target_mut(&mut variant, facts)?;
            let position = Vec3::new(x, target.position().y, target.position().z);
            if delayed {
                let first = target.first_show().clone();
                target.hides.push(HideEvent { step_begin: step });
                target.shows.push(ShowEvent {
                    step_begin: facts.step_begin + end as u32 + 1,
                    position,
                    rotation: first.rotation,
                    scale: first.scale,
                    bounds: None,
                });
            } else {
                target.teleports.push(TeleportEvent {
                    step_begin: step,
                    step_end: step,
                    position,
                });
            }
            Ok(variant)
        }
        SetupKind::FallDown => {
            let step = facts.event_step()?;
            let x = facts.second_drop_x("teleport forward")?;
            let mut variant = branch(
                baseline,
                facts,
                Manipulation::TeleportForward {
                    step,
                    delayed: false,
                },
                Plausibility::Implausible,
            )?;
            let target = target_mut(&mut variant, facts)?;
            target.teleports.push(TeleportEvent {
                step_begin: step,
                step_end: step,
                position: Vec3::new(x, facts.resting_y, facts.start.z),
            });
            Ok(variant)
        }
    }
}

/// The target jumps back from the later paired occluder to the earlier one.
pub fn teleport_backward(baseline: &SceneVariant, facts: &EventFacts) -> Result<SceneVariant> {
    match facts.setup {
        SetupKind::MoveAcross => {
            let (low, high) = facts.index_pair("teleport backward")?;
            let step = facts.step_begin + high as u32;
            let x = facts.position_at(low)?;
            let mut variant = branch(
                baseline,
                facts,
                Manipulation::TeleportBackward { step },
                Plausibility::Implausible,
            )?;
            let target = target_mut(&mut variant, facts)?;
            let position = Vec3::new(x, target.position().y, target.position().z);
            target.teleports.push(TeleportEvent {
                step_begin: step,
                step_end: step,
                position,
            });
            Ok(variant)
        }
        SetupKind::FallDown => {
            let step = facts.event_step()?;
            let x = facts.second_drop_x("teleport backward")?;
            let mut variant = branch(
                baseline,
                facts,
                Manipulation::TeleportBackward { step },
                Plausibility::Implausible,
            )?;
            let target = target_mut(&mut variant, facts)?;
            target.first_show_mut().position.x = x;
            target.teleports.push(TeleportEvent {
                step_begin: step,
                step_end: step,
                position: Vec3::new(facts.start.x, facts.resting_y, facts.start.z),
            });
            Ok(variant)
        }
    }
}

/// Shift the whole push by the index gap between the two paired occluders.
pub fn shift_motion(
    baseline: &SceneVariant,
    facts: &EventFacts,
    shift: MotionShift,
) -> Result<SceneVariant> {
    if facts.setup != SetupKind::MoveAcross {
        return Err(SceneError::event("shift motion", "only moving targets can be shifted"));
    }
    let (low, high) = facts.index_pair("shift motion")?;
    let delta = (high - low) as u32;
    let begin = match shift {
        MotionShift::Delay => facts.step_begin + delta,
        MotionShift::Advance => facts.step_begin.checked_sub(delta).ok_or_else(|| {
            SceneError::event("advance motion", format!("cannot start before step 0 (delta {})", delta))
        })?,
    };
    if begin as usize + facts.positions.len() > facts.last_step as usize {
        return Err(SceneError::event(
            "shift motion",
            format!("starting at {} runs past step {}", begin, facts.last_step),
        ));
    }
    let mut variant = branch(
        baseline,
        facts,
        Manipulation::ShiftMotion {
            shift,
            steps: delta,
        },
        Plausibility::Plausible,
    )?;
    let target = target_mut(&mut variant, facts)?;
    for force in target
        .forces
        .iter_mut()
        .filter(|f| f.step_begin == facts.step_begin)
    {
        force.step_begin = begin;
    }
    Ok(variant)
}

/// Drop the target behind the second paired occluder instead. Plausible.
pub fn swap_drop_position(baseline: &SceneVariant, facts: &EventFacts) -> Result<SceneVariant> {
    if facts.setup != SetupKind::FallDown {
        return Err(SceneError::event("swap drop position", "only dropped targets"));
    }
    let x = facts.second_drop_x("swap drop position")?;
    let mut variant = branch(
        baseline,
        facts,
        Manipulation::SwapDropPosition,
        Plausibility::Plausible,
    )?;
    target_mut(&mut variant, facts)?.first_show_mut().position.x = x;
    Ok(variant)
}

// ---------------------------------------------------------------------------
// Shape constancy
// ---------------------------------------------------------------------------

/// Give `b` the start, push and trajectory of `a`.
fn take_over(a: &ObjectInstance, b: &mut ObjectInstance) {
    let y = a.position().y - a.resting_y + b.resting_y;
    let show = b.first_show_mut();
    show.step_begin = a.step_begin();
    show.position = Vec3::new(a.position().x, y, a.position().z);
    b.forces = a.forces.clone();
    b.movement = a.movement.clone();
}

/// Swap the target for the similar-sized `replacement` at the event step.
pub fn swap_shape(
    baseline: &SceneVariant,
    facts: &EventFacts,
    replacement: &ObjectInstance,
    mode: SwapMode,
) -> Result<SceneVariant> {
    let step = facts.event_step()?;
    let hidden_x = facts.hidden_x()?;
    let answer = match mode {
        SwapMode::BReplacesA => Plausibility::Plausible,
        _ => Plausibility::Implausible,
    };
    let mut variant = branch(baseline, facts, Manipulation::ShapeSwap { mode, step }, answer)?;
    let a = variant
        .object(&facts.target_id)
        .cloned()
        .ok_or_else(|| SceneError::event("shape swap", "target missing"))?;
    let mut b = replacement.clone();

    match mode {
        SwapMode::TurnAIntoB => {
            take_over(&a, &mut b);
            let resting_y = b.resting_y;
            let show = b.first_show_mut();
            show.step_begin = step;
            match facts.setup {
                SetupKind::MoveAcross => show.position.x = hidden_x,
                SetupKind::FallDown => show.position.y = resting_y,
            }
            target_mut(&mut variant, facts)?
                .hides
                .push(HideEvent { step_begin: step });
            variant.goal.target_ids.push(b.id.clone());
            variant.objects.push(b);
        }
        SwapMode::TurnBIntoA => {
            take_over(&a, &mut b);
            b.hides.push(HideEvent { step_begin: step });
            let target = target_mut(&mut variant, facts)?;
            let show = target.first_show_mut();
            show.step_begin = step;
            match facts.setup {
                SetupKind::MoveAcross => show.position.x = hidden_x,
                SetupKind::FallDown => show.position.y = facts.resting_y,
            }
            variant.goal.target_ids.push(b.id.clone());
            variant.objects.push(b);
        }
        SwapMode::BReplacesA => {
            take_over(&a, &mut b);
            for id in variant.goal.target_ids.iter_mut() {
                if *id == facts.target_id {
                    *id = b.id.clone();
                }
            }
            if let Some(slot) = variant.objects.iter_mut().find(|o| o.id == facts.target_id) {
                *slot = b;
            }
        }
    }
    Ok(variant)
}

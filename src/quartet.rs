//! Quartet composition for the intuitive-physics set kinds.
//!
//! | Kind         | 1        | 2                 | 3                 | 4                     |
//! |--------------|----------|-------------------|-------------------|-----------------------|
//! | permanence   | baseline | disappear         | appear            | target removed        |
//! | continuity   | baseline | teleport forward  | teleport backward | delayed / other drop  |
//! | shape        | baseline | A turns into B    | B turns into A    | B replaces A          |
//!
//! Variants 1 and 4 are plausible.

use log::debug;
use rand::Rng;

use crate::catalog::{choose, pick_material, Catalog};
use crate::choreography::{
    appear_behind_occluder, disappear_behind_occluder, remove_target, shift_motion,
    swap_drop_position, swap_shape, teleport_backward, teleport_forward, EventFacts, TeleportMode,
};
use crate::error::{Result, SceneError};
use crate::ids::IdSource;
use crate::intphys::IntphysLayout;
use crate::protocol::{MotionShift, SceneSetKind, SceneVariant, SetupKind, SwapMode};
use crate::trajectory::{EARLIEST_ACTION_STEP, MOVE_ACROSS_LAST_ACTION_STEP};
use crate::types::{GeneratorConfig, ObjectInstance, Role};

/// Build the four variants of `kind` on top of `layout`.
pub fn build_quartet<R: Rng + ?Sized>(
    rng: &mut R,
    kind: SceneSetKind,
    layout: IntphysLayout,
    catalog: &Catalog,
    config: &GeneratorConfig,
    ids: &mut IdSource,
) -> Result<Vec<SceneVariant>> {
    let setup = layout.setup;
    let mut facts = layout.facts.clone();
    let target_definition = layout.target_definition.clone();
    let mut baseline = layout.into_variant(kind, config.room);

    let variants = match kind {
        SceneSetKind::ObjectPermanence => {
            let disappear = disappear_behind_occluder(&baseline, &facts)?;
            let appear = appear_behind_occluder(&baseline, &facts)?;
            let removed = remove_target(&baseline, &facts)?;
            vec![baseline, disappear, appear, removed]
        }
        SceneSetKind::SpatioTemporalContinuity => match setup {
            SetupKind::MoveAcross => {
                fit_delay_window(&mut baseline, &mut facts)?;
                let mode = if rng.gen_bool(config.teleport_delay_chance.clamp(0.0, 1.0)) {
                    TeleportMode::Delayed
                } else {
                    TeleportMode::Instant
                };
                let forward = teleport_forward(&baseline, &facts, mode)?;
                let backward = teleport_backward(&baseline, &facts)?;
                let delayed = shift_motion(&baseline, &facts, MotionShift::Delay)?;
                vec![baseline, forward, backward, delayed]
            }
            SetupKind::FallDown => {
                let forward = teleport_forward(&baseline, &facts, TeleportMode::Instant)?;
                let backward = teleport_backward(&baseline, &facts)?;
                let moved = swap_drop_position(&baseline, &facts)?;
                vec![baseline, forward, backward, moved]
            }
        },
        SceneSetKind::ShapeConstancy => {
            let partners = catalog.shape_partners(&target_definition);
            let partner = choose(rng, &partners, "shape partner")?;
            let target = baseline
                .object(&facts.target_id)
                .ok_or_else(|| SceneError::event("shape swap", "target missing"))?;
            let mut b = ObjectInstance::from_definition(
                ids.next("target"),
                partner,
                Role::Target,
                target.position(),
                0.0,
                None,
            );
            b.materials = pick_material(rng, partner);
            let a_into_b = swap_shape(&baseline, &facts, &b, SwapMode::TurnAIntoB)?;
            let b_into_a = swap_shape(&baseline, &facts, &b, SwapMode::TurnBIntoA)?;
            let replaced = swap_shape(&baseline, &facts, &b, SwapMode::BReplacesA)?;
            vec![baseline, a_into_b, b_into_a, replaced]
        }
        other => {
            return Err(SceneError::event(
                "quartet",
                format!("{} is not an intuitive-physics kind", other),
            ))
        }
    };
    debug!("built {} quartet on a {:?} baseline", kind, setup);
    Ok(variants)
}

/// Move the target's push earlier if delaying it by the occluder gap would
/// run past the last action step or past the start of the object trailing
/// it. The push never moves before its own leader's start. Updates both the
/// baseline and `facts`.
pub fn fit_delay_window(baseline: &mut SceneVariant, facts: &mut EventFacts) -> Result<()> {
    let (low, high) = match facts.occluder_indices.as_slice() {
        [a, b, ..] => ((*a).min(*b), (*a).max(*b)),
        _ => return Err(SceneError::event("delay motion", "needs two paired occluder indices")),
    };
    let delta = (high - low) as u32;
    let length = facts.positions.len() as u32;
    let earliest = facts
        .leader_step_begin
        .map_or(EARLIEST_ACTION_STEP, |leader| leader.max(EARLIEST_ACTION_STEP));
    let mut latest = MOVE_ACROSS_LAST_ACTION_STEP.checked_sub(length + delta);
    if let Some(trailer) = facts.trailer_step_begin {
        latest = latest.zip(trailer.checked_sub(delta)).map(|(a, b)| a.min(b));
    }
    let latest = latest.filter(|latest| *latest >= earliest).ok_or_else(|| {
        SceneError::event(
            "delay motion",
            format!(
                "{} steps plus a {} step delay do not fit after step {}",
                length, delta, earliest
            ),
        )
    })?;
    if facts.step_begin <= latest {
        return Ok(());
    }
    let previous = facts.step_begin;
    let target = baseline
        .object_mut(&facts.target_id)
        .ok_or_else(|| SceneError::event("delay motion", "target missing"))?;
    for force in target.forces.iter_mut().filter(|f| f.step_begin == previous) {
        force.step_begin = latest;
    }
    facts.step_begin = latest;
    debug!("moved push of {} from step {} to {}", facts.target_id, previous, latest);
    Ok(())
}

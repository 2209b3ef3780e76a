//! Baseline layouts for intuitive-physics scenes.
//!
//! A layout is the plausible first variant of a quartet, plus the
//! [`EventFacts`] the event transforms need about its target.
//!
//! ```text
//! move-across   objects enter from the side and are pushed across the
//!               screen; the target is hidden by 1 or 2 paired occluders
//! fall-down     objects drop from above onto the floor behind sideways
//!               occluders; the target lands behind its paired occluder
//! ```
//!
//! The performer always watches from the default pose. Background
//! furniture, if any, sits against the back wall behind the occluders.

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::catalog::{choose, pick_material, Catalog};
use crate::choreography::EventFacts;
use crate::error::{Result, SceneError};
use crate::ids::IdSource;
use crate::occluder::{OccluderComposer, OccluderPair};
use crate::placement::{random_real, Location, Predicate, SceneAttempt, POSITION_STEP};
use crate::protocol::{GoalMetadata, Plausibility, SceneSetKind, SceneVariant, SetupKind};
use crate::trajectory::{
    assign_options, choose_positions, fall_step_begin, schedule, DepthBand, FALL_DOWN_HEIGHT,
    FALL_DOWN_LAST_STEP, FALL_DOWN_MAX_X, MOVE_ACROSS_LAST_ACTION_STEP, MOVE_ACROSS_LAST_STEP,
};
use crate::types::{
    ChosenMovement, GeneratorConfig, ObjectDefinition, ObjectInstance, PerformerPose, Role, Room,
    StepVector,
};

/// Background furniture stays behind this Z.
pub const BACKGROUND_MIN_Z: f64 = 3.25;

const MOVE_ACROSS_OBJECTS: [(usize, u32); 3] = [(1, 40), (2, 30), (3, 30)];
const MOVE_ACROSS_OCCLUDERS: [(usize, u32); 3] = [(1, 50), (2, 30), (3, 20)];
const CONTINUITY_OCCLUDERS: [(usize, u32); 2] = [(2, 60), (3, 40)];
const BACKGROUND_OBJECTS: [(usize, u32); 6] =
    [(0, 50), (1, 10), (2, 10), (3, 10), (4, 10), (5, 10)];

fn weighted<R: Rng + ?Sized>(rng: &mut R, choices: &[(usize, u32)]) -> usize {
    choices
        .choose_weighted(rng, |c| c.1)
        .map(|c| c.0)
        .unwrap_or(choices[0].0)
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// A finished baseline before it is turned into a [`SceneVariant`].
#[derive(Debug, Clone)]
pub struct IntphysLayout {
    pub setup: SetupKind,
    pub pose: PerformerPose,
    /// Moving or falling objects, target first.
    pub objects: Vec<ObjectInstance>,
    pub target_definition: ObjectDefinition,
    pub occluders: Vec<OccluderPair>,
    pub background: Vec<ObjectInstance>,
    pub facts: EventFacts,
}

impl IntphysLayout {
    pub fn target(&self) -> &ObjectInstance {
        &self.objects[0]
    }

    pub fn last_step(&self) -> u32 {
        match self.setup {
            SetupKind::MoveAcross => MOVE_ACROSS_LAST_STEP,
            SetupKind::FallDown => FALL_DOWN_LAST_STEP,
        }
    }

    pub fn into_variant(self, kind: SceneSetKind, room: Room) -> SceneVariant {
        let last_step = self.last_step();
        let target_id = self.target().id.clone();
        let mut objects = self.objects;
        for pair in self.occluders {
            objects.extend(pair.into_instances());
        }
        objects.extend(self.background);
        SceneVariant {
            name: String::new(),
            room,
            performer_start: self.pose,
            intuitive_physics: true,
            objects,
            goal: GoalMetadata {
                category: kind,
                setup: Some(self.setup),
                last_step: Some(last_step),
                target_ids: vec![target_id],
            },
            answer: Plausibility::Plausible,
            manipulation: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub struct LayoutBuilder<'a> {
    catalog: &'a Catalog,
    config: &'a GeneratorConfig,
    ids: &'a mut IdSource,
}

impl<'a> LayoutBuilder<'a> {
    pub fn new(catalog: &'a Catalog, config: &'a GeneratorConfig, ids: &'a mut IdSource) -> Self {
        Self {
            catalog,
            config,
            ids,
        }
    }

    pub fn build<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        kind: SceneSetKind,
        setup: SetupKind,
    ) -> Result<IntphysLayout> {
        let mut layout = match setup {
            SetupKind::MoveAcross => self.move_across(rng, kind)?,
            SetupKind::FallDown => self.fall_down(rng, kind)?,
        };
        if !self.config.skip_background {
            layout.background = self.background(rng)?;
        }
        debug!(
            "{} {:?} layout: {} object(s), {} occluder(s), {} background",
            kind,
            setup,
            layout.objects.len(),
            layout.occluders.len(),
            layout.background.len()
        );
        Ok(layout)
    }

    fn target_candidates(&self, kind: SceneSetKind) -> Vec<&'a ObjectDefinition> {
        let catalog = self.catalog;
        let movers = catalog.movers();
        match kind {
            SceneSetKind::ShapeConstancy => movers
                .into_iter()
                .filter(|d| !catalog.shape_partners(d).is_empty())
                .collect(),
            _ => movers,
        }
    }

    fn instance<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        definition: &ObjectDefinition,
        role: Role,
        location: &Location,
    ) -> ObjectInstance {
        let prefix = match role {
            Role::Target => "target",
            Role::Background => "background",
            _ => "distractor",
        };
        let mut instance = ObjectInstance::from_definition(
            self.ids.next(prefix),
            definition,
            role,
            location.position,
            location.rotation_y,
            Some(location.bounds),
        );
        instance.materials = pick_material(rng, definition);
        instance
    }

    // -----------------------------------------------------------------------
    // Move-across
    // -----------------------------------------------------------------------

    fn move_across<R: Rng + ?Sized>(&mut self, rng: &mut R, kind: SceneSetKind) -> Result<IntphysLayout> {
        let continuity = kind == SceneSetKind::SpatioTemporalContinuity;
        let object_count = weighted(rng, &MOVE_ACROSS_OBJECTS);
        let occluder_count = if continuity {
            weighted(rng, &CONTINUITY_OCCLUDERS)
        } else {
            weighted(rng, &MOVE_ACROSS_OCCLUDERS)
        };

        let catalog = self.catalog;
        let target_definition = choose(rng, &self.target_candidates(kind), "target")?;
        let movers = catalog.movers();
        let mut definitions = vec![target_definition];
        for _ in 1..object_count {
            definitions.push(choose(rng, &movers, "moving object")?);
        }

        let mut positions = choose_positions(rng, object_count)?;
        let options = assign_options(rng, &definitions, &mut positions)?;
        let plans = schedule(rng, &definitions, &positions, &options, MOVE_ACROSS_LAST_ACTION_STEP)?;

        let mut objects = Vec::with_capacity(plans.len());
        for (i, (definition, plan)) in definitions.iter().zip(&plans).enumerate() {
            let band = plan.position.band();
            let x = plan.position.start_x();
            let mut location = Location::for_definition(definition, x, band.z(), 0.0);
            location.position.y = definition.position_y + plan.option.start_y;
            let role = if i == 0 { Role::Target } else { Role::Distractor };
            let mut instance = self.instance(rng, definition, role, &location);
            let force = plan.force();
            instance.forces.push(StepVector {
                step_begin: plan.step_begin,
                step_end: MOVE_ACROSS_LAST_ACTION_STEP,
                vector: force,
            });
            instance.movement = Some(ChosenMovement {
                start_y: plan.option.start_y,
                force,
                position_by_step: plan.positions.clone(),
                occluder_indices: Vec::new(),
            });
            objects.push(instance);
        }

        let tries = self.config.placement_tries;
        let mut composer = OccluderComposer::new(self.ids).with_tries(tries);
        let mut occluders: Vec<OccluderPair> = Vec::with_capacity(occluder_count);
        let mut target_xs = Vec::new();
        let paired_on_target = if continuity { 2 } else { 1 };

        // The target first, then one occluder per remaining object, then
        // unpaired ones.
        let mut owners: Vec<usize> = vec![0; paired_on_target];
        owners.extend(1..objects.len());
        owners.truncate(occluder_count);
        for &owner in &owners {
            let band = plans[owner].position.band();
            let (pair, index) = composer.compose_for_trajectory(rng, &objects[owner], band, &occluders)?;
            if owner == 0 {
                target_xs.push(pair.x());
            }
            if let Some(movement) = objects[owner].movement.as_mut() {
                movement.occluder_indices.push(index);
            }
            occluders.push(pair);
        }
        while occluders.len() < occluder_count {
            let pair = composer.compose_random(rng, false, &occluders)?;
            occluders.push(pair);
        }

        let lane = plans[0].position;
        let partner_start = plans
            .iter()
            .find(|p| p.position == lane.partner())
            .map(|p| p.step_begin);
        let (leader, trailer) = if lane.is_last() {
            (partner_start, None)
        } else {
            (None, partner_start)
        };
        let facts = EventFacts::for_mover(&objects[0], target_xs, lane.band().sight_factor(), MOVE_ACROSS_LAST_STEP)?
            .with_lane(leader, trailer);
        Ok(IntphysLayout {
            setup: SetupKind::MoveAcross,
            pose: PerformerPose::default(),
            objects,
            target_definition: target_definition.clone(),
            occluders,
            background: Vec::new(),
            facts,
        })
    }

    // -----------------------------------------------------------------------
    // Fall-down
    // -----------------------------------------------------------------------

    fn fall_down<R: Rng + ?Sized>(&mut self, rng: &mut R, kind: SceneSetKind) -> Result<IntphysLayout> {
        let continuity = kind == SceneSetKind::SpatioTemporalContinuity;
        let object_count = if continuity { 1 } else { rng.gen_range(1..=2) };
        let occluder_count = if continuity || object_count == 2 {
            2
        } else {
            rng.gen_range(1..=2)
        };

        let catalog = self.catalog;
        let target_definition = choose(rng, &self.target_candidates(kind), "target")?;
        let movers = catalog.movers();
        let mut definitions = vec![target_definition];
        for _ in 1..object_count {
            definitions.push(choose(rng, &movers, "falling object")?);
        }

        let tries = self.config.placement_tries.max(1);
        let mut objects: Vec<ObjectInstance> = Vec::with_capacity(object_count);
        let mut occluders: Vec<OccluderPair> = Vec::with_capacity(occluder_count);
        let mut target_xs = Vec::new();
        let band = *DepthBand::ALL.choose(rng).unwrap_or(&DepthBand::Near);

        for (i, definition) in definitions.iter().enumerate() {
            let role = if i == 0 { Role::Target } else { Role::Distractor };
            let step_begin = fall_step_begin(rng);
            let mut last = None;
            let mut placed = None;
            for _ in 0..tries {
                let x = random_real(rng, -FALL_DOWN_MAX_X, FALL_DOWN_MAX_X, POSITION_STEP);
                let mut location = Location::for_definition(definition, x, band.z(), 0.0);
                location.position.y = FALL_DOWN_HEIGHT;
                let id = self.ids.next(if i == 0 { "target" } else { "distractor" });
                let mut instance = ObjectInstance::from_definition(
                    id,
                    definition,
                    role,
                    location.position,
                    0.0,
                    Some(location.bounds),
                );
                instance.first_show_mut().step_begin = step_begin;
                let mut composer = OccluderComposer::new(self.ids).with_tries(tries);
                match composer.compose_for_fall(rng, &instance, band, &occluders) {
                    Ok(pair) => {
                        placed = Some((instance, pair));
                        break;
                    }
                    Err(e) if e.is_recoverable() => last = Some(e),
                    Err(e) => return Err(e),
                }
            }
            let Some((mut instance, pair)) = placed else {
                return Err(last.unwrap_or_else(|| {
                    SceneError::placement(definition.label(), "drop position", tries)
                }));
            };
            instance.materials = pick_material(rng, definition);
            if i == 0 {
                target_xs.push(pair.x());
            }
            occluders.push(pair);
            objects.push(instance);
        }

        if continuity {
            let pair = self.second_drop_occluder(rng, &objects[0], band, &occluders)?;
            target_xs.push(pair.x());
            occluders.push(pair);
        }
        let mut composer = OccluderComposer::new(self.ids).with_tries(tries);
        while occluders.len() < occluder_count {
            let pair = composer.compose_random(rng, true, &occluders)?;
            occluders.push(pair);
        }

        let facts = EventFacts::for_drop(&objects[0], target_xs, band.sight_factor(), FALL_DOWN_LAST_STEP);
        Ok(IntphysLayout {
            setup: SetupKind::FallDown,
            pose: PerformerPose::default(),
            objects,
            target_definition: target_definition.clone(),
            occluders,
            background: Vec::new(),
            facts,
        })
    }

    /// A second sideways occluder where the target could also have landed.
    fn second_drop_occluder<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        target: &ObjectInstance,
        band: DepthBand,
        existing: &[OccluderPair],
    ) -> Result<OccluderPair> {
        let tries = self.config.placement_tries.max(1);
        let mut composer = OccluderComposer::new(self.ids).with_tries(tries);
        let mut trial = target.clone();
        let mut last = None;
        for _ in 0..tries {
            trial.first_show_mut().position.x =
                random_real(rng, -FALL_DOWN_MAX_X, FALL_DOWN_MAX_X, POSITION_STEP);
            match composer.compose_for_fall(rng, &trial, band, existing) {
                Ok(pair) => return Ok(pair),
                Err(e) if e.is_recoverable() => last = Some(e),
                Err(e) => return Err(e),
            }
        }
        Err(last.unwrap_or_else(|| SceneError::placement(&target.id, "second drop position", tries)))
    }

    // -----------------------------------------------------------------------
    // Background
    // -----------------------------------------------------------------------

    /// Furniture against the back wall. Pieces that do not fit are left out.
    fn background<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Vec<ObjectInstance>> {
        let count = weighted(rng, &BACKGROUND_OBJECTS);
        if count == 0 {
            return Ok(Vec::new());
        }
        let catalog = self.catalog;
        let candidates = catalog.background();
        let room = self.config.room;
        let area = Room::new(room.min_x, room.max_x, BACKGROUND_MIN_Z, room.max_z, room.height);
        let mut attempt = SceneAttempt::new(self.config, PerformerPose::default());
        let mut placed = Vec::with_capacity(count);
        for _ in 0..count {
            let definition = choose(rng, &candidates, "background")?;
            match attempt.place_and_commit(rng, definition, &[Predicate::InsideArea(area)]) {
                Ok(location) => {
                    let instance = self.instance(rng, definition, Role::Background, &location);
                    placed.push(instance);
                }
                Err(e) if e.is_recoverable() => {
                    debug!("skipping background {}: {}", definition.label(), e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(placed)
    }
}

//! Interactive scene pairs.
//!
//! Both scenes of a pair are plausible; they differ in one arrangement the
//! agent has to notice.
//!
//! - **immediately visible**: the target is in front of the performer in
//!   scene 1 and behind it in scene 2.
//! - **similar adjacent**: scene 2 adds a look-alike next to the target, or
//!   both share a receptacle.

use log::debug;
use rand::Rng;

use crate::catalog::{choose, pick_material, Catalog};
use crate::containment::{find_receptacle_for_pair, put_pair_in_receptacle};
use crate::error::{Result, SceneError};
use crate::ids::IdSource;
use crate::placement::{random_pose, GroupMember, Location, Predicate, SceneAttempt, MAX_POSE_REGENERATIONS};
use crate::protocol::{GoalMetadata, Manipulation, Plausibility, SceneSetKind, SceneVariant};
use crate::types::{GeneratorConfig, ObjectDefinition, ObjectInstance, PerformerPose, Role};

const MAX_DISTRACTORS: usize = 2;

fn place_instance<R: Rng + ?Sized>(
    rng: &mut R,
    ids: &mut IdSource,
    definition: &ObjectDefinition,
    role: Role,
    location: &Location,
) -> ObjectInstance {
    let prefix = match role {
        Role::Target => "target",
        Role::Confusor => "confusor",
        Role::Receptacle => "receptacle",
        _ => "distractor",
    };
    let mut instance = ObjectInstance::from_definition(
        ids.next(prefix),
        definition,
        role,
        location.position,
        location.rotation_y,
        Some(location.bounds),
    );
    instance.materials = pick_material(rng, definition);
    instance
}

fn variant(
    kind: SceneSetKind,
    config: &GeneratorConfig,
    pose: PerformerPose,
    objects: Vec<ObjectInstance>,
    target_id: &str,
    manipulation: Option<Manipulation>,
) -> SceneVariant {
    SceneVariant {
        name: String::new(),
        room: config.room,
        performer_start: pose,
        intuitive_physics: false,
        objects,
        goal: GoalMetadata {
            category: kind,
            setup: None,
            last_step: None,
            target_ids: vec![target_id.to_string()],
        },
        answer: Plausibility::Plausible,
        manipulation,
    }
}

// ---------------------------------------------------------------------------
// Immediately visible
// ---------------------------------------------------------------------------

pub fn immediately_visible<R: Rng + ?Sized>(
    rng: &mut R,
    catalog: &Catalog,
    config: &GeneratorConfig,
    ids: &mut IdSource,
) -> Result<Vec<SceneVariant>> {
    let pickupables = catalog.pickupables();
    let definition = choose(rng, &pickupables, "pickupable")?;
    let mut attempt = SceneAttempt::new(config, random_pose(rng, &config.room));

    // A pose regenerated while placing the back location invalidates the
    // front one, so both are redone against the new pose.
    let mut found = None;
    for _ in 0..=MAX_POSE_REGENERATIONS {
        let front = attempt.place_around_performer(rng, definition, Predicate::InFrontOfPerformer)?;
        let generation = attempt.pose_generation();
        let back = attempt.place_around_performer(rng, definition, Predicate::BehindPerformer)?;
        if attempt.pose_generation() == generation {
            found = Some((front, back));
            break;
        }
    }
    let (front, back) = found.ok_or_else(|| {
        SceneError::placement(
            definition.label(),
            "in front of and behind one pose",
            MAX_POSE_REGENERATIONS,
        )
    })?;
    attempt.commit(front.bounds);
    attempt.commit(back.bounds);

    let mut distractors = Vec::new();
    for _ in 0..rng.gen_range(0..=MAX_DISTRACTORS) {
        let distractor = choose(rng, &pickupables, "pickupable")?;
        let location = attempt.place_and_commit(
            rng,
            distractor,
            &[Predicate::NeverObstructs(vec![front.bounds])],
        )?;
        distractors.push(place_instance(rng, ids, distractor, Role::Distractor, &location));
    }

    let target = place_instance(rng, ids, definition, Role::Target, &front);
    let mut behind = target.clone();
    {
        let show = behind.first_show_mut();
        show.position = back.position;
        show.rotation.y = definition.rotation.y + back.rotation_y;
        show.bounds = Some(back.bounds);
    }
    let pose = *attempt.pose();
    let kind = SceneSetKind::ImmediatelyVisible;

    let mut first = vec![target.clone()];
    first.extend(distractors.iter().cloned());
    let mut second = vec![behind];
    second.extend(distractors);

    debug!(
        "{} at {} in front and {} behind the performer",
        target.id, front.position, back.position
    );
    Ok(vec![
        variant(kind, config, pose, first, &target.id, None),
        variant(
            kind,
            config,
            pose,
            second,
            &target.id,
            Some(Manipulation::MoveBehindPerformer),
        ),
    ])
}

// ---------------------------------------------------------------------------
// Similar adjacent
// ---------------------------------------------------------------------------

pub fn similar_adjacent<R: Rng + ?Sized>(
    rng: &mut R,
    catalog: &Catalog,
    config: &GeneratorConfig,
    ids: &mut IdSource,
) -> Result<Vec<SceneVariant>> {
    let candidates: Vec<&ObjectDefinition> = catalog
        .pickupables()
        .into_iter()
        .filter(|d| !catalog.similar_to(d).is_empty())
        .collect();
    let definition = choose(rng, &candidates, "target with a look-alike")?;
    let similar = choose(rng, &catalog.similar_to(definition), "look-alike")?;
    let mut attempt = SceneAttempt::new(config, random_pose(rng, &config.room));
    let contained = rng.gen_bool(config.containment_chance.clamp(0.0, 1.0));
    let kind = SceneSetKind::SimilarAdjacent;

    let (first, second, target_id) = if contained {
        let receptacles = catalog.receptacles();
        let (receptacle_def, fit) =
            find_receptacle_for_pair(receptacles, definition.dimensions, similar.dimensions)
                .ok_or_else(|| SceneError::ContainmentImpossible {
                    definition: format!("{} and {}", definition.label(), similar.label()),
                    receptacle: "any receptacle".to_string(),
                })?;
        let location =
            attempt.place_and_commit(rng, receptacle_def, &[Predicate::InFrontOfPerformer])?;
        let mut receptacle = place_instance(rng, ids, receptacle_def, Role::Receptacle, &location);
        let mut target = place_instance(rng, ids, definition, Role::Target, &location);
        let mut look_alike = place_instance(rng, ids, similar, Role::Confusor, &location);
        if !put_pair_in_receptacle(&mut receptacle, receptacle_def, [&mut target, &mut look_alike], &fit) {
            return Err(SceneError::ContainmentImpossible {
                definition: definition.label(),
                receptacle: receptacle_def.label(),
            });
        }
        // Scene 1 has the same receptacle holding the target alone.
        let mut alone = receptacle.clone();
        alone.children.retain(|id| *id != look_alike.id);
        let target_id = target.id.clone();
        (
            vec![alone, target.clone()],
            vec![receptacle, target, look_alike],
            target_id,
        )
    } else {
        let locations = attempt.place_group(
            rng,
            &[
                GroupMember::Free(definition, vec![Predicate::InFrontOfPerformer]),
                GroupMember::Beside {
                    definition: similar,
                    of: 0,
                    keep_visible: true,
                },
            ],
        )?;
        let target = place_instance(rng, ids, definition, Role::Target, &locations[0]);
        let look_alike = place_instance(rng, ids, similar, Role::Confusor, &locations[1]);
        let target_id = target.id.clone();
        (vec![target.clone()], vec![target, look_alike], target_id)
    };

    debug!(
        "{} next to a {} (contained: {})",
        definition.label(),
        similar.label(),
        contained
    );
    let pose = *attempt.pose();
    Ok(vec![
        variant(kind, config, pose, first, &target_id, None),
        variant(
            kind,
            config,
            pose,
            second,
            &target_id,
            Some(Manipulation::AddSimilarAdjacent { contained }),
        ),
    ])
}

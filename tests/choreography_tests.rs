//! Event transform tests

#[cfg(test)]
mod tests {
    use intphys_world::choreography::{
        appear_behind_occluder, disappear_behind_occluder, remove_target, shift_motion,
        swap_drop_position, swap_shape, teleport_backward, teleport_forward, EventFacts,
        TeleportMode,
    };
    use intphys_world::protocol::{
        GoalMetadata, Manipulation, MotionShift, Plausibility, SceneSetKind, SceneVariant,
        SetupKind, SwapMode,
    };
    use intphys_world::quartet::fit_delay_window;
    use intphys_world::trajectory::{FALL_DOWN_LAST_STEP, MOVE_ACROSS_LAST_STEP};
    use intphys_world::types::{
        ChosenMovement, ObjectDefinition, ObjectInstance, PerformerPose, Role, Room, StepVector,
        Vec3,
    };

    const PUSH_START: u32 = 20;

    fn make_positions(len: usize) -> Vec<f64> {
        (0..len).map(|i| 4.0 - 0.25 * i as f64).collect()
    }

    fn make_variant(objects: Vec<ObjectInstance>, setup: SetupKind, last_step: u32) -> SceneVariant {
        let target_ids = vec![objects[0].id.clone()];
        SceneVariant {
            name: String::new(),
            room: Room::default(),
            performer_start: PerformerPose::default(),
            intuitive_physics: true,
            objects,
            goal: GoalMetadata {
                category: SceneSetKind::ObjectPermanence,
                setup: Some(setup),
                last_step: Some(last_step),
                target_ids,
            },
            answer: Plausibility::Plausible,
            manipulation: None,
        }
    }

    fn make_mover(len: usize) -> (SceneVariant, EventFacts) {
        let definition = ObjectDefinition::boxed("cube", Vec3::new(0.25, 0.25, 0.25));
        let mut target = ObjectInstance::from_definition(
            "target_a".to_string(),
            &definition,
            Role::Target,
            Vec3::new(4.2, 0.125, 1.6),
            0.0,
            None,
        );
        let force = Vec3::new(-250.0, 0.0, 0.0);
        target.forces.push(StepVector {
            step_begin: PUSH_START,
            step_end: 54,
            vector: force,
        });
        let positions = make_positions(len);
        target.movement = Some(ChosenMovement {
            start_y: 0.0,
            force,
            position_by_step: positions.clone(),
            occluder_indices: vec![5, 15],
        });
        let xs = vec![positions[5] * 0.9, positions[15] * 0.9];
        let facts = EventFacts::for_mover(&target, xs, 0.9, MOVE_ACROSS_LAST_STEP).expect("moves");
        (make_variant(vec![target], SetupKind::MoveAcross, MOVE_ACROSS_LAST_STEP), facts)
    }

    fn make_drop() -> (SceneVariant, EventFacts) {
        let definition = ObjectDefinition::boxed("sphere", Vec3::new(0.5, 0.5, 0.5));
        let mut target = ObjectInstance::from_definition(
            "target_b".to_string(),
            &definition,
            Role::Target,
            Vec3::new(1.0, 3.8, 2.7),
            0.0,
            None,
        );
        target.first_show_mut().step_begin = 15;
        let facts = EventFacts::for_drop(&target, vec![0.8, -1.6], 0.8, FALL_DOWN_LAST_STEP);
        (make_variant(vec![target], SetupKind::FallDown, FALL_DOWN_LAST_STEP), facts)
    }

    fn make_replacement() -> ObjectInstance {
        let definition = ObjectDefinition::boxed("cylinder", Vec3::new(0.2, 0.3, 0.2));
        ObjectInstance::from_definition(
            "target_c".to_string(),
            &definition,
            Role::Target,
            Vec3::zero(),
            0.0,
            None,
        )
    }

    // -----------------------------------------------------------------------
    // Facts
    // -----------------------------------------------------------------------

    #[test]
    fn event_steps() {
        let (_, mover) = make_mover(30);
        assert_eq!(mover.step_begin, PUSH_START);
        assert_eq!(mover.event_step().expect("paired"), PUSH_START + 5);
        let (_, drop) = make_drop();
        assert_eq!(drop.event_step().expect("drop"), 15 + 7);
    }

    // -----------------------------------------------------------------------
    // Permanence
    // -----------------------------------------------------------------------

    #[test]
    fn disappear_hides_at_event_step_and_leaves_baseline() {
        let (baseline, facts) = make_mover(30);
        let variant = disappear_behind_occluder(&baseline, &facts).expect("applies");
        let target = variant.object("target_a").expect("still listed");
        assert_eq!(target.hides.len(), 1);
        assert_eq!(target.hides[0].step_begin, 25);
        assert_eq!(variant.answer, Plausibility::Implausible);
        assert_eq!(
            variant.manipulation,
            Some(Manipulation::DisappearBehindOccluder { step: 25 })
        );
        assert!(baseline.object("target_a").expect("baseline").hides.is_empty());
        assert!(baseline.is_baseline());
    }

    #[test]
    fn appear_starts_behind_occluder() {
        let (baseline, facts) = make_mover(30);
        let variant = appear_behind_occluder(&baseline, &facts).expect("applies");
        let show = variant.object("target_a").expect("listed").first_show().clone();
        assert_eq!(show.step_begin, 25);
        assert_eq!(show.position.x, make_positions(30)[5]);
    }

    #[test]
    fn appear_after_drop_starts_on_the_floor() {
        let (baseline, facts) = make_drop();
        let variant = appear_behind_occluder(&baseline, &facts).expect("applies");
        let show = variant.object("target_b").expect("listed").first_show().clone();
        assert_eq!(show.step_begin, 22);
        assert_eq!(show.position.y, 0.25);
    }

    #[test]
    fn removed_target_is_plausible() {
        let (baseline, facts) = make_mover(30);
        let variant = remove_target(&baseline, &facts).expect("applies");
        assert!(variant.objects.is_empty());
        assert!(variant.goal.target_ids.is_empty());
        assert_eq!(variant.answer, Plausibility::Plausible);
    }

    // -----------------------------------------------------------------------
    // Continuity
    // -----------------------------------------------------------------------

    #[test]
    fn instant_teleport_forward() {
        let (baseline, facts) = make_mover(30);
        let variant = teleport_forward(&baseline, &facts, TeleportMode::Instant).expect("applies");
        let target = variant.object("target_a").expect("listed");
        assert_eq!(target.teleports.len(), 1);
        assert_eq!(target.teleports[0].step_begin, 25);
        assert_eq!(target.teleports[0].position.x, make_positions(30)[15]);
    }

    #[test]
    fn delayed_teleport_hides_then_reappears() {
        let (baseline, facts) = make_mover(30);
        let variant = teleport_forward(&baseline, &facts, TeleportMode::Delayed).expect("applies");
        let target = variant.object("target_a").expect("listed");
        assert!(target.teleports.is_empty());
        assert_eq!(target.hides[0].step_begin, 25);
        assert_eq!(target.shows.len(), 2);
        assert_eq!(target.shows[1].step_begin, PUSH_START + 15 + 1);
        assert_eq!(
            variant.manipulation,
            Some(Manipulation::TeleportForward { step: 25, delayed: true })
        );
    }

    #[test]
    fn teleport_backward_returns_to_first_occluder() {
        let (baseline, facts) = make_mover(30);
        let variant = teleport_backward(&baseline, &facts).expect("applies");
        let teleport = variant.object("target_a").expect("listed").teleports[0];
        assert_eq!(teleport.step_begin, 35);
        assert_eq!(teleport.position.x, make_positions(30)[5]);
    }

    #[test]
    fn delayed_motion_shifts_push() {
        let (baseline, facts) = make_mover(30);
        let variant = shift_motion(&baseline, &facts, MotionShift::Delay).expect("fits");
        let target = variant.object("target_a").expect("listed");
        assert_eq!(target.forces[0].step_begin, PUSH_START + 10);
        assert_eq!(variant.answer, Plausibility::Plausible);
    }

    #[test]
    fn advanced_motion_starts_earlier() {
        let (baseline, facts) = make_mover(30);
        let variant = shift_motion(&baseline, &facts, MotionShift::Advance).expect("fits");
        let target = variant.object("target_a").expect("listed");
        assert_eq!(target.forces[0].step_begin, PUSH_START - 10);
        assert_eq!(
            variant.manipulation,
            Some(Manipulation::ShiftMotion {
                shift: MotionShift::Advance,
                steps: 10
            })
        );
    }

    #[test]
    fn delayed_motion_past_last_step_fails() {
        let (baseline, facts) = make_mover(35);
        assert!(shift_motion(&baseline, &facts, MotionShift::Delay).is_err());
    }

    #[test]
    fn delay_window_moves_push_earlier() {
        let (mut baseline, mut facts) = make_mover(25);
        fit_delay_window(&mut baseline, &mut facts).expect("room before");
        assert_eq!(facts.step_begin, 54 - 25 - 10);
        assert_eq!(
            baseline.object("target_a").expect("listed").forces[0].step_begin,
            facts.step_begin
        );
        assert!(shift_motion(&baseline, &facts, MotionShift::Delay).is_ok());
    }

    #[test]
    fn delay_window_never_passes_the_leader() {
        let (mut baseline, mut facts) = make_mover(25);
        facts.leader_step_begin = Some(20);
        assert!(fit_delay_window(&mut baseline, &mut facts).is_err());

        let (mut baseline, facts) = make_mover(25);
        let mut facts = facts.with_lane(Some(15), None);
        fit_delay_window(&mut baseline, &mut facts).expect("room after the leader");
        assert_eq!(facts.step_begin, 19);
    }

    #[test]
    fn delay_window_keeps_clear_of_the_trailer() {
        let (mut baseline, facts) = make_mover(25);
        let mut facts = facts.with_lane(None, Some(25));
        fit_delay_window(&mut baseline, &mut facts).expect("room before the trailer");
        assert_eq!(facts.step_begin, 15);
        let delayed = shift_motion(&baseline, &facts, MotionShift::Delay).expect("fits");
        let target = delayed.object("target_a").expect("listed");
        assert!(target.forces[0].step_begin <= 25);

        let (mut baseline, facts) = make_mover(25);
        let mut facts = facts.with_lane(None, Some(22));
        assert!(fit_delay_window(&mut baseline, &mut facts).is_err(), "22 - 10 is before the warm-up");
    }

    #[test]
    fn drop_position_swap_and_teleports() {
        let (baseline, facts) = make_drop();
        let moved = swap_drop_position(&baseline, &facts).expect("applies");
        assert_eq!(moved.object("target_b").expect("listed").position().x, -2.0);

        let forward = teleport_forward(&baseline, &facts, TeleportMode::Instant).expect("applies");
        let teleport = forward.object("target_b").expect("listed").teleports[0];
        assert_eq!(teleport.step_begin, 22);
        assert_eq!(teleport.position, Vec3::new(-2.0, 0.25, 2.7));

        assert!(shift_motion(&baseline, &facts, MotionShift::Delay).is_err());
    }

    // -----------------------------------------------------------------------
    // Shape constancy
    // -----------------------------------------------------------------------

    #[test]
    fn a_turns_into_b() {
        let (baseline, facts) = make_mover(30);
        let variant = swap_shape(&baseline, &facts, &make_replacement(), SwapMode::TurnAIntoB).expect("applies");
        let a = variant.object("target_a").expect("a");
        let b = variant.object("target_c").expect("b");
        assert_eq!(a.hides[0].step_begin, 25);
        assert_eq!(b.step_begin(), 25);
        assert_eq!(b.position().x, make_positions(30)[5]);
        assert_eq!(b.forces, a.forces);
        assert_eq!(variant.goal.target_ids, vec!["target_a".to_string(), "target_c".to_string()]);
    }

    #[test]
    fn b_turns_into_a() {
        let (baseline, facts) = make_mover(30);
        let variant = swap_shape(&baseline, &facts, &make_replacement(), SwapMode::TurnBIntoA).expect("applies");
        let a = variant.object("target_a").expect("a");
        let b = variant.object("target_c").expect("b");
        assert_eq!(b.hides[0].step_begin, 25);
        assert_eq!(b.step_begin(), 0);
        assert_eq!(a.step_begin(), 25);
    }

    #[test]
    fn b_replaces_a_is_plausible() {
        let (baseline, facts) = make_mover(30);
        let variant = swap_shape(&baseline, &facts, &make_replacement(), SwapMode::BReplacesA).expect("applies");
        assert!(variant.object("target_a").is_none());
        let b = variant.object("target_c").expect("b");
        assert_eq!(b.position().x, 4.2);
        assert_eq!(b.position().y, 0.15, "rests at its own height");
        assert_eq!(variant.goal.target_ids, vec!["target_c".to_string()]);
        assert_eq!(variant.answer, Plausibility::Plausible);
    }
}

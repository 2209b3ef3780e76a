//! Scene generator tests

#[cfg(test)]
mod tests {
    use intphys_world::catalog::Catalog;
    use intphys_world::error::SceneError;
    use intphys_world::protocol::{Manipulation, Plausibility, SceneSetKind, SetupKind};
    use intphys_world::types::{
        Attribute, GeneratorConfig, ObjectDefinition, ObjectInstance, Role, Vec3,
    };
    use std::sync::Arc;
    use intphys_world::{generate_batch, SceneGenerator};

    fn make_generator() -> SceneGenerator {
        SceneGenerator::with_builtin_catalog(GeneratorConfig::default()).expect("bundled catalog is valid")
    }

    // -----------------------------------------------------------------------
    // Catalog
    // -----------------------------------------------------------------------

    #[test]
    fn builtin_catalog_loads() {
        let catalog = Catalog::builtin().expect("valid");
        assert!(!catalog.movers().is_empty());
        assert!(!catalog.receptacles().is_empty());
        assert!(!catalog.background().is_empty());
        assert!(catalog
            .movers()
            .into_iter()
            .any(|m| !catalog.shape_partners(m).is_empty()));
        assert!(catalog
            .pickupables()
            .into_iter()
            .any(|p| !catalog.similar_to(p).is_empty()));
    }

    #[test]
    fn invalid_catalog_is_rejected() {
        let json = r#"{"definitions":[{"shape":"cube","size":"tiny","mass":1.0,
            "dimensions":{"x":0.0,"y":0.1,"z":0.1}}]}"#;
        assert!(matches!(Catalog::from_json_str(json), Err(SceneError::Catalog(_))));
        assert!(Catalog::from_json_str("{").is_err());
    }

    // -----------------------------------------------------------------------
    // Quartets
    // -----------------------------------------------------------------------

    #[test]
    fn quartets_have_one_baseline_and_expected_answers() {
        let generator = make_generator();
        for kind in [
            SceneSetKind::ObjectPermanence,
            SceneSetKind::SpatioTemporalContinuity,
            SceneSetKind::ShapeConstancy,
        ] {
            for seed in 0..4 {
                let set = generator.generate(kind, seed).expect("set builds");
                assert_eq!(set.variants.len(), 4, "{} seed {}", kind, seed);
                assert_eq!(set.variants.iter().filter(|v| v.is_baseline()).count(), 1);
                assert!(set.variants[0].is_baseline());
                let answers: Vec<Plausibility> = set.variants.iter().map(|v| v.answer).collect();
                assert_eq!(
                    answers,
                    vec![
                        Plausibility::Plausible,
                        Plausibility::Implausible,
                        Plausibility::Implausible,
                        Plausibility::Plausible
                    ]
                );
                assert!(set.variants.iter().all(|v| v.intuitive_physics));
                assert_eq!(set.variants[0].name, format!("{}-{:04}-1", kind, seed));
            }
        }
    }

    #[test]
    fn variant_names_pad_the_seed() {
        let generator = make_generator();
        let small = generator
            .generate(SceneSetKind::ObjectPermanence, 7)
            .expect("set builds");
        let names: Vec<&str> = small.variants.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "object-permanence-0007-1",
                "object-permanence-0007-2",
                "object-permanence-0007-3",
                "object-permanence-0007-4"
            ]
        );
        let wide = generator
            .generate(SceneSetKind::ImmediatelyVisible, 12345)
            .expect("pair builds");
        assert_eq!(wide.variants[1].name, "immediately-visible-12345-2");
    }

    #[test]
    fn permanence_hides_the_target() {
        let generator = make_generator();
        let set = generator
            .generate(SceneSetKind::ObjectPermanence, 11)
            .expect("set builds");
        let target_id = set.variants[0].goal.target_ids[0].clone();
        let disappear = &set.variants[1];
        assert!(matches!(
            disappear.manipulation,
            Some(Manipulation::DisappearBehindOccluder { .. })
        ));
        assert_eq!(disappear.object(&target_id).expect("target").hides.len(), 1);
        assert!(set.variants[3].object(&target_id).is_none());
        assert!(set.variants[0]
            .objects
            .iter()
            .any(|o| o.role == Role::Occluder && o.structure));
    }

    #[test]
    fn continuity_trailers_never_start_before_their_leaders() {
        let generator = make_generator();
        let mut lanes_checked = 0;
        for seed in 0..150 {
            let set = generator
                .generate(SceneSetKind::SpatioTemporalContinuity, seed)
                .expect("set builds");
            if set.variants[0].goal.setup != Some(SetupKind::MoveAcross) {
                continue;
            }
            for variant in &set.variants {
                let movers: Vec<&ObjectInstance> = variant
                    .objects
                    .iter()
                    .filter(|o| o.movement.is_some() && !o.forces.is_empty())
                    .collect();
                for (i, a) in movers.iter().enumerate() {
                    for b in &movers[i + 1..] {
                        let (pa, pb) = (a.position(), b.position());
                        if pa.z != pb.z || pa.x.signum() != pb.x.signum() {
                            continue;
                        }
                        let (leader, trailer) = if pa.x.abs() < pb.x.abs() { (a, b) } else { (b, a) };
                        lanes_checked += 1;
                        assert!(
                            trailer.forces[0].step_begin >= leader.forces[0].step_begin,
                            "{} seed {}: trailer {} starts {} before leader {} at {}",
                            variant.name,
                            seed,
                            trailer.id,
                            trailer.forces[0].step_begin,
                            leader.id,
                            leader.forces[0].step_begin
                        );
                    }
                }
            }
        }
        assert!(lanes_checked > 0, "no shared lanes generated");
    }

    #[test]
    fn same_seed_same_json() {
        let a = make_generator()
            .generate(SceneSetKind::SpatioTemporalContinuity, 42)
            .expect("builds");
        let b = make_generator()
            .generate(SceneSetKind::SpatioTemporalContinuity, 42)
            .expect("builds");
        assert_eq!(
            serde_json::to_string(&a).expect("serializes"),
            serde_json::to_string(&b).expect("serializes")
        );
    }

    // -----------------------------------------------------------------------
    // Pairs
    // -----------------------------------------------------------------------

    #[test]
    fn immediately_visible_moves_target_behind() {
        let generator = make_generator();
        for seed in 0..4 {
            let set = generator
                .generate(SceneSetKind::ImmediatelyVisible, seed)
                .expect("pair builds");
            assert_eq!(set.variants.len(), 2);
            let [first, second] = [&set.variants[0], &set.variants[1]];
            assert!(first.is_baseline());
            assert_eq!(second.manipulation, Some(Manipulation::MoveBehindPerformer));
            assert_eq!(first.performer_start, second.performer_start);
            let id = &first.goal.target_ids[0];
            let pose = first.performer_start;
            let forward = pose.forward();
            let ahead = |x: f64, z: f64| {
                (x - pose.position.x) * forward.x + (z - pose.position.z) * forward.z
            };
            let front = first.object(id).expect("target").position();
            let back = second.object(id).expect("target").position();
            assert!(ahead(front.x, front.z) > 1.2);
            assert!(ahead(back.x, back.z) < 0.0);
            assert!(first.goal.last_step.is_none());
        }
    }

    #[test]
    fn similar_adjacent_adds_a_look_alike() {
        let generator = make_generator();
        for seed in 0..6 {
            let set = generator
                .generate(SceneSetKind::SimilarAdjacent, seed)
                .expect("pair builds");
            let [first, second] = [&set.variants[0], &set.variants[1]];
            let confusors = |objects: &[intphys_world::ObjectInstance]| {
                objects.iter().filter(|o| o.role == Role::Confusor).count()
            };
            assert_eq!(confusors(&first.objects), 0);
            assert_eq!(confusors(&second.objects), 1);
            if let Some(Manipulation::AddSimilarAdjacent { contained: true }) = second.manipulation {
                let receptacle = second
                    .objects
                    .iter()
                    .find(|o| o.role == Role::Receptacle)
                    .expect("container present");
                assert_eq!(receptacle.children.len(), 2);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Statistics and failure
    // -----------------------------------------------------------------------

    #[test]
    fn stats_count_built_sets() {
        let generator = make_generator();
        generator
            .generate(SceneSetKind::ObjectPermanence, 3)
            .expect("builds");
        generator
            .generate(SceneSetKind::SimilarAdjacent, 3)
            .expect("builds");
        let stats = generator.stats();
        assert_eq!(stats.sets_built, 2);
        assert_eq!(stats.variants_emitted, 6);
        assert!(stats.attempts >= 2);
    }

    #[test]
    fn batch_reports_every_seed_of_a_panicked_worker() {
        let generator = make_generator();
        let seeds: Vec<u64> = (10..17).collect();
        let results = generate_batch(&seeds, 3, |seed| {
            if seed == 13 {
                panic!("worker blew up on {}", seed);
            }
            generator.generate(SceneSetKind::ObjectPermanence, seed)
        });
        let returned: Vec<u64> = results.iter().map(|(seed, _)| *seed).collect();
        assert_eq!(returned, seeds);
        // Seeds are dealt round-robin, so 13 shares a worker with 10 and 16.
        for (seed, result) in &results {
            match seed {
                10 | 13 | 16 => assert!(
                    matches!(result, Err(SceneError::WorkerPanicked { seed: s }) if s == seed),
                    "seed {} should be reported lost",
                    seed
                ),
                _ => assert!(result.is_ok(), "seed {} should build", seed),
            }
        }
    }

    #[test]
    fn oversized_catalog_aborts() {
        let mut giant = ObjectDefinition::boxed("wardrobe", Vec3::new(30.0, 1.0, 30.0));
        giant.attributes.push(Attribute::Pickupable);
        let catalog = Catalog::from_definitions(vec![giant]).expect("valid definitions");
        let mut config = GeneratorConfig::default();
        config.max_attempts = 3;
        let generator = SceneGenerator::new(config, Arc::new(catalog));
        match generator.generate(SceneSetKind::ImmediatelyVisible, 1) {
            Err(SceneError::ConstructionAborted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert!(last.is_recoverable());
            }
            other => panic!("expected ConstructionAborted, got {:?}", other.map(|s| s.kind)),
        }
        let stats = generator.stats();
        assert_eq!(stats.aborted, 1);
        assert_eq!(stats.placement_failures, 3);
    }
}

//! Containment fitter tests

#[cfg(test)]
mod tests {
    use intphys_world::containment::{
        can_enclose, find_receptacle_for_pair, fit_pair, fit_single, how_can_contain,
        put_in_receptacle, put_pair_in_receptacle, Arrangement, Axis,
    };
    use intphys_world::types::{Cavity, ObjectDefinition, ObjectInstance, Role, Vec3};

    fn make_receptacle(cavity: Vec3) -> ObjectDefinition {
        let mut definition = ObjectDefinition::boxed("box", Vec3::new(cavity.x + 0.1, cavity.y + 0.1, cavity.z + 0.1));
        definition.cavities.push(Cavity {
            position: Vec3::new(0.0, 0.1, 0.0),
            dimensions: cavity,
        });
        definition
    }

    fn make_instance(id: &str, definition: &ObjectDefinition) -> ObjectInstance {
        ObjectInstance::from_definition(
            id.to_string(),
            definition,
            Role::Target,
            Vec3::new(1.0, definition.position_y, 1.0),
            0.0,
            None,
        )
    }

    // -----------------------------------------------------------------------
    // Single objects
    // -----------------------------------------------------------------------

    #[test]
    fn enclose_prefers_no_rotation() {
        let cavity = Cavity {
            position: Vec3::zero(),
            dimensions: Vec3::new(0.3, 0.2, 0.3),
        };
        assert_eq!(can_enclose(&cavity, Vec3::new(0.2, 0.1, 0.2)), Some(0.0));
    }

    #[test]
    fn enclose_rotates_long_objects() {
        let cavity = Cavity {
            position: Vec3::zero(),
            dimensions: Vec3::new(0.2, 0.1, 0.5),
        };
        assert_eq!(can_enclose(&cavity, Vec3::new(0.4, 0.1, 0.1)), Some(90.0));
    }

    #[test]
    fn too_large_or_too_tall_does_not_fit() {
        let receptacle = make_receptacle(Vec3::new(0.25, 0.15, 0.45));
        assert!(fit_single(&receptacle, Vec3::new(0.6, 0.1, 0.1)).is_none());
        assert!(fit_single(&receptacle, Vec3::new(0.1, 0.2, 0.1)).is_none());
        assert!(how_can_contain(&receptacle, &[Vec3::new(0.1, 0.1, 0.1), Vec3::new(0.5, 0.1, 0.5)]).is_none());
    }

    // -----------------------------------------------------------------------
    // Pairs
    // -----------------------------------------------------------------------

    #[test]
    fn pair_side_by_side_along_long_axis() {
        let receptacle = make_receptacle(Vec3::new(0.25, 0.15, 0.45));
        let target = Vec3::new(0.1, 0.1, 0.1);
        let confusor = Vec3::new(0.2, 0.1, 0.2);
        let fit = fit_pair(&receptacle, target, confusor).expect("both fit");
        assert_eq!(fit.cavity_index, 0);
        assert_eq!(fit.arrangement, Arrangement::SideBySide { axis: Axis::Z });

        let [a, b] = fit.slots;
        let (a_lo, a_hi) = (a.offset.z - target.z / 2.0, a.offset.z + target.z / 2.0);
        let (b_lo, b_hi) = (b.offset.z - confusor.z / 2.0, b.offset.z + confusor.z / 2.0);
        assert!(a_hi <= b_lo || b_hi <= a_lo, "slots overlap: {:?} {:?}", a, b);
        assert!(a_lo >= -0.225 - 1e-9 && b_hi <= 0.225 + 1e-9, "slots leave the cavity");
    }

    #[test]
    fn pair_stacks_when_floor_is_small() {
        let receptacle = make_receptacle(Vec3::new(0.2, 0.3, 0.2));
        let a = Vec3::new(0.15, 0.1, 0.15);
        let fit = fit_pair(&receptacle, a, a).expect("stacked fit");
        assert_eq!(fit.arrangement, Arrangement::Stacked);
        assert_eq!(fit.slots[1].lift, 0.1);
    }

    #[test]
    fn pair_that_never_fits() {
        let receptacle = make_receptacle(Vec3::new(0.2, 0.15, 0.2));
        let a = Vec3::new(0.15, 0.1, 0.15);
        assert!(fit_pair(&receptacle, a, a).is_none());
    }

    #[test]
    fn first_receptacle_that_fits_wins() {
        let small = make_receptacle(Vec3::new(0.1, 0.1, 0.1));
        let large = make_receptacle(Vec3::new(0.25, 0.15, 0.45));
        let (chosen, _) = find_receptacle_for_pair(
            [&small, &large],
            Vec3::new(0.1, 0.1, 0.1),
            Vec3::new(0.2, 0.1, 0.2),
        )
        .expect("large one fits");
        assert_eq!(chosen.dimensions, large.dimensions);
    }

    // -----------------------------------------------------------------------
    // Re-parenting
    // -----------------------------------------------------------------------

    #[test]
    fn put_pair_reparents_both() {
        let receptacle_def = make_receptacle(Vec3::new(0.25, 0.15, 0.45));
        let a_def = ObjectDefinition::boxed("cube", Vec3::new(0.1, 0.1, 0.1));
        let b_def = ObjectDefinition::boxed("sphere", Vec3::new(0.2, 0.1, 0.2));
        let fit = fit_pair(&receptacle_def, a_def.dimensions, b_def.dimensions).expect("fits");

        let mut receptacle = make_instance("box_1", &receptacle_def);
        let mut a = make_instance("cube_1", &a_def);
        let mut b = make_instance("sphere_1", &b_def);
        assert!(put_pair_in_receptacle(&mut receptacle, &receptacle_def, [&mut a, &mut b], &fit));

        assert_eq!(receptacle.children, vec!["cube_1".to_string(), "sphere_1".to_string()]);
        assert_eq!(a.parent.as_deref(), Some("box_1"));
        assert!(a.bounds().is_none(), "contained objects have no world footprint");
        // Cavity floor at 0.1 - 0.075, plus the cube's resting height.
        assert!((a.position().y - (0.025 + 0.05)).abs() < 1e-9, "y = {}", a.position().y);
        assert_eq!(a.position().z, fit.slots[0].offset.z);
    }

    #[test]
    fn single_object_sits_on_cavity_floor() {
        let receptacle_def = make_receptacle(Vec3::new(0.25, 0.15, 0.45));
        let toy_def = ObjectDefinition::boxed("cube", Vec3::new(0.1, 0.1, 0.1));
        let fit = fit_single(&receptacle_def, toy_def.dimensions).expect("fits");
        assert_eq!(fit.cavity_index, 0);

        let mut receptacle = make_instance("box_2", &receptacle_def);
        let mut toy = make_instance("cube_2", &toy_def);
        put_in_receptacle(&mut receptacle, &mut toy, &receptacle_def.cavities[0], &fit.slot);
        assert_eq!(receptacle.children, vec!["cube_2".to_string()]);
        assert_eq!(toy.parent.as_deref(), Some("box_2"));
        assert!((toy.position().y - 0.075).abs() < 1e-9);
        assert_eq!(toy.position().x, 0.0);
    }
}

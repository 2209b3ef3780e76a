//! Receptacle fitting.
//!
//! Every query here is pure and answers with `Option`: a missing fit is an
//! ordinary outcome the caller reacts to by trying another receptacle. Moving
//! and re-parenting the winners is done separately by [`put_in_receptacle`].

use serde::{Deserialize, Serialize};

use crate::types::{Cavity, ObjectDefinition, ObjectInstance, Point, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    Z,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arrangement {
    SideBySide { axis: Axis },
    Stacked,
}

/// Where one object goes inside a cavity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub rotation_y: f64,
    /// Horizontal offset from the cavity center.
    pub offset: Point,
    /// Height above the cavity floor.
    pub lift: f64,
}

impl Slot {
    fn centered(rotation_y: f64) -> Self {
        Self {
            rotation_y,
            offset: Point::default(),
            lift: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SingleFit {
    pub cavity_index: usize,
    pub slot: Slot,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairFit {
    pub cavity_index: usize,
    pub arrangement: Arrangement,
    pub slots: [Slot; 2],
}

// ---------------------------------------------------------------------------
// Single objects
// ---------------------------------------------------------------------------

/// Footprint `(x, z)` of `dimensions` turned by `rotation_y` (0 or 90).
fn turned(dimensions: Vec3, rotation_y: f64) -> (f64, f64) {
    if rotation_y == 0.0 {
        (dimensions.x, dimensions.z)
    } else {
        (dimensions.z, dimensions.x)
    }
}

/// The rotation (0 or 90) at which `dimensions` fits in `cavity`.
pub fn can_enclose(cavity: &Cavity, dimensions: Vec3) -> Option<f64> {
    if dimensions.y > cavity.dimensions.y {
        return None;
    }
    [0.0, 90.0].into_iter().find(|&rotation| {
        let (x, z) = turned(dimensions, rotation);
        x <= cavity.dimensions.x && z <= cavity.dimensions.z
    })
}

/// First cavity of `receptacle` that holds every one of `objects` on its own.
pub fn how_can_contain(receptacle: &ObjectDefinition, objects: &[Vec3]) -> Option<(usize, Vec<f64>)> {
    receptacle
        .cavities
        .iter()
        .enumerate()
        .find_map(|(index, cavity)| {
            let rotations: Option<Vec<f64>> =
                objects.iter().map(|dims| can_enclose(cavity, *dims)).collect();
            rotations.map(|r| (index, r))
        })
}

pub fn fit_single(receptacle: &ObjectDefinition, dimensions: Vec3) -> Option<SingleFit> {
    how_can_contain(receptacle, &[dimensions]).map(|(cavity_index, rotations)| SingleFit {
        cavity_index,
        slot: Slot::centered(rotations[0]),
    })
}

// ---------------------------------------------------------------------------
// Pairs
// ---------------------------------------------------------------------------

const ROTATION_PAIRS: [(f64, f64); 4] = [(0.0, 0.0), (0.0, 90.0), (90.0, 0.0), (90.0, 90.0)];

fn side_by_side(cavity: &Cavity, a: Vec3, b: Vec3, axis: Axis) -> Option<[Slot; 2]> {
    if a.y > cavity.dimensions.y || b.y > cavity.dimensions.y {
        return None;
    }
    let (along, across) = match axis {
        Axis::X => (cavity.dimensions.x, cavity.dimensions.z),
        Axis::Z => (cavity.dimensions.z, cavity.dimensions.x),
    };
    ROTATION_PAIRS.into_iter().find_map(|(ra, rb)| {
        let (ax, az) = turned(a, ra);
        let (bx, bz) = turned(b, rb);
        let ((a_along, a_across), (b_along, b_across)) = match axis {
            Axis::X => ((ax, az), (bx, bz)),
            Axis::Z => ((az, ax), (bz, bx)),
        };
        if a_along + b_along > along || a_across.max(b_across) > across {
            return None;
        }
        // Split the slack evenly between the walls and the gap.
        let slack = (along - a_along - b_along) / 3.0;
        let a_center = -along / 2.0 + slack + a_along / 2.0;
        let b_center = along / 2.0 - slack - b_along / 2.0;
        let offset = |d: f64| match axis {
            Axis::X => Point::new(d, 0.0),
            Axis::Z => Point::new(0.0, d),
        };
        Some([
            Slot {
                rotation_y: ra,
                offset: offset(a_center),
                lift: 0.0,
            },
            Slot {
                rotation_y: rb,
                offset: offset(b_center),
                lift: 0.0,
            },
        ])
    })
}

fn stacked(cavity: &Cavity, a: Vec3, b: Vec3) -> Option<[Slot; 2]> {
    if a.y + b.y > cavity.dimensions.y {
        return None;
    }
    let flat = |d: Vec3| Vec3::new(d.x, 0.0, d.z);
    let ra = can_enclose(cavity, flat(a))?;
    let rb = can_enclose(cavity, flat(b))?;
    Some([
        Slot::centered(ra),
        Slot {
            rotation_y: rb,
            offset: Point::default(),
            lift: a.y,
        },
    ])
}

/// Whether `a` and `b` fit together in one cavity of `receptacle`.
///
/// Side-by-side along the cavity's longer axis is preferred, then along its
/// shorter axis, then stacked.
pub fn fit_pair(receptacle: &ObjectDefinition, a: Vec3, b: Vec3) -> Option<PairFit> {
    receptacle
        .cavities
        .iter()
        .enumerate()
        .find_map(|(cavity_index, cavity)| {
            let (long, short) = if cavity.dimensions.z > cavity.dimensions.x {
                (Axis::Z, Axis::X)
            } else {
                (Axis::X, Axis::Z)
            };
            let candidates = [
                (Arrangement::SideBySide { axis: long }, side_by_side(cavity, a, b, long)),
                (Arrangement::SideBySide { axis: short }, side_by_side(cavity, a, b, short)),
                (Arrangement::Stacked, stacked(cavity, a, b)),
            ];
            candidates
                .into_iter()
                .find_map(|(arrangement, slots)| {
                    slots.map(|slots| PairFit {
                        cavity_index,
                        arrangement,
                        slots,
                    })
                })
        })
}

/// First receptacle among `candidates` that holds both objects.
pub fn find_receptacle_for_pair<'a, I>(candidates: I, a: Vec3, b: Vec3) -> Option<(&'a ObjectDefinition, PairFit)>
where
    I: IntoIterator<Item = &'a ObjectDefinition>,
{
    candidates
        .into_iter()
        .find_map(|r| fit_pair(r, a, b).map(|fit| (r, fit)))
}

// ---------------------------------------------------------------------------
// Re-parenting
// ---------------------------------------------------------------------------

/// Move `child` into `cavity` of `receptacle`. The child's position becomes
/// local to the receptacle and its world footprint is dropped.
pub fn put_in_receptacle(
    receptacle: &mut ObjectInstance,
    child: &mut ObjectInstance,
    cavity: &Cavity,
    slot: &Slot,
) {
    let resting_y = child.resting_y;
    let show = child.first_show_mut();
    show.position = Vec3::new(
        cavity.position.x + slot.offset.x,
        cavity.position.y - cavity.dimensions.y / 2.0 + slot.lift + resting_y,
        cavity.position.z + slot.offset.z,
    );
    show.rotation.y = slot.rotation_y;
    show.bounds = None;
    child.parent = Some(receptacle.id.clone());
    receptacle.children.push(child.id.clone());
}

/// Put both objects of a [`PairFit`] into their slots.
pub fn put_pair_in_receptacle(
    receptacle: &mut ObjectInstance,
    definition: &ObjectDefinition,
    pair: [&mut ObjectInstance; 2],
    fit: &PairFit,
) -> bool {
    let Some(cavity) = definition.cavities.get(fit.cavity_index) else {
        return false;
    };
    let [a, b] = pair;
    put_in_receptacle(receptacle, a, cavity, &fit.slots[0]);
    put_in_receptacle(receptacle, b, cavity, &fit.slots[1]);
    true
}

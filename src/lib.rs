//! IntPhys World
//!
//! Procedural scene construction and intuitive-physics event sets for
//! evaluating embodied agents.
//!
//! ## Architecture
//!
//! ```text
//! SceneGenerator  (generator.rs)          ← retry loop, statistics
//!   ├── LayoutBuilder  (intphys.rs)       ← move-across / fall-down baselines
//!   │     ├── trajectory.rs               ← screen positions, push tables
//!   │     └── OccluderComposer (occluder.rs)
//!   ├── build_quartet  (quartet.rs)
//!   │     └── choreography.rs             ← pure Variant → Variant events
//!   └── pairs.rs                          ← interactive scene pairs
//!         ├── SceneAttempt (placement.rs) ← pose + bounds of one attempt
//!         └── containment.rs
//! geometry.rs  catalog.rs  protocol.rs  types.rs  error.rs  ids.rs
//! ```
//!
//! The library does no I/O. Scene documents in [`protocol`] are plain
//! serde data; writing them out is up to the caller.

pub mod catalog;
pub mod choreography;
pub mod containment;
pub mod error;
pub mod generator;
pub mod geometry;
pub mod ids;
pub mod intphys;
pub mod occluder;
pub mod pairs;
pub mod placement;
pub mod protocol;
pub mod quartet;
pub mod trajectory;
pub mod types;

// Convenience re-exports
pub use catalog::Catalog;
pub use error::{Result, SceneError};
pub use generator::{generate_batch, SceneGenerator};
pub use placement::{GroupMember, Location, PlacementSolver, Predicate, SceneAttempt};
pub use protocol::{Manipulation, Plausibility, SceneSet, SceneSetKind, SceneVariant, SetupKind};
pub use types::{
    GeneratorConfig, GeneratorStats, ObjectDefinition, ObjectInstance, PerformerPose, Point, Room,
    Vec3,
};

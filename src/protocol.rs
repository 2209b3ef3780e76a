//! Scene documents.
//!
//! This module owns **every type handed to the external scene writer**. The
//! writer turns a [`SceneVariant`] into the simulation host's own document
//! format; nothing here knows that format.
//!
//! ## Set shapes
//!
//! | Kind                          | Variants | Plausible        |
//! |-------------------------------|----------|------------------|
//! | `object_permanence`           | 4        | 1 and 4          |
//! | `spatio_temporal_continuity`  | 4        | 1 and 4          |
//! | `shape_constancy`             | 4        | 1 and 4          |
//! | `immediately_visible`         | 2        | both             |
//! | `similar_adjacent`            | 2        | both             |
//!
//! ## Design rules
//!
//! 1. Every struct is `Serialize + Deserialize` with snake_case JSON.
//! 2. Variant 1 of every set is the baseline: `manipulation` is `None`.
//! 3. Siblings never share data; each variant is a full copy.
//! 4. Numbers are already rounded when they get here; the writer copies them.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{ObjectInstance, PerformerPose, Room};

// ---------------------------------------------------------------------------
// Set kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneSetKind {
    ObjectPermanence,
    SpatioTemporalContinuity,
    ShapeConstancy,
    ImmediatelyVisible,
    SimilarAdjacent,
}

impl SceneSetKind {
    pub const ALL: [SceneSetKind; 5] = [
        SceneSetKind::ObjectPermanence,
        SceneSetKind::SpatioTemporalContinuity,
        SceneSetKind::ShapeConstancy,
        SceneSetKind::ImmediatelyVisible,
        SceneSetKind::SimilarAdjacent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SceneSetKind::ObjectPermanence => "object-permanence",
            SceneSetKind::SpatioTemporalContinuity => "spatio-temporal-continuity",
            SceneSetKind::ShapeConstancy => "shape-constancy",
            SceneSetKind::ImmediatelyVisible => "immediately-visible",
            SceneSetKind::SimilarAdjacent => "similar-adjacent",
        }
    }

    pub fn is_intuitive_physics(self) -> bool {
        matches!(
            self,
            SceneSetKind::ObjectPermanence
                | SceneSetKind::SpatioTemporalContinuity
                | SceneSetKind::ShapeConstancy
        )
    }
}

impl std::fmt::Display for SceneSetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SceneSetKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        let normalized = normalized.strip_suffix("-pair").unwrap_or(&normalized);
        SceneSetKind::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| format!("unknown scene set kind '{}'", s))
    }
}

/// How the intuitive-physics objects enter the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupKind {
    MoveAcross,
    FallDown,
}

// ---------------------------------------------------------------------------
// Manipulations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plausibility {
    Plausible,
    Implausible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionShift {
    Delay,
    Advance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapMode {
    /// A hides at the event step and B appears in its place.
    TurnAIntoB,
    /// B starts the scene and A takes over at the event step.
    TurnBIntoA,
    /// B is used for the whole scene.
    BReplacesA,
}

/// The single change separating a variant from its baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Manipulation {
    DisappearBehindOccluder { step: u32 },
    AppearBehindOccluder { step: u32 },
    TeleportForward { step: u32, delayed: bool },
    TeleportBackward { step: u32 },
    ShiftMotion { shift: MotionShift, steps: u32 },
    SwapDropPosition,
    ShapeSwap { mode: SwapMode, step: u32 },
    RemoveTarget,
    MoveBehindPerformer,
    AddSimilarAdjacent { contained: bool },
}

// ---------------------------------------------------------------------------
// Variant
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalMetadata {
    pub category: SceneSetKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup: Option<SetupKind>,
    /// Unset for interactive scenes, which run until the agent ends them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_step: Option<u32>,
    pub target_ids: Vec<String>,
}

/// One member of a generated set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneVariant {
    pub name: String,
    pub room: Room,
    pub performer_start: PerformerPose,
    pub intuitive_physics: bool,
    pub objects: Vec<ObjectInstance>,
    pub goal: GoalMetadata,
    pub answer: Plausibility,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manipulation: Option<Manipulation>,
}

impl SceneVariant {
    /// Structural copy to derive a sibling from.
    pub fn snapshot(&self) -> SceneVariant {
        self.clone()
    }

    pub fn object(&self, id: &str) -> Option<&ObjectInstance> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn object_mut(&mut self, id: &str) -> Option<&mut ObjectInstance> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    pub fn is_baseline(&self) -> bool {
        self.manipulation.is_none()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A finished set as written out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSet {
    pub kind: SceneSetKind,
    pub seed: u64,
    pub variants: Vec<SceneVariant>,
}

impl SceneSet {
    pub fn baseline(&self) -> Option<&SceneVariant> {
        self.variants.first()
    }

    /// Name each variant `<kind>-<seed>-<n>`, counting from 1. The seed is
    /// zero-padded to at least four digits.
    pub fn assign_names(&mut self) {
        let (kind, seed) = (self.kind, self.seed);
        for (i, v) in self.variants.iter_mut().enumerate() {
            v.name = format!("{}-{:04}-{}", kind, seed, i + 1);
        }
    }
}

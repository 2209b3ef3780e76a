//! Scene construction errors.
//!
//! Placement, containment, occluder and event failures are recoverable: the
//! generator discards the whole attempt and starts over. Only
//! [`SceneError::ConstructionAborted`] and catalog problems reach the caller.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SceneError>;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("no valid location for {definition} ({constraint}) after {tries} tries")]
    PlacementExhausted {
        definition: String,
        constraint: String,
        tries: u32,
    },

    #[error("{definition} does not fit in {receptacle}")]
    ContainmentImpossible {
        definition: String,
        receptacle: String,
    },

    #[error("occluder at x={x:.2} scale={scale:.2} overlaps {conflicting}")]
    OccluderConflict {
        x: f64,
        scale: f64,
        conflicting: String,
    },

    #[error("cannot apply {event}: {reason}")]
    EventUnsatisfiable { event: String, reason: String },

    #[error("construction aborted after {attempts} attempts: {last}")]
    ConstructionAborted {
        attempts: u32,
        #[source]
        last: Box<SceneError>,
    },

    #[error("worker building seed {seed} panicked")]
    WorkerPanicked { seed: u64 },

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SceneError {
    pub fn placement(definition: impl Into<String>, constraint: impl Into<String>, tries: u32) -> Self {
        SceneError::PlacementExhausted {
            definition: definition.into(),
            constraint: constraint.into(),
            tries,
        }
    }

    pub fn event(event: impl Into<String>, reason: impl Into<String>) -> Self {
        SceneError::EventUnsatisfiable {
            event: event.into(),
            reason: reason.into(),
        }
    }

    /// Whether the generator may discard the attempt and retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SceneError::PlacementExhausted { .. }
                | SceneError::ContainmentImpossible { .. }
                | SceneError::OccluderConflict { .. }
                | SceneError::EventUnsatisfiable { .. }
        )
    }
}

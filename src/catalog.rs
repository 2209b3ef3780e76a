//! Object definition catalog.
//!
//! The catalog is read once and never changes. Build attempts borrow it;
//! parallel generators share one `Arc<Catalog>`.

use std::sync::Arc;

use log::info;
use once_cell::sync::Lazy;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SceneError};
use crate::types::{Attribute, ObjectDefinition};

/// Largest X difference between look-alike definitions.
pub const MAX_SIZE_DIFFERENCE: f64 = 0.1;

static BUILTIN_JSON: &str = include_str!("../data/catalog.json");

static BUILTIN: Lazy<std::result::Result<Arc<Catalog>, String>> = Lazy::new(|| {
    Catalog::from_json_str(BUILTIN_JSON)
        .map(Arc::new)
        .map_err(|e| e.to_string())
});

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    definitions: Vec<ObjectDefinition>,
}

impl Catalog {
    /// Parse and validate a catalog document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let catalog: Catalog = serde_json::from_str(json)?;
        catalog.validate()?;
        info!("loaded catalog with {} definitions", catalog.definitions.len());
        Ok(catalog)
    }

    pub fn from_definitions(definitions: Vec<ObjectDefinition>) -> Result<Self> {
        let catalog = Catalog { definitions };
        catalog.validate()?;
        Ok(catalog)
    }

    /// The catalog bundled with the crate.
    pub fn builtin() -> Result<Arc<Catalog>> {
        (*BUILTIN).clone().map_err(SceneError::Catalog)
    }

    fn validate(&self) -> Result<()> {
        if self.definitions.is_empty() {
            return Err(SceneError::Catalog("catalog has no definitions".to_string()));
        }
        for d in &self.definitions {
            let dims = d.dimensions;
            if !(dims.x > 0.0 && dims.y > 0.0 && dims.z > 0.0) {
                return Err(SceneError::Catalog(format!(
                    "{} has non-positive dimensions {}",
                    d.label(),
                    dims
                )));
            }
            if d.mass <= 0.0 {
                return Err(SceneError::Catalog(format!("{} has no mass", d.label())));
            }
            for (i, option) in d.movement_options.iter().enumerate() {
                let monotonic = option.position_by_step.windows(2).all(|w| w[1] > w[0]);
                if option.position_by_step.is_empty() || !monotonic {
                    return Err(SceneError::Catalog(format!(
                        "{} movement option {} is not a strictly increasing table",
                        d.label(),
                        i
                    )));
                }
            }
            for (i, cavity) in d.cavities.iter().enumerate() {
                let c = cavity.dimensions;
                if !(c.x > 0.0 && c.y > 0.0 && c.z > 0.0) {
                    return Err(SceneError::Catalog(format!(
                        "{} cavity {} has non-positive dimensions {}",
                        d.label(),
                        i,
                        c
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn definitions(&self) -> &[ObjectDefinition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    // -----------------------------------------------------------------------
    // Queries (catalog order is kept so sampling stays deterministic)
    // -----------------------------------------------------------------------

    /// Definitions with push tables.
    pub fn movers(&self) -> Vec<&ObjectDefinition> {
        self.definitions
            .iter()
            .filter(|d| !d.movement_options.is_empty())
            .collect()
    }

    pub fn pickupables(&self) -> Vec<&ObjectDefinition> {
        self.definitions
            .iter()
            .filter(|d| d.has(Attribute::Pickupable))
            .collect()
    }

    pub fn receptacles(&self) -> Vec<&ObjectDefinition> {
        self.definitions.iter().filter(|d| d.is_receptacle()).collect()
    }

    /// Furniture for decorating the back of the room.
    pub fn background(&self) -> Vec<&ObjectDefinition> {
        self.definitions
            .iter()
            .filter(|d| !d.has(Attribute::Pickupable) && d.movement_options.is_empty())
            .collect()
    }

    /// Movers of a different shape no wider than `definition` and at most
    /// [`MAX_SIZE_DIFFERENCE`] narrower.
    pub fn shape_partners(&self, definition: &ObjectDefinition) -> Vec<&ObjectDefinition> {
        let width = definition.dimensions.x;
        self.movers()
            .into_iter()
            .filter(|d| {
                d.shape != definition.shape
                    && d.dimensions.x <= width
                    && d.dimensions.x >= width - MAX_SIZE_DIFFERENCE
            })
            .collect()
    }

    /// Pickupables of another shape in the same size class and of a
    /// comparable width.
    pub fn similar_to(&self, definition: &ObjectDefinition) -> Vec<&ObjectDefinition> {
        self.pickupables()
            .into_iter()
            .filter(|d| {
                d.shape != definition.shape
                    && d.size == definition.size
                    && (d.dimensions.x - definition.dimensions.x).abs() <= MAX_SIZE_DIFFERENCE
            })
            .collect()
    }
}

/// One material from the definition's choices, or none.
pub fn pick_material<R: Rng + ?Sized>(rng: &mut R, definition: &ObjectDefinition) -> Vec<String> {
    if definition.materials.is_empty() {
        return Vec::new();
    }
    let i = rng.gen_range(0..definition.materials.len());
    vec![definition.materials[i].clone()]
}

/// Uniform choice from a non-empty candidate list.
pub fn choose<'a, R: Rng + ?Sized>(
    rng: &mut R,
    candidates: &[&'a ObjectDefinition],
    wanted: &str,
) -> Result<&'a ObjectDefinition> {
    if candidates.is_empty() {
        return Err(SceneError::Catalog(format!("no {} definitions", wanted)));
    }
    Ok(candidates[rng.gen_range(0..candidates.len())])
}

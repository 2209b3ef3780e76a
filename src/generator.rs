//! Scene set generator.
//!
//! Retries whole build attempts. An attempt owns all of its mutable state
//! (pose, bounds, ids, instances); a recoverable failure drops it and the
//! next attempt starts clean with the same random stream continuing. After
//! `max_attempts` failures the set is abandoned with
//! [`SceneError::ConstructionAborted`].
//!
//! One generator may be shared between threads; each [`SceneGenerator::generate`]
//! call is independent apart from the statistics counters.

use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::catalog::Catalog;
use crate::error::{Result, SceneError};
use crate::ids::IdSource;
use crate::intphys::LayoutBuilder;
use crate::pairs::{immediately_visible, similar_adjacent};
use crate::protocol::{SceneSet, SceneSetKind, SceneVariant, SetupKind};
use crate::quartet::build_quartet;
use crate::types::{GeneratorConfig, GeneratorStats};

pub struct SceneGenerator {
    config: GeneratorConfig,
    catalog: Arc<Catalog>,
    stats: Mutex<GeneratorStats>,
}

impl SceneGenerator {
    pub fn new(config: GeneratorConfig, catalog: Arc<Catalog>) -> Self {
        Self {
            config,
            catalog,
            stats: Mutex::new(GeneratorStats::default()),
        }
    }

    /// A generator over the bundled catalog.
    pub fn with_builtin_catalog(config: GeneratorConfig) -> Result<Self> {
        Ok(Self::new(config, Catalog::builtin()?))
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn stats(&self) -> GeneratorStats {
        self.stats.lock().clone()
    }

    /// Build one complete set of `kind` from `seed`.
    pub fn generate(&self, kind: SceneSetKind, seed: u64) -> Result<SceneSet> {
        let mut rng = SmallRng::seed_from_u64(seed);
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;
        let variants = loop {
            attempt += 1;
            self.stats.lock().attempts += 1;
            match self.attempt(&mut rng, kind, seed, attempt) {
                Ok(variants) => break variants,
                Err(e) if e.is_recoverable() => {
                    self.record_failure(&e);
                    if attempt >= max_attempts {
                        self.stats.lock().aborted += 1;
                        return Err(SceneError::ConstructionAborted {
                            attempts: attempt,
                            last: Box::new(e),
                        });
                    }
                    warn!("{} seed {} attempt {} failed: {}", kind, seed, attempt, e);
                }
                Err(e) => return Err(e),
            }
        };

        let mut set = SceneSet {
            kind,
            seed,
            variants,
        };
        set.assign_names();
        {
            let mut stats = self.stats.lock();
            stats.sets_built += 1;
            stats.variants_emitted += set.variants.len() as u64;
        }
        info!(
            "built {} set for seed {} with {} variants in {} attempt(s)",
            kind,
            seed,
            set.variants.len(),
            attempt
        );
        Ok(set)
    }

    fn attempt(
        &self,
        rng: &mut SmallRng,
        kind: SceneSetKind,
        seed: u64,
        attempt: u32,
    ) -> Result<Vec<SceneVariant>> {
        let mut ids = IdSource::new(seed, attempt);
        match kind {
            SceneSetKind::ImmediatelyVisible => {
                immediately_visible(rng, &self.catalog, &self.config, &mut ids)
            }
            SceneSetKind::SimilarAdjacent => similar_adjacent(rng, &self.catalog, &self.config, &mut ids),
            _ => {
                let setup = if rng.gen_bool(0.5) {
                    SetupKind::MoveAcross
                } else {
                    SetupKind::FallDown
                };
                debug!("{} attempt {} uses a {:?} baseline", kind, attempt, setup);
                let layout = LayoutBuilder::new(&self.catalog, &self.config, &mut ids).build(rng, kind, setup)?;
                build_quartet(rng, kind, layout, &self.catalog, &self.config, &mut ids)
            }
        }
    }

    fn record_failure(&self, error: &SceneError) {
        let mut stats = self.stats.lock();
        match error {
            SceneError::PlacementExhausted { .. } => stats.placement_failures += 1,
            SceneError::ContainmentImpossible { .. } => stats.containment_failures += 1,
            SceneError::OccluderConflict { .. } => stats.occluder_conflicts += 1,
            SceneError::EventUnsatisfiable { .. } => stats.event_failures += 1,
            _ => {}
        }
    }
}

/// Build one result per seed over `threads` scoped workers.
///
/// Seeds are dealt round-robin. Every seed of a worker that panics comes back
/// as [`SceneError::WorkerPanicked`]; the output is sorted by seed.
pub fn generate_batch<F>(seeds: &[u64], threads: usize, build: F) -> Vec<(u64, Result<SceneSet>)>
where
    F: Fn(u64) -> Result<SceneSet> + Sync,
{
    let threads = threads.max(1);
    let mut shares: Vec<Vec<u64>> = vec![Vec::new(); threads];
    for (i, seed) in seeds.iter().enumerate() {
        shares[i % threads].push(*seed);
    }

    let mut results = Vec::with_capacity(seeds.len());
    std::thread::scope(|scope| {
        let build = &build;
        let handles: Vec<_> = shares
            .into_iter()
            .filter(|share| !share.is_empty())
            .map(|share| {
                let handle = scope.spawn({
                    let share = share.clone();
                    move || share.into_iter().map(|seed| (seed, build(seed))).collect::<Vec<_>>()
                });
                (share, handle)
            })
            .collect();
        for (share, handle) in handles {
            match handle.join() {
                Ok(built) => results.extend(built),
                Err(_) => {
                    warn!("worker panicked; {} seeds lost", share.len());
                    results.extend(
                        share
                            .into_iter()
                            .map(|seed| (seed, Err(SceneError::WorkerPanicked { seed }))),
                    );
                }
            }
        }
    });
    results.sort_by_key(|(seed, _)| *seed);
    results
}

//! intphys-world-gen binary
//!
//! Builds scene sets and writes every variant as a JSON document.
//!
//! ## Configuration (env / TOML via `config` crate)
//!
//! | Key                              | Default | Description                          |
//! |----------------------------------|---------|--------------------------------------|
//! | `INTPHYS_SEED`                   | `42`    | Seed of the first set                |
//! | `INTPHYS_MAX_ATTEMPTS`           | `20`    | Attempts per set before aborting     |
//! | `INTPHYS_PLACEMENT_TRIES`        | `100`   | Samples per placement                |
//! | `INTPHYS_PERFORMER_RADIUS`       | `0.05`  | Performer footprint half-width       |
//! | `INTPHYS_TELEPORT_DELAY_CHANCE`  | `0.5`   | Chance of a delayed forward teleport |
//! | `INTPHYS_CONTAINMENT_CHANCE`     | `0.5`   | Chance look-alikes share a container |
//! | `INTPHYS_SKIP_BACKGROUND`        | `false` | No background furniture              |
//! | `INTPHYS_ROOM__MIN_X` (etc.)     | `-4.95` | Room bounds                          |
//!
//! Flags override the environment, which overrides the `--config` file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use intphys_world::{generate_batch, GeneratorConfig, SceneGenerator, SceneSet, SceneSetKind};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "intphys-world-gen", about = "IntPhys scene set generator", version)]
struct Args {
    /// Set kind: object-permanence, spatio-temporal-continuity,
    /// shape-constancy, immediately-visible-pair, similar-adjacent-pair
    #[arg(long, env = "INTPHYS_KIND", default_value = "object-permanence")]
    kind: SceneSetKind,

    /// Seed of the first set; set i uses seed + i
    #[arg(long, env = "INTPHYS_SEED")]
    seed: Option<u64>,

    /// Number of sets to build
    #[arg(long, env = "INTPHYS_COUNT", default_value_t = 1)]
    count: u64,

    /// Worker threads
    #[arg(long, env = "INTPHYS_THREADS", default_value_t = 1)]
    threads: usize,

    /// Output directory (stdout when absent)
    #[arg(long, env = "INTPHYS_OUTPUT")]
    output: Option<PathBuf>,

    /// Optional TOML config file
    #[arg(long, env = "INTPHYS_CONFIG")]
    config: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<GeneratorConfig> {
    let mut builder = config::Config::builder();
    if let Some(path) = &args.config {
        builder = builder.add_source(config::File::from(path.as_path()));
    }
    builder = builder.add_source(
        config::Environment::with_prefix("INTPHYS")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );
    let mut generator_config: GeneratorConfig = builder
        .build()
        .context("reading configuration")?
        .try_deserialize()
        .context("parsing configuration")?;
    if let Some(seed) = args.seed {
        generator_config.seed = seed;
    }
    Ok(generator_config)
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn write_set(set: &SceneSet, output: Option<&Path>) -> Result<()> {
    match output {
        Some(dir) => {
            for variant in &set.variants {
                let path = dir.join(format!("{}.json", variant.name));
                std::fs::write(&path, variant.to_json()?)
                    .with_context(|| format!("writing {}", path.display()))?;
                log::debug!("wrote {}", path.display());
            }
        }
        None => println!("{}", serde_json::to_string_pretty(set)?),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("intphys_world=debug".parse()?),
        )
        .init();

    let args = Args::parse();
    let generator_config = load_config(&args)?;
    let first_seed = generator_config.seed;

    log::info!(
        "Starting intphys-world-gen (kind={}, seed={}, count={}, threads={})",
        args.kind,
        first_seed,
        args.count,
        args.threads,
    );

    if let Some(dir) = &args.output {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let generator = SceneGenerator::with_builtin_catalog(generator_config)?;
    let seeds: Vec<u64> = (0..args.count).map(|i| first_seed + i).collect();
    let kind = args.kind;
    let results = generate_batch(&seeds, args.threads, |seed| {
        let _span = tracing::info_span!("scene_set", kind = %kind, seed).entered();
        generator.generate(kind, seed)
    });

    let mut failed = 0;
    for (seed, result) in results {
        match result {
            Ok(set) => write_set(&set, args.output.as_deref())?,
            Err(e) => {
                failed += 1;
                log::error!("seed {} failed: {}", seed, e);
            }
        }
    }

    let stats = generator.stats();
    log::info!(
        "Done: {} sets, {} variants, {} attempts, {} aborted \
         (placement {}, containment {}, occluder {}, event {})",
        stats.sets_built,
        stats.variants_emitted,
        stats.attempts,
        stats.aborted,
        stats.placement_failures,
        stats.containment_failures,
        stats.occluder_conflicts,
        stats.event_failures,
    );

    if failed > 0 {
        anyhow::bail!("{} of {} sets failed", failed, args.count);
    }
    Ok(())
}

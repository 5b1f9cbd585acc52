use anyhow::{Context, Result};
use arena_gp_core::arena::{Arena, ArenaLayout};
use arena_gp_core::config::RunConfig;
use arena_gp_core::episode::{Episode, Frame, TrialOutcome};
use arena_gp_core::evolution::Evolution;
use arena_gp_core::policy::Policy;
use arena_gp_core::rng::{create_rng, derive_trial_rng};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "arena-gp")]
#[command(about = "Evolve and replay expression-tree controllers for a 2-D arena agent")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evolve a population of policies from a config file
    Evolve {
        /// Path to run config file (JSON)
        #[arg(long)]
        config: PathBuf,

        /// Number of generations to run
        #[arg(long, default_value_t = 50)]
        generations: usize,

        /// Override the config seed
        #[arg(long)]
        seed: Option<u64>,

        /// Output directory for best_policy.json, history.json and summary.json
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run one episode with a saved policy
    Replay {
        /// Path to a saved policy (JSON)
        #[arg(long)]
        policy: PathBuf,

        /// Path to run config file (JSON); defaults are used when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Seed for arena generation and the episode
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Write arena layout, frames and outcome to this file
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Dump the default configuration to stdout
    DumpDefaultConfig,
}

#[derive(Serialize)]
struct ReplayLog<'a> {
    seed: u64,
    layout: ArenaLayout,
    frames: &'a [Frame],
    outcome: &'a TrialOutcome,
    fitness: f64,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn load_config(path: &Path) -> Result<RunConfig> {
    let file = File::open(path)
        .with_context(|| format!("failed to open config file {}", path.display()))?;
    let config: RunConfig =
        serde_json::from_reader(BufReader::new(file)).context("failed to parse config")?;
    config.validate().context("config validation error")?;
    Ok(config)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("failed to write {}", path.display()))
}

fn evolve(
    config: &Path,
    generations: usize,
    seed: Option<u64>,
    out: Option<PathBuf>,
) -> Result<()> {
    let mut run_config = load_config(config)?;
    if let Some(seed) = seed {
        run_config.evolution.seed = seed;
    }
    info!(
        generations,
        seed = run_config.evolution.seed,
        population = run_config.evolution.population_size,
        "starting evolution"
    );

    let mut engine = Evolution::new(run_config).context("failed to initialize evolution")?;
    let (best, history) = engine.evolve(generations).context("evolution failed")?;
    let best = best.context("no generations were run")?;
    println!(
        "Best fitness: {:.2} (depth {}, {} nodes) after {} generations",
        best.fitness,
        best.policy.depth(),
        best.policy.size(),
        history.len()
    );

    if let Some(out_dir) = out {
        std::fs::create_dir_all(&out_dir).context("failed to create output directory")?;
        best.policy
            .save(out_dir.join("best_policy.json"))
            .context("failed to save best policy")?;
        write_json(&out_dir.join("history.json"), &history)?;
        if let Some(summary) = engine.summary() {
            write_json(&out_dir.join("summary.json"), &summary)?;
        }
        println!("Results saved to {}", out_dir.display());
    }
    Ok(())
}

fn replay(policy: &Path, config: Option<&Path>, seed: u64, out: Option<PathBuf>) -> Result<()> {
    let policy = Policy::load(policy).context("failed to load policy")?;
    let run_config = match config {
        Some(path) => load_config(path)?,
        None => RunConfig::default(),
    };

    let arena = Arena::generate(&run_config.arena, &mut create_rng(seed))
        .context("failed to generate arena")?;
    let layout = arena.layout();
    let episode = Episode::new(
        &policy,
        &run_config.agent,
        arena,
        derive_trial_rng(seed, 0, 0, 0),
    );
    let (frames, outcome) = episode.record();
    let fitness = outcome.fitness();

    println!(
        "Steps: {}, resources: {}, collisions: {}, goal: {}, energy: {:.1}, fitness: {:.2}",
        outcome.steps,
        outcome.resources_collected,
        outcome.collisions,
        outcome.goal_reached,
        outcome.energy,
        fitness
    );

    if let Some(path) = out {
        let log = ReplayLog {
            seed,
            layout,
            frames: &frames,
            outcome: &outcome,
            fitness,
        };
        write_json(&path, &log)?;
        println!("Frames saved to {}", path.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::DumpDefaultConfig => {
            let config = RunConfig::default();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Evolve {
            config,
            generations,
            seed,
            out,
        } => evolve(&config, generations, seed, out)?,
        Commands::Replay {
            policy,
            config,
            seed,
            out,
        } => replay(&policy, config.as_deref(), seed, out)?,
    }
    Ok(())
}

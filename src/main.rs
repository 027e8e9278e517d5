use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use highway_q::db::{ResultsDb, save_summary};
use highway_q::render::TextSink;
use highway_q::{Config, ObstaclePattern, RunSummary, Simulator, TabularQLearner};

/// Train a tabular Q-learning driver through a curriculum of widening roads.
#[derive(Parser, Debug)]
#[command(name = "highway_q")]
struct Cli {
    /// JSON config file; missing fields use defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Independent runs to train in parallel.
    #[arg(long, default_value_t = 1)]
    runs: u64,

    /// Base seed; run i uses seed + i.
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    starting_width: Option<usize>,

    #[arg(long)]
    ending_width: Option<usize>,

    /// Advances an episode must reach to finish a stage.
    #[arg(long)]
    level_complete: Option<u64>,

    #[arg(long)]
    obstacle_probability: Option<f32>,

    /// Use the fixed alternating obstacle layout.
    #[arg(long)]
    alternating: bool,

    /// Print the road (single run only).
    #[arg(long)]
    render: bool,

    /// Print every episode instead of every n-th one.
    #[arg(long)]
    show_all: bool,

    /// Pause between rendered frames.
    #[arg(long, default_value_t = 0)]
    frame_delay_ms: u64,

    /// Write the run summary here as JSON.
    #[arg(long)]
    summary_json: Option<PathBuf>,

    /// Append results to this SQLite database.
    #[arg(long)]
    results_db: Option<PathBuf>,

    /// Log learning scalars.
    #[arg(short, long)]
    verbose: bool,
}

fn build_config(cli: &Cli) -> Result<Config> {
    let mut cfg = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(w) = cli.starting_width {
        cfg.sim.starting_width = w;
    }
    if let Some(w) = cli.ending_width {
        cfg.sim.ending_width = w;
    }
    if let Some(n) = cli.level_complete {
        cfg.sim.num_advances_level_complete = n;
    }
    if let Some(p) = cli.obstacle_probability {
        cfg.sim.random_obstacle_probability = p;
    }
    if cli.alternating {
        cfg.sim.obstacle_pattern = ObstaclePattern::Alternating;
    }
    if cli.show_all {
        cfg.sim.fast_mode = false;
    }

    cfg.validate()?;
    Ok(cfg)
}

/// Seed both RNGs of a run from one number so runs are reproducible.
fn seeded(cfg: &Config, seed: Option<u64>) -> Config {
    let mut cfg = cfg.clone();
    if let Some(seed) = seed {
        cfg.sim.seed = Some(seed);
        cfg.agent.seed = Some(seed ^ 0xA5A5_5A5A);
    }
    cfg
}

fn run_one(cfg: Config, render: Option<(bool, u64, Duration)>) -> RunSummary {
    let mut sim = Simulator::new(cfg.sim);
    if let Some((fast_mode, display_every, delay)) = render {
        sim = sim.with_sink(Box::new(TextSink::new(io::stdout(), fast_mode, display_every, delay)));
    }
    let mut agent = TabularQLearner::new(cfg.agent);
    sim.run(&mut agent)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let cfg = build_config(&cli)?;
    tracing::info!(runs = cli.runs, "starting training");

    let summaries: Vec<RunSummary> = if cli.runs <= 1 {
        let render = cli
            .render
            .then(|| (cfg.sim.fast_mode, cfg.sim.display_every, Duration::from_millis(cli.frame_delay_ms)));
        vec![run_one(seeded(&cfg, cli.seed), render)]
    } else {
        if cli.render {
            tracing::warn!("--render ignored with more than one run");
        }
        let base = cli.seed.or(cfg.sim.seed);
        (0..cli.runs)
            .into_par_iter()
            .map(|i| run_one(seeded(&cfg, base.map(|s| s.wrapping_add(i))), None))
            .collect()
    };

    for summary in &summaries {
        for stage in &summary.stages {
            tracing::info!(
                seed = summary.seed,
                road_width = stage.road_width,
                episodes = stage.episodes,
                best_advances = stage.best_advances,
                "stage result"
            );
        }
    }

    if let Some(path) = &cli.summary_json {
        for (i, summary) in summaries.iter().enumerate() {
            let target = if summaries.len() == 1 {
                path.clone()
            } else {
                path.with_extension(format!("{i}.json"))
            };
            save_summary(&target, summary).with_context(|| format!("writing {}", target.display()))?;
        }
    }

    if let Some(path) = &cli.results_db {
        let mut db = ResultsDb::open(path).with_context(|| format!("opening {}", path.display()))?;
        for summary in &summaries {
            let run_id = db.record_run(summary).context("recording run")?;
            tracing::info!(run_id, seed = summary.seed, "run recorded");
        }
    }

    Ok(())
}

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use wastebots_app::{RunOptions, load_config, run};
use wastebots_brain::initialize;
use wastebots_core::{Tier, WastebotsConfig};

/// Run a waste-collection simulation and print the final report as JSON.
#[derive(Debug, Parser)]
#[command(name = "wastebots", version)]
struct Cli {
    /// JSON world configuration; flags below override its fields.
    #[arg(long, env = "WASTEBOTS_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long, env = "WASTEBOTS_WIDTH")]
    width: Option<u32>,
    #[arg(long, env = "WASTEBOTS_HEIGHT")]
    height: Option<u32>,
    /// Strategy for every tier without an override.
    #[arg(long, env = "WASTEBOTS_STRATEGY")]
    strategy: Option<String>,
    #[arg(long, env = "WASTEBOTS_GREEN_STRATEGY")]
    green_strategy: Option<String>,
    #[arg(long, env = "WASTEBOTS_YELLOW_STRATEGY")]
    yellow_strategy: Option<String>,
    #[arg(long, env = "WASTEBOTS_RED_STRATEGY")]
    red_strategy: Option<String>,
    #[arg(long, env = "WASTEBOTS_SEED")]
    seed: Option<u64>,
    /// Tick budget.
    #[arg(long, env = "WASTEBOTS_TICKS", default_value_t = 1_000)]
    ticks: u64,
    /// Keep stepping after the grid is clear.
    #[arg(long)]
    no_stop: bool,
    /// Progress log cadence in ticks (0 disables).
    #[arg(long, env = "WASTEBOTS_REPORT_EVERY", default_value_t = 100)]
    report_every: u64,
    #[arg(long)]
    pretty: bool,
}

impl Cli {
    fn world_config(&self) -> Result<WastebotsConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => WastebotsConfig::default(),
        };
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(strategy) = &self.strategy {
            config.strategy.clone_from(strategy);
        }
        let overrides = [
            (Tier::Green, &self.green_strategy),
            (Tier::Yellow, &self.yellow_strategy),
            (Tier::Red, &self.red_strategy),
        ];
        for (tier, strategy) in overrides {
            if let Some(strategy) = strategy {
                config.strategy_overrides.insert(tier, strategy.clone());
            }
        }
        if self.seed.is_some() {
            config.rng_seed = self.seed;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.world_config()?;
    let mut world = initialize(config).context("failed to initialise world")?;
    info!(
        width = world.config().width,
        height = world.config().height,
        robots = world.robots().len(),
        "starting WasteBots run"
    );

    let options = RunOptions {
        max_ticks: cli.ticks,
        stop_when_clear: !cli.no_stop,
        report_every: cli.report_every,
    };
    let report = run(&mut world, &options);
    let json = if cli.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

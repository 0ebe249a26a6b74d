//! Batch driver plumbing shared by the `wastebots` binary and its tests.

use std::{fs, io, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use wastebots_core::{Tier, WasteCounts, WastebotsConfig, WorldState, WorldStateError};

/// Failures surfaced while preparing or running a batch.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to read config `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config `{path}`: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    World(#[from] WorldStateError),
}

/// Load a JSON world configuration; omitted fields take their defaults.
pub fn load_config(path: &Path) -> Result<WastebotsConfig, AppError> {
    let display = path.display().to_string();
    let raw = fs::read_to_string(path).map_err(|source| AppError::Io {
        path: display.clone(),
        source,
    })?;
    let config: WastebotsConfig =
        serde_json::from_str(&raw).map_err(|source| AppError::Parse {
            path: display,
            source,
        })?;
    config.validate()?;
    Ok(config)
}

/// Stop conditions and logging cadence for [`run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub max_ticks: u64,
    pub stop_when_clear: bool,
    /// Emit a progress line every this many ticks; zero disables it.
    pub report_every: u64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_ticks: 1_000,
            stop_when_clear: true,
            report_every: 100,
        }
    }
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunReport {
    pub ticks_run: u64,
    pub final_tick: u64,
    pub cleared: bool,
    /// First tick at which no top-tier waste remained, if it happened.
    pub top_tier_cleared_at: Option<u64>,
    pub fusions: usize,
    pub disposals: usize,
    pub failed_actions: usize,
    pub messages_sent: usize,
    pub waste: WasteCounts,
}

/// Advance `world` until the tick budget is spent or, optionally, no waste remains.
pub fn run(world: &mut WorldState, options: &RunOptions) -> RunReport {
    let top = Tier::Red;
    let mut report = RunReport {
        ticks_run: 0,
        final_tick: world.tick().0,
        cleared: world.is_clear(),
        top_tier_cleared_at: None,
        fusions: 0,
        disposals: 0,
        failed_actions: 0,
        messages_sent: 0,
        waste: world.waste_counts(),
    };
    if report.waste.per_tier[top] == 0 {
        report.top_tier_cleared_at = Some(report.final_tick);
    }

    while report.ticks_run < options.max_ticks {
        if options.stop_when_clear && report.cleared {
            break;
        }
        let events = world.step();
        report.ticks_run += 1;
        report.fusions += events.fusions;
        report.disposals += events.disposals;
        report.failed_actions += events.failed_actions;
        report.messages_sent += events.messages_sent;

        let counts = world.waste_counts();
        if report.top_tier_cleared_at.is_none() && counts.per_tier[top] == 0 {
            report.top_tier_cleared_at = Some(events.tick.0);
        }
        report.cleared = counts.total() == 0;
        report.waste = counts;
        report.final_tick = events.tick.0;

        if options.report_every > 0 && report.ticks_run % options.report_every == 0 {
            info!(
                tick = events.tick.0,
                green = counts.per_tier[Tier::Green],
                yellow = counts.per_tier[Tier::Yellow],
                red = counts.per_tier[Tier::Red],
                fusions = report.fusions,
                disposals = report.disposals,
                "run progress"
            );
        }
    }

    info!(
        ticks = report.ticks_run,
        cleared = report.cleared,
        remaining = report.waste.total(),
        "run finished"
    );
    report
}

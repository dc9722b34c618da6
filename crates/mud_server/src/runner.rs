//! Real-time pulse loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use mud_core::config::EngineConfig;
use mud_core::data::SpellCatalog;
use mud_core::engine::{Engine, PulseReport};

use crate::config::ServerConfig;
use crate::sink::TracingSink;
use crate::Result;

/// What the loop has done so far, published after every pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopStatus {
    /// Pulses run.
    pub pulses: u64,
    /// Events fired across all pulses.
    pub events_fired: u64,
    /// Characters that died.
    pub deaths: u64,
    /// Effect records that expired.
    pub expired_effects: u64,
}

impl LoopStatus {
    fn record(&mut self, report: &PulseReport) {
        self.pulses = report.pulse;
        self.events_fired += report.events_fired as u64;
        self.deaths += report.deaths.len() as u64;
        if let Some(sweep) = &report.sweep {
            self.expired_effects += sweep.expired as u64;
        }
    }
}

/// Owns the engine and drives it.
pub struct GameLoop {
    engine: Engine,
    config: ServerConfig,
    status: watch::Sender<LoopStatus>,
}

impl GameLoop {
    /// Build a loop around an existing engine.
    #[must_use]
    pub fn new(engine: Engine, config: ServerConfig) -> Self {
        let (status, _) = watch::channel(LoopStatus::default());
        Self {
            engine,
            config,
            status,
        }
    }

    /// Load catalog and engine tunables named by `config`.
    ///
    /// # Errors
    ///
    /// Returns the load error of whichever data file is broken.
    pub fn from_config(config: ServerConfig) -> Result<Self> {
        let catalog = SpellCatalog::load(config.spells_path())?;
        let engine_config = EngineConfig::load(config.engine_path())?;
        info!(
            spells = catalog.len(),
            seed = engine_config.seed,
            "Loaded engine data from {}",
            config.data_dir.display()
        );
        let engine = Engine::new(engine_config, Arc::new(catalog), Box::new(TracingSink));
        Ok(Self::new(engine, config))
    }

    /// The engine, for setting up a world before running.
    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// The engine.
    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Watch the loop's progress.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LoopStatus> {
        self.status.subscribe()
    }

    /// Run one pulse and publish the new status.
    pub fn step(&mut self) -> PulseReport {
        let report = self.engine.pulse();
        self.status.send_modify(|s| s.record(&report));
        if let Some(sweep) = &report.sweep {
            debug!(
                pulse = report.pulse,
                expired = sweep.expired,
                wear_offs = sweep.wear_offs,
                "effect sweep"
            );
        }
        let every = self.config.status_every;
        if every > 0 && report.pulse % every == 0 {
            let status = *self.status.borrow();
            info!(
                pulse = status.pulses,
                events = status.events_fired,
                deaths = status.deaths,
                "status"
            );
        }
        report
    }

    /// Pulse on the configured interval until the pulse limit is reached or
    /// `shutdown` resolves. Returns the engine for inspection.
    pub async fn run<F>(mut self, shutdown: F) -> Engine
    where
        F: Future<Output = ()>,
    {
        let period = Duration::from_millis(self.config.tick_interval_ms.max(1));
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(interval_ms = self.config.tick_interval_ms, limit = ?self.config.pulse_limit, "Pulse loop started");
        loop {
            if self
                .config
                .pulse_limit
                .is_some_and(|limit| self.engine.pulse_count() >= limit)
            {
                info!(pulse = self.engine.pulse_count(), "Pulse limit reached");
                break;
            }
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!(pulse = self.engine.pulse_count(), "Shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    self.step();
                }
            }
        }
        self.engine
    }
}

pub mod dispatch;
pub mod rules;

use glam::Vec2;
use thiserror::Error;

use crate::boid::Flock;
use crate::config::{ConfigError, FlockRules, UpdateMode, WorldConfig};
use dispatch::{DispatchError, Dispatcher};
use rules::{update_batch, Tick};

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// A tick that was refused before any boid was touched.
#[derive(Debug, Error, PartialEq)]
pub enum TickError {
    #[error("time delta must be finite and non-negative, got {0}")]
    InvalidDelta(f32),
}

enum Updater {
    Sequential,
    Parallel(Dispatcher),
}

/// The flock plus everything needed to advance it.
pub struct Simulation {
    flock: Flock,
    rules: FlockRules,
    bounds: Vec2,
    updater: Updater,
    tick_count: u64,
}

impl Simulation {
    /// Validate `config` and take ownership of a flock spawned for it.
    pub fn new(config: &WorldConfig, flock: Flock, mode: UpdateMode) -> Result<Self, SimError> {
        config.validate()?;
        config.check_flock(&flock)?;
        let updater = match mode {
            UpdateMode::Sequential => Updater::Sequential,
            UpdateMode::Parallel { workers } => Updater::Parallel(Dispatcher::new(workers)?),
        };
        Ok(Self {
            flock,
            rules: config.rules,
            bounds: Vec2::new(config.width, config.height),
            updater,
            tick_count: 0,
        })
    }

    /// Spawn a flock from `config` with a seeded RNG and wrap it.
    pub fn seeded(config: &WorldConfig, seed: u64, mode: UpdateMode) -> Result<Self, SimError> {
        config.validate()?;
        let flock = Flock::spawn(config, &mut fastrand::Rng::with_seed(seed));
        Self::new(config, flock, mode)
    }

    /// Advance every boid by `dt` seconds. All writes are complete on return.
    pub fn step(&mut self, dt: f32) -> Result<(), TickError> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(TickError::InvalidDelta(dt));
        }
        let tick = Tick {
            rules: &self.rules,
            bounds: self.bounds,
            dt,
        };
        match &mut self.updater {
            Updater::Sequential => update_batch(&[], self.flock.boids_mut(), &[], tick),
            Updater::Parallel(dispatcher) => dispatcher.run(self.flock.boids_mut(), tick),
        }
        self.tick_count += 1;
        Ok(())
    }

    pub fn flock(&self) -> &Flock {
        &self.flock
    }

    pub fn mode(&self) -> UpdateMode {
        match &self.updater {
            Updater::Sequential => UpdateMode::Sequential,
            Updater::Parallel(d) => UpdateMode::Parallel {
                workers: d.workers(),
            },
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}

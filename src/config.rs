use clap::Parser;
use thiserror::Error;

use crate::boid::{Flock, ScoutGroup};

/// Errors raised when validating a world configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("boid count must be non-zero")]
    EmptyPopulation,
    #[error("scout groups ({right} right + {left} left) exceed the population of {count}")]
    TooManyScouts {
        right: usize,
        left: usize,
        count: usize,
    },
    #[error("world bounds {width}x{height} must be positive and finite")]
    InvalidBounds { width: f32, height: f32 },
    #[error("{name} must be finite and non-negative, got {value}")]
    InvalidFactor { name: &'static str, value: f32 },
    #[error("visual range must be positive, got {0}")]
    InvalidVisualRange(f32),
    #[error("protected range {protected} is larger than visual range {visual}")]
    ProtectedExceedsVisual { protected: f32, visual: f32 },
    #[error("speed range [{min}, {max}] is inverted or empty")]
    InvalidSpeedRange { min: f32, max: f32 },
    #[error("bias increment must be positive, got {0}")]
    InvalidBiasIncrement(f32),
    #[error("max bias {max_bias} must lie in [{increment}, 1.0]")]
    InvalidMaxBias { max_bias: f32, increment: f32 },
    #[error("worker count must be non-zero")]
    NoWorkers,
    #[error("flock holds {actual} boids but the config asks for {expected}")]
    FlockSizeMismatch { expected: usize, actual: usize },
    #[error("boid {index} is in group {actual:?}, expected {expected:?}")]
    FlockGroupMismatch {
        index: usize,
        expected: ScoutGroup,
        actual: ScoutGroup,
    },
}

/// Steering constants applied to every boid on every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlockRules {
    /// Neighbours closer than this (per axis and by distance) are visible.
    pub visual_range: f32,
    /// Neighbours closer than this push the boid away.
    pub protected_range: f32,
    /// Cohesion strength toward the visible neighbours' centre.
    pub centering_factor: f32,
    /// Separation strength, scaled by the tick delta.
    pub avoid_factor: f32,
    /// Alignment strength toward the visible neighbours' mean velocity.
    pub matching_factor: f32,
    /// Velocity nudge applied per axis while outside the world bounds.
    pub turn_factor: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    /// Upper bound of a scout's directional bias.
    pub max_bias: f32,
    /// Bias step per tick, also the lower bound once a scout has updated.
    pub bias_increment: f32,
}

impl Default for FlockRules {
    fn default() -> Self {
        Self {
            visual_range: 75.0,
            protected_range: 20.0,
            centering_factor: 0.005,
            avoid_factor: 0.05,
            matching_factor: 0.05,
            turn_factor: 1.0,
            min_speed: 10.0,
            max_speed: 40.0,
            max_bias: 0.25,
            bias_increment: 0.005,
        }
    }
}

impl FlockRules {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let factors = [
            ("visual_range", self.visual_range),
            ("protected_range", self.protected_range),
            ("centering_factor", self.centering_factor),
            ("avoid_factor", self.avoid_factor),
            ("matching_factor", self.matching_factor),
            ("turn_factor", self.turn_factor),
            ("min_speed", self.min_speed),
            ("max_speed", self.max_speed),
            ("max_bias", self.max_bias),
            ("bias_increment", self.bias_increment),
        ];
        for (name, value) in factors {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidFactor { name, value });
            }
        }

        if self.visual_range <= 0.0 {
            return Err(ConfigError::InvalidVisualRange(self.visual_range));
        }
        if self.protected_range > self.visual_range {
            return Err(ConfigError::ProtectedExceedsVisual {
                protected: self.protected_range,
                visual: self.visual_range,
            });
        }
        if self.max_speed <= 0.0 || self.min_speed > self.max_speed {
            return Err(ConfigError::InvalidSpeedRange {
                min: self.min_speed,
                max: self.max_speed,
            });
        }
        if self.bias_increment <= 0.0 {
            return Err(ConfigError::InvalidBiasIncrement(self.bias_increment));
        }
        if self.max_bias < self.bias_increment || self.max_bias > 1.0 {
            return Err(ConfigError::InvalidMaxBias {
                max_bias: self.max_bias,
                increment: self.bias_increment,
            });
        }
        Ok(())
    }
}

/// Population, world bounds and rules for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldConfig {
    pub boid_count: usize,
    /// The first `right_scouts` boids prefer moving right.
    pub right_scouts: usize,
    /// The next `left_scouts` boids prefer moving left.
    pub left_scouts: usize,
    pub width: f32,
    pub height: f32,
    pub rules: FlockRules,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            boid_count: 200,
            right_scouts: 10,
            left_scouts: 10,
            width: 800.0,
            height: 600.0,
            rules: FlockRules::default(),
        }
    }
}

impl WorldConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.boid_count == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        let scouts = self.right_scouts.saturating_add(self.left_scouts);
        if scouts > self.boid_count {
            return Err(ConfigError::TooManyScouts {
                right: self.right_scouts,
                left: self.left_scouts,
                count: self.boid_count,
            });
        }
        let bounds_ok = |v: f32| v.is_finite() && v > 0.0;
        if !bounds_ok(self.width) || !bounds_ok(self.height) {
            return Err(ConfigError::InvalidBounds {
                width: self.width,
                height: self.height,
            });
        }
        self.rules.validate()
    }

    /// Check that `flock` has this population and scout split.
    pub fn check_flock(&self, flock: &Flock) -> Result<(), ConfigError> {
        if flock.len() != self.boid_count {
            return Err(ConfigError::FlockSizeMismatch {
                expected: self.boid_count,
                actual: flock.len(),
            });
        }
        for (index, boid) in flock.boids().iter().enumerate() {
            let expected = ScoutGroup::for_index(index, self.right_scouts, self.left_scouts);
            if boid.group != expected {
                return Err(ConfigError::FlockGroupMismatch {
                    index,
                    expected,
                    actual: boid.group,
                });
            }
        }
        Ok(())
    }
}

/// How the per-tick update is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// One in-place pass over the whole flock.
    Sequential,
    /// Contiguous batches spread over a fixed worker pool.
    Parallel { workers: usize },
}

impl UpdateMode {
    pub fn label(self) -> String {
        match self {
            UpdateMode::Sequential => "sequential".to_string(),
            UpdateMode::Parallel { workers } => format!("{workers} threads"),
        }
    }
}

/// Detected hardware parallelism, never less than one.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[derive(Parser, Debug)]
#[command(name = "boidflock", version, about = "Boids flocking with biased scout groups")]
pub struct Cli {
    /// Number of boids in the flock.
    #[arg(long, env = "BOIDFLOCK_BOIDS", default_value_t = 200)]
    pub boids: usize,

    /// Boids biased toward moving right (taken from the start of the flock).
    #[arg(long, env = "BOIDFLOCK_RIGHT_SCOUTS", default_value_t = 10)]
    pub right_scouts: usize,

    /// Boids biased toward moving left (taken after the right scouts).
    #[arg(long, env = "BOIDFLOCK_LEFT_SCOUTS", default_value_t = 10)]
    pub left_scouts: usize,

    /// World and window width in pixels.
    #[arg(long, env = "BOIDFLOCK_WIDTH", default_value_t = 800.0)]
    pub width: f32,

    /// World and window height in pixels.
    #[arg(long, env = "BOIDFLOCK_HEIGHT", default_value_t = 600.0)]
    pub height: f32,

    #[arg(long, env = "BOIDFLOCK_VISUAL_RANGE", default_value_t = 75.0)]
    pub visual_range: f32,

    #[arg(long, env = "BOIDFLOCK_PROTECTED_RANGE", default_value_t = 20.0)]
    pub protected_range: f32,

    /// Cohesion strength toward the visible neighbours' centre.
    #[arg(long, env = "BOIDFLOCK_CENTERING_FACTOR", default_value_t = 0.005)]
    pub centering_factor: f32,

    /// Separation strength, scaled by the tick delta.
    #[arg(long, env = "BOIDFLOCK_AVOID_FACTOR", default_value_t = 0.05)]
    pub avoid_factor: f32,

    /// Alignment strength toward the visible neighbours' mean velocity.
    #[arg(long, env = "BOIDFLOCK_MATCHING_FACTOR", default_value_t = 0.05)]
    pub matching_factor: f32,

    /// Velocity nudge per axis while a boid is outside the world.
    #[arg(long, env = "BOIDFLOCK_TURN_FACTOR", default_value_t = 1.0)]
    pub turn_factor: f32,

    #[arg(long, env = "BOIDFLOCK_MIN_SPEED", default_value_t = 10.0)]
    pub min_speed: f32,

    #[arg(long, env = "BOIDFLOCK_MAX_SPEED", default_value_t = 40.0)]
    pub max_speed: f32,

    #[arg(long, env = "BOIDFLOCK_MAX_BIAS", default_value_t = 0.25)]
    pub max_bias: f32,

    #[arg(long, env = "BOIDFLOCK_BIAS_INCREMENT", default_value_t = 0.005)]
    pub bias_increment: f32,

    /// Worker threads for the parallel update (defaults to hardware parallelism).
    #[arg(long, env = "BOIDFLOCK_THREADS")]
    pub threads: Option<usize>,

    /// Run the single-threaded in-place update instead of the worker pool.
    #[arg(long, env = "BOIDFLOCK_SEQUENTIAL")]
    pub sequential: bool,

    /// Seed for the initial flock; a random seed is drawn when omitted.
    #[arg(long, env = "BOIDFLOCK_SEED")]
    pub seed: Option<u64>,
}

impl Cli {
    pub fn world_config(&self) -> WorldConfig {
        WorldConfig {
            boid_count: self.boids,
            right_scouts: self.right_scouts,
            left_scouts: self.left_scouts,
            width: self.width,
            height: self.height,
            rules: FlockRules {
                visual_range: self.visual_range,
                protected_range: self.protected_range,
                centering_factor: self.centering_factor,
                avoid_factor: self.avoid_factor,
                matching_factor: self.matching_factor,
                turn_factor: self.turn_factor,
                min_speed: self.min_speed,
                max_speed: self.max_speed,
                max_bias: self.max_bias,
                bias_increment: self.bias_increment,
            },
        }
    }

    pub fn update_mode(&self) -> Result<UpdateMode, ConfigError> {
        if self.sequential {
            return Ok(UpdateMode::Sequential);
        }
        match self.threads {
            Some(0) => Err(ConfigError::NoWorkers),
            Some(workers) => Ok(UpdateMode::Parallel { workers }),
            None => Ok(UpdateMode::Parallel {
                workers: default_workers(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(WorldConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_empty_population() {
        let config = WorldConfig {
            boid_count: 0,
            right_scouts: 0,
            left_scouts: 0,
            ..WorldConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyPopulation));
    }

    #[test]
    fn rejects_scouts_beyond_population() {
        let config = WorldConfig {
            boid_count: 15,
            ..WorldConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TooManyScouts { count: 15, .. })
        ));
    }

    #[test]
    fn rejects_bad_bounds() {
        let config = WorldConfig {
            width: 0.0,
            ..WorldConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBounds { .. })));

        let config = WorldConfig {
            height: f32::NAN,
            ..WorldConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBounds { .. })));
    }

    #[test]
    fn rejects_inverted_speed_range() {
        let rules = FlockRules {
            min_speed: 50.0,
            max_speed: 40.0,
            ..FlockRules::default()
        };
        assert_eq!(
            rules.validate(),
            Err(ConfigError::InvalidSpeedRange { min: 50.0, max: 40.0 })
        );
    }

    #[test]
    fn rejects_negative_factor() {
        let rules = FlockRules {
            avoid_factor: -0.1,
            ..FlockRules::default()
        };
        assert!(matches!(
            rules.validate(),
            Err(ConfigError::InvalidFactor { name: "avoid_factor", .. })
        ));
    }

    #[test]
    fn rejects_protected_range_wider_than_visual() {
        let rules = FlockRules {
            protected_range: 100.0,
            ..FlockRules::default()
        };
        assert!(matches!(
            rules.validate(),
            Err(ConfigError::ProtectedExceedsVisual { .. })
        ));
    }

    #[test]
    fn rejects_bad_bias_bounds() {
        let rules = FlockRules {
            bias_increment: 0.0,
            ..FlockRules::default()
        };
        assert_eq!(rules.validate(), Err(ConfigError::InvalidBiasIncrement(0.0)));

        let rules = FlockRules {
            max_bias: 1.5,
            ..FlockRules::default()
        };
        assert!(matches!(rules.validate(), Err(ConfigError::InvalidMaxBias { .. })));

        let rules = FlockRules {
            max_bias: 0.001,
            ..FlockRules::default()
        };
        assert!(matches!(rules.validate(), Err(ConfigError::InvalidMaxBias { .. })));
    }

    #[test]
    fn cli_defaults_match_world_defaults() {
        let cli = Cli::parse_from(["boidflock"]);
        let config = cli.world_config();
        assert_eq!(config, WorldConfig::default());
        assert_eq!(config.rules.centering_factor, 0.005);
        assert_eq!(config.rules.avoid_factor, 0.05);
        assert_eq!(config.rules.matching_factor, 0.05);
        assert_eq!(config.rules.turn_factor, 1.0);
    }

    #[test]
    fn cli_steering_factors_reach_rules() {
        let cli = Cli::parse_from([
            "boidflock",
            "--centering-factor",
            "0.01",
            "--avoid-factor",
            "0.2",
            "--matching-factor",
            "0",
            "--turn-factor",
            "2.5",
        ]);
        let config = cli.world_config();
        assert_eq!(config.rules.centering_factor, 0.01);
        assert_eq!(config.rules.avoid_factor, 0.2);
        assert_eq!(config.rules.matching_factor, 0.0);
        assert_eq!(config.rules.turn_factor, 2.5);
        assert_eq!(config.validate(), Ok(()));

        let cli = Cli::parse_from(["boidflock", "--turn-factor=-1"]);
        assert_eq!(
            cli.world_config().validate(),
            Err(ConfigError::InvalidFactor {
                name: "turn_factor",
                value: -1.0
            })
        );
    }

    #[test]
    fn cli_update_mode() {
        let cli = Cli::parse_from(["boidflock", "--sequential"]);
        assert_eq!(cli.update_mode(), Ok(UpdateMode::Sequential));

        let cli = Cli::parse_from(["boidflock", "--threads", "3"]);
        assert_eq!(cli.update_mode(), Ok(UpdateMode::Parallel { workers: 3 }));

        let cli = Cli::parse_from(["boidflock", "--threads", "0"]);
        assert_eq!(cli.update_mode(), Err(ConfigError::NoWorkers));
    }
}

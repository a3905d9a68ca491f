//! Configuration types for controlling a checking run.

use thiserror::Error;

use crate::rng::RandomSource;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Invalid number of successful tests (must be > 0)
    #[error("Invalid successful test count: {0} (must be > 0)")]
    InvalidSuccessfulTests(usize),
    /// Invalid discard ratio (must be a fraction in [0.0, 1.0))
    #[error("Invalid discard ratio: {0} (must be in [0.0, 1.0))")]
    InvalidDiscardRatio(f64),
    /// Invalid maximum size (must be > 0)
    #[error("Invalid max size: {0} (must be > 0)")]
    InvalidMaxSize(usize),
}

/// Exact coordinates of one generated test case.
///
/// Feeding a token back through [`CheckerConfig::with_replay`] makes the
/// first iteration of the next run regenerate exactly the same inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReplayToken {
    /// Seed pair of the case's random source
    pub seed: (u64, u64),
    /// Size the case was generated at
    pub size: usize,
}

impl ReplayToken {
    /// Create a replay token
    pub fn new(seed: (u64, u64), size: usize) -> Self {
        Self { seed, size }
    }

    /// The random source this token points at
    pub fn source(&self) -> RandomSource {
        RandomSource::new(self.seed.0, self.seed.1)
    }
}

/// Configuration for a single checking run
#[derive(Debug, Clone, PartialEq)]
pub struct CheckerConfig {
    /// Number of passing cases required before the property is accepted
    pub max_successful_tests: usize,
    /// Largest tolerated share of discarded cases, in `[0.0, 1.0)`
    pub max_discard_ratio: f64,
    /// Cases drawn before the discard ratio may end a run
    pub discard_warmup: usize,
    /// Budget of shrink candidate evaluations; zero disables shrinking
    pub max_shrinks: usize,
    /// Upper bound of the size parameter handed to generators
    pub max_size: usize,
    /// Replay a recorded case on the first iteration
    pub replay: Option<ReplayToken>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            max_successful_tests: 100,
            max_discard_ratio: 0.9,
            discard_warmup: 0,
            max_shrinks: 1000,
            max_size: 100,
            replay: None,
        }
    }
}

impl CheckerConfig {
    /// Create a new checker configuration with validation
    pub fn new(
        max_successful_tests: usize,
        max_discard_ratio: f64,
        max_shrinks: usize,
        max_size: usize,
        replay: Option<ReplayToken>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            max_successful_tests,
            max_discard_ratio,
            discard_warmup: 0,
            max_shrinks,
            max_size,
            replay,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the checker configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_successful_tests == 0 {
            return Err(ConfigError::InvalidSuccessfulTests(
                self.max_successful_tests,
            ));
        }
        if !(0.0..1.0).contains(&self.max_discard_ratio) {
            return Err(ConfigError::InvalidDiscardRatio(self.max_discard_ratio));
        }
        if self.max_size == 0 {
            return Err(ConfigError::InvalidMaxSize(self.max_size));
        }
        Ok(())
    }

    /// Set the number of passing cases required
    pub fn with_successful_tests(mut self, count: usize) -> Self {
        self.max_successful_tests = count;
        self
    }

    /// Set the tolerated discard ratio
    pub fn with_discard_ratio(mut self, ratio: f64) -> Self {
        self.max_discard_ratio = ratio;
        self
    }

    /// Let `cases` draws pass before the discard ratio is enforced
    pub fn with_discard_warmup(mut self, cases: usize) -> Self {
        self.discard_warmup = cases;
        self
    }

    /// Set the shrink evaluation budget
    pub fn with_max_shrinks(mut self, max_shrinks: usize) -> Self {
        self.max_shrinks = max_shrinks;
        self
    }

    /// Set the maximum generation size
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Replay the case identified by `seed` and `size` first
    pub fn with_replay(mut self, seed: (u64, u64), size: usize) -> Self {
        self.replay = Some(ReplayToken::new(seed, size));
        self
    }

    /// Replay a token taken from an earlier report
    pub fn with_replay_token(mut self, token: ReplayToken) -> Self {
        self.replay = Some(token);
        self
    }

    /// Create a checker configuration from global defaults with optional overrides
    pub fn from_global_with_overrides(
        global: &GlobalConfig,
        max_successful_tests: Option<usize>,
        replay: Option<ReplayToken>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            max_successful_tests: max_successful_tests
                .unwrap_or(global.default_successful_tests),
            max_discard_ratio: global.default_discard_ratio,
            discard_warmup: global.default_discard_warmup,
            max_shrinks: global.default_max_shrinks,
            max_size: global.default_max_size,
            replay,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Process-wide defaults every new checker starts from
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalConfig {
    /// Default number of passing cases
    pub default_successful_tests: usize,
    /// Default discard ratio
    pub default_discard_ratio: f64,
    /// Default discard warm-up
    pub default_discard_warmup: usize,
    /// Default shrink budget
    pub default_max_shrinks: usize,
    /// Default maximum size
    pub default_max_size: usize,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        let defaults = CheckerConfig::default();
        Self {
            default_successful_tests: defaults.max_successful_tests,
            default_discard_ratio: defaults.max_discard_ratio,
            default_discard_warmup: defaults.discard_warmup,
            default_max_shrinks: defaults.max_shrinks,
            default_max_size: defaults.max_size,
        }
    }
}

impl GlobalConfig {
    /// Validate the global configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        CheckerConfig::from_global_with_overrides(self, None, None).map(|_| ())
    }
}

/// Holds the global defaults for the current thread
#[derive(Debug, Default)]
pub struct ConfigManager {
    global_config: GlobalConfig,
}

impl ConfigManager {
    /// Create a new configuration manager with default global configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new configuration manager with custom global configuration
    pub fn with_global_config(global_config: GlobalConfig) -> Result<Self, ConfigError> {
        global_config.validate()?;
        Ok(Self { global_config })
    }

    /// Get the current global configuration
    pub fn global_config(&self) -> &GlobalConfig {
        &self.global_config
    }

    /// Update the global configuration
    pub fn set_global_config(&mut self, global_config: GlobalConfig) -> Result<(), ConfigError> {
        global_config.validate()?;
        self.global_config = global_config;
        Ok(())
    }

    /// Create a checker configuration that inherits from global defaults
    pub fn create_checker_config(&self) -> CheckerConfig {
        CheckerConfig::from_global_with_overrides(&self.global_config, None, None)
            .unwrap_or_default()
    }
}

// Thread-local global configuration manager (doc comment not allowed on thread_local!)
thread_local! {
    static CONFIG_MANAGER: std::cell::RefCell<ConfigManager> = std::cell::RefCell::new(ConfigManager::new());
}

/// Get the current global configuration
pub fn get_global_config() -> GlobalConfig {
    CONFIG_MANAGER.with(|manager| manager.borrow().global_config().clone())
}

/// Set the global configuration
pub fn set_global_config(config: GlobalConfig) -> Result<(), ConfigError> {
    CONFIG_MANAGER.with(|manager| manager.borrow_mut().set_global_config(config))
}

/// Create a checker configuration that inherits from global defaults
pub fn create_checker_config() -> CheckerConfig {
    CONFIG_MANAGER.with(|manager| manager.borrow().create_checker_config())
}

//! Test and scoring configuration
//!
//! Both structs deserialize from partial JSON; missing fields take the
//! defaults below.

use serde::{Deserialize, Serialize};

use crate::error::ReadinessError;

/// Default Go/No-Go block duration (30 s)
pub const DEFAULT_GO_BLOCK_MS: u64 = 30_000;
/// Default spacing between Go/No-Go stimuli
pub const DEFAULT_GO_INTERVAL_MS: u64 = 1_400;
/// Default Go/No-Go response window
pub const DEFAULT_GO_WINDOW_MS: u64 = 1_200;
/// Default probability of a green (go) stimulus
pub const DEFAULT_GO_PROBABILITY: f64 = 0.65;
/// Default Stroop block duration (30 s)
pub const DEFAULT_STROOP_BLOCK_MS: u64 = 30_000;
/// Default Stroop response window
pub const DEFAULT_STROOP_WINDOW_MS: u64 = 2_500;
/// Default pause between a Stroop response and the next stimulus
pub const DEFAULT_STROOP_GAP_MS: u64 = 250;
/// Longest accepted block (1 h)
pub const MAX_BLOCK_MS: u64 = 3_600_000;

/// Timing and randomness of a readiness test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    pub go_block_ms: u64,
    pub go_interval_ms: u64,
    pub go_window_ms: u64,
    pub go_probability: f64,
    pub stroop_block_ms: u64,
    pub stroop_window_ms: u64,
    pub stroop_gap_ms: u64,
    /// Fixed seed for reproducible stimulus sequences
    pub seed: Option<u64>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            go_block_ms: DEFAULT_GO_BLOCK_MS,
            go_interval_ms: DEFAULT_GO_INTERVAL_MS,
            go_window_ms: DEFAULT_GO_WINDOW_MS,
            go_probability: DEFAULT_GO_PROBABILITY,
            stroop_block_ms: DEFAULT_STROOP_BLOCK_MS,
            stroop_window_ms: DEFAULT_STROOP_WINDOW_MS,
            stroop_gap_ms: DEFAULT_STROOP_GAP_MS,
            seed: None,
        }
    }
}

impl TestConfig {
    /// Parse a (possibly partial) JSON configuration and validate it
    pub fn from_json(json: &str) -> Result<Self, ReadinessError> {
        let config: TestConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), ReadinessError> {
        if self.go_block_ms == 0 || self.stroop_block_ms == 0 {
            return Err(ReadinessError::InvalidConfig(
                "block durations must be greater than zero".to_string(),
            ));
        }
        if self.go_block_ms > MAX_BLOCK_MS || self.stroop_block_ms > MAX_BLOCK_MS {
            return Err(ReadinessError::InvalidConfig(format!(
                "block durations must not exceed {} ms",
                MAX_BLOCK_MS
            )));
        }
        if self.go_interval_ms == 0 || self.go_window_ms == 0 || self.stroop_window_ms == 0 {
            return Err(ReadinessError::InvalidConfig(
                "intervals and response windows must be greater than zero".to_string(),
            ));
        }
        if self.go_interval_ms > self.go_block_ms {
            return Err(ReadinessError::InvalidConfig(format!(
                "go_interval_ms ({}) must not exceed go_block_ms ({})",
                self.go_interval_ms, self.go_block_ms
            )));
        }
        if self.stroop_window_ms > self.stroop_block_ms
            || self.stroop_gap_ms > self.stroop_block_ms
        {
            return Err(ReadinessError::InvalidConfig(format!(
                "stroop window and gap must not exceed stroop_block_ms ({})",
                self.stroop_block_ms
            )));
        }
        // Each Go/No-Go window must close before the next stimulus appears
        if self.go_window_ms >= self.go_interval_ms {
            return Err(ReadinessError::InvalidConfig(format!(
                "go_window_ms ({}) must be shorter than go_interval_ms ({})",
                self.go_window_ms, self.go_interval_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.go_probability) {
            return Err(ReadinessError::InvalidConfig(format!(
                "go_probability must be within [0, 1], got {}",
                self.go_probability
            )));
        }
        Ok(())
    }
}

/// Thresholds used by server-side scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Minimum score for `APTO`
    pub fit_threshold: f64,
    /// Minimum score for `ALERTA`; below is `ALTO_RISCO`
    pub alert_threshold: f64,
    /// Reaction time that earns the full speed component
    pub fast_reaction_ms: f64,
    /// Reaction time that earns no speed component
    pub slow_reaction_ms: f64,
    /// Sessions kept in each subject's rolling baseline
    pub baseline_window: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            fit_threshold: 70.0,
            alert_threshold: 50.0,
            fast_reaction_ms: 400.0,
            slow_reaction_ms: 1_500.0,
            baseline_window: 10,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ReadinessError> {
        if self.alert_threshold > self.fit_threshold {
            return Err(ReadinessError::InvalidConfig(
                "alert_threshold must not exceed fit_threshold".to_string(),
            ));
        }
        if self.fast_reaction_ms >= self.slow_reaction_ms {
            return Err(ReadinessError::InvalidConfig(
                "fast_reaction_ms must be below slow_reaction_ms".to_string(),
            ));
        }
        if self.baseline_window == 0 {
            return Err(ReadinessError::InvalidConfig(
                "baseline_window must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

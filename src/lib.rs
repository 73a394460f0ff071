//! Synheart Readiness - Cognitive readiness test engine
//!
//! Runs a fitness-for-duty check made of a Go/No-Go (sustained attention)
//! block followed by a Stroop block, collects every response as a typed event
//! and scores the session into a readiness score and a risk level.
//!
//! ## Modules
//!
//! - **Runner**: timer-driven block state machine owning all test state
//! - **Backend**: session creation and finalization (in-process or HTTP)
//! - **Scoring pipeline**: events → metrics → score → risk → subject baseline

pub mod backend;
pub mod baseline;
pub mod classifier;
pub mod config;
pub mod encoder;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod runner;
pub mod scoring;
pub mod simulate;
pub mod stimulus;
pub mod timer;
pub mod types;

pub use backend::{LocalBackend, ReadinessBackend};
pub use config::{ScoringConfig, TestConfig};
pub use error::ReadinessError;
pub use pipeline::{events_to_report, ReadinessProcessor};
pub use runner::{ReadinessTest, TestPhase};
pub use types::{
    BlockType, ErrorType, FinalizeResponse, ReadinessEvent, ReadinessResult, Response, RiskLevel,
    StimulusColor,
};

#[cfg(feature = "http")]
pub use backend::{HttpBackend, HttpBackendConfig};

/// Crate version embedded in reports
pub const READINESS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "synheart-readiness";

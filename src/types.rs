//! Core types for the readiness test
//!
//! This module defines the data that flows from the block runners through the
//! event accumulator to the scoring backend: stimuli, responses, events,
//! sessions and results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ReadinessError;

/// Test block identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    /// Go/No-Go block
    SustainedAttention,
    /// Color-word conflict block
    Stroop,
}

impl BlockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::SustainedAttention => "sustained_attention",
            BlockType::Stroop => "stroop",
        }
    }
}

/// Colors used by both blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StimulusColor {
    Red,
    Green,
    Blue,
    Yellow,
}

impl StimulusColor {
    /// Every color, in a stable order
    pub const ALL: [StimulusColor; 4] = [
        StimulusColor::Red,
        StimulusColor::Green,
        StimulusColor::Blue,
        StimulusColor::Yellow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StimulusColor::Red => "red",
            StimulusColor::Green => "green",
            StimulusColor::Blue => "blue",
            StimulusColor::Yellow => "yellow",
        }
    }

    /// Word shown on screen for this color
    pub fn word(&self) -> &'static str {
        match self {
            StimulusColor::Red => "VERMELHO",
            StimulusColor::Green => "VERDE",
            StimulusColor::Blue => "AZUL",
            StimulusColor::Yellow => "AMARELO",
        }
    }
}

impl fmt::Display for StimulusColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StimulusColor {
    type Err = ReadinessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "red" => Ok(StimulusColor::Red),
            "green" => Ok(StimulusColor::Green),
            "blue" => Ok(StimulusColor::Blue),
            "yellow" => Ok(StimulusColor::Yellow),
            other => Err(ReadinessError::ParseError(format!("unknown color: {}", other))),
        }
    }
}

/// Stimulus category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StimulusKind {
    Go,
    NoGo,
    Stroop,
}

/// A stimulus presented to the subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stimulus {
    pub kind: StimulusKind,
    /// Text displayed (color word for Stroop, color name for Go/No-Go)
    pub value: String,
    /// Color the stimulus is rendered in
    pub color: StimulusColor,
}

impl Stimulus {
    /// Go/No-Go stimulus: green is a go signal, anything else is no-go
    pub fn go_no_go(color: StimulusColor) -> Self {
        let kind = if color == StimulusColor::Green {
            StimulusKind::Go
        } else {
            StimulusKind::NoGo
        };
        Self {
            kind,
            value: color.as_str().to_string(),
            color,
        }
    }

    /// Stroop stimulus: `word` names a color, `ink` is the rendered color
    pub fn stroop(word: StimulusColor, ink: StimulusColor) -> Self {
        Self {
            kind: StimulusKind::Stroop,
            value: word.word().to_string(),
            color: ink,
        }
    }

    /// Response the subject is expected to give
    pub fn expected_response(&self) -> Response {
        match self.kind {
            StimulusKind::Go => Response::Click,
            StimulusKind::NoGo => Response::NoClick,
            StimulusKind::Stroop => Response::Color(self.color),
        }
    }
}

/// A subject response; serialized as a lowercase string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Response {
    Click,
    NoClick,
    Color(StimulusColor),
}

impl Response {
    pub fn as_str(&self) -> &'static str {
        match self {
            Response::Click => "click",
            Response::NoClick => "no_click",
            Response::Color(color) => color.as_str(),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Response> for String {
    fn from(response: Response) -> Self {
        response.as_str().to_string()
    }
}

impl TryFrom<String> for Response {
    type Error = ReadinessError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "click" => Ok(Response::Click),
            "no_click" | "no-click" => Ok(Response::NoClick),
            other => other.parse().map(Response::Color),
        }
    }
}

/// Error classification of a single response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    None,
    Omission,
    Commission,
    Conflict,
}

/// Session lifecycle on the server side
///
/// A session is `Open` from creation until its events are scored, then
/// `Finalized`. A rejected submission leaves it `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Open,
    Finalized,
}

/// A readiness test session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessSession {
    pub id: String,
    pub subject_id: String,
    pub created_at: DateTime<Utc>,
    pub status: SessionStatus,
}

/// One recorded response (or non-response) to one stimulus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessEvent {
    pub session_id: String,
    pub block_type: BlockType,
    pub timestamp: DateTime<Utc>,
    pub stimulus_type: StimulusKind,
    pub stimulus_value: String,
    pub stimulus_color: StimulusColor,
    pub expected_response: Response,
    pub observed_response: Option<Response>,
    /// Milliseconds from stimulus onset; `None` on timeout
    pub reaction_time_ms: Option<u32>,
    pub is_correct: bool,
    pub error_type: ErrorType,
}

/// Fitness-for-duty classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Apto,
    Alerta,
    AltoRisco,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Apto => "APTO",
            RiskLevel::Alerta => "ALERTA",
            RiskLevel::AltoRisco => "ALTO_RISCO",
        }
    }
}

/// Body returned by the finalize endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizeResponse {
    pub score: f64,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub deviation_created: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deviation_id: Option<String>,
}

/// Per-block aggregate metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockMetrics {
    pub stimuli: u32,
    pub correct: u32,
    pub omissions: u32,
    pub commissions: u32,
    pub conflicts: u32,
    /// Stimuli that expected a withheld response
    pub no_go_stimuli: u32,
    /// correct / stimuli (0-1)
    pub accuracy: f64,
    /// Mean reaction time of answered stimuli
    pub mean_reaction_ms: Option<f64>,
    /// Population standard deviation of answered reaction times
    pub reaction_sd_ms: Option<f64>,
}

/// Derived metrics for a whole session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadinessMetrics {
    pub sustained_attention: BlockMetrics,
    pub stroop: BlockMetrics,
    /// Mean reaction time across both blocks
    pub mean_reaction_ms: Option<f64>,
}

/// Score relative to the subject's own history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectBaseline {
    /// Mean score over the baseline window, before this session
    pub score_baseline: Option<f64>,
    /// Deviation of this session from the baseline (percentage)
    pub score_deviation_pct: Option<f64>,
    pub sessions_in_baseline: u32,
}

/// Full scoring outcome of a finalized session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessResult {
    pub session_id: String,
    pub score: f64,
    pub risk_level: RiskLevel,
    pub metrics: ReadinessMetrics,
    pub baseline: SubjectBaseline,
    pub deviation_id: Option<String>,
}

impl ReadinessResult {
    pub fn to_finalize_response(&self) -> FinalizeResponse {
        FinalizeResponse {
            score: self.score,
            risk_level: self.risk_level,
            deviation_created: self.deviation_id.is_some(),
            deviation_id: self.deviation_id.clone(),
        }
    }
}

/// Safety deviation opened automatically for a high-risk result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviationRecord {
    pub id: String,
    pub subject_id: String,
    pub session_id: String,
    pub score: f64,
    pub risk_level: RiskLevel,
    pub created_at: DateTime<Utc>,
    pub description: String,
}

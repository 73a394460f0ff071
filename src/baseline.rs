//! Subject baseline management
//!
//! Keeps a rolling window of past readiness scores per subject so a result can
//! be read against the subject's own history as well as the fixed thresholds.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::types::SubjectBaseline;

/// Default baseline window in sessions
pub const DEFAULT_SUBJECT_BASELINE_WINDOW: usize = 10;

/// Rolling score history keyed by subject
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectBaselineStore {
    scores: HashMap<String, VecDeque<f64>>,
    /// Maximum window size (number of sessions per subject)
    window_size: usize,
}

impl Default for SubjectBaselineStore {
    fn default() -> Self {
        Self::new(DEFAULT_SUBJECT_BASELINE_WINDOW)
    }
}

impl SubjectBaselineStore {
    pub fn new(window_size: usize) -> Self {
        Self {
            scores: HashMap::new(),
            window_size: window_size.max(1),
        }
    }

    /// Compare `score` with the subject's baseline, then add it to the window
    pub fn update_and_contextualize(&mut self, subject_id: &str, score: f64) -> SubjectBaseline {
        // Deviation is measured against history that excludes this session
        let score_baseline = self.baseline_for(subject_id);
        let score_deviation_pct = calculate_deviation(score, score_baseline);

        let window = self.scores.entry(subject_id.to_string()).or_default();
        window.push_back(score);
        while window.len() > self.window_size {
            window.pop_front();
        }

        SubjectBaseline {
            score_baseline,
            score_deviation_pct,
            sessions_in_baseline: window.len() as u32,
        }
    }

    /// Rolling mean score for a subject
    pub fn baseline_for(&self, subject_id: &str) -> Option<f64> {
        let window = self.scores.get(subject_id)?;
        if window.is_empty() {
            return None;
        }
        Some(window.iter().sum::<f64>() / window.len() as f64)
    }

    pub fn session_count(&self, subject_id: &str) -> usize {
        self.scores.get(subject_id).map(VecDeque::len).unwrap_or(0)
    }

    /// Restore a store; a persisted window of zero is raised to one session
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut store: Self = serde_json::from_str(json)?;
        store.window_size = store.window_size.max(1);
        Ok(store)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn clear(&mut self) {
        self.scores.clear();
    }
}

fn calculate_deviation(current: f64, baseline: Option<f64>) -> Option<f64> {
    match baseline {
        Some(base) if base > 0.0 => Some(((current - base) / base) * 100.0),
        Some(_) if current > 0.0 => Some(100.0),
        Some(_) => Some(0.0),
        None => None,
    }
}

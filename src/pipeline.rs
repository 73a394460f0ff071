//! Scoring pipeline orchestration
//!
//! Server-side path from a finalized event list to a scored result:
//! events → metrics → score → risk level → subject baseline.

use crate::baseline::SubjectBaselineStore;
use crate::config::ScoringConfig;
use crate::encoder::ReportEncoder;
use crate::error::ReadinessError;
use crate::metrics::MetricsDeriver;
use crate::scoring::ReadinessScorer;
use crate::types::{ReadinessEvent, ReadinessResult};

/// Parse a JSON array of events
pub fn parse_events(json: &str) -> Result<Vec<ReadinessEvent>, ReadinessError> {
    serde_json::from_str(json)
        .map_err(|e| ReadinessError::ParseError(format!("Failed to parse readiness events: {}", e)))
}

/// Score an event list with default thresholds and no history (stateless, one-shot).
///
/// The session id is taken from the events; every event must carry the same one.
///
/// # Example
/// ```ignore
/// let report_json = events_to_report(events_json)?;
/// ```
pub fn events_to_report(events_json: &str) -> Result<String, ReadinessError> {
    let events = parse_events(events_json)?;
    let session_id = single_session_id(&events)?;

    let mut processor = ReadinessProcessor::new();
    let result = processor.process(None, &session_id, &events)?;

    ReportEncoder::new().encode_to_json(None, &events, &result)
}

/// The one session id shared by all events
pub fn single_session_id(events: &[ReadinessEvent]) -> Result<String, ReadinessError> {
    let first = events.first().ok_or(ReadinessError::MissingSession)?;
    if let Some(other) = events.iter().find(|e| e.session_id != first.session_id) {
        return Err(ReadinessError::ForeignEvent {
            expected: first.session_id.clone(),
            found: other.session_id.clone(),
        });
    }
    Ok(first.session_id.clone())
}

/// Stateful processor that keeps subject baselines across sessions
pub struct ReadinessProcessor {
    scorer: ReadinessScorer,
    baseline_store: SubjectBaselineStore,
}

impl Default for ReadinessProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessProcessor {
    pub fn new() -> Self {
        Self::build(ScoringConfig::default())
    }

    /// Processor with custom thresholds; the config must pass [`ScoringConfig::validate`]
    pub fn with_config(config: ScoringConfig) -> Result<Self, ReadinessError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: ScoringConfig) -> Self {
        Self {
            baseline_store: SubjectBaselineStore::new(config.baseline_window),
            scorer: ReadinessScorer::new(config),
        }
    }

    /// Score a session's events
    ///
    /// Events from a different session are rejected. When `subject_id` is
    /// given the score is compared with, then added to, that subject's
    /// baseline.
    pub fn process(
        &mut self,
        subject_id: Option<&str>,
        session_id: &str,
        events: &[ReadinessEvent],
    ) -> Result<ReadinessResult, ReadinessError> {
        if let Some(foreign) = events.iter().find(|e| e.session_id != session_id) {
            return Err(ReadinessError::ForeignEvent {
                expected: session_id.to_string(),
                found: foreign.session_id.clone(),
            });
        }

        let metrics = MetricsDeriver::derive(events);
        let score = self.scorer.score(&metrics);
        let risk_level = self.scorer.risk_level(score);

        let baseline = match subject_id {
            Some(subject) => self.baseline_store.update_and_contextualize(subject, score),
            None => Default::default(),
        };

        Ok(ReadinessResult {
            session_id: session_id.to_string(),
            score,
            risk_level,
            metrics,
            baseline,
            deviation_id: None,
        })
    }

    pub fn save_baselines(&self) -> Result<String, ReadinessError> {
        self.baseline_store
            .to_json()
            .map_err(ReadinessError::JsonError)
    }

    pub fn load_baselines(&mut self, json: &str) -> Result<(), ReadinessError> {
        self.baseline_store = SubjectBaselineStore::from_json(json)
            .map_err(|e| ReadinessError::ParseError(e.to_string()))?;
        Ok(())
    }

    pub fn baseline_session_count(&self, subject_id: &str) -> usize {
        self.baseline_store.session_count(subject_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::tests::event;
    use crate::types::{BlockType, Response, RiskLevel, Stimulus, StimulusColor};

    fn perfect_events() -> Vec<ReadinessEvent> {
        let mut events = Vec::new();
        for i in 0..20 {
            let (stimulus, observed, rt) = if i % 3 == 0 {
                (Stimulus::go_no_go(StimulusColor::Red), None, None)
            } else {
                (
                    Stimulus::go_no_go(StimulusColor::Green),
                    Some(Response::Click),
                    Some(320),
                )
            };
            events.push(event(BlockType::SustainedAttention, stimulus, observed, rt));
        }
        for _ in 0..10 {
            events.push(event(
                BlockType::Stroop,
                Stimulus::stroop(StimulusColor::Yellow, StimulusColor::Green),
                Some(Response::Color(StimulusColor::Green)),
                Some(380),
            ));
        }
        events
    }

    #[test]
    fn test_process_perfect_session() {
        let mut processor = ReadinessProcessor::new();
        let result = processor.process(Some("worker-1"), "sess-1", &perfect_events()).unwrap();

        assert_eq!(result.score, 100.0);
        assert_eq!(result.risk_level, RiskLevel::Apto);
        assert_eq!(result.metrics.sustained_attention.stimuli, 20);
        assert_eq!(result.metrics.stroop.stimuli, 10);
        assert_eq!(result.baseline.sessions_in_baseline, 1);
        assert_eq!(processor.baseline_session_count("worker-1"), 1);
    }

    #[test]
    fn test_rejects_foreign_events() {
        let mut processor = ReadinessProcessor::new();
        let result = processor.process(None, "other-session", &perfect_events());
        assert!(matches!(result, Err(ReadinessError::ForeignEvent { .. })));
    }

    #[test]
    fn test_events_to_report_stateless() {
        let json = serde_json::to_string(&perfect_events()).unwrap();
        let report = events_to_report(&json).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&report).unwrap();
        assert_eq!(parsed["provenance"]["session_id"], "sess-1");
        assert_eq!(parsed["risk_level"], "APTO");
        assert_eq!(parsed["event_count"], 30);
    }

    #[test]
    fn test_events_to_report_requires_events() {
        assert!(matches!(events_to_report("[]"), Err(ReadinessError::MissingSession)));
        assert!(matches!(
            events_to_report("not json"),
            Err(ReadinessError::ParseError(_))
        ));
    }

    #[test]
    fn test_with_config_rejects_inverted_thresholds() {
        let config = ScoringConfig {
            fit_threshold: 40.0,
            alert_threshold: 60.0,
            ..ScoringConfig::default()
        };
        assert!(matches!(
            ReadinessProcessor::with_config(config),
            Err(ReadinessError::InvalidConfig(_))
        ));

        let strict = ScoringConfig {
            fit_threshold: 90.0,
            ..ScoringConfig::default()
        };
        let mut processor = ReadinessProcessor::with_config(strict).unwrap();
        let result = processor.process(None, "sess-1", &perfect_events()).unwrap();
        assert_eq!(result.risk_level, RiskLevel::Apto);
    }

    #[test]
    fn test_loaded_zero_window_still_tracks() {
        let mut processor = ReadinessProcessor::new();
        processor
            .load_baselines(r#"{"scores": {}, "window_size": 0}"#)
            .unwrap();

        processor.process(Some("worker-1"), "sess-1", &perfect_events()).unwrap();
        let result = processor.process(Some("worker-1"), "sess-1", &perfect_events()).unwrap();
        assert_eq!(processor.baseline_session_count("worker-1"), 1);
        assert_eq!(result.baseline.score_baseline, Some(100.0));
    }

    #[test]
    fn test_baseline_persistence() {
        let mut processor = ReadinessProcessor::new();
        processor.process(Some("worker-1"), "sess-1", &perfect_events()).unwrap();
        let saved = processor.save_baselines().unwrap();

        let mut restored = ReadinessProcessor::new();
        restored.load_baselines(&saved).unwrap();
        let result = restored.process(Some("worker-1"), "sess-1", &perfect_events()).unwrap();

        assert_eq!(result.baseline.score_baseline, Some(100.0));
        assert_eq!(result.baseline.score_deviation_pct, Some(0.0));
        assert_eq!(restored.baseline_session_count("worker-1"), 2);
    }
}

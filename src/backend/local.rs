//! In-process backend
//!
//! Holds sessions in memory, scores them with [`ReadinessProcessor`] and opens
//! a deviation record whenever a session comes back `ALTO_RISCO`.

use chrono::Utc;
use log::{info, warn};
use std::collections::HashMap;
use uuid::Uuid;

use super::ReadinessBackend;
use crate::config::ScoringConfig;
use crate::error::ReadinessError;
use crate::pipeline::ReadinessProcessor;
use crate::types::{
    DeviationRecord, FinalizeResponse, ReadinessEvent, ReadinessResult, ReadinessSession,
    RiskLevel, SessionStatus,
};

/// Memory-backed sessions, results and deviations
#[derive(Default)]
pub struct LocalBackend {
    sessions: HashMap<String, ReadinessSession>,
    results: HashMap<String, ReadinessResult>,
    deviations: Vec<DeviationRecord>,
    processor: ReadinessProcessor,
}

impl LocalBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend scoring with custom thresholds
    pub fn with_scoring(config: ScoringConfig) -> Result<Self, ReadinessError> {
        Ok(Self {
            processor: ReadinessProcessor::with_config(config)?,
            ..Self::default()
        })
    }

    pub fn session(&self, session_id: &str) -> Option<&ReadinessSession> {
        self.sessions.get(session_id)
    }

    pub fn result(&self, session_id: &str) -> Option<&ReadinessResult> {
        self.results.get(session_id)
    }

    pub fn deviations(&self) -> &[DeviationRecord] {
        &self.deviations
    }

    pub fn processor(&self) -> &ReadinessProcessor {
        &self.processor
    }

    fn open_deviation(&mut self, session: &ReadinessSession, result: &ReadinessResult) -> String {
        let id = Uuid::new_v4().to_string();
        let record = DeviationRecord {
            id: id.clone(),
            subject_id: session.subject_id.clone(),
            session_id: session.id.clone(),
            score: result.score,
            risk_level: result.risk_level,
            created_at: Utc::now(),
            description: format!(
                "Readiness test scored {:.1} ({}) for subject {}",
                result.score,
                result.risk_level.as_str(),
                session.subject_id
            ),
        };
        warn!(
            "high-risk readiness result, opened deviation {} for session {}",
            id, session.id
        );
        self.deviations.push(record);
        id
    }
}

impl ReadinessBackend for LocalBackend {
    fn create_session(&mut self, subject_id: &str) -> Result<String, ReadinessError> {
        let subject_id = subject_id.trim();
        if subject_id.is_empty() {
            return Err(ReadinessError::MissingSubject);
        }

        let session = ReadinessSession {
            id: Uuid::new_v4().to_string(),
            subject_id: subject_id.to_string(),
            created_at: Utc::now(),
            status: SessionStatus::Open,
        };
        let id = session.id.clone();
        info!("opened readiness session {} for subject {}", id, subject_id);
        self.sessions.insert(id.clone(), session);
        Ok(id)
    }

    fn finalize_session(
        &mut self,
        session_id: &str,
        events: &[ReadinessEvent],
    ) -> Result<FinalizeResponse, ReadinessError> {
        let session = self
            .sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| ReadinessError::UnknownSession(session_id.to_string()))?;

        if session.status == SessionStatus::Finalized {
            return Err(ReadinessError::AlreadyFinalized(session_id.to_string()));
        }

        let mut result = self
            .processor
            .process(Some(&session.subject_id), session_id, events)?;

        if result.risk_level == RiskLevel::AltoRisco {
            result.deviation_id = Some(self.open_deviation(&session, &result));
        }

        if let Some(stored) = self.sessions.get_mut(session_id) {
            stored.status = SessionStatus::Finalized;
        }

        info!(
            "finalized session {} with {} events: score {:.1} ({})",
            session_id,
            events.len(),
            result.score,
            result.risk_level.as_str()
        );

        let response = result.to_finalize_response();
        self.results.insert(session_id.to_string(), result);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::tests::event;
    use crate::types::{BlockType, Response, Stimulus, StimulusColor};

    fn events_for(session_id: &str, observed: Option<Response>) -> Vec<ReadinessEvent> {
        (0..12)
            .map(|_| {
                let mut e = event(
                    BlockType::SustainedAttention,
                    Stimulus::go_no_go(StimulusColor::Green),
                    observed,
                    observed.map(|_| 300),
                );
                e.session_id = session_id.to_string();
                e
            })
            .collect()
    }

    #[test]
    fn test_create_requires_subject() {
        let mut backend = LocalBackend::new();
        assert!(matches!(
            backend.create_session("   "),
            Err(ReadinessError::MissingSubject)
        ));
    }

    #[test]
    fn test_finalize_at_most_once() {
        let mut backend = LocalBackend::new();
        let id = backend.create_session("worker-1").unwrap();
        assert_eq!(backend.session(&id).unwrap().status, SessionStatus::Open);

        let events = events_for(&id, Some(Response::Click));
        backend.finalize_session(&id, &events).unwrap();
        assert_eq!(backend.session(&id).unwrap().status, SessionStatus::Finalized);

        let again = backend.finalize_session(&id, &events);
        assert!(matches!(again, Err(ReadinessError::AlreadyFinalized(_))));
    }

    #[test]
    fn test_with_scoring_validates_and_applies_thresholds() {
        let inverted = ScoringConfig {
            alert_threshold: 95.0,
            ..ScoringConfig::default()
        };
        assert!(matches!(
            LocalBackend::with_scoring(inverted),
            Err(ReadinessError::InvalidConfig(_))
        ));

        // Every go stimulus hit at 300 ms, no Stroop block: 35 + 15 + 20 = 70
        let strict = ScoringConfig {
            fit_threshold: 80.0,
            ..ScoringConfig::default()
        };
        let mut backend = LocalBackend::with_scoring(strict).unwrap();
        let id = backend.create_session("worker-2").unwrap();
        let response = backend
            .finalize_session(&id, &events_for(&id, Some(Response::Click)))
            .unwrap();
        assert_eq!(response.score, 70.0);
        assert_eq!(response.risk_level, RiskLevel::Alerta);
        assert!(!response.deviation_created);
    }

    #[test]
    fn test_unknown_session() {
        let mut backend = LocalBackend::new();
        let result = backend.finalize_session("missing", &[]);
        assert!(matches!(result, Err(ReadinessError::UnknownSession(_))));
    }

    #[test]
    fn test_foreign_events_leave_session_open() {
        let mut backend = LocalBackend::new();
        let id = backend.create_session("worker-1").unwrap();

        let result = backend.finalize_session(&id, &events_for("someone-else", None));
        assert!(matches!(result, Err(ReadinessError::ForeignEvent { .. })));
        assert_eq!(backend.session(&id).unwrap().status, SessionStatus::Open);
    }

    #[test]
    fn test_high_risk_opens_deviation() {
        let mut backend = LocalBackend::new();
        let id = backend.create_session("worker-9").unwrap();

        // Every go stimulus missed, no Stroop block
        let response = backend.finalize_session(&id, &events_for(&id, None)).unwrap();
        assert_eq!(response.risk_level, RiskLevel::AltoRisco);
        assert!(response.deviation_created);

        let deviations = backend.deviations();
        assert_eq!(deviations.len(), 1);
        assert_eq!(deviations[0].subject_id, "worker-9");
        assert_eq!(deviations[0].session_id, id);
        assert_eq!(response.deviation_id.as_deref(), Some(deviations[0].id.as_str()));
        assert!(backend.result(&id).is_some());
    }
}

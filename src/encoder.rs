//! Readiness report encoder
//!
//! Encodes a scored session into a self-describing JSON report with producer,
//! provenance and quality metadata.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ReadinessError;
use crate::types::{
    ReadinessEvent, ReadinessMetrics, ReadinessResult, RiskLevel, SubjectBaseline,
};
use crate::{PRODUCER_NAME, READINESS_VERSION};

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Below this many events the report is flagged as thin
const LOW_EVENT_COUNT: usize = 10;

/// Omission share above which the report is flagged
const HIGH_OMISSION_RATE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportQualityFlag {
    LowEventCount,
    HighOmissionRate,
    MissingStroopBlock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProvenance {
    pub session_id: String,
    pub subject_id: Option<String>,
    pub started_at_utc: Option<String>,
    pub computed_at_utc: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub provenance: ReportProvenance,
    pub score: f64,
    pub risk_level: RiskLevel,
    pub deviation_id: Option<String>,
    pub metrics: ReadinessMetrics,
    pub baseline: SubjectBaseline,
    pub event_count: usize,
    pub quality_flags: Vec<ReportQualityFlag>,
}

/// Report encoder
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn encode(
        &self,
        subject_id: Option<&str>,
        events: &[ReadinessEvent],
        result: &ReadinessResult,
    ) -> ReadinessReport {
        let started_at = events.iter().map(|e| e.timestamp).min();

        ReadinessReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: READINESS_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            provenance: ReportProvenance {
                session_id: result.session_id.clone(),
                subject_id: subject_id.map(str::to_string),
                started_at_utc: started_at.map(|t| t.to_rfc3339()),
                computed_at_utc: Utc::now().to_rfc3339(),
            },
            score: result.score,
            risk_level: result.risk_level,
            deviation_id: result.deviation_id.clone(),
            metrics: result.metrics.clone(),
            baseline: result.baseline.clone(),
            event_count: events.len(),
            quality_flags: quality_flags(events.len(), &result.metrics),
        }
    }

    pub fn encode_to_json(
        &self,
        subject_id: Option<&str>,
        events: &[ReadinessEvent],
        result: &ReadinessResult,
    ) -> Result<String, ReadinessError> {
        let report = self.encode(subject_id, events, result);
        serde_json::to_string_pretty(&report).map_err(ReadinessError::JsonError)
    }
}

fn quality_flags(event_count: usize, metrics: &ReadinessMetrics) -> Vec<ReportQualityFlag> {
    let mut flags = Vec::new();

    if event_count < LOW_EVENT_COUNT {
        flags.push(ReportQualityFlag::LowEventCount);
    }

    let stimuli = metrics.sustained_attention.stimuli + metrics.stroop.stimuli;
    let omissions = metrics.sustained_attention.omissions + metrics.stroop.omissions;
    if stimuli > 0 && omissions as f64 / stimuli as f64 > HIGH_OMISSION_RATE {
        flags.push(ReportQualityFlag::HighOmissionRate);
    }

    if metrics.stroop.stimuli == 0 {
        flags.push(ReportQualityFlag::MissingStroopBlock);
    }

    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::tests::event;
    use crate::metrics::MetricsDeriver;
    use crate::types::{BlockType, Response, Stimulus, StimulusColor};

    fn scored(events: &[ReadinessEvent]) -> ReadinessResult {
        ReadinessResult {
            session_id: "sess-1".to_string(),
            score: 42.0,
            risk_level: RiskLevel::AltoRisco,
            metrics: MetricsDeriver::derive(events),
            baseline: SubjectBaseline::default(),
            deviation_id: Some("dev-1".to_string()),
        }
    }

    #[test]
    fn test_encode_report() {
        let events = vec![event(
            BlockType::Stroop,
            Stimulus::stroop(StimulusColor::Blue, StimulusColor::Blue),
            Some(Response::Color(StimulusColor::Blue)),
            Some(640),
        )];
        let result = scored(&events);
        let encoder = ReportEncoder::with_instance_id("test-instance".to_string());
        let report = encoder.encode(Some("worker-7"), &events, &result);

        assert_eq!(report.report_version, REPORT_VERSION);
        assert_eq!(report.producer.name, PRODUCER_NAME);
        assert_eq!(report.producer.instance_id, "test-instance");
        assert_eq!(report.provenance.session_id, "sess-1");
        assert_eq!(report.provenance.subject_id.as_deref(), Some("worker-7"));
        assert!(report.provenance.started_at_utc.is_some());
        assert_eq!(report.event_count, 1);
        assert_eq!(report.deviation_id.as_deref(), Some("dev-1"));
        assert_eq!(report.quality_flags, vec![ReportQualityFlag::LowEventCount]);
    }

    #[test]
    fn test_high_omission_and_missing_stroop_flags() {
        let events: Vec<_> = (0..12)
            .map(|_| {
                event(
                    BlockType::SustainedAttention,
                    Stimulus::go_no_go(StimulusColor::Green),
                    None,
                    None,
                )
            })
            .collect();
        let result = scored(&events);
        let report = ReportEncoder::new().encode(None, &events, &result);

        assert!(report.quality_flags.contains(&ReportQualityFlag::HighOmissionRate));
        assert!(report.quality_flags.contains(&ReportQualityFlag::MissingStroopBlock));
        assert!(!report.quality_flags.contains(&ReportQualityFlag::LowEventCount));
    }

    #[test]
    fn test_encode_to_json() {
        let events = Vec::new();
        let result = scored(&events);
        let json = ReportEncoder::new().encode_to_json(None, &events, &result).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["report_version"], "1.0.0");
        assert_eq!(parsed["risk_level"], "ALTO_RISCO");
        assert_eq!(parsed["producer"]["name"], "synheart-readiness");
        assert!(parsed["provenance"]["started_at_utc"].is_null());
    }
}

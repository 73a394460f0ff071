//! Metric derivation
//!
//! Aggregates raw events into per-block counts, accuracy and reaction-time
//! statistics. Reaction times only come from answered stimuli; timeouts carry
//! no latency.

use crate::types::{BlockMetrics, BlockType, ErrorType, ReadinessEvent, ReadinessMetrics, Response};

/// Derives [`ReadinessMetrics`] from an event list
pub struct MetricsDeriver;

impl MetricsDeriver {
    pub fn derive(events: &[ReadinessEvent]) -> ReadinessMetrics {
        let sustained_attention = block_metrics(events, BlockType::SustainedAttention);
        let stroop = block_metrics(events, BlockType::Stroop);

        let all_rts: Vec<f64> = events
            .iter()
            .filter_map(|e| e.reaction_time_ms)
            .map(f64::from)
            .collect();

        ReadinessMetrics {
            sustained_attention,
            stroop,
            mean_reaction_ms: mean(&all_rts),
        }
    }
}

fn block_metrics(events: &[ReadinessEvent], block: BlockType) -> BlockMetrics {
    let mut metrics = BlockMetrics::default();
    let mut rts: Vec<f64> = Vec::new();

    for event in events.iter().filter(|e| e.block_type == block) {
        metrics.stimuli += 1;
        if event.is_correct {
            metrics.correct += 1;
        }
        if event.expected_response == Response::NoClick {
            metrics.no_go_stimuli += 1;
        }
        match event.error_type {
            ErrorType::None => {}
            ErrorType::Omission => metrics.omissions += 1,
            ErrorType::Commission => metrics.commissions += 1,
            ErrorType::Conflict => metrics.conflicts += 1,
        }
        if let Some(rt) = event.reaction_time_ms {
            rts.push(f64::from(rt));
        }
    }

    if metrics.stimuli > 0 {
        metrics.accuracy = metrics.correct as f64 / metrics.stimuli as f64;
    }
    metrics.mean_reaction_ms = mean(&rts);
    metrics.reaction_sd_ms = std_dev(&rts);
    metrics
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn std_dev(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::classifier::classify;
    use crate::types::{Stimulus, StimulusColor};
    use chrono::{TimeZone, Utc};

    /// Build a classified event the way the runner does
    pub(crate) fn event(
        block: BlockType,
        stimulus: Stimulus,
        observed: Option<Response>,
        rt: Option<u32>,
    ) -> ReadinessEvent {
        let expected = stimulus.expected_response();
        let classification = classify(block, expected, observed);
        ReadinessEvent {
            session_id: "sess-1".to_string(),
            block_type: block,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap(),
            stimulus_type: stimulus.kind,
            stimulus_value: stimulus.value,
            stimulus_color: stimulus.color,
            expected_response: expected,
            observed_response: observed,
            reaction_time_ms: rt,
            is_correct: classification.is_correct,
            error_type: classification.error_type,
        }
    }

    #[test]
    fn test_counts_by_block_and_error() {
        let events = vec![
            event(
                BlockType::SustainedAttention,
                Stimulus::go_no_go(StimulusColor::Green),
                Some(Response::Click),
                Some(300),
            ),
            event(
                BlockType::SustainedAttention,
                Stimulus::go_no_go(StimulusColor::Green),
                None,
                None,
            ),
            event(
                BlockType::SustainedAttention,
                Stimulus::go_no_go(StimulusColor::Red),
                Some(Response::Click),
                Some(500),
            ),
            event(
                BlockType::SustainedAttention,
                Stimulus::go_no_go(StimulusColor::Red),
                None,
                None,
            ),
            event(
                BlockType::Stroop,
                Stimulus::stroop(StimulusColor::Red, StimulusColor::Blue),
                Some(Response::Color(StimulusColor::Red)),
                Some(900),
            ),
        ];

        let metrics = MetricsDeriver::derive(&events);
        let go = &metrics.sustained_attention;
        assert_eq!(go.stimuli, 4);
        assert_eq!(go.correct, 2);
        assert_eq!(go.omissions, 1);
        assert_eq!(go.commissions, 1);
        assert_eq!(go.no_go_stimuli, 2);
        assert!((go.accuracy - 0.5).abs() < 1e-9);
        assert_eq!(go.mean_reaction_ms, Some(400.0));
        assert_eq!(go.reaction_sd_ms, Some(100.0));

        assert_eq!(metrics.stroop.stimuli, 1);
        assert_eq!(metrics.stroop.conflicts, 1);
        assert_eq!(metrics.stroop.accuracy, 0.0);

        // (300 + 500 + 900) / 3
        let overall = metrics.mean_reaction_ms.unwrap();
        assert!((overall - 566.666).abs() < 0.01);
    }

    #[test]
    fn test_empty_events() {
        let metrics = MetricsDeriver::derive(&[]);
        assert_eq!(metrics.sustained_attention.stimuli, 0);
        assert_eq!(metrics.sustained_attention.accuracy, 0.0);
        assert_eq!(metrics.mean_reaction_ms, None);
        assert_eq!(metrics.stroop.reaction_sd_ms, None);
    }
}

//! Readiness scoring
//!
//! Turns derived metrics into a 0-100 score and a risk level.

use crate::config::ScoringConfig;
use crate::types::{ReadinessMetrics, RiskLevel};

const WEIGHT_GO_ACCURACY: f64 = 0.35;
const WEIGHT_INHIBITION: f64 = 0.15;
const WEIGHT_STROOP_ACCURACY: f64 = 0.30;
const WEIGHT_SPEED: f64 = 0.20;

/// Score calculator bound to a set of thresholds
#[derive(Debug, Clone, Default)]
pub struct ReadinessScorer {
    config: ScoringConfig,
}

impl ReadinessScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Compute the readiness score (0-100, one decimal)
    ///
    /// Formula:
    /// ```text
    /// Score = 100 * ( 0.35 * go_accuracy
    ///               + 0.15 * inhibition
    ///               + 0.30 * stroop_accuracy
    ///               + 0.20 * speed )
    /// ```
    pub fn score(&self, metrics: &ReadinessMetrics) -> f64 {
        let go_accuracy = metrics.sustained_attention.accuracy;
        let inhibition = compute_inhibition(metrics);
        let stroop_accuracy = metrics.stroop.accuracy;
        let speed = self.compute_speed(metrics.mean_reaction_ms);

        let raw = WEIGHT_GO_ACCURACY * go_accuracy
            + WEIGHT_INHIBITION * inhibition
            + WEIGHT_STROOP_ACCURACY * stroop_accuracy
            + WEIGHT_SPEED * speed;

        ((raw * 100.0).clamp(0.0, 100.0) * 10.0).round() / 10.0
    }

    pub fn risk_level(&self, score: f64) -> RiskLevel {
        if score >= self.config.fit_threshold {
            RiskLevel::Apto
        } else if score >= self.config.alert_threshold {
            RiskLevel::Alerta
        } else {
            RiskLevel::AltoRisco
        }
    }

    /// Linear map from 1.0 at `fast_reaction_ms` to 0.0 at `slow_reaction_ms`
    fn compute_speed(&self, mean_reaction_ms: Option<f64>) -> f64 {
        let Some(rt) = mean_reaction_ms else {
            return 0.0;
        };
        let span = self.config.slow_reaction_ms - self.config.fast_reaction_ms;
        if span <= 0.0 {
            return 0.0;
        }
        ((self.config.slow_reaction_ms - rt) / span).clamp(0.0, 1.0)
    }
}

/// Share of no-go stimuli correctly withheld
fn compute_inhibition(metrics: &ReadinessMetrics) -> f64 {
    let block = &metrics.sustained_attention;
    if block.stimuli == 0 {
        return 0.0;
    }
    if block.no_go_stimuli == 0 {
        return 1.0;
    }
    let commission_rate = block.commissions as f64 / block.no_go_stimuli as f64;
    (1.0 - commission_rate).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BlockMetrics;

    fn metrics(go_acc: f64, commissions: u32, stroop_acc: f64, rt: Option<f64>) -> ReadinessMetrics {
        ReadinessMetrics {
            sustained_attention: BlockMetrics {
                stimuli: 20,
                no_go_stimuli: 8,
                commissions,
                accuracy: go_acc,
                ..BlockMetrics::default()
            },
            stroop: BlockMetrics {
                stimuli: 10,
                accuracy: stroop_acc,
                ..BlockMetrics::default()
            },
            mean_reaction_ms: rt,
        }
    }

    #[test]
    fn test_perfect_fast_session_scores_full() {
        let scorer = ReadinessScorer::default();
        let score = scorer.score(&metrics(1.0, 0, 1.0, Some(350.0)));
        assert_eq!(score, 100.0);
        assert_eq!(scorer.risk_level(score), RiskLevel::Apto);
    }

    #[test]
    fn test_speed_component_is_linear() {
        let scorer = ReadinessScorer::default();
        // RT halfway between 400 and 1500 ms gives half the speed weight
        let score = scorer.score(&metrics(1.0, 0, 1.0, Some(950.0)));
        assert_eq!(score, 90.0);
    }

    #[test]
    fn test_no_responses_is_high_risk() {
        let scorer = ReadinessScorer::default();
        let score = scorer.score(&metrics(0.4, 0, 0.0, None));
        // 0.35 * 0.4 + 0.15 * 1.0 = 0.29
        assert_eq!(score, 29.0);
        assert_eq!(scorer.risk_level(score), RiskLevel::AltoRisco);
    }

    #[test]
    fn test_commissions_reduce_inhibition() {
        let scorer = ReadinessScorer::default();
        let clean = scorer.score(&metrics(0.8, 0, 0.8, Some(600.0)));
        let impulsive = scorer.score(&metrics(0.8, 8, 0.8, Some(600.0)));
        assert!((clean - impulsive - 15.0).abs() < 0.05);
    }

    #[test]
    fn test_risk_thresholds() {
        let scorer = ReadinessScorer::default();
        assert_eq!(scorer.risk_level(70.0), RiskLevel::Apto);
        assert_eq!(scorer.risk_level(69.9), RiskLevel::Alerta);
        assert_eq!(scorer.risk_level(50.0), RiskLevel::Alerta);
        assert_eq!(scorer.risk_level(49.9), RiskLevel::AltoRisco);
    }

    #[test]
    fn test_empty_metrics_score_zero() {
        let scorer = ReadinessScorer::default();
        assert_eq!(scorer.score(&ReadinessMetrics::default()), 0.0);
    }
}

//! Scripted subjects
//!
//! Drives a [`ReadinessTest`] to completion with a synthetic responder. Used by
//! the CLI `simulate` command and by end-to-end tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::backend::ReadinessBackend;
use crate::error::ReadinessError;
use crate::runner::{ReadinessTest, TestPhase};
use crate::types::{BlockType, StimulusColor, StimulusKind};

/// Fastest plausible reaction
const MIN_REACTION_MS: f64 = 150.0;

/// Behaviour of a synthetic subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectProfile {
    /// Probability of clicking a go stimulus
    pub hit_rate: f64,
    /// Probability of clicking a no-go stimulus
    pub false_alarm_rate: f64,
    /// Probability of naming the ink color in Stroop
    pub stroop_accuracy: f64,
    pub mean_reaction_ms: f64,
    /// Uniform jitter around the mean reaction time
    pub reaction_jitter_ms: f64,
    pub seed: u64,
}

impl Default for SubjectProfile {
    fn default() -> Self {
        Self {
            hit_rate: 0.95,
            false_alarm_rate: 0.05,
            stroop_accuracy: 0.9,
            mean_reaction_ms: 450.0,
            reaction_jitter_ms: 120.0,
            seed: 1,
        }
    }
}

impl SubjectProfile {
    /// Never responds to anything
    pub fn unresponsive() -> Self {
        Self {
            hit_rate: 0.0,
            false_alarm_rate: 0.0,
            stroop_accuracy: 0.0,
            ..Self::default()
        }
    }
}

/// Synthetic responder bound to a profile
pub struct SimulatedSubject {
    profile: SubjectProfile,
    rng: StdRng,
}

impl SimulatedSubject {
    pub fn new(profile: SubjectProfile) -> Self {
        Self {
            rng: StdRng::seed_from_u64(profile.seed),
            profile,
        }
    }

    /// Run the test until it finishes; the test must already be started
    pub fn run<B: ReadinessBackend>(
        &mut self,
        test: &mut ReadinessTest<B>,
    ) -> Result<(), ReadinessError> {
        if test.phase() == TestPhase::Idle {
            return Err(ReadinessError::InvalidTransition(
                "simulation needs a started test".to_string(),
            ));
        }

        let mut decided = 0;
        while test.phase() != TestPhase::Finished {
            let open = test
                .current_stimulus()
                .filter(|_| test.stimuli_shown() != decided)
                .cloned();

            if let Some(open) = open {
                decided = test.stimuli_shown();
                let at = open.shown_at_ms + self.reaction_ms();
                if at < open.deadline_ms {
                    match open.block {
                        BlockType::SustainedAttention => {
                            if self.clicks(open.stimulus.kind) {
                                test.press(at)?;
                                continue;
                            }
                        }
                        BlockType::Stroop => {
                            if let Some(color) = self.stroop_answer(open.stimulus.color) {
                                test.answer(color, at)?;
                                continue;
                            }
                        }
                    }
                }
            }

            match test.next_deadline() {
                Some(next) => test.advance(next)?,
                None => break,
            }
        }

        Ok(())
    }

    fn reaction_ms(&mut self) -> u64 {
        let jitter = self.profile.reaction_jitter_ms.max(0.0);
        let offset = if jitter > 0.0 {
            self.rng.gen_range(-jitter..=jitter)
        } else {
            0.0
        };
        (self.profile.mean_reaction_ms + offset).max(MIN_REACTION_MS) as u64
    }

    fn clicks(&mut self, kind: StimulusKind) -> bool {
        let p = match kind {
            StimulusKind::Go => self.profile.hit_rate,
            _ => self.profile.false_alarm_rate,
        };
        self.rng.gen_bool(p.clamp(0.0, 1.0))
    }

    fn stroop_answer(&mut self, ink: StimulusColor) -> Option<StimulusColor> {
        if self.profile.stroop_accuracy <= 0.0 {
            return None;
        }
        if self.rng.gen_bool(self.profile.stroop_accuracy.clamp(0.0, 1.0)) {
            return Some(ink);
        }
        let wrong: Vec<_> = StimulusColor::ALL.into_iter().filter(|c| *c != ink).collect();
        Some(wrong[self.rng.gen_range(0..wrong.len())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;
    use crate::config::TestConfig;
    use crate::types::{ErrorType, RiskLevel};

    fn run(profile: SubjectProfile) -> ReadinessTest<LocalBackend> {
        let config = TestConfig::default().with_seed(11);
        let mut test = ReadinessTest::new(config, LocalBackend::new()).unwrap();
        test.start("worker-42").unwrap();
        SimulatedSubject::new(profile).run(&mut test).unwrap();
        test
    }

    #[test]
    fn test_attentive_subject_is_fit() {
        let profile = SubjectProfile {
            hit_rate: 1.0,
            false_alarm_rate: 0.0,
            stroop_accuracy: 1.0,
            mean_reaction_ms: 380.0,
            reaction_jitter_ms: 0.0,
            seed: 3,
        };
        let test = run(profile);

        assert_eq!(test.phase(), TestPhase::Finished);
        let result = test.result().unwrap();
        assert_eq!(result.score, 100.0);
        assert_eq!(result.risk_level, RiskLevel::Apto);
        assert!(!result.deviation_created);
        assert!(test.events().iter().all(|e| e.is_correct));
        assert_eq!(test.events().len() as u32, test.stimuli_shown());
    }

    #[test]
    fn test_unresponsive_subject_is_high_risk() {
        let test = run(SubjectProfile::unresponsive());

        let result = test.result().unwrap();
        assert_eq!(result.risk_level, RiskLevel::AltoRisco);
        assert!(result.deviation_created);
        assert_eq!(test.backend().deviations().len(), 1);
    }

    #[test]
    fn test_slow_subject_times_out() {
        let profile = SubjectProfile {
            mean_reaction_ms: 5_000.0,
            reaction_jitter_ms: 0.0,
            ..SubjectProfile::default()
        };
        let test = run(profile);

        assert!(test
            .events()
            .iter()
            .filter(|e| e.block_type == BlockType::Stroop)
            .all(|e| e.error_type == ErrorType::Omission && e.reaction_time_ms.is_none()));
    }

    #[test]
    fn test_event_count_equals_stimuli_shown() {
        let test = run(SubjectProfile::default());
        assert_eq!(test.events().len() as u32, test.stimuli_shown());

        let go = test
            .events()
            .iter()
            .filter(|e| e.block_type == BlockType::SustainedAttention)
            .count();
        assert_eq!(go, 21);
        assert!(test.events().len() > 21);
    }

    #[test]
    fn test_requires_started_test() {
        let mut test = ReadinessTest::new(TestConfig::default(), LocalBackend::new()).unwrap();
        let result = SimulatedSubject::new(SubjectProfile::default()).run(&mut test);
        assert!(matches!(result, Err(ReadinessError::InvalidTransition(_))));
    }
}

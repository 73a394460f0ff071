//! Stimulus generation
//!
//! The generator owns its random source so a seeded run reproduces the exact
//! color sequence of both blocks.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::{Stimulus, StimulusColor};

/// Produces Go/No-Go and Stroop stimuli
#[derive(Debug, Clone)]
pub struct StimulusGenerator {
    rng: StdRng,
    go_probability: f64,
}

impl StimulusGenerator {
    /// Generator with a fixed seed
    pub fn seeded(seed: u64, go_probability: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            go_probability,
        }
    }

    /// Generator seeded from the operating system
    pub fn from_entropy(go_probability: f64) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            go_probability,
        }
    }

    /// Green with `go_probability`, red otherwise
    pub fn next_go_no_go(&mut self) -> Stimulus {
        let color = if self.rng.gen_bool(self.go_probability.clamp(0.0, 1.0)) {
            StimulusColor::Green
        } else {
            StimulusColor::Red
        };
        Stimulus::go_no_go(color)
    }

    /// Word and ink drawn independently; they may coincide
    pub fn next_stroop(&mut self) -> Stimulus {
        let word = self.pick_color();
        let ink = self.pick_color();
        Stimulus::stroop(word, ink)
    }

    fn pick_color(&mut self) -> StimulusColor {
        StimulusColor::ALL[self.rng.gen_range(0..StimulusColor::ALL.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StimulusKind;

    #[test]
    fn test_seeded_sequence_is_reproducible() {
        let mut a = StimulusGenerator::seeded(42, 0.65);
        let mut b = StimulusGenerator::seeded(42, 0.65);

        let seq_a: Vec<_> = (0..50).map(|_| a.next_go_no_go().color).collect();
        let seq_b: Vec<_> = (0..50).map(|_| b.next_go_no_go().color).collect();
        assert_eq!(seq_a, seq_b);

        let stroop_a: Vec<_> = (0..20).map(|_| a.next_stroop()).collect();
        let stroop_b: Vec<_> = (0..20).map(|_| b.next_stroop()).collect();
        assert_eq!(stroop_a, stroop_b);
    }

    #[test]
    fn test_go_probability_extremes() {
        let mut always = StimulusGenerator::seeded(7, 1.0);
        assert!((0..100).all(|_| always.next_go_no_go().kind == StimulusKind::Go));

        let mut never = StimulusGenerator::seeded(7, 0.0);
        assert!((0..100).all(|_| never.next_go_no_go().kind == StimulusKind::NoGo));
    }

    #[test]
    fn test_go_ratio_near_configured_probability() {
        let mut generator = StimulusGenerator::seeded(1234, 0.65);
        let go = (0..5000)
            .filter(|_| generator.next_go_no_go().kind == StimulusKind::Go)
            .count();
        let ratio = go as f64 / 5000.0;
        assert!((ratio - 0.65).abs() < 0.05, "ratio was {}", ratio);
    }

    #[test]
    fn test_only_green_and_red_in_go_no_go() {
        let mut generator = StimulusGenerator::seeded(9, 0.5);
        for _ in 0..200 {
            let color = generator.next_go_no_go().color;
            assert!(color == StimulusColor::Green || color == StimulusColor::Red);
        }
    }
}

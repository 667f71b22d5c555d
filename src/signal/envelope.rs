//! Envelope detection
//!
//! Tracks the amplitude envelope of a signal with an asymmetric one-pole
//! smoother: a fast attack coefficient follows rising levels, a slow release
//! coefficient lets the level decay. The input may be band-limited first by
//! an optional pre-filter.

use crate::filter::SignalFilter;

/// An envelope detector
///
/// Rectifies the (optionally pre-filtered) input and smooths it with
/// exponential attack/release coefficients. The detector state persists
/// across calls, so a signal may be fed in arbitrary block sizes.
pub struct EnvelopeDetector {
    g_attack: f64,
    g_release: f64,
    level: f64,
    prefilter: Option<Box<dyn SignalFilter>>,
}

impl EnvelopeDetector {
    /// Creates an envelope detector
    ///
    /// # Arguments
    /// * `sample_rate` - Sampling rate in Hz
    /// * `attack_time` - Attack time constant in seconds (time for 1/e convergence)
    /// * `release_time` - Release time constant in seconds (time for 1/e convergence)
    /// * `prefilter` - Filter for pre-processing the signal, e.g. a bandpass
    ///   to limit the detector to the speech band. `None` bypasses filtering.
    pub fn new(
        sample_rate: f64,
        attack_time: f64,
        release_time: f64,
        prefilter: Option<Box<dyn SignalFilter>>,
    ) -> Self {
        Self {
            g_attack: (-1.0 / (sample_rate * attack_time)).exp(),
            g_release: (-1.0 / (sample_rate * release_time)).exp(),
            level: 0.0,
            prefilter,
        }
    }

    /// Processes one input sample and returns the current envelope level
    pub fn step(&mut self, input: f64) -> f64 {
        let prefiltered = match &mut self.prefilter {
            Some(filter) => filter.step(input),
            None => input,
        };
        let in_level = prefiltered.abs();
        let g = if in_level > self.level {
            self.g_attack
        } else {
            self.g_release
        };
        self.level = g * self.level + (1.0 - g) * in_level;
        self.level
    }

    /// Processes a block of samples and returns the envelope, one level per sample
    pub fn process(&mut self, input: &[f32]) -> Vec<f32> {
        input.iter().map(|&x| self.step(x as f64) as f32).collect()
    }

    /// Current envelope level
    pub fn level(&self) -> f64 {
        self.level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::EchoFilter;

    fn detector() -> EnvelopeDetector {
        EnvelopeDetector::new(48000.0, 0.0015, 0.03, None)
    }

    #[test]
    fn test_envelope_rises_toward_input_level() {
        let mut env = detector();
        let mut level = 0.0;
        for _ in 0..1000 {
            level = env.step(0.8);
        }
        assert!(level > 0.79, "envelope should converge upward, got {}", level);
        assert!(level <= 0.8);
    }

    #[test]
    fn test_release_decays_monotonically_to_zero() {
        let mut env = detector();
        for _ in 0..1000 {
            env.step(0.8);
        }
        let mut previous = env.level();
        for _ in 0..10000 {
            let level = env.step(0.0);
            assert!(level < previous, "decay must be strictly monotonic");
            assert!(level >= 0.0, "envelope must never go negative");
            previous = level;
        }
        assert!(previous < 1e-3, "envelope should approach zero, got {}", previous);
    }

    #[test]
    fn test_attack_faster_than_release() {
        let mut env = detector();
        let samples_to_reach = |env: &mut EnvelopeDetector, input: f64, target: f64| {
            let mut n = 0;
            while (env.level() - target).abs() > 0.1 {
                env.step(input);
                n += 1;
            }
            n
        };
        let rise = samples_to_reach(&mut env, 1.0, 1.0);
        let fall = samples_to_reach(&mut env, 0.0, 0.0);
        assert!(rise < fall, "attack ({}) should be faster than release ({})", rise, fall);
    }

    #[test]
    fn test_release_rate_follows_coefficient() {
        // After one release time constant the level must be close to 1/e.
        let release_time = 0.03;
        let mut env = EnvelopeDetector::new(48000.0, 0.0015, release_time, None);
        for _ in 0..48000 {
            env.step(1.0);
        }
        let start = env.level();
        for _ in 0..(48000.0 * release_time) as usize {
            env.step(0.0);
        }
        let ratio = env.level() / start;
        assert!((ratio - (-1.0f64).exp()).abs() < 0.01, "ratio {}", ratio);
    }

    #[test]
    fn test_prefilter_feeds_detector() {
        // An echo prefilter repeats the impulse, so the envelope gets
        // re-excited after the delay while the bypassed one keeps decaying.
        let echo = EchoFilter::new(32, 0.9).unwrap();
        let mut filtered = EnvelopeDetector::new(48000.0, 0.0015, 0.03, Some(Box::new(echo)));
        let mut plain = detector();
        let mut rebound = false;
        let mut previous_f = 0.0;
        for i in 0..256 {
            let x = if i == 0 { 1.0 } else { 0.0 };
            let f = filtered.step(x);
            plain.step(x);
            if i > 0 && f > previous_f {
                rebound = true;
            }
            previous_f = f;
        }
        assert!(rebound, "echoed impulse should re-excite the envelope");
    }

    #[test]
    fn test_process_matches_step() {
        let input: Vec<f32> = (0..100).map(|i| ((i as f32) * 0.1).sin()).collect();
        let mut a = detector();
        let mut b = detector();
        let block = a.process(&input);
        let single: Vec<f32> = input.iter().map(|&x| b.step(x as f64) as f32).collect();
        assert_eq!(block, single);
    }
}

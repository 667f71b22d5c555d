//! Brown noise generation
//!
//! Generates brown noise (brownian / red noise) by integrating white noise.
//! A first-order high-pass filter reduces DC drift and keeps clipping rare;
//! when the integration would leave the output range, the white-noise step
//! is reflected instead of clamped.

use thiserror::Error;

/// Errors from noise generator construction
#[derive(Error, Debug)]
pub enum NoiseError {
    #[error("invalid output range: min {min} must be below max {max}")]
    InvalidRange { min: f64, max: f64 },

    #[error("slope must be positive and below half the value range, got {0}")]
    InvalidSlope(f64),

    #[error("high-pass factor must be within 0 (inclusive) and 1 (exclusive), got {0}")]
    InvalidHighPass(f64),
}

/// xorshift64 pseudo-random generator for white noise
///
/// A tiny self-contained PRNG is all the noise source needs; quality
/// requirements are modest and reproducibility with a fixed seed matters
/// for tests.
#[derive(Debug, Clone)]
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 0x9E3779B97F4A7C15 } else { seed },
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform value in -1 .. 1
    fn next_bipolar(&mut self) -> f64 {
        // 53 random bits mapped to [0, 1), then centered
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64 * 2.0 - 1.0
    }
}

/// A brown noise generator
///
/// # Example
/// ```
/// use audiodsp::signal::noise::BrownNoiseGenerator;
///
/// let mut generator = BrownNoiseGenerator::new();
/// let sample = generator.next_value();
/// assert!((-1.0..=1.0).contains(&sample));
/// ```
#[derive(Debug, Clone)]
pub struct BrownNoiseGenerator {
    min_value: f64,
    max_value: f64,
    slope: f64,
    hp_filter: f64,
    center_value: f64,
    current_value: f64,
    random: XorShift64,
}

impl BrownNoiseGenerator {
    /// Creates a brown noise generator with an output range of -1 to +1
    pub fn new() -> Self {
        Self::with_range(-1.0, 1.0).expect("default range is valid")
    }

    /// Creates a brown noise generator with a specified output value range
    ///
    /// Uses a maximum slope of 1/20 of the range and a high-pass factor of
    /// 0.02, reasonable defaults for audio test signals.
    pub fn with_range(min_value: f64, max_value: f64) -> Result<Self, NoiseError> {
        Self::with_params(min_value, max_value, (max_value - min_value) / 20.0, 0.02)
    }

    /// Creates a brown noise generator
    ///
    /// # Arguments
    /// * `min_value` / `max_value` - Output value range
    /// * `slope` - Maximum difference between two consecutive output values;
    ///   controls the amplitude of the output spectrum. Must stay below half
    ///   the value range because clipping reflects the white-noise step.
    /// * `hp_filter` - First-order high-pass factor against DC drift,
    ///   0 disables the filter
    pub fn with_params(
        min_value: f64,
        max_value: f64,
        slope: f64,
        hp_filter: f64,
    ) -> Result<Self, NoiseError> {
        if min_value >= max_value {
            return Err(NoiseError::InvalidRange {
                min: min_value,
                max: max_value,
            });
        }
        let value_range = max_value - min_value;
        if slope <= 0.0 || slope >= value_range / 2.0 {
            return Err(NoiseError::InvalidSlope(slope));
        }
        if !(0.0..1.0).contains(&hp_filter) {
            return Err(NoiseError::InvalidHighPass(hp_filter));
        }
        let center_value = (min_value + max_value) / 2.0;
        Ok(Self {
            min_value,
            max_value,
            slope,
            hp_filter,
            center_value,
            current_value: center_value,
            random: XorShift64::new(0x5DEECE66D),
        })
    }

    /// Replaces the white-noise seed, for reproducible sequences
    pub fn reseed(&mut self, seed: u64) {
        self.random = XorShift64::new(seed);
    }

    /// Returns the next output value of the noise generator
    pub fn next_value(&mut self) -> f64 {
        let white_noise = self.random.next_bipolar() * self.slope;
        let mut v = self.current_value;
        if self.hp_filter > 0.0 {
            // First-order high pass against DC drift
            v -= (v - self.center_value) * self.hp_filter;
        }
        // Integrate white noise; reflect the step when it would leave the range
        let mut next = v + white_noise;
        if next < self.min_value || next > self.max_value {
            next = v - white_noise;
        }
        self.current_value = next;
        next
    }

    /// Fills a buffer with noise samples
    pub fn fill_buffer(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_value() as f32;
        }
    }
}

impl Default for BrownNoiseGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameters_rejected() {
        assert!(matches!(
            BrownNoiseGenerator::with_range(1.0, -1.0),
            Err(NoiseError::InvalidRange { .. })
        ));
        assert!(matches!(
            BrownNoiseGenerator::with_params(-1.0, 1.0, 0.0, 0.02),
            Err(NoiseError::InvalidSlope(_))
        ));
        assert!(matches!(
            BrownNoiseGenerator::with_params(-1.0, 1.0, 1.5, 0.02),
            Err(NoiseError::InvalidSlope(_))
        ));
        assert!(matches!(
            BrownNoiseGenerator::with_params(-1.0, 1.0, 0.1, 1.0),
            Err(NoiseError::InvalidHighPass(_))
        ));
    }

    #[test]
    fn test_white_noise_is_bipolar_and_centered() {
        let mut rng = XorShift64::new(7);
        let n = 100_000;
        let mut sum = 0.0;
        for _ in 0..n {
            let v = rng.next_bipolar();
            assert!((-1.0..1.0).contains(&v), "out of range: {}", v);
            sum += v;
        }
        let mean = sum / n as f64;
        assert!(mean.abs() < 0.02, "white noise mean should be near zero, got {}", mean);
    }

    #[test]
    fn test_output_stays_in_range() {
        let mut generator = BrownNoiseGenerator::with_range(-0.5, 0.5).unwrap();
        for _ in 0..100_000 {
            let v = generator.next_value();
            assert!((-0.5..=0.5).contains(&v), "out of range: {}", v);
        }
    }

    #[test]
    fn test_slope_bounds_consecutive_steps() {
        let slope = 0.05;
        let mut generator = BrownNoiseGenerator::with_params(-1.0, 1.0, slope, 0.02).unwrap();
        let mut previous = generator.next_value();
        for _ in 0..10_000 {
            let v = generator.next_value();
            // The high-pass nudge adds at most hp * range/2 on top of the slope
            assert!(
                (v - previous).abs() <= slope + 0.02 + 1e-12,
                "step too large: {}",
                (v - previous).abs()
            );
            previous = v;
        }
    }

    #[test]
    fn test_signal_actually_moves() {
        let mut generator = BrownNoiseGenerator::new();
        let values: Vec<f64> = (0..100).map(|_| generator.next_value()).collect();
        let distinct = values.windows(2).filter(|w| w[0] != w[1]).count();
        assert!(distinct > 90, "noise should rarely repeat consecutive values");
    }

    #[test]
    fn test_reseed_reproduces_sequence() {
        let mut a = BrownNoiseGenerator::new();
        let mut b = BrownNoiseGenerator::new();
        a.reseed(42);
        b.reseed(42);
        for _ in 0..1000 {
            assert_eq!(a.next_value(), b.next_value());
        }
    }

    #[test]
    fn test_high_pass_limits_drift() {
        let mut generator = BrownNoiseGenerator::with_params(-1.0, 1.0, 0.05, 0.02).unwrap();
        let n = 100_000;
        let mean: f64 = (0..n).map(|_| generator.next_value()).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.2, "mean should hover near center, got {}", mean);
    }
}

//! Spectrum analysis
//!
//! Converts a real signal block into a complex spectrum and into normalized
//! single-sided amplitudes. Magnitudes of the bins between DC and Nyquist
//! are doubled so each value reports the amplitude of the corresponding
//! sinusoidal component.

use rustfft::{num_complex::Complex, FftPlanner};

/// FFT-backed spectrum analyzer
///
/// Keeps an [`FftPlanner`] so repeated transforms of the same block size
/// reuse the plan.
pub struct SpectrumAnalyzer {
    planner: FftPlanner<f32>,
}

impl SpectrumAnalyzer {
    /// Creates a new spectrum analyzer
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }

    /// Computes the complex DFT of a real signal block
    ///
    /// The result has the same length as the input; the upper half contains
    /// the complex conjugates of the lower half.
    pub fn spectrum(&mut self, signal: &[f32]) -> Vec<Complex<f32>> {
        if signal.is_empty() {
            return Vec::new();
        }
        let mut buf: Vec<Complex<f32>> =
            signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
        let fft = self.planner.plan_fft_forward(buf.len());
        fft.process(&mut buf);
        buf
    }

    /// Computes normalized single-sided amplitudes for bins 0 ..= len/2
    ///
    /// Bin `k` corresponds to the absolute frequency
    /// `k * sample_rate / len`. DC and (for even lengths) the Nyquist bin
    /// are normalized by `len`; all other bins by `len / 2`, because only
    /// one of the two conjugate values is reported.
    pub fn magnitude_spectrum(&mut self, signal: &[f32]) -> Vec<f32> {
        let len = signal.len();
        self.spectrum(signal)
            .iter()
            .take(len / 2 + 1)
            .enumerate()
            .map(|(k, c)| {
                let half = k > 0 && 2 * k < len;
                c.norm() / if half { len as f32 / 2.0 } else { len as f32 }
            })
            .collect()
    }
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    #[test]
    fn test_empty_signal() {
        let mut analyzer = SpectrumAnalyzer::new();
        assert!(analyzer.spectrum(&[]).is_empty());
        assert!(analyzer.magnitude_spectrum(&[]).is_empty());
    }

    #[test]
    fn test_dc_amplitude() {
        let mut analyzer = SpectrumAnalyzer::new();
        let magnitudes = analyzer.magnitude_spectrum(&[0.25; 64]);
        assert!((magnitudes[0] - 0.25).abs() < 1e-5);
        for &m in &magnitudes[1..] {
            assert!(m.abs() < 1e-5);
        }
    }

    #[test]
    fn test_sine_amplitude_lands_in_its_bin() {
        let len = 64;
        let bin = 5;
        let amplitude = 0.5;
        let signal: Vec<f32> = (0..len)
            .map(|i| amplitude * (TAU * bin as f32 * i as f32 / len as f32).sin())
            .collect();
        let mut analyzer = SpectrumAnalyzer::new();
        let magnitudes = analyzer.magnitude_spectrum(&signal);
        assert_eq!(magnitudes.len(), len / 2 + 1);
        assert!(
            (magnitudes[bin] - amplitude).abs() < 1e-4,
            "bin {} magnitude {}",
            bin,
            magnitudes[bin]
        );
        for (k, &m) in magnitudes.iter().enumerate() {
            if k != bin {
                assert!(m < 1e-4, "leakage into bin {}: {}", k, m);
            }
        }
    }

    #[test]
    fn test_nyquist_bin_not_doubled() {
        // Alternating +a/-a is a pure Nyquist component of amplitude a.
        let len = 32;
        let signal: Vec<f32> = (0..len).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
        let mut analyzer = SpectrumAnalyzer::new();
        let magnitudes = analyzer.magnitude_spectrum(&signal);
        assert!((magnitudes[len / 2] - 0.5).abs() < 1e-5);
    }
}

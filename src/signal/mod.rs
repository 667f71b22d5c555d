//! Signal-level processing
//!
//! This module contains everything that works on whole signals or sample
//! streams rather than byte streams:
//! - In-memory multi-channel signal storage ([`AudioSignal`])
//! - Envelope following ([`envelope`])
//! - Activity/silence segmentation ([`activity`])
//! - Brown noise generation ([`noise`])
//! - RMS level normalization ([`normalize`])

pub mod activity;
pub mod envelope;
pub mod noise;
pub mod normalize;

/// An audio signal held in memory, one sample buffer per channel
///
/// Sample values are normalized floats with a nominal range of -1 .. 1.
/// All channels have equal length.
#[derive(Debug, Clone, Default)]
pub struct AudioSignal {
    /// Sampling rate in Hz
    pub sample_rate: f64,
    /// Sample values, one buffer per channel
    pub data: Vec<Vec<f32>>,
}

impl AudioSignal {
    /// Creates a silent signal with the given shape
    pub fn new(sample_rate: f64, channels: usize, len: usize) -> Self {
        Self {
            sample_rate,
            data: vec![vec![0.0; len]; channels],
        }
    }

    /// Signal length in frames
    pub fn len(&self) -> usize {
        self.data.first().map(|c| c.len()).unwrap_or(0)
    }

    /// True when the signal holds no frames
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of channels
    pub fn channels(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_shape() {
        let signal = AudioSignal::new(44100.0, 2, 128);
        assert_eq!(signal.channels(), 2);
        assert_eq!(signal.len(), 128);
        assert!(!signal.is_empty());
        assert!(AudioSignal::default().is_empty());
    }
}

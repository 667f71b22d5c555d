//! RMS level normalization
//!
//! Adjusts the amplitude of a signal so that its loudest segment reaches a
//! target RMS value. The signal is divided into fixed-size segments and the
//! maximum per-segment RMS over all channels determines the gain. For
//! speech audio a segment size of around 100 ms is reasonable.
//!
//! This is a whole-signal amplitude adjustment and deliberately separate
//! from activity-zone classification.

/// Adjusts the amplitude of a multi-channel signal to match a target RMS
///
/// # Arguments
/// * `signals` - The signal values, one buffer per channel; amplified in place
/// * `target_rms` - Target RMS amplitude for the loudest segment
/// * `segment_size` - Number of samples per RMS measurement
///
/// A signal that is entirely zero is left unchanged.
pub fn normalize_rms(signals: &mut [Vec<f32>], target_rms: f32, segment_size: usize) {
    let max_rms = signals
        .iter()
        .map(|channel| max_segment_rms(channel, segment_size))
        .fold(0.0f64, f64::max);
    if max_rms == 0.0 {
        return;
    }
    let factor = target_rms as f64 / max_rms;
    for channel in signals.iter_mut() {
        for sample in channel.iter_mut() {
            *sample = (*sample as f64 * factor) as f32;
        }
    }
}

/// Maximum RMS over the segments of one channel
///
/// A trailing rest shorter than 2/3 of the segment size is folded into the
/// previous segment instead of being measured on its own, so a few loud
/// samples at the very end cannot dominate the result.
fn max_segment_rms(signal: &[f32], segment_size: usize) -> f64 {
    let mut max_rms = 0.0f64;
    let mut p = 0;
    while p < signal.len() {
        let end = if p + segment_size * 5 / 3 > signal.len() {
            signal.len()
        } else {
            p + segment_size
        };
        max_rms = max_rms.max(rms(&signal[p..end]));
        p = end;
    }
    max_rms
}

fn rms(segment: &[f32]) -> f64 {
    let sum: f64 = segment.iter().map(|&x| (x as f64) * (x as f64)).sum();
    (sum / segment.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_signal_hits_target_exactly() {
        let mut signals = vec![vec![0.25f32; 1000]];
        normalize_rms(&mut signals, 0.5, 100);
        for &sample in &signals[0] {
            assert_relative_eq!(sample, 0.5, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_loudest_segment_determines_gain() {
        // Quiet half at 0.1, loud half at 0.4. The loud segment fixes the
        // factor at 0.8 / 0.4 = 2, so the quiet half ends at 0.2.
        let mut signal = vec![0.1f32; 500];
        signal.extend(vec![0.4f32; 500]);
        let mut signals = vec![signal];
        normalize_rms(&mut signals, 0.8, 100);
        assert_relative_eq!(signals[0][0], 0.2, max_relative = 1e-5);
        assert_relative_eq!(signals[0][999], 0.8, max_relative = 1e-5);
    }

    #[test]
    fn test_max_rms_taken_across_channels() {
        let mut signals = vec![vec![0.1f32; 400], vec![0.5f32; 400]];
        normalize_rms(&mut signals, 0.5, 100);
        // The louder channel already sits at the target
        assert_relative_eq!(signals[1][0], 0.5, max_relative = 1e-6);
        assert_relative_eq!(signals[0][0], 0.1, max_relative = 1e-6);
    }

    #[test]
    fn test_zero_signal_unchanged() {
        let mut signals = vec![vec![0.0f32; 256]];
        normalize_rms(&mut signals, 0.5, 64);
        assert!(signals[0].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_short_trailing_rest_folds_into_previous_segment() {
        // 150 samples with segment size 100: the 50-sample rest is shorter
        // than 2/3 of a segment, so it merges with the first one. A lone
        // loud sample at the end is averaged over 150 samples instead of 50.
        let mut signal = vec![0.0f32; 149];
        signal.push(0.6);
        let folded = max_segment_rms(&signal, 100);
        assert_relative_eq!(folded, 0.6f32 as f64 / 150.0f64.sqrt(), max_relative = 1e-9);
    }
}

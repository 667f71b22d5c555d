//! Per-channel stateful signal filters
//!
//! A filter processes one sample per [`SignalFilter::step`] call and keeps
//! all of its state private. One instance serves exactly one channel of one
//! stream; instances are never shared across channels or threads. Heavier
//! filters (IIR designs etc.) plug in through the same contract.

mod echo;

pub use echo::EchoFilter;

use thiserror::Error;

/// Errors from filter construction
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("echo delay must be at least 1 sample, got {0}")]
    InvalidEchoDelay(usize),

    #[error("attenuation must be below 1 to keep the feedback loop bounded, got {0}")]
    InvalidAttenuation(f64),
}

/// A stateful per-channel signal filter
///
/// `step` is called once per sample, strictly in signal order. Filter state
/// (delay lines, IIR history) depends on this ordering, so calls are never
/// reordered or parallelized within a channel.
pub trait SignalFilter: Send {
    /// Processes one input sample and returns the output sample
    fn step(&mut self, input: f64) -> f64;
}

/// Identity filter, useful as a placeholder for unfiltered channels
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughFilter;

impl SignalFilter for PassThroughFilter {
    fn step(&mut self, input: f64) -> f64 {
        input
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_through() {
        let mut filter = PassThroughFilter;
        for &x in &[0.0, 1.0, -0.5, 123.456] {
            assert_eq!(filter.step(x), x);
        }
    }
}

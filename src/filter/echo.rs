//! Delay-line echo filter
//!
//! Produces multiple echoes by feeding attenuated, delayed output samples
//! back into the signal. Serves as the minimal reference implementation of
//! the [`SignalFilter`] contract.

use super::{FilterError, SignalFilter};

/// A simple recursive echo filter
///
/// Each output sample is the input plus the attenuated output from
/// `echo_delay` samples ago. Because the feedback taps the *output*, one
/// impulse produces an infinite train of echoes decaying by the attenuation
/// factor.
///
/// # Example
/// ```
/// use audiodsp::filter::{EchoFilter, SignalFilter};
///
/// let mut echo = EchoFilter::new(4, 0.5).unwrap();
/// assert_eq!(echo.step(1.0), 1.0);
/// for _ in 0..3 {
///     assert_eq!(echo.step(0.0), 0.0);
/// }
/// // First echo arrives one delay later, attenuated
/// assert_eq!(echo.step(0.0), 0.5);
/// ```
#[derive(Debug)]
pub struct EchoFilter {
    attenuation: f64,
    delay_buf: Vec<f64>,
    delay_pos: usize,
}

impl EchoFilter {
    /// Creates a new echo filter
    ///
    /// # Arguments
    /// * `echo_delay` - Echo delay time in samples, at least 1
    /// * `attenuation` - Echo attenuation factor, must be below 1 to keep
    ///   the feedback loop from growing without bound
    pub fn new(echo_delay: usize, attenuation: f64) -> Result<Self, FilterError> {
        if echo_delay < 1 {
            return Err(FilterError::InvalidEchoDelay(echo_delay));
        }
        if attenuation >= 1.0 {
            return Err(FilterError::InvalidAttenuation(attenuation));
        }
        Ok(Self {
            attenuation,
            delay_buf: vec![0.0; echo_delay],
            delay_pos: 0,
        })
    }
}

impl SignalFilter for EchoFilter {
    fn step(&mut self, input: f64) -> f64 {
        let output = input + self.attenuation * self.delay_buf[self.delay_pos];
        self.delay_buf[self.delay_pos] = output;
        self.delay_pos = (self.delay_pos + 1) % self.delay_buf.len();
        output
    }
}

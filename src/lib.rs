//! Audiodsp - real-time audio signal processing
//!
//! This library moves audio between byte-oriented sources and sinks while
//! applying per-channel stateful filters, and derives speech-activity zones
//! from the processed signal. The main pieces are:
//! - PCM sample codec between packed byte frames and float channels ([`codec`])
//! - Per-channel stateful signal filters ([`filter`])
//! - Pull-based filtered byte streams and the real-time pump ([`stream`])
//! - Envelope following and activity segmentation ([`signal`])
//! - Magnitude spectrum analysis ([`spectrum`])

pub mod codec;
pub mod filter;
pub mod signal;
pub mod spectrum;
pub mod stream;

pub use codec::{ByteOrder, SampleEncoding, SampleFormat};
pub use filter::{EchoFilter, PassThroughFilter, SignalFilter};
pub use signal::{activity::ActivityDetector, activity::Zone, envelope::EnvelopeDetector, AudioSignal};
pub use stream::{filtered::FilteredReader, pump::AudioPump, AudioReader, LineControl, OutputLine};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Decode buffer size of a filtered stream, in frames
pub const DEFAULT_FILTER_BUFFER_FRAMES: usize = 4096;

/// Default pump transfer buffer time in milliseconds (non-real-time input)
pub const DEFAULT_PUMP_BUFFER_MS: u64 = 500;

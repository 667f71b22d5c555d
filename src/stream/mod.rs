//! Byte-oriented audio streams
//!
//! This module defines the pull-based byte-stream contracts the rest of the
//! crate plugs into, plus ready-made endpoints:
//! - Stream contracts ([`AudioReader`], [`LineControl`], [`OutputLine`])
//! - Filtered streams ([`filtered`])
//! - Ring-buffer device bridges ([`ring`])
//! - The real-time stream pump ([`pump`])
//! - In-memory and writer-backed endpoints for files and tests
//!
//! All streams speak whole frames: a reader must return a multiple of the
//! frame size whenever the upstream allows it, and a byte count that splits
//! a frame is an invariant violation, not an I/O condition.

pub mod filtered;
pub mod pump;
pub mod ring;

use crate::codec::{self, CodecError, SampleFormat};
use crate::signal::AudioSignal;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use thiserror::Error;

/// Errors from byte-stream operations
#[derive(Error, Debug)]
pub enum StreamError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A pull-based audio byte stream
///
/// `read` fills the buffer with as many whole frames as are available and
/// returns the byte count; short reads are allowed. `Ok(0)` signals the end
/// of the stream.
pub trait AudioReader: Send {
    /// The sample format of the stream
    fn format(&self) -> &SampleFormat;

    /// Reads up to `buf.len()` bytes of whole frames
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StreamError>;
}

/// Control handle for a capture line feeding an [`AudioReader`]
///
/// Used by the pump to start and stop the data flow from a different thread
/// than the one blocked in `read`. Stopping a line makes a blocked read
/// return promptly; flushing discards samples buffered in the line.
pub trait LineControl: Send + Sync {
    /// Starts the data flow
    fn start(&self);

    /// Stops the data flow; unblocks pending reads
    fn stop(&self);

    /// Discards buffered data
    fn flush(&self);
}

/// A playback sink shared between the pump worker and its controller
///
/// `write` returns the number of bytes the line accepted; accepting fewer
/// bytes than offered while the line is running means the output is blocked.
pub trait OutputLine: Send + Sync {
    /// The sample format the line expects
    fn format(&self) -> &SampleFormat;

    /// Writes bytes to the line, returning the count accepted
    fn write(&self, buf: &[u8]) -> Result<usize, StreamError>;

    /// Blocks until all buffered data has reached the underlying device
    fn drain(&self);

    /// Starts the line
    fn start(&self);

    /// Stops the line; unblocks pending writes
    fn stop(&self);

    /// Discards data buffered in the line
    fn flush(&self);
}

/// Block size used when draining a whole stream into memory, in frames
const READ_BLOCK_FRAMES: usize = 0x4000;

/// A pull-based reader over an in-memory [`AudioSignal`]
///
/// Packs frames through the sample codec on demand, so a whole signal can
/// be streamed without materializing its byte form.
pub struct SignalReader {
    format: SampleFormat,
    data: Vec<Vec<f32>>,
    len: usize,
    pos: usize,
}

impl SignalReader {
    /// Creates a reader that streams `signal` in the given byte format
    ///
    /// The format's sample rate and channel count must describe the signal;
    /// a channel mismatch is rejected.
    pub fn new(signal: AudioSignal, format: SampleFormat) -> Result<Self, CodecError> {
        if signal.channels() != format.channels {
            return Err(CodecError::ChannelMismatch {
                buffers: signal.channels(),
                channels: format.channels,
            });
        }
        let len = signal.len();
        Ok(Self {
            format,
            data: signal.data,
            len,
            pos: 0,
        })
    }

    /// Frames not yet read
    pub fn remaining(&self) -> usize {
        self.len - self.pos
    }
}

impl AudioReader for SignalReader {
    fn format(&self) -> &SampleFormat {
        &self.format
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        let rem_frames = self.len - self.pos;
        if rem_frames == 0 {
            return Ok(0);
        }
        let frame_size = self.format.frame_size();
        assert!(
            buf.len() >= frame_size,
            "read buffer ({} bytes) smaller than one frame ({} bytes)",
            buf.len(),
            frame_size
        );
        let frames = rem_frames.min(buf.len() / frame_size);
        codec::encode(&self.format, &self.data, self.pos, buf, 0, frames)?;
        self.pos += frames;
        Ok(frames * frame_size)
    }
}

/// Drains an [`AudioReader`] to its end and decodes it into an [`AudioSignal`]
///
/// Reads block-wise; a byte count that splits a frame indicates a broken
/// upstream and panics.
pub fn read_signal<R: AudioReader>(reader: &mut R) -> Result<AudioSignal, StreamError> {
    let format = *reader.format();
    let frame_size = format.frame_size();
    let mut block = vec![0u8; READ_BLOCK_FRAMES * frame_size];
    let mut data: Vec<Vec<f32>> = vec![Vec::new(); format.channels];
    loop {
        let n = reader.read(&mut block)?;
        if n == 0 {
            break;
        }
        assert_eq!(
            n % frame_size,
            0,
            "reader returned a partial frame: {} bytes with frame size {}",
            n,
            frame_size
        );
        let frames = n / frame_size;
        let base = data[0].len();
        for channel in data.iter_mut() {
            channel.resize(base + frames, 0.0);
        }
        codec::decode(&format, &block, 0, &mut data, base, frames)?;
    }
    Ok(AudioSignal {
        sample_rate: format.sample_rate,
        data,
    })
}

/// An output line that collects written bytes in memory
///
/// Useful for offline rendering and for tests. An optional acceptance limit
/// makes the line stop taking data at a byte count, which exercises the
/// blocked-output path of the pump.
pub struct MemoryOutputLine {
    format: SampleFormat,
    data: Mutex<Vec<u8>>,
    running: AtomicBool,
    accept_limit: Option<usize>,
}

impl MemoryOutputLine {
    /// Creates a memory line with unlimited acceptance
    pub fn new(format: SampleFormat) -> Self {
        Self {
            format,
            data: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
            accept_limit: None,
        }
    }

    /// Creates a memory line that accepts at most `limit` bytes in total
    pub fn with_accept_limit(format: SampleFormat, limit: usize) -> Self {
        Self {
            accept_limit: Some(limit),
            ..Self::new(format)
        }
    }

    /// Returns the collected bytes, leaving the line empty
    pub fn take_data(&self) -> Vec<u8> {
        std::mem::take(&mut *self.data.lock().expect("memory line lock poisoned"))
    }

    /// Number of bytes collected so far
    pub fn len(&self) -> usize {
        self.data.lock().expect("memory line lock poisoned").len()
    }

    /// True when nothing has been written yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OutputLine for MemoryOutputLine {
    fn format(&self) -> &SampleFormat {
        &self.format
    }

    fn write(&self, buf: &[u8]) -> Result<usize, StreamError> {
        let mut data = self.data.lock().expect("memory line lock poisoned");
        let accepted = match self.accept_limit {
            Some(limit) => buf.len().min(limit.saturating_sub(data.len())),
            None => buf.len(),
        };
        data.extend_from_slice(&buf[..accepted]);
        Ok(accepted)
    }

    fn drain(&self) {}

    fn start(&self) {
        self.running.store(true, Ordering::Release);
    }

    fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    fn flush(&self) {}
}

/// An output line over any [`std::io::Write`], e.g. a file or a pipe
///
/// Lifecycle hooks are no-ops; `drain` flushes the writer.
pub struct WriterOutputLine<W: Write + Send> {
    format: SampleFormat,
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterOutputLine<W> {
    /// Creates an output line writing PCM bytes to `writer`
    pub fn new(format: SampleFormat, writer: W) -> Self {
        Self {
            format,
            writer: Mutex::new(writer),
        }
    }
}

impl<W: Write + Send> OutputLine for WriterOutputLine<W> {
    fn format(&self) -> &SampleFormat {
        &self.format
    }

    fn write(&self, buf: &[u8]) -> Result<usize, StreamError> {
        let mut writer = self.writer.lock().expect("writer line lock poisoned");
        Ok(writer.write(buf)?)
    }

    fn drain(&self) {
        let mut writer = self.writer.lock().expect("writer line lock poisoned");
        let _ = writer.flush();
    }

    fn start(&self) {}

    fn stop(&self) {}

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::SampleEncoding;

    fn ramp_signal(channels: usize, len: usize) -> AudioSignal {
        let mut signal = AudioSignal::new(48000.0, channels, len);
        for (c, channel) in signal.data.iter_mut().enumerate() {
            for (i, sample) in channel.iter_mut().enumerate() {
                *sample = ((i + c * 7) % 19) as f32 / 19.0 - 0.5;
            }
        }
        signal
    }

    #[test]
    fn test_signal_reader_round_trip() {
        let signal = ramp_signal(2, 1000);
        let format = SampleFormat::float32(48000.0, 2);
        let expected = signal.clone();
        let mut reader = SignalReader::new(signal, format).unwrap();
        let decoded = read_signal(&mut reader).unwrap();
        assert_eq!(decoded.channels(), 2);
        assert_eq!(decoded.len(), 1000);
        assert_eq!(decoded.data, expected.data);
    }

    #[test]
    fn test_signal_reader_short_reads() {
        let signal = ramp_signal(1, 10);
        let format = SampleFormat::pcm16(48000.0, 1);
        let mut reader = SignalReader::new(signal, format).unwrap();
        // 3 frames fit into 7 bytes worth of request -> 6 bytes per read
        let mut buf = [0u8; 7];
        let mut total = 0;
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            assert_eq!(n % 2, 0, "reads must be whole frames");
            total += n;
        }
        assert_eq!(total, 20);
    }

    #[test]
    fn test_signal_reader_rejects_channel_mismatch() {
        let signal = ramp_signal(1, 10);
        let format = SampleFormat::pcm16(48000.0, 2);
        assert!(matches!(
            SignalReader::new(signal, format),
            Err(CodecError::ChannelMismatch { .. })
        ));
    }

    #[test]
    fn test_memory_line_accept_limit() {
        let format = SampleFormat::pcm16(48000.0, 1);
        let line = MemoryOutputLine::with_accept_limit(format, 6);
        assert_eq!(line.write(&[1, 2, 3, 4]).unwrap(), 4);
        assert_eq!(line.write(&[5, 6, 7, 8]).unwrap(), 2);
        assert_eq!(line.take_data(), [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_writer_line_collects_bytes() {
        let format = SampleFormat::new(48000.0, 1, SampleEncoding::Signed, 16, crate::ByteOrder::Little);
        let line = WriterOutputLine::new(format, Vec::new());
        line.write(&[9, 8, 7]).unwrap();
        line.drain();
        let writer = line.writer.lock().unwrap();
        assert_eq!(writer.as_slice(), [9, 8, 7]);
    }
}

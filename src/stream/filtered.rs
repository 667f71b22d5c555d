//! Filtered byte streams
//!
//! Wraps an [`AudioReader`] so that every pulled block is decoded, run
//! through one stateful filter per channel, and re-encoded, without ever
//! materializing the whole signal. Because the filters live as long as the
//! adapter, delay lines and IIR state carry across block boundaries and the
//! output is independent of how the stream is chunked.

use super::{AudioReader, StreamError};
use crate::codec::{self, CodecError, SampleFormat};
use crate::filter::SignalFilter;
use crate::DEFAULT_FILTER_BUFFER_FRAMES;

/// A pull-based byte stream that filters another stream in flight
///
/// The adapter reuses one fixed-size decode buffer allocated at
/// construction; no per-read allocation happens. Reads consume and produce
/// the same byte count, since filtering performs no resampling.
pub struct FilteredReader<R: AudioReader> {
    inner: R,
    filters: Vec<Box<dyn SignalFilter>>,
    format: SampleFormat,
    frame_size: usize,
    byte_buf: Vec<u8>,
    channel_bufs: Vec<Vec<f32>>,
}

impl<R: AudioReader> FilteredReader<R> {
    /// Wraps `inner` with one filter per channel
    ///
    /// Fails with `ChannelMismatch` when the filter count does not equal
    /// the stream's channel count.
    pub fn new(inner: R, filters: Vec<Box<dyn SignalFilter>>) -> Result<Self, CodecError> {
        Self::with_buffer_frames(inner, filters, DEFAULT_FILTER_BUFFER_FRAMES)
    }

    /// Like [`new`](Self::new) with an explicit decode buffer size in frames
    pub fn with_buffer_frames(
        inner: R,
        filters: Vec<Box<dyn SignalFilter>>,
        buffer_frames: usize,
    ) -> Result<Self, CodecError> {
        let format = *inner.format();
        if filters.len() != format.channels {
            return Err(CodecError::ChannelMismatch {
                buffers: filters.len(),
                channels: format.channels,
            });
        }
        let frame_size = format.frame_size();
        Ok(Self {
            inner,
            filters,
            format,
            frame_size,
            byte_buf: vec![0u8; buffer_frames * frame_size],
            channel_bufs: vec![vec![0.0; buffer_frames]; format.channels],
        })
    }

    /// The wrapped reader
    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R: AudioReader> AudioReader for FilteredReader<R> {
    fn format(&self) -> &SampleFormat {
        &self.format
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        assert!(
            buf.len() >= self.frame_size,
            "read buffer ({} bytes) smaller than one frame ({} bytes)",
            buf.len(),
            self.frame_size
        );
        // Clamp the request to whole frames that fit the decode buffer,
        // then take whatever the upstream returns for a single read.
        let max_bytes = buf.len().min(self.byte_buf.len());
        let request = (max_bytes / self.frame_size) * self.frame_size;
        let n = self.inner.read(&mut self.byte_buf[..request])?;
        if n == 0 {
            return Ok(0);
        }
        assert_eq!(
            n % self.frame_size,
            0,
            "upstream returned a partial frame: {} bytes with frame size {}",
            n,
            self.frame_size
        );
        let frames = n / self.frame_size;
        codec::decode(&self.format, &self.byte_buf, 0, &mut self.channel_bufs, 0, frames)?;
        for (filter, channel) in self.filters.iter_mut().zip(self.channel_bufs.iter_mut()) {
            for sample in &mut channel[..frames] {
                *sample = filter.step(*sample as f64) as f32;
            }
        }
        codec::encode(&self.format, &self.channel_bufs, 0, buf, 0, frames)?;
        Ok(n)
    }
}

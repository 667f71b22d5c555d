//! PCM sample codec
//!
//! Bit-exact conversion between packed interleaved byte frames and
//! normalized per-channel float buffers. Supports 16/24/32-bit signed
//! integer PCM and 32-bit IEEE-754 float PCM, in both byte orders.
//!
//! All operations work on whole frames only. Decoding never produces
//! partial frames and encoding never consumes them; callers that hand in
//! misaligned byte counts have violated the framing invariant and the
//! codec treats that as a defect, not a recoverable error.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by the sample codec
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("unsupported sample format: {bits} bits per sample for {encoding:?} PCM")]
    UnsupportedFormat { bits: u16, encoding: SampleEncoding },

    #[error("number of channel buffers ({buffers}) does not match channel count ({channels})")]
    ChannelMismatch { buffers: usize, channels: usize },
}

/// Sample encoding of a PCM stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleEncoding {
    /// Two's-complement signed integer PCM (16, 24 or 32 bits)
    Signed,
    /// IEEE-754 binary32 float PCM (32 bits only)
    Float,
}

/// Byte order of multi-byte samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ByteOrder {
    Big,
    Little,
}

/// Describes the binary layout of a PCM byte stream
///
/// The frame size is derived: `channels * ceil(bits_per_sample / 8)` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleFormat {
    /// Sampling rate in Hz
    pub sample_rate: f64,
    /// Number of interleaved channels (>= 1)
    pub channels: usize,
    /// Sample encoding
    pub encoding: SampleEncoding,
    /// Bits per sample (16, 24 or 32)
    pub bits_per_sample: u16,
    /// Byte order of multi-byte samples
    pub byte_order: ByteOrder,
}

impl SampleFormat {
    /// Create a sample format description
    pub fn new(
        sample_rate: f64,
        channels: usize,
        encoding: SampleEncoding,
        bits_per_sample: u16,
        byte_order: ByteOrder,
    ) -> Self {
        Self {
            sample_rate,
            channels,
            encoding,
            bits_per_sample,
            byte_order,
        }
    }

    /// Standard 16-bit little-endian signed PCM
    pub fn pcm16(sample_rate: f64, channels: usize) -> Self {
        Self::new(
            sample_rate,
            channels,
            SampleEncoding::Signed,
            16,
            ByteOrder::Little,
        )
    }

    /// 32-bit little-endian IEEE float PCM
    pub fn float32(sample_rate: f64, channels: usize) -> Self {
        Self::new(
            sample_rate,
            channels,
            SampleEncoding::Float,
            32,
            ByteOrder::Little,
        )
    }

    /// Bytes per sample, `ceil(bits_per_sample / 8)`
    pub fn bytes_per_sample(&self) -> usize {
        ((self.bits_per_sample + 7) / 8) as usize
    }

    /// Bytes per frame (one sample per channel)
    pub fn frame_size(&self) -> usize {
        self.channels * self.bytes_per_sample()
    }

    fn is_big_endian(&self) -> bool {
        self.byte_order == ByteOrder::Big
    }
}

/// Unpacks interleaved PCM bytes into normalized per-channel float buffers.
///
/// Reads `frames` frames from `input` starting at byte offset `in_pos` and
/// writes one float per channel and frame into `output` starting at sample
/// index `out_pos`. Signed-integer samples are scaled by the full-scale
/// positive code `2^(bits-1) - 1`, so the nominal value range is -1 .. 1
/// (the most negative code lands slightly below -1).
///
/// # Errors
/// `ChannelMismatch` when `output.len() != format.channels`,
/// `UnsupportedFormat` for bit depths the encoding does not support.
///
/// # Panics
/// Panics when `input` is too short for `frames` whole frames or an output
/// buffer is too short for `out_pos + frames` samples.
pub fn decode(
    format: &SampleFormat,
    input: &[u8],
    in_pos: usize,
    output: &mut [Vec<f32>],
    out_pos: usize,
    frames: usize,
) -> Result<(), CodecError> {
    check_layout(format, output.len(), frames, input.len(), in_pos)?;
    let big_endian = format.is_big_endian();
    let bits = format.bits_per_sample;
    let sample_size = format.bytes_per_sample();
    let frame_size = format.frame_size();
    match format.encoding {
        SampleEncoding::Signed => {
            let max_code = ((1i64 << (bits - 1)) - 1) as f32;
            for (channel, out_buf) in output.iter_mut().enumerate() {
                let p0 = in_pos + channel * sample_size;
                for i in 0..frames {
                    let v = unpack_signed_int(input, p0 + i * frame_size, bits, big_endian);
                    out_buf[out_pos + i] = v as f32 / max_code;
                }
            }
        }
        SampleEncoding::Float => {
            for (channel, out_buf) in output.iter_mut().enumerate() {
                let p0 = in_pos + channel * sample_size;
                for i in 0..frames {
                    out_buf[out_pos + i] = unpack_float(input, p0 + i * frame_size, big_endian);
                }
            }
        }
    }
    Ok(())
}

/// Packs normalized per-channel float buffers into interleaved PCM bytes.
///
/// The inverse of [`decode`]. Every sample is clamped to -1 .. 1 before
/// quantization; signed-integer quantization rounds to the nearest code.
/// Values produced by [`decode`] re-encode byte-identically.
///
/// # Errors
/// Same conditions as [`decode`].
///
/// # Panics
/// Panics when `output` is too short for `frames` whole frames or an input
/// buffer is too short for `in_pos + frames` samples.
pub fn encode(
    format: &SampleFormat,
    input: &[Vec<f32>],
    in_pos: usize,
    output: &mut [u8],
    out_pos: usize,
    frames: usize,
) -> Result<(), CodecError> {
    check_layout(format, input.len(), frames, output.len(), out_pos)?;
    let big_endian = format.is_big_endian();
    let bits = format.bits_per_sample;
    let sample_size = format.bytes_per_sample();
    let frame_size = format.frame_size();
    match format.encoding {
        SampleEncoding::Signed => {
            let max_code = ((1i64 << (bits - 1)) - 1) as f32;
            for (channel, in_buf) in input.iter().enumerate() {
                let p0 = out_pos + channel * sample_size;
                for i in 0..frames {
                    let clamped = in_buf[in_pos + i].clamp(-1.0, 1.0);
                    let v = (clamped * max_code).round() as i32;
                    pack_signed_int(v, output, p0 + i * frame_size, bits, big_endian);
                }
            }
        }
        SampleEncoding::Float => {
            for (channel, in_buf) in input.iter().enumerate() {
                let p0 = out_pos + channel * sample_size;
                for i in 0..frames {
                    let clamped = in_buf[in_pos + i].clamp(-1.0, 1.0);
                    pack_float(clamped, output, p0 + i * frame_size, big_endian);
                }
            }
        }
    }
    Ok(())
}

fn check_layout(
    format: &SampleFormat,
    buffers: usize,
    frames: usize,
    byte_len: usize,
    byte_pos: usize,
) -> Result<(), CodecError> {
    if buffers != format.channels {
        return Err(CodecError::ChannelMismatch {
            buffers,
            channels: format.channels,
        });
    }
    let bits = format.bits_per_sample;
    let supported = match format.encoding {
        SampleEncoding::Signed => bits == 16 || bits == 24 || bits == 32,
        SampleEncoding::Float => bits == 32,
    };
    if !supported {
        return Err(CodecError::UnsupportedFormat {
            bits,
            encoding: format.encoding,
        });
    }
    assert!(
        byte_len >= byte_pos + frames * format.frame_size(),
        "byte buffer too small: {} bytes at offset {} for {} frames of {} bytes",
        byte_len,
        byte_pos,
        frames,
        format.frame_size()
    );
    Ok(())
}

fn unpack_signed_int(buf: &[u8], pos: usize, bits: u16, big_endian: bool) -> i32 {
    match bits {
        16 => {
            let b = [buf[pos], buf[pos + 1]];
            if big_endian {
                i16::from_be_bytes(b) as i32
            } else {
                i16::from_le_bytes(b) as i32
            }
        }
        24 => {
            let (hi, mid, lo) = if big_endian {
                (buf[pos], buf[pos + 1], buf[pos + 2])
            } else {
                (buf[pos + 2], buf[pos + 1], buf[pos])
            };
            ((hi as i8 as i32) << 16) | ((mid as i32) << 8) | lo as i32
        }
        32 => {
            let b = [buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]];
            if big_endian {
                i32::from_be_bytes(b)
            } else {
                i32::from_le_bytes(b)
            }
        }
        _ => unreachable!("bit depth validated before unpacking"),
    }
}

fn pack_signed_int(v: i32, buf: &mut [u8], pos: usize, bits: u16, big_endian: bool) {
    match bits {
        16 => {
            let b = if big_endian {
                (v as i16).to_be_bytes()
            } else {
                (v as i16).to_le_bytes()
            };
            buf[pos..pos + 2].copy_from_slice(&b);
        }
        24 => {
            let b = v.to_le_bytes();
            if big_endian {
                buf[pos] = b[2];
                buf[pos + 1] = b[1];
                buf[pos + 2] = b[0];
            } else {
                buf[pos] = b[0];
                buf[pos + 1] = b[1];
                buf[pos + 2] = b[2];
            }
        }
        32 => {
            let b = if big_endian {
                v.to_be_bytes()
            } else {
                v.to_le_bytes()
            };
            buf[pos..pos + 4].copy_from_slice(&b);
        }
        _ => unreachable!("bit depth validated before packing"),
    }
}

fn unpack_float(buf: &[u8], pos: usize, big_endian: bool) -> f32 {
    let b = [buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]];
    if big_endian {
        f32::from_be_bytes(b)
    } else {
        f32::from_le_bytes(b)
    }
}

fn pack_float(f: f32, buf: &mut [u8], pos: usize, big_endian: bool) {
    let b = if big_endian {
        f.to_be_bytes()
    } else {
        f.to_le_bytes()
    };
    buf[pos..pos + 4].copy_from_slice(&b);
}

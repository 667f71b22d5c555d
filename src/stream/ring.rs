//! Ring-buffer device bridges
//!
//! Real device APIs push and pull audio from their own callback threads,
//! while the pump wants blocking, pull-based byte streams. These bridges
//! connect the two worlds with a lock-free SPSC byte ring per direction:
//!
//! - [`ring_input`]: the device callback pushes captured bytes into a
//!   [`RingInputLine`]; a [`RingReader`] blocks on the other end until data
//!   arrives or the line is stopped.
//! - [`ring_output`]: the pump writes into a [`RingOutputLine`] (blocking
//!   while the ring is full); the playback callback pops bytes from a
//!   [`RingConsumer`].
//!
//! Ring capacities are rounded down to whole frames and both ends transfer
//! whole frames only, so downstream framing invariants hold. A flush marks
//! the bytes buffered at that moment as stale; the consuming side skips
//! exactly those, so data arriving after the flush is never swept away
//! with them.

use super::{AudioReader, LineControl, OutputLine, StreamError};
use crate::codec::SampleFormat;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Poll interval while waiting for ring space or data
const POLL_INTERVAL: Duration = Duration::from_millis(1);

fn frame_capacity(capacity_bytes: usize, frame_size: usize) -> usize {
    (capacity_bytes / frame_size).max(1) * frame_size
}

/// Drops the bytes a flush marked as stale from the front of the ring
fn skip_stale(consumer: &mut HeapCons<u8>, stale: &AtomicUsize) {
    let mut remaining = stale.swap(0, Ordering::AcqRel);
    let mut scratch = [0u8; 512];
    while remaining > 0 {
        let take = remaining.min(scratch.len());
        let n = consumer.pop_slice(&mut scratch[..take]);
        if n == 0 {
            break;
        }
        remaining -= n;
    }
}

/// Creates a capture-side ring bridge
///
/// Returns the line handle (for the device callback and for pump control)
/// and the blocking reader for the consuming side. `capacity_bytes` is
/// rounded down to a whole number of frames.
pub fn ring_input(format: SampleFormat, capacity_bytes: usize) -> (Arc<RingInputLine>, RingReader) {
    let capacity = frame_capacity(capacity_bytes, format.frame_size());
    let (producer, consumer) = HeapRb::<u8>::new(capacity).split();
    let line = Arc::new(RingInputLine {
        format,
        producer: Mutex::new(producer),
        running: AtomicBool::new(false),
        stale: AtomicUsize::new(0),
    });
    let reader = RingReader {
        format,
        consumer,
        line: Arc::clone(&line),
    };
    (line, reader)
}

/// Capture line backed by a byte ring
///
/// The device callback calls [`push`](Self::push); the pump controls the
/// line through [`LineControl`].
pub struct RingInputLine {
    format: SampleFormat,
    producer: Mutex<HeapProd<u8>>,
    running: AtomicBool,
    stale: AtomicUsize,
}

impl RingInputLine {
    /// The sample format flowing through the line
    pub fn format(&self) -> &SampleFormat {
        &self.format
    }

    /// Pushes captured bytes from the device callback
    ///
    /// Only whole frames are accepted; returns the byte count taken. Bytes
    /// beyond the ring's free space are dropped (capture overrun), and a
    /// stopped line accepts nothing.
    pub fn push(&self, buf: &[u8]) -> usize {
        if !self.running.load(Ordering::Acquire) {
            return 0;
        }
        let frame_size = self.format.frame_size();
        let mut producer = self.producer.lock().expect("ring producer lock poisoned");
        let room = producer.vacant_len();
        let take = (room.min(buf.len()) / frame_size) * frame_size;
        producer.push_slice(&buf[..take])
    }

    /// True while the line is started
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl LineControl for RingInputLine {
    fn start(&self) {
        self.running.store(true, Ordering::Release);
    }

    fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Marks everything currently buffered as stale
    fn flush(&self) {
        let occupied = self
            .producer
            .lock()
            .expect("ring producer lock poisoned")
            .occupied_len();
        self.stale.store(occupied, Ordering::Release);
    }
}

/// Blocking reader over the capture ring
pub struct RingReader {
    format: SampleFormat,
    consumer: HeapCons<u8>,
    line: Arc<RingInputLine>,
}

impl AudioReader for RingReader {
    fn format(&self) -> &SampleFormat {
        &self.format
    }

    /// Blocks until at least one frame is available or the line is stopped
    ///
    /// Returns `Ok(0)` once the line has been stopped and the ring holds no
    /// more whole frames, the ring-bridge equivalent of end-of-stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        let frame_size = self.format.frame_size();
        assert!(
            buf.len() >= frame_size,
            "read buffer ({} bytes) smaller than one frame ({} bytes)",
            buf.len(),
            frame_size
        );
        loop {
            skip_stale(&mut self.consumer, &self.line.stale);
            let available = self.consumer.occupied_len();
            let take = (available.min(buf.len()) / frame_size) * frame_size;
            if take > 0 {
                return Ok(self.consumer.pop_slice(&mut buf[..take]));
            }
            if !self.line.is_running() {
                return Ok(0);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Creates a playback-side ring bridge
///
/// Returns the line (for the pump) and the consumer for the playback
/// callback. `capacity_bytes` is rounded down to a whole number of frames.
pub fn ring_output(
    format: SampleFormat,
    capacity_bytes: usize,
) -> (Arc<RingOutputLine>, RingConsumer) {
    let capacity = frame_capacity(capacity_bytes, format.frame_size());
    let (producer, consumer) = HeapRb::<u8>::new(capacity).split();
    let line = Arc::new(RingOutputLine {
        format,
        producer: Mutex::new(producer),
        running: AtomicBool::new(false),
        stale: AtomicUsize::new(0),
    });
    let consumer = RingConsumer {
        consumer,
        line: Arc::clone(&line),
    };
    (line, consumer)
}

/// Playback line backed by a byte ring
pub struct RingOutputLine {
    format: SampleFormat,
    producer: Mutex<HeapProd<u8>>,
    running: AtomicBool,
    stale: AtomicUsize,
}

impl RingOutputLine {
    /// True while the line is started
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl OutputLine for RingOutputLine {
    fn format(&self) -> &SampleFormat {
        &self.format
    }

    /// Writes whole frames into the ring, blocking while it is full
    ///
    /// Returns early with a short count when the line is stopped; a running
    /// line always accepts the full buffer eventually.
    fn write(&self, buf: &[u8]) -> Result<usize, StreamError> {
        let frame_size = self.format.frame_size();
        let mut written = 0;
        while written < buf.len() {
            if !self.running.load(Ordering::Acquire) {
                break;
            }
            let pushed = {
                let mut producer = self.producer.lock().expect("ring producer lock poisoned");
                let room = producer.vacant_len();
                let take = (room.min(buf.len() - written) / frame_size) * frame_size;
                producer.push_slice(&buf[written..written + take])
            };
            if pushed == 0 {
                std::thread::sleep(POLL_INTERVAL);
            } else {
                written += pushed;
            }
        }
        Ok(written)
    }

    /// Blocks until the playback side has consumed all buffered bytes
    fn drain(&self) {
        while self.running.load(Ordering::Acquire) {
            let occupied = self
                .producer
                .lock()
                .expect("ring producer lock poisoned")
                .occupied_len();
            if occupied == 0 {
                break;
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    fn start(&self) {
        self.running.store(true, Ordering::Release);
    }

    fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Marks everything currently buffered as stale
    fn flush(&self) {
        let occupied = self
            .producer
            .lock()
            .expect("ring producer lock poisoned")
            .occupied_len();
        self.stale.store(occupied, Ordering::Release);
    }
}

/// Playback-callback side of the output ring
pub struct RingConsumer {
    consumer: HeapCons<u8>,
    line: Arc<RingOutputLine>,
}

impl RingConsumer {
    /// Pops buffered bytes for the playback callback, non-blocking
    pub fn pop(&mut self, buf: &mut [u8]) -> usize {
        skip_stale(&mut self.consumer, &self.line.stale);
        self.consumer.pop_slice(buf)
    }

    /// Bytes currently buffered
    pub fn buffered(&self) -> usize {
        self.consumer.occupied_len()
    }
}

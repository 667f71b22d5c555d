//! Real-time stream pump
//!
//! Moves audio from an [`AudioReader`] to an [`OutputLine`] on a dedicated
//! worker thread, so a capture line keeps flowing while the caller does
//! other work. The pump owns the reader while running and hands it back on
//! stop, which makes a pump restartable with the same endpoints.
//!
//! Faults inside the worker (I/O errors, a blocked output) do not unwind
//! into the caller; they end the transfer, and [`AudioPump::stop`] surfaces
//! the captured fault once.

use super::{AudioReader, LineControl, OutputLine, StreamError};
use crate::codec::SampleFormat;
use crate::DEFAULT_PUMP_BUFFER_MS;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

/// Errors from constructing and controlling an [`AudioPump`]
#[derive(Error, Debug)]
pub enum PumpError {
    #[error("reader format {reader:?} does not match output format {output:?}")]
    FormatMismatch {
        reader: SampleFormat,
        output: SampleFormat,
    },

    #[error("pump is already running")]
    AlreadyRunning,

    #[error("output line blocked: accepted {accepted} of {offered} bytes")]
    OutputBlocked { offered: usize, accepted: usize },

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("failed to spawn pump worker thread")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("pump worker thread panicked")]
    WorkerPanicked,
}

struct Worker {
    handle: JoinHandle<Box<dyn AudioReader>>,
    result_rx: Receiver<Result<(), PumpError>>,
}

/// Pumps bytes from a reader to an output line on a worker thread
///
/// The pump is a small state machine: idle after construction, running
/// after [`start`](Self::start), idle again after [`stop`](Self::stop) or
/// when the input ends. The transfer buffer is sized from the buffer time
/// given at construction, rounded to whole frames.
pub struct AudioPump {
    input_control: Option<Arc<dyn LineControl>>,
    output: Arc<dyn OutputLine>,
    format: SampleFormat,
    buffer_size: usize,
    stop_flag: Arc<AtomicBool>,
    // Exactly one of `worker` and `reader` is Some: the running worker owns
    // the reader and returns it through its join handle.
    worker: Option<Worker>,
    reader: Option<Box<dyn AudioReader>>,
    finished: Option<Result<(), PumpError>>,
}

impl AudioPump {
    /// Creates an idle pump over the given endpoints
    ///
    /// `input_control` is the control handle of the capture line feeding
    /// `reader`, if there is one; pass `None` for non-real-time sources
    /// like in-memory signals or files. Fails with `FormatMismatch` when
    /// the reader and the output line disagree on the sample format.
    pub fn new(
        input_control: Option<Arc<dyn LineControl>>,
        reader: Box<dyn AudioReader>,
        output: Arc<dyn OutputLine>,
        buffer_time: Duration,
    ) -> Result<Self, PumpError> {
        let format = *reader.format();
        if format != *output.format() {
            return Err(PumpError::FormatMismatch {
                reader: format,
                output: *output.format(),
            });
        }
        let frames = (format.sample_rate * buffer_time.as_secs_f64()).round() as usize;
        let buffer_size = frames.max(1) * format.frame_size();
        Ok(Self {
            input_control,
            output,
            format,
            buffer_size,
            stop_flag: Arc::new(AtomicBool::new(false)),
            worker: None,
            reader: Some(reader),
            finished: None,
        })
    }

    /// Creates a pump for playing a non-real-time source, e.g. a signal
    /// held in memory, with the default buffer time
    pub fn for_playback(
        reader: Box<dyn AudioReader>,
        output: Arc<dyn OutputLine>,
    ) -> Result<Self, PumpError> {
        Self::new(None, reader, output, Duration::from_millis(DEFAULT_PUMP_BUFFER_MS))
    }

    /// The format flowing through the pump
    pub fn format(&self) -> &SampleFormat {
        &self.format
    }

    /// True while the worker thread is alive
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
    }

    /// Starts the transfer on a new worker thread
    ///
    /// Clears any fault left over from a previous run. Fails with
    /// `AlreadyRunning` while a worker is active.
    pub fn start(&mut self) -> Result<(), PumpError> {
        if self.is_running() {
            return Err(PumpError::AlreadyRunning);
        }
        // Reclaim the reader from a worker that exited on its own.
        if let Some(worker) = self.worker.take() {
            let reader = worker.handle.join().map_err(|_| PumpError::WorkerPanicked)?;
            self.reader = Some(reader);
        }
        self.finished = None;
        let reader = self.reader.take().ok_or(PumpError::AlreadyRunning)?;

        self.stop_flag.store(false, Ordering::Release);
        let stop_flag = Arc::clone(&self.stop_flag);
        let input_control = self.input_control.clone();
        let output = Arc::clone(&self.output);
        let buffer_size = self.buffer_size;
        let (result_tx, result_rx) = bounded(1);

        info!(
            sample_rate = self.format.sample_rate,
            channels = self.format.channels,
            buffer_size,
            "starting audio pump"
        );
        // The reader travels to the worker through a handoff slot so a
        // failed spawn can take it back and the pump stays startable.
        let handoff = Arc::new(Mutex::new(Some(reader)));
        let worker_handoff = Arc::clone(&handoff);
        let spawned = std::thread::Builder::new()
            .name("audio-pump".into())
            .spawn(move || {
                let reader = worker_handoff
                    .lock()
                    .expect("pump reader handoff poisoned")
                    .take()
                    .expect("pump reader handoff empty");
                let (reader, result) =
                    run_worker(reader, input_control, output, buffer_size, stop_flag);
                if let Err(fault) = &result {
                    error!(%fault, "audio pump worker stopped on fault");
                }
                let _ = result_tx.send(result);
                reader
            });
        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.reader = handoff
                    .lock()
                    .expect("pump reader handoff poisoned")
                    .take();
                return Err(PumpError::WorkerSpawn(e));
            }
        };
        self.worker = Some(Worker { handle, result_rx });
        Ok(())
    }

    /// Stops the transfer and surfaces any captured worker fault
    ///
    /// Stops and flushes both lines so a worker blocked in a read or write
    /// returns promptly, then joins the worker. A no-op on an idle pump,
    /// except that a fault from a naturally finished run is still returned
    /// once.
    pub fn stop(&mut self) -> Result<(), PumpError> {
        let worker = match self.worker.take() {
            Some(worker) => worker,
            None => return self.finished.take().unwrap_or(Ok(())),
        };
        debug!("stopping audio pump");
        self.stop_flag.store(true, Ordering::Release);
        if let Some(control) = &self.input_control {
            control.stop();
            control.flush();
        }
        self.output.stop();
        self.output.flush();
        let reader = worker.handle.join().map_err(|_| PumpError::WorkerPanicked)?;
        self.reader = Some(reader);
        self.finished
            .take()
            .or_else(|| worker.result_rx.try_recv().ok())
            .unwrap_or(Ok(()))
    }

    /// Waits up to `timeout` for the worker to finish on its own
    ///
    /// Returns true once the worker has finished (or when the pump is
    /// idle). Does not stop anything; the worker's result is held for the
    /// following [`stop`](Self::stop) call.
    pub fn wait_for_completion(&mut self, timeout: Duration) -> bool {
        let worker = match &self.worker {
            Some(worker) => worker,
            None => return true,
        };
        match worker.result_rx.recv_timeout(timeout) {
            Ok(result) => {
                self.finished = Some(result);
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => true,
        }
    }
}

impl Drop for AudioPump {
    /// Stops a still-running worker so no thread outlives the pump; any
    /// captured fault is discarded
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Worker body: transfers until done, then forces both ends inactive
fn run_worker(
    mut reader: Box<dyn AudioReader>,
    input_control: Option<Arc<dyn LineControl>>,
    output: Arc<dyn OutputLine>,
    buffer_size: usize,
    stop_flag: Arc<AtomicBool>,
) -> (Box<dyn AudioReader>, Result<(), PumpError>) {
    let result = transfer(
        reader.as_mut(),
        input_control.as_deref(),
        output.as_ref(),
        buffer_size,
        &stop_flag,
    );
    if let Some(control) = &input_control {
        control.stop();
        control.flush();
    }
    output.stop();
    output.flush();
    debug!("audio pump worker exited");
    (reader, result)
}

fn transfer(
    reader: &mut dyn AudioReader,
    input_control: Option<&dyn LineControl>,
    output: &dyn OutputLine,
    buffer_size: usize,
    stop_flag: &AtomicBool,
) -> Result<(), PumpError> {
    let frame_size = reader.format().frame_size();
    if let Some(control) = input_control {
        control.flush();
        control.start();
    }
    output.flush();
    output.start();
    let mut buf = vec![0u8; buffer_size];
    loop {
        if stop_flag.load(Ordering::Acquire) {
            return Ok(());
        }
        let n = reader.read(&mut buf)?;
        if n == 0 {
            // Natural end of the input: let buffered output play out.
            output.drain();
            return Ok(());
        }
        assert_eq!(
            n % frame_size,
            0,
            "reader returned a partial frame: {} bytes with frame size {}",
            n,
            frame_size
        );
        let accepted = output.write(&buf[..n])?;
        if accepted < n {
            if stop_flag.load(Ordering::Acquire) {
                // The short write came from our own stop, not from the line.
                return Ok(());
            }
            return Err(PumpError::OutputBlocked {
                offered: n,
                accepted,
            });
        }
    }
}

//! Activity detection
//!
//! Subdivides a signal envelope into zones with sound and zones with
//! silence. The envelope is scanned left to right and split into maximal
//! runs on one side of the threshold; runs too short to trust are
//! reclassified as "undef" and merged into their surroundings:
//!
//! - adjacent undef runs are combined,
//! - an undef run followed by an active run is absorbed into it
//!   (extending the zone backward),
//! - an undef run that never reaches an active run before the next silence
//!   run (or the end of the signal) is treated as silence,
//! - the start and the end of the signal count as silence.
//!
//! These merge rules are deliberately asymmetric; changing them moves
//! observable zone boundaries.

use serde::{Deserialize, Serialize};

/// A half-open index range `[start, end)` of sustained activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Index of the first active sample
    pub start: usize,
    /// Index one past the last active sample
    pub end: usize,
}

impl Zone {
    /// Zone length in samples
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// True when the zone spans no samples
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentKind {
    Active,
    Silence,
    Undef,
}

/// An activity detector for segmenting a signal envelope
///
/// The detector holds only its configuration; each [`process`](Self::process)
/// call scans independently, so one detector may classify any number of
/// envelopes.
///
/// # Example
/// ```
/// use audiodsp::signal::activity::ActivityDetector;
///
/// let detector = ActivityDetector::new(1.0, 3, 2);
/// let envelope = [0.0, 0.0, 0.0, 5.0, 5.0, 5.0, 5.0, 0.0, 0.0, 0.0];
/// let zones = detector.process(&envelope);
/// assert_eq!(zones.len(), 1);
/// assert_eq!((zones[0].start, zones[0].end), (3, 7));
/// ```
#[derive(Debug, Clone)]
pub struct ActivityDetector {
    threshold_level: f32,
    min_activity_len: usize,
    min_silence_len: usize,
}

impl ActivityDetector {
    /// Creates an activity detector
    ///
    /// # Arguments
    /// * `threshold_level` - Envelope level separating activity from silence;
    ///   a level equal to the threshold counts as active
    /// * `min_activity_len` - Minimum number of samples for an active run
    /// * `min_silence_len` - Minimum number of samples for a silence run
    pub fn new(threshold_level: f32, min_activity_len: usize, min_silence_len: usize) -> Self {
        Self {
            threshold_level,
            min_activity_len,
            min_silence_len,
        }
    }

    /// Scans a signal envelope and returns the active zones
    ///
    /// Zones are returned in increasing order and never overlap. An empty
    /// envelope yields no zones.
    pub fn process(&self, envelope: &[f32]) -> Vec<Zone> {
        let mut zones = Vec::new();
        let mut pos = 0;
        let mut active_start: Option<usize> = None;
        let mut undef_start: Option<usize> = None;
        while pos < envelope.len() {
            let segment_start = pos;
            match self.scan_segment(envelope, &mut pos) {
                SegmentKind::Silence => {
                    if let Some(start) = active_start.take() {
                        zones.push(Zone {
                            start,
                            end: segment_start,
                        });
                    }
                    undef_start = None;
                }
                SegmentKind::Active => {
                    if active_start.is_none() {
                        active_start = Some(undef_start.unwrap_or(segment_start));
                    }
                    undef_start = None;
                }
                SegmentKind::Undef => {
                    if undef_start.is_none() {
                        undef_start = Some(segment_start);
                    }
                }
            }
        }
        if let Some(start) = active_start {
            zones.push(Zone {
                start,
                end: envelope.len(),
            });
        }
        zones
    }

    /// Advances over the next maximal same-side run and classifies it
    fn scan_segment(&self, envelope: &[f32], pos: &mut usize) -> SegmentKind {
        let start = *pos;
        let active = envelope[*pos] >= self.threshold_level;
        *pos += 1;
        while *pos < envelope.len() && (envelope[*pos] >= self.threshold_level) == active {
            *pos += 1;
        }
        let min_len = if active {
            self.min_activity_len
        } else {
            self.min_silence_len
        };
        if *pos - start < min_len {
            SegmentKind::Undef
        } else if active {
            SegmentKind::Active
        } else {
            SegmentKind::Silence
        }
    }
}

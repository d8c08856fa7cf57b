//! Session capture
//!
//! A [`SessionRecorder`] lives for exactly one recording session. The
//! transport calls its notification handlers, which only decode and append to
//! the owning stream buffer. [`SessionRecorder::stop`] consumes the recorder,
//! so no analysis can read a buffer that is still being written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::decoder::FrameDecoder;
use crate::error::ComputeError;
use crate::types::{AccelerometerSample, IbiSample, Recording, Stream};

/// Append-only sample buffer for one sensor stream
#[derive(Debug, Clone)]
pub struct StreamBuffer<T> {
    samples: Vec<T>,
}

impl<T> Default for StreamBuffer<T> {
    fn default() -> Self {
        Self {
            samples: Vec::new(),
        }
    }
}

impl<T> StreamBuffer<T> {
    pub fn append(&mut self, samples: Vec<T>) -> usize {
        let count = samples.len();
        self.samples.extend(samples);
        count
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.samples
    }

    pub fn into_inner(self) -> Vec<T> {
        self.samples
    }
}

/// One captured transport notification, for offline replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub stream: Stream,
    /// Receipt wall-clock time (unix seconds)
    pub received_at: f64,
    pub payload: Vec<u8>,
}

impl Notification {
    /// Parse NDJSON (one notification per line)
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<Notification>, ComputeError> {
        let mut notifications = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<Notification>(trimmed) {
                Ok(notification) => notifications.push(notification),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(notifications)
    }
}

/// Owns the decoder and both stream buffers for one session
#[derive(Debug)]
pub struct SessionRecorder {
    session_id: Uuid,
    decoder: FrameDecoder,
    accelerometer: StreamBuffer<AccelerometerSample>,
    ibi: StreamBuffer<IbiSample>,
}

impl Default for SessionRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRecorder {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            decoder: FrameDecoder::new(),
            accelerometer: StreamBuffer::default(),
            ibi: StreamBuffer::default(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Accelerometer notification callback. Returns the number of samples
    /// appended.
    pub fn on_accelerometer_notification(&mut self, payload: &[u8]) -> usize {
        let samples = self.decoder.decode_accelerometer_frame(payload);
        self.accelerometer.append(samples)
    }

    /// Heart rate notification callback. Returns the number of IBIs appended.
    pub fn on_heart_rate_notification(&mut self, payload: &[u8]) -> usize {
        let samples = self.decoder.decode_heart_rate_frame(payload);
        self.ibi.append(samples)
    }

    /// Replay a previously captured notification at its recorded receipt
    /// time.
    pub fn replay(&mut self, notification: &Notification) -> usize {
        match notification.stream {
            Stream::Accelerometer => {
                let samples = self
                    .decoder
                    .decode_accelerometer_frame_at(&notification.payload, notification.received_at);
                self.accelerometer.append(samples)
            }
            Stream::HeartRate => {
                let samples = self
                    .decoder
                    .decode_heart_rate_frame_at(&notification.payload, notification.received_at);
                self.ibi.append(samples)
            }
        }
    }

    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }

    pub fn accelerometer(&self) -> &[AccelerometerSample] {
        self.accelerometer.as_slice()
    }

    pub fn ibi(&self) -> &[IbiSample] {
        self.ibi.as_slice()
    }

    /// End the session and hand over the captured streams.
    ///
    /// Accelerometer times become relative to the first accelerometer
    /// sample. IBI times become relative to the wall-clock start of the
    /// accelerometer stream, or to the first IBI when no accelerometer frame
    /// arrived.
    pub fn stop(self) -> Recording {
        debug!(
            accelerometer = self.accelerometer.len(),
            ibi = self.ibi.len(),
            "session stopped"
        );
        if self.accelerometer.is_empty() && !self.ibi.is_empty() {
            warn!("no accelerometer frames; IBI times relative to the first IBI");
        }

        let start_time = self.decoder.accelerometer_start_time();
        let started_at = start_time.and_then(unix_seconds_to_utc);

        let mut accelerometer = self.accelerometer.into_inner();
        if let Some(first) = accelerometer.first().map(|s| s.time) {
            for sample in &mut accelerometer {
                sample.time -= first;
            }
        }

        let mut ibi = self.ibi.into_inner();
        if let Some(origin) = start_time.or_else(|| ibi.first().map(|s| s.time)) {
            for sample in &mut ibi {
                sample.time -= origin;
            }
        }

        Recording {
            session_id: self.session_id,
            started_at,
            accelerometer,
            ibi,
        }
    }
}

fn unix_seconds_to_utc(seconds: f64) -> Option<DateTime<Utc>> {
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1.0e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}

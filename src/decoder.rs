//! Sensor frame decoding
//!
//! Turns raw notification payloads from the chest strap into typed samples:
//! - PMD accelerometer frames (tag `0x02`) into [`AccelerometerSample`]s
//! - GATT Heart Rate Measurement (0x2A37) frames into [`IbiSample`]s
//!
//! Decoding never fails. A payload that is not the expected frame kind, or is
//! too short to carry one, decodes to an empty vector.

use chrono::Utc;

use crate::types::{AccelerometerSample, IbiSample};

/// PMD measurement type tag for accelerometer frames
pub const ACC_FRAME_TAG: u8 = 0x02;

/// Accelerometer sampling frequency requested from the sensor (Hz)
pub const ACC_SAMPLE_RATE_HZ: f64 = 200.0;

/// Header: tag (1) + last-sample timestamp (8) + frame type (1)
const ACC_HEADER_LEN: usize = 10;

const HR_FLAG_UINT16: u8 = 1 << 0;
const HR_FLAG_ENERGY_EXPENDED: u8 = 1 << 3;
const HR_FLAG_RR_PRESENT: u8 = 1 << 4;

/// RR intervals are transmitted in 1/1024 s units
const RR_UNITS_PER_SECOND: f64 = 1024.0;

const NANOS_PER_SECOND: f64 = 1.0e9;

/// Stateful decoder for one recording session.
///
/// The only state is the running sample counts and the wall-clock time at
/// which the accelerometer stream started.
#[derive(Debug, Clone, Default)]
pub struct FrameDecoder {
    acc_samples_seen: usize,
    ibi_samples_seen: usize,
    acc_start_time: Option<f64>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode an accelerometer notification received now.
    pub fn decode_accelerometer_frame(&mut self, payload: &[u8]) -> Vec<AccelerometerSample> {
        self.decode_accelerometer_frame_at(payload, wall_clock_seconds())
    }

    /// Decode an accelerometer notification received at `received_at`
    /// (unix seconds).
    ///
    /// Sample times are back-computed from the embedded timestamp of the
    /// last sample at a fixed 200 Hz spacing.
    pub fn decode_accelerometer_frame_at(
        &mut self,
        payload: &[u8],
        received_at: f64,
    ) -> Vec<AccelerometerSample> {
        if payload.len() < ACC_HEADER_LEN || payload[0] != ACC_FRAME_TAG {
            return Vec::new();
        }

        if self.acc_samples_seen == 0 {
            self.acc_start_time = Some(received_at);
        }

        let timestamp = read_u64_le(&payload[1..9]) as f64 / NANOS_PER_SECOND;
        let width = payload[9] as usize + 1;
        if width > 8 {
            return Vec::new();
        }

        let data = &payload[ACC_HEADER_LEN..];
        let n = data.len() / (3 * width);
        let period = 1.0 / ACC_SAMPLE_RATE_HZ;

        let samples: Vec<AccelerometerSample> = data
            .chunks_exact(3 * width)
            .enumerate()
            .map(|(k, triplet)| {
                let time = timestamp - (n - 1 - k) as f64 * period;
                AccelerometerSample {
                    time,
                    x: read_signed_le(&triplet[..width]) as f64,
                    y: read_signed_le(&triplet[width..2 * width]) as f64,
                    z: read_signed_le(&triplet[2 * width..]) as f64,
                }
            })
            .collect();

        self.acc_samples_seen += samples.len();
        samples
    }

    /// Decode a heart rate measurement notification received now.
    pub fn decode_heart_rate_frame(&mut self, payload: &[u8]) -> Vec<IbiSample> {
        self.decode_heart_rate_frame_at(payload, wall_clock_seconds())
    }

    /// Decode a heart rate measurement notification received at
    /// `received_at` (unix seconds).
    ///
    /// Flags byte layout:
    /// - bit 0: heart rate is uint16 instead of uint8
    /// - bit 3: 2-byte energy expenditure field present
    /// - bit 4: RR intervals present
    ///
    /// The protocol carries no per-interval timestamp, so every interval in the
    /// frame is stamped with the receipt time.
    pub fn decode_heart_rate_frame_at(&mut self, payload: &[u8], received_at: f64) -> Vec<IbiSample> {
        let Some(&flags) = payload.first() else {
            return Vec::new();
        };
        if flags & HR_FLAG_RR_PRESENT == 0 {
            return Vec::new();
        }

        let mut first_rr_byte = 2;
        if flags & HR_FLAG_UINT16 != 0 {
            first_rr_byte += 1;
        }
        if flags & HR_FLAG_ENERGY_EXPENDED != 0 {
            first_rr_byte += 2;
        }
        if first_rr_byte >= payload.len() {
            return Vec::new();
        }

        let samples: Vec<IbiSample> = payload[first_rr_byte..]
            .chunks_exact(2)
            .map(|pair| {
                let raw = u16::from_le_bytes([pair[0], pair[1]]) as f64;
                IbiSample {
                    time: received_at,
                    value: (raw / RR_UNITS_PER_SECOND * 1000.0).ceil(),
                }
            })
            .collect();

        self.ibi_samples_seen += samples.len();
        samples
    }

    /// Number of accelerometer samples decoded so far
    pub fn accelerometer_samples_seen(&self) -> usize {
        self.acc_samples_seen
    }

    /// Number of IBI samples decoded so far
    pub fn ibi_samples_seen(&self) -> usize {
        self.ibi_samples_seen
    }

    /// Receipt time (unix seconds) of the first accelerometer frame
    pub fn accelerometer_start_time(&self) -> Option<f64> {
        self.acc_start_time
    }
}

/// Current wall-clock time in unix seconds
pub fn wall_clock_seconds() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + now.timestamp_subsec_nanos() as f64 / NANOS_PER_SECOND
}

fn read_u64_le(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .rev()
        .fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

/// Little-endian two's complement integer of 1 to 8 bytes
fn read_signed_le(bytes: &[u8]) -> i64 {
    let unused_bits = 64 - 8 * bytes.len() as u32;
    ((read_u64_le(bytes) << unused_bits) as i64) >> unused_bits
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ACC_EXAMPLE: [u8; 16] = [
        0x02, 0xEA, 0x54, 0xA2, 0x42, 0x8B, 0x45, 0x52, 0x08, 0x01, 0x45, 0xFF, 0xE4, 0xFF, 0xB5,
        0x03,
    ];

    fn acc_frame(timestamp_ns: u64, frame_type: u8, samples: &[[i16; 3]]) -> Vec<u8> {
        let mut frame = vec![ACC_FRAME_TAG];
        frame.extend_from_slice(&timestamp_ns.to_le_bytes());
        frame.push(frame_type);
        for s in samples {
            for axis in s {
                frame.extend_from_slice(&axis.to_le_bytes());
            }
        }
        frame
    }

    #[test]
    fn test_decode_example_accelerometer_frame() {
        let mut decoder = FrameDecoder::new();
        let samples = decoder.decode_accelerometer_frame_at(&ACC_EXAMPLE, 100.0);

        assert_eq!(samples.len(), 1);
        // x bytes 45 FF are 0xFF45 as a little-endian i16
        assert_eq!(samples[0].axes(), [-187.0, -28.0, 949.0]);
        let expected_time = 0x0852_458B_42A2_54EA_u64 as f64 / 1.0e9;
        assert_eq!(samples[0].time, expected_time);
        assert_eq!(decoder.accelerometer_start_time(), Some(100.0));
        assert_eq!(decoder.accelerometer_samples_seen(), 1);
    }

    #[test]
    fn test_accelerometer_times_back_computed() {
        let mut decoder = FrameDecoder::new();
        let frame = acc_frame(10_000_000_000, 1, &[[1, 2, 3], [4, 5, 6], [7, 8, 9]]);
        let samples = decoder.decode_accelerometer_frame_at(&frame, 0.0);

        assert_eq!(samples.len(), 3);
        assert!((samples[0].time - 9.99).abs() < 1e-12);
        assert!((samples[1].time - 9.995).abs() < 1e-12);
        assert_eq!(samples[2].time, 10.0);
        assert_eq!(samples[2].axes(), [7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_accelerometer_start_time_only_on_first_frame() {
        let mut decoder = FrameDecoder::new();
        decoder.decode_accelerometer_frame_at(&acc_frame(1_000_000_000, 1, &[[0, 0, 1]]), 5.0);
        decoder.decode_accelerometer_frame_at(&acc_frame(2_000_000_000, 1, &[[0, 0, 1]]), 6.0);
        assert_eq!(decoder.accelerometer_start_time(), Some(5.0));
        assert_eq!(decoder.accelerometer_samples_seen(), 2);
    }

    #[test]
    fn test_non_accelerometer_tag_is_dropped() {
        let mut decoder = FrameDecoder::new();
        let mut ecg = ACC_EXAMPLE;
        ecg[0] = 0x00;
        assert!(decoder.decode_accelerometer_frame_at(&ecg, 1.0).is_empty());
        assert!(decoder.decode_accelerometer_frame_at(&[0x02, 0x01], 1.0).is_empty());
        assert_eq!(decoder.accelerometer_start_time(), None);
    }

    #[test]
    fn test_accelerometer_8bit_and_partial_triplet() {
        let mut decoder = FrameDecoder::new();
        let mut frame = vec![ACC_FRAME_TAG];
        frame.extend_from_slice(&1_000_000_000u64.to_le_bytes());
        frame.push(0x00);
        frame.extend_from_slice(&[0xFF, 0x01, 0x80, 0x7F]);
        let samples = decoder.decode_accelerometer_frame_at(&frame, 0.0);

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].axes(), [-1.0, 1.0, -128.0]);
    }

    #[test]
    fn test_accelerometer_24bit_sign_extension() {
        let mut decoder = FrameDecoder::new();
        let mut frame = vec![ACC_FRAME_TAG];
        frame.extend_from_slice(&0u64.to_le_bytes());
        frame.push(0x02);
        frame.extend_from_slice(&[0xFE, 0xFF, 0xFF, 0x10, 0x00, 0x00, 0x00, 0x00, 0x80]);
        let samples = decoder.decode_accelerometer_frame_at(&frame, 0.0);

        assert_eq!(samples[0].axes(), [-2.0, 16.0, -8_388_608.0]);
    }

    #[test]
    fn test_decode_rr_interval() {
        let mut decoder = FrameDecoder::new();
        let samples = decoder.decode_heart_rate_frame_at(&[0x10, 60, 0x00, 0x04], 42.0);
        assert_eq!(samples, vec![IbiSample::new(42.0, 1000.0)]);
        assert_eq!(decoder.ibi_samples_seen(), 1);
    }

    #[test]
    fn test_rr_offsets_with_uint16_hr_and_energy() {
        let mut decoder = FrameDecoder::new();
        // flags, hr (2), energy (2), rr 512, rr 800
        let payload = [0x19, 0x2C, 0x01, 0x10, 0x00, 0x00, 0x02, 0x20, 0x03];
        let samples = decoder.decode_heart_rate_frame_at(&payload, 1.0);

        let values: Vec<f64> = samples.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![500.0, (800.0_f64 / 1024.0 * 1000.0).ceil()]);
        assert!(samples.iter().all(|s| s.time == 1.0));
    }

    #[test]
    fn test_heart_rate_without_rr_is_empty() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.decode_heart_rate_frame_at(&[0x00, 72], 1.0).is_empty());
        assert!(decoder.decode_heart_rate_frame_at(&[], 1.0).is_empty());
        assert!(decoder.decode_heart_rate_frame_at(&[0x10, 72], 1.0).is_empty());
        assert_eq!(decoder.ibi_samples_seen(), 0);
    }

    #[test]
    fn test_trailing_odd_rr_byte_ignored() {
        let mut decoder = FrameDecoder::new();
        let samples = decoder.decode_heart_rate_frame_at(&[0x10, 60, 0x00, 0x04, 0x07], 0.0);
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn test_decoded_times_non_decreasing() {
        let mut decoder = FrameDecoder::new();
        let mut times = Vec::new();
        for frame in 0..5u64 {
            let ts = 1_000_000_000 + frame * 50_000_000;
            let samples: Vec<[i16; 3]> = (0..10).map(|i| [i, -i, 1000]).collect();
            let decoded = decoder.decode_accelerometer_frame_at(&acc_frame(ts, 1, &samples), 0.0);
            times.extend(decoded.iter().map(|s| s.time));
        }
        assert_eq!(times.len(), 50);
        assert!(times.windows(2).all(|w| w[0] <= w[1] + 1e-12));
    }
}

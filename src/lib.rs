//! breath-flux - Breathing rate and HRV from a chest-strap sensor
//!
//! breath-flux turns the raw notification streams of a chest strap into two
//! physiological series through a deterministic pipeline: frame decoding →
//! session capture → gravity/noise filtering → breath peak detection → HRV
//! extraction and alignment.
//!
//! ## Modules
//!
//! - **Capture**: decode accelerometer and heart rate frames into samples
//!   ([`decoder`], [`recorder`])
//! - **Analysis**: derive breathing rate and HRV from a complete recording
//!   ([`signal`], [`breathing`], [`hrv`], [`pipeline`])

pub mod breathing;
pub mod config;
pub mod decoder;
pub mod error;
pub mod filter;
pub mod hrv;
pub mod peaks;
pub mod pipeline;
pub mod recorder;
pub mod signal;
pub mod types;

pub use config::AnalysisConfig;
pub use decoder::FrameDecoder;
pub use error::ComputeError;
pub use pipeline::{analyze_recording_json, BreathingAnalyser};
pub use recorder::{Notification, SessionRecorder};
pub use types::{
    AccelerometerSample, BreathingAnalysis, BreathingRateSample, HrvSample, IbiSample, Recording,
};

/// Crate version embedded in CLI output
pub const FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

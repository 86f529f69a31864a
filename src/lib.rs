//! Real-time audio spectrum analysis: log-spaced frequency bands with
//! attack/release smoothing, decaying peak markers and a peak/RMS meter.

pub mod audio;
pub mod dsp;
pub mod settings;
pub mod util;

pub use dsp::analyzer::{Analyzer, AnalyzerError, ResizeError};
pub use dsp::{Reconfigurable, SampleFormat};
pub use settings::{AnalyzerSettings, SettingsStore};

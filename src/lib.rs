pub mod config;
pub mod constants;
pub mod error;
pub mod extract;
pub mod output;
pub mod processing;
pub mod session;
pub mod signal_processing;
pub mod source;
pub mod wav;

#[cfg(feature = "simulation")]
pub mod simulation;

pub use config::VitalsConfig;
pub use error::{Result, VitalsError};
pub use processing::{Channel, FrameSample, SignalProcessor, VitalsProcessor, WaveformResult};
pub use wav::save_recording;

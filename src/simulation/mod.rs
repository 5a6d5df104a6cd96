mod measure;
mod noise;
mod signal;

pub use measure::{ErrorStats, RateMeasurement, measure_error_across_rates, measure_rates};
pub use noise::{
    AdditiveNoiseConfig, DropoutConfig, ImpulseNoiseConfig, NoiseConfig, apply_noise,
    generate_noisy_test_frames, signal_power, white_noise,
};
pub use signal::{
    BREATHING_AMPLITUDE, CARDIAC_BASELINE, ILLUMINATION_DRIFT_PER_SEC, POSTURE_DRIFT_PER_SEC,
    PULSE_AMPLITUDE, breathing_component, cardiac_trace, generate_sine, generate_test_frames,
    generate_test_frames_with_rate_fn, pulse_component, respiration_trace, zip_frames,
};

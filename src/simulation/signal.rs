use std::f32::consts::PI;

use crate::processing::FrameSample;

/// Mean green level of a skin ROI (8-bit scale)
pub const CARDIAC_BASELINE: f32 = 100.0;
/// Pulse-induced green variation, peak amplitude
pub const PULSE_AMPLITUDE: f32 = 0.5;
/// Slow illumination change, green levels per second
pub const ILLUMINATION_DRIFT_PER_SEC: f32 = 0.06;
/// Peak shoulder motion signal
pub const BREATHING_AMPLITUDE: f32 = 1.0;
/// Slow posture change in the shoulder motion trace, per second
pub const POSTURE_DRIFT_PER_SEC: f32 = 0.03;

/// Sine of `freq_hz` sampled at `frame_rate`
pub fn generate_sine(num_frames: usize, frame_rate: f32, freq_hz: f32, amplitude: f32) -> Vec<f32> {
    (0..num_frames)
        .map(|i| amplitude * (2.0 * PI * freq_hz * i as f32 / frame_rate).sin())
        .collect()
}

/// Pulse component at `bpm`
pub fn pulse_component(num_frames: usize, frame_rate: f32, bpm: f32) -> Vec<f32> {
    generate_sine(num_frames, frame_rate, bpm / 60.0, PULSE_AMPLITUDE)
}

/// Breathing component at `rpm`
pub fn breathing_component(num_frames: usize, frame_rate: f32, rpm: f32) -> Vec<f32> {
    generate_sine(num_frames, frame_rate, rpm / 60.0, BREATHING_AMPLITUDE)
}

/// Green ROI mean trace: baseline plus illumination drift plus `pulse`
pub fn cardiac_trace(pulse: &[f32], frame_rate: f32) -> Vec<f32> {
    pulse
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let t = i as f32 / frame_rate;
            CARDIAC_BASELINE + ILLUMINATION_DRIFT_PER_SEC * t + p
        })
        .collect()
}

/// Shoulder motion trace: `breathing` plus posture drift
pub fn respiration_trace(breathing: &[f32], frame_rate: f32) -> Vec<f32> {
    breathing
        .iter()
        .enumerate()
        .map(|(i, &b)| b + POSTURE_DRIFT_PER_SEC * i as f32 / frame_rate)
        .collect()
}

/// Pair channel traces into frames
pub fn zip_frames(cardiac: &[f32], respiration: &[f32]) -> Vec<FrameSample> {
    cardiac
        .iter()
        .zip(respiration)
        .map(|(&c, &r)| FrameSample::new(c, r))
        .collect()
}

/// Synthetic recording with constant rates
pub fn generate_test_frames(
    duration_secs: f32,
    frame_rate: f32,
    bpm: f32,
    rpm: f32,
) -> Vec<FrameSample> {
    generate_test_frames_with_rate_fn(duration_secs, frame_rate, |_| (bpm, rpm))
}

/// Synthetic recording with time-varying rates
///
/// `rate_fn` maps time in seconds to `(bpm, rpm)`. Phase is accumulated
/// frame by frame so rate changes stay continuous.
pub fn generate_test_frames_with_rate_fn<F>(
    duration_secs: f32,
    frame_rate: f32,
    rate_fn: F,
) -> Vec<FrameSample>
where
    F: Fn(f32) -> (f32, f32),
{
    let num_frames = (duration_secs * frame_rate) as usize;
    let dt = 1.0 / frame_rate;

    let mut pulse = Vec::with_capacity(num_frames);
    let mut breathing = Vec::with_capacity(num_frames);
    let mut pulse_phase = 0.0f32;
    let mut breathing_phase = 0.0f32;

    for i in 0..num_frames {
        let (bpm, rpm) = rate_fn(i as f32 * dt);
        pulse.push(PULSE_AMPLITUDE * pulse_phase.sin());
        breathing.push(BREATHING_AMPLITUDE * breathing_phase.sin());
        pulse_phase = (pulse_phase + 2.0 * PI * bpm / 60.0 * dt) % (2.0 * PI);
        breathing_phase = (breathing_phase + 2.0 * PI * rpm / 60.0 * dt) % (2.0 * PI);
    }

    zip_frames(
        &cardiac_trace(&pulse, frame_rate),
        &respiration_trace(&breathing, frame_rate),
    )
}

#![allow(dead_code)]

pub use vitalscope::simulation::{
    NoiseConfig, generate_noisy_test_frames, generate_sine, generate_test_frames,
    generate_test_frames_with_rate_fn, white_noise,
};

use vitalscope::processing::{FrameResult, FrameSample, VitalsProcessor};

/// Spacing of FFT bins in cycles per minute for an `n`-sample window
pub fn bin_per_minute(frame_rate: f32, n: usize) -> f32 {
    frame_rate / n as f32 * 60.0
}

/// Run `frames` through `processor`, returning the last result
pub fn feed(processor: &mut VitalsProcessor, frames: &[FrameSample]) -> FrameResult {
    let mut last = FrameResult::default();
    for &frame in frames {
        last = processor.process_frame(frame);
    }
    last
}

pub fn rms(x: &[f32]) -> f32 {
    (x.iter().map(|v| v * v).sum::<f32>() / x.len() as f32).sqrt()
}

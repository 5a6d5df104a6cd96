use std::path::Path;

use hound::{WavSpec, WavWriter};

use crate::processing::FrameSample;

/// Write frames as a stereo float WAV recording
///
/// Left carries the cardiac trace, right the respiration trace, and the WAV
/// sample rate is the frame rate (WAV headers only hold whole rates).
pub fn save_recording<P: AsRef<Path>>(
    path: P,
    frames: &[FrameSample],
    frame_rate: u32,
) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 2,
        sample_rate: frame_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec)?;

    for frame in frames {
        writer.write_sample(frame.cardiac)?;
        writer.write_sample(frame.respiration)?;
    }

    writer.finalize()?;
    Ok(())
}

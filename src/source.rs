//! Per-frame sample sources
//!
//! Everything upstream of the pipeline (camera, face and pose landmarks,
//! ROI averaging) happens elsewhere; a source only hands over one
//! `FrameSample` per video frame.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use hound::WavReader;

use crate::config::CaptureConfig;
use crate::error::VitalsError;
use crate::processing::FrameSample;

pub trait SampleSource: Send {
    /// Next frame, or `None` once the source is exhausted
    fn next_frame(&mut self) -> anyhow::Result<Option<FrameSample>>;

    /// Frame rate the source was captured at, if it knows it
    fn frame_rate(&self) -> Option<f32>;

    /// Stop flag of the session driving this source
    ///
    /// Sources that can block indefinitely in `next_frame` should return
    /// `Ok(None)` soon after the flag is set.
    fn watch_stop(&mut self, _stop: Arc<AtomicBool>) {}
}

/// Stereo WAV recording sampled at the frame rate
pub struct WavFileSource {
    frames: Vec<FrameSample>,
    position: usize,
    frame_rate: u32,
}

impl WavFileSource {
    /// Open a recording, mapping its channels per `capture`
    pub fn new<P: AsRef<Path>>(path: P, capture: &CaptureConfig) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let reader = WavReader::open(path)
            .with_context(|| format!("Failed to open recording {}", path.display()))?;
        let spec = reader.spec();

        if spec.channels != 2 {
            return Err(VitalsError::SourceFormat(format!(
                "expected stereo recording, got {} channels",
                spec.channels
            ))
            .into());
        }

        let samples = Self::read_samples(reader, &spec)?;
        let frames = samples
            .chunks_exact(2)
            .map(|pair| capture.frame_from_stereo(pair[0], pair[1]))
            .collect();

        Ok(Self {
            frames,
            position: 0,
            frame_rate: spec.sample_rate,
        })
    }

    fn read_samples(
        mut reader: WavReader<BufReader<File>>,
        spec: &hound::WavSpec,
    ) -> anyhow::Result<Vec<f32>> {
        let samples = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                let max_val = 2_i64.pow(spec.bits_per_sample as u32 - 1) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / max_val))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(samples)
    }

    /// Total frames in the recording
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl SampleSource for WavFileSource {
    fn next_frame(&mut self) -> anyhow::Result<Option<FrameSample>> {
        let frame = self.frames.get(self.position).copied();
        if frame.is_some() {
            self.position += 1;
        }
        Ok(frame)
    }

    fn frame_rate(&self) -> Option<f32> {
        Some(self.frame_rate as f32)
    }
}

/// Text stream with one `cardiac,respiration` pair per line
///
/// Values may be separated by a comma or whitespace. Blank lines and lines
/// starting with `#` are skipped.
pub struct LineSource<R> {
    reader: R,
    line: String,
    line_number: usize,
}

impl<R: BufRead + Send> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_number: 0,
        }
    }
}

impl LineSource<BufReader<std::io::Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(std::io::stdin()))
    }
}

impl<R: BufRead + Send> SampleSource for LineSource<R> {
    fn next_frame(&mut self) -> anyhow::Result<Option<FrameSample>> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let text = self.line.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }

            let frame = parse_frame_line(text)
                .with_context(|| format!("Line {}: {:?}", self.line_number, text))?;
            return Ok(Some(frame));
        }
    }

    fn frame_rate(&self) -> Option<f32> {
        None
    }
}

/// Parse `"cardiac,respiration"` (or whitespace separated)
pub fn parse_frame_line(text: &str) -> anyhow::Result<FrameSample> {
    let mut fields = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|f| !f.is_empty());

    let mut next_value = |name: &str| -> anyhow::Result<f32> {
        let field = fields
            .next()
            .with_context(|| format!("missing {} value", name))?;
        field
            .parse::<f32>()
            .with_context(|| format!("invalid {} value {:?}", name, field))
    };

    let cardiac = next_value("cardiac")?;
    let respiration = next_value("respiration")?;
    if fields.next().is_some() {
        anyhow::bail!("expected two values");
    }

    Ok(FrameSample::new(cardiac, respiration))
}

/// How often an idle `ChannelSource` re-checks its stop flag
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Frames pushed by an in-process producer
///
/// Ends when every sender has been dropped, or once the watched stop flag is
/// set while the producer is idle.
pub struct ChannelSource {
    rx: Receiver<FrameSample>,
    frame_rate: Option<f32>,
    stop: Option<Arc<AtomicBool>>,
}

impl ChannelSource {
    pub fn new(rx: Receiver<FrameSample>, frame_rate: Option<f32>) -> Self {
        Self {
            rx,
            frame_rate,
            stop: None,
        }
    }

    fn stop_requested(&self) -> bool {
        self.stop
            .as_ref()
            .is_some_and(|stop| stop.load(Ordering::Relaxed))
    }
}

impl SampleSource for ChannelSource {
    fn next_frame(&mut self) -> anyhow::Result<Option<FrameSample>> {
        loop {
            match self.rx.recv_timeout(STOP_POLL_INTERVAL) {
                Ok(frame) => return Ok(Some(frame)),
                Err(RecvTimeoutError::Disconnected) => return Ok(None),
                Err(RecvTimeoutError::Timeout) => {
                    if self.stop_requested() {
                        return Ok(None);
                    }
                }
            }
        }
    }

    fn frame_rate(&self) -> Option<f32> {
        self.frame_rate
    }

    fn watch_stop(&mut self, stop: Arc<AtomicBool>) {
        self.stop = Some(stop);
    }
}

use std::fmt;

use crate::config::{ChannelConfig, VitalsConfig};
use crate::constants::FALLBACK_FRAME_RATE;
use crate::signal_processing::iir_butterworth_bandpass;
use crate::signal_processing::{
    BandpassOutcome, Detrender, RateSmoother, SampleBuffer, SpectralRateEstimator,
};

/// Physiological signal carried by one pipeline channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Pulse, from the green-channel skin color trace
    Cardiac,
    /// Breathing, from shoulder motion
    Respiration,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Cardiac, Channel::Respiration];

    /// Unit the channel's rate is reported in
    pub fn rate_unit(&self) -> &'static str {
        match self {
            Channel::Cardiac => "BPM",
            Channel::Respiration => "RPM",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Cardiac => write!(f, "cardiac"),
            Channel::Respiration => write!(f, "respiration"),
        }
    }
}

/// One scalar per channel for a single video frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameSample {
    pub cardiac: f32,
    pub respiration: f32,
}

impl FrameSample {
    pub fn new(cardiac: f32, respiration: f32) -> Self {
        Self {
            cardiac,
            respiration,
        }
    }

    pub fn get(&self, channel: Channel) -> f32 {
        match channel {
            Channel::Cardiac => self.cardiac,
            Channel::Respiration => self.respiration,
        }
    }
}

/// Waveform produced for one channel on one frame
///
/// The variant records which stage produced the samples, so a consumer can
/// tell a properly filtered trace from a degraded one.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum WaveformResult {
    /// Buffer not full yet
    #[default]
    Empty,
    /// Detrended and bandpass filtered
    Filtered(Vec<f32>),
    /// Filtering was not possible; detrended samples instead
    DetrendedFallback(Vec<f32>),
    /// Window too short for the filter; raw buffer contents
    RawFallback(Vec<f32>),
}

impl WaveformResult {
    pub fn samples(&self) -> &[f32] {
        match self {
            WaveformResult::Empty => &[],
            WaveformResult::Filtered(s)
            | WaveformResult::DetrendedFallback(s)
            | WaveformResult::RawFallback(s) => s,
        }
    }

    pub fn into_samples(self) -> Vec<f32> {
        match self {
            WaveformResult::Empty => Vec::new(),
            WaveformResult::Filtered(s)
            | WaveformResult::DetrendedFallback(s)
            | WaveformResult::RawFallback(s) => s,
        }
    }

    pub fn is_filtered(&self) -> bool {
        matches!(self, WaveformResult::Filtered(_))
    }

    pub fn is_empty(&self) -> bool {
        self.samples().is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples().len()
    }
}

/// Waveform and instantaneous rate for one channel
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChannelOutcome {
    pub waveform: WaveformResult,
    /// Rate per minute, `0.0` when there is no estimate
    pub rate: f32,
}

struct ChannelPipeline {
    channel: Channel,
    buffer: SampleBuffer,
    detrender: Detrender,
    params: ChannelConfig,
    has_estimated: bool,
}

impl ChannelPipeline {
    fn new(channel: Channel, params: &ChannelConfig, buffer_size: usize, fs: f32) -> Self {
        Self {
            channel,
            buffer: SampleBuffer::new(buffer_size),
            detrender: Detrender::new(params.detrend_window_secs, fs),
            params: params.clone(),
            has_estimated: false,
        }
    }

    fn process(
        &mut self,
        sample: f32,
        fs: f32,
        estimator: &mut SpectralRateEstimator,
    ) -> ChannelOutcome {
        self.buffer.append(sample);
        if !self.buffer.is_full() {
            return ChannelOutcome::default();
        }

        let raw = self.buffer.snapshot();
        let detrended = self.detrender.apply(&raw);
        let p = &self.params;

        let outcome = match iir_butterworth_bandpass::apply(
            &detrended,
            p.low_hz,
            p.high_hz,
            p.filter_order,
            fs,
        ) {
            BandpassOutcome::Filtered(filtered) => {
                let rate = estimator.estimate(
                    &filtered,
                    fs,
                    p.low_hz,
                    p.high_hz,
                    p.min_analysis_secs,
                );
                ChannelOutcome {
                    waveform: WaveformResult::Filtered(filtered),
                    rate,
                }
            }
            BandpassOutcome::Unfiltered(_) => {
                let rate = estimator.estimate(
                    &detrended,
                    fs,
                    p.low_hz,
                    p.high_hz,
                    p.min_analysis_secs,
                );
                ChannelOutcome {
                    waveform: WaveformResult::DetrendedFallback(detrended),
                    rate,
                }
            }
            BandpassOutcome::TooShort => ChannelOutcome {
                waveform: WaveformResult::RawFallback(raw),
                rate: 0.0,
            },
        };

        if outcome.rate > 0.0 && !self.has_estimated {
            self.has_estimated = true;
            log::debug!(
                "First {} estimate: {:.1} {}",
                self.channel,
                outcome.rate,
                self.channel.rate_unit()
            );
        }

        outcome
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.has_estimated = false;
    }
}

/// Per-session two-channel rate pipeline
///
/// Each channel keeps its own sample buffer. On every sample the full buffer
/// is detrended, zero-phase bandpass filtered and searched for its dominant
/// frequency; nothing but the buffer carries over between calls.
///
/// Until a channel's buffer is full, its results are `WaveformResult::Empty`
/// with a rate of `0.0`.
pub struct SignalProcessor {
    sample_rate: f32,
    cardiac: ChannelPipeline,
    respiration: ChannelPipeline,
    estimator: SpectralRateEstimator,
}

impl SignalProcessor {
    /// Create a processor for one session
    ///
    /// A non-positive or non-finite frame rate is replaced by 30 fps with a
    /// warning.
    pub fn new(config: &VitalsConfig) -> Self {
        let mut sample_rate = config.capture.frame_rate;
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            log::warn!(
                "Invalid frame rate {}, assuming {} fps",
                sample_rate,
                FALLBACK_FRAME_RATE
            );
            sample_rate = FALLBACK_FRAME_RATE;
        }

        let buffer_size = config.capture.buffer_size;
        Self {
            sample_rate,
            cardiac: ChannelPipeline::new(
                Channel::Cardiac,
                &config.cardiac,
                buffer_size,
                sample_rate,
            ),
            respiration: ChannelPipeline::new(
                Channel::Respiration,
                &config.respiration,
                buffer_size,
                sample_rate,
            ),
            estimator: SpectralRateEstimator::new(),
        }
    }

    /// Feed one sample to `channel` and analyze its buffer
    pub fn process(&mut self, channel: Channel, sample: f32) -> ChannelOutcome {
        let fs = self.sample_rate;
        let pipeline = match channel {
            Channel::Cardiac => &mut self.cardiac,
            Channel::Respiration => &mut self.respiration,
        };
        pipeline.process(sample, fs, &mut self.estimator)
    }

    pub fn process_cardiac(&mut self, sample: f32) -> ChannelOutcome {
        self.process(Channel::Cardiac, sample)
    }

    pub fn process_respiration(&mut self, sample: f32) -> ChannelOutcome {
        self.process(Channel::Respiration, sample)
    }

    /// Raw buffered samples of `channel`, oldest first
    pub fn raw_signal(&self, channel: Channel) -> Vec<f32> {
        self.pipeline(channel).buffer.snapshot()
    }

    pub fn raw_cardiac(&self) -> Vec<f32> {
        self.raw_signal(Channel::Cardiac)
    }

    pub fn raw_respiration(&self) -> Vec<f32> {
        self.raw_signal(Channel::Respiration)
    }

    /// Whether `channel` has a full buffer and is being analyzed
    pub fn is_warm(&self, channel: Channel) -> bool {
        self.pipeline(channel).buffer.is_full()
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn buffer_size(&self) -> usize {
        self.cardiac.buffer.capacity()
    }

    /// Drop all buffered samples (new session)
    pub fn reset(&mut self) {
        self.cardiac.reset();
        self.respiration.reset();
    }

    fn pipeline(&self, channel: Channel) -> &ChannelPipeline {
        match channel {
            Channel::Cardiac => &self.cardiac,
            Channel::Respiration => &self.respiration,
        }
    }
}

/// Processed output for one channel on one frame
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChannelOutput {
    pub waveform: WaveformResult,
    /// Instantaneous rate per minute (`0.0` = no estimate)
    pub rate: f32,
    /// Moving average of recent positive rates
    pub smoothed_rate: f32,
}

/// Processed output for one frame
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameResult {
    pub cardiac: ChannelOutput,
    pub respiration: ChannelOutput,
}

impl FrameResult {
    pub fn channel(&self, channel: Channel) -> &ChannelOutput {
        match channel {
            Channel::Cardiac => &self.cardiac,
            Channel::Respiration => &self.respiration,
        }
    }
}

/// Per-frame orchestration: signal processor plus displayed-rate smoothing
pub struct VitalsProcessor {
    signal: SignalProcessor,
    cardiac_smoother: RateSmoother,
    respiration_smoother: RateSmoother,
    frames_processed: u64,
}

impl VitalsProcessor {
    pub fn new(config: &VitalsConfig) -> Self {
        let history = config.smoothing.history_size;
        Self {
            signal: SignalProcessor::new(config),
            cardiac_smoother: RateSmoother::new(history),
            respiration_smoother: RateSmoother::new(history),
            frames_processed: 0,
        }
    }

    /// Feed one frame's samples through both channels
    pub fn process_frame(&mut self, frame: FrameSample) -> FrameResult {
        self.frames_processed += 1;

        let cardiac = self.signal.process_cardiac(frame.cardiac);
        let respiration = self.signal.process_respiration(frame.respiration);

        FrameResult {
            cardiac: ChannelOutput {
                smoothed_rate: self.cardiac_smoother.observe(cardiac.rate),
                waveform: cardiac.waveform,
                rate: cardiac.rate,
            },
            respiration: ChannelOutput {
                smoothed_rate: self.respiration_smoother.observe(respiration.rate),
                waveform: respiration.waveform,
                rate: respiration.rate,
            },
        }
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn signal_processor(&self) -> &SignalProcessor {
        &self.signal
    }

    pub fn sample_rate(&self) -> f32 {
        self.signal.sample_rate()
    }

    /// Clear buffers and smoothing history
    pub fn reset(&mut self) {
        self.signal.reset();
        self.cardiac_smoother.reset();
        self.respiration_smoother.reset();
        self.frames_processed = 0;
    }
}

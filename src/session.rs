//! Worker thread that drives a sample source through the pipeline
//!
//! The worker owns the source and a `VitalsProcessor`, runs them
//! sequentially, and publishes updates over a crossbeam channel at the
//! configured output rate (in stream time). Stopping is cooperative: the
//! flag is checked between frames, and sources that wait on a producer also
//! watch it while idle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::config::VitalsConfig;
use crate::processing::{FrameResult, VitalsProcessor, WaveformResult};
use crate::source::SampleSource;

const EVENT_QUEUE_DEPTH: usize = 64;

/// Snapshot of the pipeline published to the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub struct VitalsUpdate {
    /// Index of the frame this update was produced on (0-based)
    pub frame_index: u64,
    /// Stream time of that frame in seconds
    pub time_secs: f64,
    /// Smoothed cardiac rate (beats per minute)
    pub bpm: f32,
    /// Instantaneous cardiac rate
    pub bpm_raw: f32,
    /// Smoothed respiration rate (breaths per minute)
    pub rpm: f32,
    /// Instantaneous respiration rate
    pub rpm_raw: f32,
    pub cardiac_waveform: WaveformResult,
    pub respiration_waveform: WaveformResult,
    /// Frames processed per wall-clock second, once a second has elapsed
    pub processing_fps: Option<f32>,
}

impl VitalsUpdate {
    fn from_frame(frame_index: u64, time_secs: f64, result: FrameResult, fps: Option<f32>) -> Self {
        Self {
            frame_index,
            time_secs,
            bpm: result.cardiac.smoothed_rate,
            bpm_raw: result.cardiac.rate,
            rpm: result.respiration.smoothed_rate,
            rpm_raw: result.respiration.rate,
            cardiac_waveform: result.cardiac.waveform,
            respiration_waveform: result.respiration.waveform,
            processing_fps: fps,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Update(VitalsUpdate),
    /// The source failed; the session stops after this
    Error(String),
    /// The worker has exited (source exhausted, stop requested or error)
    Stopped,
}

/// Handle to a running session
pub struct Session {
    rx: Receiver<SessionEvent>,
    stop_requested: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
    stopped: bool,
    error: Option<String>,
}

impl Session {
    /// Start processing `source` on a dedicated thread
    ///
    /// With `realtime` set the worker paces itself to the frame rate, which
    /// is what replaying a recording needs. Live sources pace themselves.
    pub fn spawn(mut source: Box<dyn SampleSource>, config: VitalsConfig, realtime: bool) -> Self {
        let (tx, rx) = bounded(EVENT_QUEUE_DEPTH);
        let stop_requested = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&stop_requested);
        source.watch_stop(Arc::clone(&stop_requested));

        let handle = thread::spawn(move || {
            if let Err(e) = run_session(source, &config, &tx, &stop, realtime) {
                log::warn!("Session error: {:#}", e);
                let _ = tx.send(SessionEvent::Error(format!("{:#}", e)));
            }
            let _ = tx.send(SessionEvent::Stopped);
        });

        Self {
            rx,
            stop_requested,
            handle: Some(handle),
            stopped: false,
            error: None,
        }
    }

    /// Raw event stream
    pub fn events(&self) -> &Receiver<SessionEvent> {
        &self.rx
    }

    /// Drain pending events and return the newest update, if any
    pub fn latest(&mut self) -> Option<VitalsUpdate> {
        let mut latest = None;
        while let Ok(event) = self.rx.try_recv() {
            if let SessionEvent::Update(update) = self.record(event) {
                latest = Some(update);
            }
        }
        latest
    }

    /// Whether `latest` has seen the worker's `Stopped` event
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Source failure seen by `latest`, if the session ended on one
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Note `Stopped` and `Error` events, handing the event back
    fn record(&mut self, event: SessionEvent) -> SessionEvent {
        match &event {
            SessionEvent::Error(message) => self.error = Some(message.clone()),
            SessionEvent::Stopped => self.stopped = true,
            SessionEvent::Update(_) => {}
        }
        event
    }

    /// Ask the worker to stop after the current frame
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Relaxed);
    }

    /// Stop the worker and wait for it to exit
    pub fn join(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.request_stop();
        if let Some(handle) = self.handle.take() {
            // Unblock a worker waiting on a full queue
            while !handle.is_finished() {
                while let Ok(event) = self.rx.try_recv() {
                    self.record(event);
                }
                thread::sleep(Duration::from_millis(1));
            }
            if handle.join().is_err() {
                log::warn!("Session worker panicked");
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Frames processed per wall-clock second
struct FpsMeter {
    window_start: Instant,
    frames: u32,
    fps: Option<f32>,
}

impl FpsMeter {
    fn new() -> Self {
        Self {
            window_start: Instant::now(),
            frames: 0,
            fps: None,
        }
    }

    fn tick(&mut self) -> Option<f32> {
        self.frames += 1;
        let elapsed = self.window_start.elapsed().as_secs_f32();
        if elapsed >= 1.0 {
            self.fps = Some(self.frames as f32 / elapsed);
            self.frames = 0;
            self.window_start = Instant::now();
        }
        self.fps
    }
}

fn run_session(
    mut source: Box<dyn SampleSource>,
    config: &VitalsConfig,
    tx: &Sender<SessionEvent>,
    stop_requested: &AtomicBool,
    realtime: bool,
) -> anyhow::Result<()> {
    let mut processor = VitalsProcessor::new(config);
    let fs = processor.sample_rate() as f64;
    let output_interval = match config.output.output_rate_hz {
        r if r.is_finite() && r > 0.0 => 1.0 / r as f64,
        _ => 0.0,
    };

    log::info!(
        "Session started: {:.2} fps, buffer {} frames, output every {:.2} s",
        fs,
        processor.signal_processor().buffer_size(),
        output_interval
    );

    let mut fps_meter = FpsMeter::new();
    let wall_start = Instant::now();
    let mut next_output = 0.0_f64;

    while !stop_requested.load(Ordering::Relaxed) {
        let Some(frame) = source.next_frame()? else {
            break;
        };

        let result = processor.process_frame(frame);
        let frame_index = processor.frames_processed() - 1;
        let time_secs = frame_index as f64 / fs;
        let fps = fps_meter.tick();

        if time_secs + 1e-9 >= next_output {
            next_output += output_interval;
            if next_output <= time_secs {
                next_output = time_secs + output_interval;
            }
            let update = VitalsUpdate::from_frame(frame_index, time_secs, result, fps);
            if tx.send(SessionEvent::Update(update)).is_err() {
                break;
            }
        }

        if realtime {
            let expected = (frame_index + 1) as f64 / fs;
            let elapsed = wall_start.elapsed().as_secs_f64();
            if expected > elapsed {
                thread::sleep(Duration::from_secs_f64(expected - elapsed));
            }
        }
    }

    log::info!(
        "Session stopped after {} frames",
        processor.frames_processed()
    );
    Ok(())
}

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use vitalscope::config::{FrameRate, VitalsConfig};
use vitalscope::output::{OutputFormat, VitalsOutput, create_formatter};
use vitalscope::session::{Session, SessionEvent};
use vitalscope::source::{LineSource, SampleSource, WavFileSource};

#[derive(Parser, Debug)]
#[command(name = "vitalscope")]
#[command(about = "Estimate heart and breathing rate from per-frame vital signals", long_about = None)]
struct Args {
    /// Stereo WAV recording (left = cardiac, right = respiration).
    /// Reads "cardiac,respiration" lines from stdin when omitted.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Frame rate (e.g., "30", "29.97fps", "33.3ms")
    #[arg(long)]
    fps: Option<FrameRate>,

    /// Per-channel buffer size in frames
    #[arg(long)]
    buffer_size: Option<usize>,

    /// Number of estimates averaged for the displayed rate
    #[arg(long)]
    history: Option<usize>,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Replay recordings at their frame rate instead of as fast as possible
    #[arg(long)]
    realtime: bool,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let mut config = match &args.config {
        Some(path) => VitalsConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => VitalsConfig::default(),
    };

    if let Some(buffer_size) = args.buffer_size {
        config.capture.buffer_size = buffer_size;
    }
    if let Some(history) = args.history {
        config.smoothing.history_size = history;
    }

    let source: Box<dyn SampleSource> = match &args.input {
        Some(path) => Box::new(WavFileSource::new(path, &config.capture)?),
        None => Box::new(LineSource::stdin()),
    };

    config.capture.frame_rate = match (args.fps, source.frame_rate()) {
        (Some(rate), _) => rate.as_fps(),
        (None, Some(fps)) => fps,
        (None, None) => config.capture.frame_rate,
    };
    config.validate()?;

    eprintln!("=== vitalscope ===");
    eprintln!("Frame rate: {} fps", config.capture.frame_rate);
    eprintln!(
        "Buffer: {} frames ({:.1} s)",
        config.capture.buffer_size,
        config.capture.buffer_size as f32 / config.capture.frame_rate
    );
    eprintln!(
        "Cardiac band: {}-{} Hz, respiration band: {}-{} Hz",
        config.cardiac.low_hz,
        config.cardiac.high_hz,
        config.respiration.low_hz,
        config.respiration.high_hz
    );
    eprintln!();

    let formatter = create_formatter(args.format, args.verbose > 0);
    if let Some(header) = formatter.header() {
        println!("{}", header);
    }

    let session = Session::spawn(source, config, args.realtime);
    let mut failure = None;

    for event in session.events().iter() {
        match event {
            SessionEvent::Update(update) => {
                println!("{}", formatter.format(&VitalsOutput::from(&update)));
            }
            SessionEvent::Error(message) => failure = Some(message),
            SessionEvent::Stopped => break,
        }
    }
    session.join();

    match failure {
        Some(message) => anyhow::bail!("Processing failed: {}", message),
        None => Ok(()),
    }
}

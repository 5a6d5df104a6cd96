use super::{Formatter, VitalsOutput};

pub struct TextFormatter {
    verbose: bool,
}

impl TextFormatter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

fn rate(value: f32) -> String {
    if value > 0.0 {
        format!("{:>5.1}", value)
    } else {
        format!("{:>5}", "--")
    }
}

impl Formatter for TextFormatter {
    fn format(&self, output: &VitalsOutput) -> String {
        if self.verbose {
            let fps = output
                .processing_fps
                .map_or("-".to_string(), |f| format!("{:.1}", f));
            format!(
                "[{:>8.2}s] Heart: {} BPM (raw: {}) Breathing: {} RPM (raw: {}) [fps: {}]",
                output.time_secs,
                rate(output.bpm),
                rate(output.bpm_raw),
                rate(output.rpm),
                rate(output.rpm_raw),
                fps
            )
        } else {
            format!(
                "Heart: {} BPM  Breathing: {} RPM",
                rate(output.bpm),
                rate(output.rpm)
            )
        }
    }
}

use super::{Formatter, VitalsOutput, iso8601_timestamp};

pub struct CsvFormatter;

fn rate(value: f32) -> String {
    if value > 0.0 {
        format!("{:.1}", value)
    } else {
        String::new()
    }
}

impl Formatter for CsvFormatter {
    fn format(&self, output: &VitalsOutput) -> String {
        let fps = output
            .processing_fps
            .map_or(String::new(), |f| format!("{:.1}", f));
        format!(
            "{},{:.3},{},{},{},{},{}",
            iso8601_timestamp(),
            output.time_secs,
            rate(output.bpm),
            rate(output.bpm_raw),
            rate(output.rpm),
            rate(output.rpm_raw),
            fps
        )
    }

    fn header(&self) -> Option<&'static str> {
        Some("ts,stream_secs,bpm,bpm_raw,rpm,rpm_raw,processing_fps")
    }
}

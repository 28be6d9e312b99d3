//! Wall-clock helpers shared by the capture and alerting paths.

use chrono::{Local, TimeZone};
use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as fractional seconds since the UNIX epoch.
pub fn epoch_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Formats an epoch timestamp as local `YYYY-MM-DD HH:MM:SS`.
///
/// Out-of-range timestamps fall back to the raw second count so an event is
/// never dropped over a formatting problem.
pub fn format_epoch(ts: f64) -> String {
    let secs = ts.trunc() as i64;
    match Local.timestamp_opt(secs, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => secs.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_epoch_renders_wall_clock() {
        let rendered = format_epoch(1_700_000_000.5);
        assert_eq!(rendered.len(), "2023-11-14 22:13:20".len());
        assert!(rendered.starts_with("20"));
    }

    #[test]
    fn format_epoch_survives_out_of_range() {
        assert_eq!(format_epoch(f64::MAX), i64::MAX.to_string());
    }
}

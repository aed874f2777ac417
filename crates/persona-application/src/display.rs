//! Presentation helpers shared by front ends.

use chrono::{DateTime, Local, TimeZone, Utc};
use persona_core::Step;

/// Shown in place of any failed answer.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Sorry, there was an error processing your request. Please try again later.";

/// Formats an epoch-millisecond timestamp as local `HH:MM`.
pub fn format_time(timestamp_ms: i64) -> String {
    format_time_in(timestamp_ms, &Local)
}

/// Formats `timestamp_ms` as `HH:MM` in `tz`. Out-of-range values render as `--:--`.
pub fn format_time_in<Tz: TimeZone>(timestamp_ms: i64, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match DateTime::<Utc>::from_timestamp_millis(timestamp_ms) {
        Some(utc) => utc.with_timezone(tz).format("%H:%M").to_string(),
        None => "--:--".to_string(),
    }
}

/// One-line indicator for a thinking step, e.g. `🧠 Thinking through a solution...`.
pub fn step_indicator(step: Step) -> String {
    format!("{} {}", step.emoji(), step.description())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn formats_hours_and_minutes() {
        // 2024-06-10T06:13:20Z
        let ts = 1_718_000_000_000;
        assert_eq!(format_time_in(ts, &Utc), "06:13");
        let ist = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
        assert_eq!(format_time_in(ts, &ist), "11:43");
    }

    #[test]
    fn out_of_range_timestamp_is_placeholder() {
        assert_eq!(format_time_in(i64::MAX, &Utc), "--:--");
    }

    #[test]
    fn indicator_pairs_emoji_and_description() {
        assert_eq!(step_indicator(Step::Analyze), "🔍 Analyzing your question...");
    }
}

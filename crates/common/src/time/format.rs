//! Stopwatch-style duration formatting

/// Format elapsed milliseconds as `HH:MM:SS`, truncating partial seconds.
///
/// Hours are not wrapped at 24, a 30-hour session renders as `30:00:00`.
///
/// # Examples
///
/// ```
/// use studysync_common::time::format::format_clock;
///
/// assert_eq!(format_clock(0), "00:00:00");
/// assert_eq!(format_clock(59_999), "00:00:59");
/// assert_eq!(format_clock(3_725_000), "01:02:05");
/// ```
pub fn format_clock(elapsed_ms: u64) -> String {
    let total_secs = elapsed_ms / 1_000;
    let hours = total_secs / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

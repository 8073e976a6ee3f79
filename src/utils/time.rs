use std::time::Duration;

/// This is the standard way of showing a tracked duration in timeflow: `HH:MM:SS`, hours are
/// not wrapped.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_seconds = elapsed.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        total_seconds / 3600,
        total_seconds / 60 % 60,
        total_seconds % 60
    )
}

pub fn format_elapsed_ms(ms: u64) -> String {
    format_elapsed(Duration::from_millis(ms))
}

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, used by the logging macros to stamp
/// each line. Clock skew or a system time before the epoch just yields 0.
pub fn get_current_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

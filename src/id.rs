//! ID generation utilities for cvagent
//!
//! Task ids combine a millisecond timestamp with 64 random bits, so two ids
//! only collide if both the millisecond and the random draw match.

use rand::Rng;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Generate a task ID
///
/// Format: `{timestamp_ms}-{random_hex}`
/// Example: `1738300800123-9f86d081884c7d65`
pub fn generate_task_id() -> String {
    let timestamp = now_ms();
    let random: u64 = rand::rng().random();
    format!("{}-{:016x}", timestamp, random)
}

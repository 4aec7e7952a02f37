//! Elapsed and remaining time, derived purely from session timestamps.
//!
//! Nothing here keeps a counter. Every answer is recomputed from
//! `started_at`, `paused_at` and the cumulative paused duration, so results
//! stay correct across suspended ticks and device sleep.

use super::state::{SessionConfig, SessionTimestamps};

/// Milliseconds of running time, clamped to zero when `now` precedes the start.
pub fn elapsed_ms(timestamps: &SessionTimestamps, now_ms: i64) -> u64 {
    let effective_end = timestamps.paused_at_ms.unwrap_or(now_ms);
    let paused = i64::try_from(timestamps.cumulative_paused_ms).unwrap_or(i64::MAX);
    effective_end
        .saturating_sub(timestamps.started_at_ms)
        .saturating_sub(paused)
        .max(0) as u64
}

/// Whole seconds left, rounded up. Exactly zero once the target is reached.
pub fn remaining_seconds(config: &SessionConfig, timestamps: &SessionTimestamps, now_ms: i64) -> u64 {
    let total_ms = config.total_ms().max(0) as u64;
    let elapsed = elapsed_ms(timestamps, now_ms);
    if elapsed >= total_ms {
        0
    } else {
        (total_ms - elapsed).div_ceil(1000)
    }
}

/// 0.0 ..= 1.0 for display. Completion never depends on this value.
pub fn progress_fraction(config: &SessionConfig, timestamps: &SessionTimestamps, now_ms: i64) -> f64 {
    if config.total_duration_seconds == 0 {
        return 0.0;
    }
    let remaining = remaining_seconds(config, timestamps, now_ms) as f64;
    (1.0 - remaining / config.total_duration_seconds as f64).clamp(0.0, 1.0)
}

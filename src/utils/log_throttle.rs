//! Rate limiting for warnings that can repeat once per metric key on every
//! flush, such as a destination receiving keys with undecodable properties.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::{Duration, Instant};

struct Window {
    opened_at: Instant,
    suppressed: u64,
}

static WINDOWS: OnceLock<Mutex<HashMap<String, Window>>> = OnceLock::new();

/// Decides whether the warning identified by `key` may be logged now.
///
/// The first occurrence opens a window of length `interval` and is emitted.
/// Later occurrences inside the window are only counted. The first occurrence
/// after the window closes is emitted again and reports how many were
/// swallowed, via `Some(suppressed)`.
pub fn should_emit(key: &str, interval: Duration) -> Option<u64> {
    let now = Instant::now();
    let mut windows = WINDOWS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    let Some(window) = windows.get_mut(key) else {
        windows.insert(
            key.to_string(),
            Window {
                opened_at: now,
                suppressed: 0,
            },
        );
        return Some(0);
    };

    if now.duration_since(window.opened_at) < interval {
        window.suppressed += 1;
        return None;
    }

    window.opened_at = now;
    Some(std::mem::take(&mut window.suppressed))
}

use std::sync::atomic::{AtomicU64, Ordering};

static ID_SEQ: AtomicU64 = AtomicU64::new(0);

pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Allocate a process-unique identifier for scenes and tokens.
///
/// A bare millisecond timestamp collides under rapid repeated calls, so the
/// timestamp is combined with a process-wide monotonic counter. Ids stay
/// time-sortable like the legacy plain-timestamp ids.
pub fn next_id() -> String {
    let seq = ID_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}-{:04}", now_ms(), seq)
}

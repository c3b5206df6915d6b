use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use tokio::time::Instant;

const NEVER: u64 = 0;

/// Time of the last auth invalidation, shared by every clone of a client.
///
/// Stored as milliseconds since `origin`, offset by one so that `NEVER`
/// cannot collide with an invalidation recorded in the first millisecond.
#[derive(Debug)]
pub(crate) struct AuthCooldown {
    origin: Instant,
    invalidated_at: AtomicU64,
}

impl AuthCooldown {
    pub(crate) fn new() -> Self {
        Self {
            origin: Instant::now(),
            invalidated_at: AtomicU64::new(NEVER),
        }
    }

    /// Records an invalidation now and reports whether the previous one
    /// happened more than `interval` ago. The timestamp is updated either way.
    pub(crate) fn check_and_mark(&self, interval: Duration) -> bool {
        let now = self.now();
        let previous = self.invalidated_at.swap(now, Ordering::AcqRel);
        if previous == NEVER {
            return true;
        }
        u128::from(now.saturating_sub(previous)) > interval.as_millis()
    }

    fn now(&self) -> u64 {
        let elapsed = u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX - 1);
        elapsed + 1
    }
}

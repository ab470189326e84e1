use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::Utc;
use log::error;

/// Default silence tolerated before a forced restart, in seconds.
pub const MAX_DISCONNECT_SECS: i64 = 10;

/// Last-activity stamp shared by every event consumer.
#[derive(Debug, Clone)]
pub struct Canary {
    last_activity: Arc<AtomicI64>,
}

impl Canary {
    pub fn new(now: i64) -> Self {
        Self {
            last_activity: Arc::new(AtomicI64::new(now)),
        }
    }

    pub fn touch(&self, now: i64) {
        self.last_activity.store(now, Ordering::Relaxed);
    }

    pub fn last_activity(&self) -> i64 {
        self.last_activity.load(Ordering::Relaxed)
    }

    pub fn idle_for(&self, now: i64) -> i64 {
        now - self.last_activity()
    }
}

/// Detects a silently dead upstream subscription. A dropped subscription
/// raises no error, it just stops delivering events.
pub struct Watchdog {
    canary: Canary,
    timeout: i64,
}

impl Watchdog {
    pub fn new(canary: Canary, timeout: i64) -> Self {
        Self { canary, timeout }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.canary.idle_for(now) > self.timeout
    }

    /// Checks every `interval` and calls `on_expire` once the canary has been
    /// silent for longer than the timeout.
    pub async fn run<F: FnOnce()>(self, interval: Duration, on_expire: F) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let now = Utc::now().timestamp();
            if self.is_expired(now) {
                error!(
                    "Canary: no events for {}s; forcing restart...",
                    self.canary.idle_for(now)
                );
                on_expire();
                return;
            }
        }
    }
}

/// Terminates the process at once, leaving recovery to the supervisor.
/// In-flight writes are not flushed.
pub fn force_exit() {
    std::process::exit(1);
}

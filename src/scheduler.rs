//! Cycle bookkeeping for the interval loops. Every periodic task owns an
//! atomic running flag; a cycle that would overlap its predecessor is
//! skipped instead of queued.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};

#[derive(Default)]
pub struct SchedulerState {
    discovery_running: AtomicBool,
    live_check_running: AtomicBool,
    sweep_running: AtomicBool,
    refresh_running: AtomicBool,
}

/// Releases the flag when the cycle ends, on every exit path.
pub struct CycleGuard<'a>(&'a AtomicBool);

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SchedulerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_discovery(&self) -> Option<CycleGuard<'_>> {
        Self::begin(&self.discovery_running)
    }

    pub fn begin_live_check(&self) -> Option<CycleGuard<'_>> {
        Self::begin(&self.live_check_running)
    }

    pub fn begin_sweep(&self) -> Option<CycleGuard<'_>> {
        Self::begin(&self.sweep_running)
    }

    pub fn begin_refresh(&self) -> Option<CycleGuard<'_>> {
        Self::begin(&self.refresh_running)
    }

    fn begin(flag: &AtomicBool) -> Option<CycleGuard<'_>> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| CycleGuard(flag))
    }
}

/// Seconds from `now` until the next occurrence of `hour:00` UTC.
pub fn seconds_until_hour(now: DateTime<Utc>, hour: u32) -> u64 {
    let today_target = now
        .date_naive()
        .and_hms_opt(hour, 0, 0)
        .expect("valid hour")
        .and_utc();
    let target = if today_target > now {
        today_target
    } else {
        today_target + chrono::Duration::days(1)
    };
    (target - now).num_seconds().max(0) as u64
}

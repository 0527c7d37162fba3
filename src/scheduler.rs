//! Wall-clock aligned scheduling.
//!
//! Cycles start at multiples of the configured interval within the UTC hour
//! (interval 60 = top of each hour), not relative to process start. The next
//! boundary is always recomputed from the current time after a cycle, so an
//! overrunning cycle delays only itself and drift never accumulates.
//!
//! Sleeping happens in bounded slices with the stop flag re-checked between
//! slices, so a termination request is observed within a few seconds even in
//! the middle of a long wait.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Timelike, Utc};

const SLEEP_SLICE: Duration = Duration::from_secs(5);

/// Cooperative stop flag, shared between the signal listener and the loop.
#[derive(Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        StopSignal::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Raise the stop flag on SIGINT or SIGTERM.
pub fn spawn_signal_listener(stop: StopSignal) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut term = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(term) => term,
                Err(e) => {
                    tracing::warn!(error = %e, "Could not install SIGTERM handler");
                    let _ = ctrl_c.await;
                    stop.raise();
                    return;
                }
            };
            tokio::select! {
                _ = ctrl_c => {}
                _ = term.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }
        tracing::info!("Received shutdown signal");
        stop.raise();
    });
}

/// Next wall-clock multiple of `interval_minutes` after `now`. At an exact
/// boundary the following one is returned, never a zero wait.
pub fn next_boundary(now: DateTime<Utc>, interval_minutes: u32) -> DateTime<Utc> {
    let interval = interval_minutes.max(1);
    let target_minute = (now.minute() / interval + 1) * interval;

    let floor_minute = now
        - ChronoDuration::seconds(i64::from(now.second()))
        - ChronoDuration::nanoseconds(i64::from(now.nanosecond()));

    if target_minute >= 60 {
        floor_minute - ChronoDuration::minutes(i64::from(now.minute())) + ChronoDuration::hours(1)
    } else {
        floor_minute + ChronoDuration::minutes(i64::from(target_minute - now.minute()))
    }
}

/// Seconds to wait until the next boundary, floored at one second.
pub fn seconds_until_next_boundary(now: DateTime<Utc>, interval_minutes: u32) -> f64 {
    let delta = next_boundary(now, interval_minutes) - now;
    (delta.num_milliseconds() as f64 / 1000.0).max(1.0)
}

pub struct Scheduler {
    interval_minutes: u32,
    stop: StopSignal,
}

impl Scheduler {
    pub fn new(interval_minutes: u32, stop: StopSignal) -> Self {
        Scheduler {
            interval_minutes: interval_minutes.max(1),
            stop,
        }
    }

    /// Run `cycle` forever, aligned to interval boundaries, until the stop
    /// flag is raised. A failing cycle is logged and the loop continues.
    pub async fn run<F, Fut>(&self, mut cycle: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        let wait = seconds_until_next_boundary(Utc::now(), self.interval_minutes);
        tracing::info!(
            wait_secs = wait as u64,
            interval_minutes = self.interval_minutes,
            "Waiting for next boundary"
        );
        if !self.sleep_sliced(Duration::from_secs_f64(wait)).await {
            return;
        }

        while !self.stop.is_raised() {
            if let Err(e) = cycle().await {
                tracing::error!(error = %e, "Cycle failed, continuing to next boundary");
            }

            // Recompute from the current time so overruns do not compound.
            let now = Utc::now();
            let mut delay = (next_boundary(now, self.interval_minutes) - now).num_milliseconds()
                as f64
                / 1000.0;
            if delay < 1.0 {
                delay = f64::from(self.interval_minutes) * 60.0;
            }
            if !self.sleep_sliced(Duration::from_secs_f64(delay)).await {
                return;
            }
        }
    }

    /// Sleep in slices, re-checking the stop flag between them. Returns
    /// `false` if the stop flag was raised during the wait.
    async fn sleep_sliced(&self, total: Duration) -> bool {
        let mut remaining = total;
        while remaining > Duration::ZERO {
            if self.stop.is_raised() {
                return false;
            }
            let slice = remaining.min(SLEEP_SLICE);
            tokio::time::sleep(slice).await;
            remaining = remaining.saturating_sub(slice);
        }
        !self.stop.is_raised()
    }
}

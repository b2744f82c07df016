//! Periodic background refresh of one store
//!
//! `Stopped -> start -> Running -> stop -> Stopped`. Each tick fires a
//! background fetch and does not wait for it; overlapping ticks are absorbed
//! by the store's in-flight slot.

use crate::logger::{self, LogTag};
use crate::store::{FetchMode, Refreshable};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

const MIN_PERIOD: Duration = Duration::from_millis(1);

pub struct PollingController {
    target: Arc<dyn Refreshable>,
    period: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl PollingController {
    pub fn new(target: Arc<dyn Refreshable>, period: Duration) -> Self {
        Self {
            target,
            period: period.max(MIN_PERIOD),
            timer: Mutex::new(None),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Start ticking; no-op while already running
    ///
    /// The first tick fires one full period after `start`. Must be called
    /// from within a tokio runtime.
    pub fn start(&self) {
        let mut timer = self.timer.lock();
        if timer.is_some() {
            return;
        }

        let target = self.target.clone();
        let period = self.period;
        logger::debug(
            LogTag::Polling,
            &format!("{}: polling every {}ms", target.name(), period.as_millis()),
        );

        *timer = Some(tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                logger::verbose(LogTag::Polling, &format!("{}: tick", target.name()));
                drop(target.refresh(FetchMode::Background));
            }
        }));
    }

    /// Cancel the timer; an in-flight fetch is left to finish
    ///
    /// Safe to call when not running.
    pub fn stop(&self) {
        if let Some(handle) = self.timer.lock().take() {
            handle.abort();
            logger::debug(LogTag::Polling, &format!("{}: polling stopped", self.target.name()));
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer.lock().is_some()
    }
}

impl Drop for PollingController {
    fn drop(&mut self) {
        self.stop();
    }
}

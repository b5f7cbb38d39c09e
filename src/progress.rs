//! Displayed upload progress
//!
//! Two imprecise signals feed one percentage:
//!
//! - **transport progress**: the fraction of request bytes written so far,
//! - **synthetic ticks**: a periodic random nudge that keeps the bar moving
//!   while the server is busy analysing and no bytes are flowing.
//!
//! Both are capped below 100 (90 by default). Only [`ProgressController::complete`],
//! called once the server has answered, shows 100. Either source can only raise
//! the value: every update is merged as `max(current, proposed)`, so whatever
//! order ticks and transport events arrive in, the sequence a user sees never
//! goes backwards.
//!
//! ```text
//!  0 ──ticks/bytes──▶ ≤90 ─────────── server reply ──▶ 100
//!                      └─ failure: ticker stopped, value left where it was
//! ```

use crate::config::ClientConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

pub const COMPLETE: u8 = 100;

/// Repeating timer running on its own thread.
///
/// The callback fires once per interval until it returns `false`, [`Ticker::cancel`]
/// is called, or the handle is dropped. Dropping joins the thread, so no
/// periodic callback outlives its owner.
pub struct Ticker {
    stop: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn spawn<F>(interval: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let spawned = thread::Builder::new()
            .name("lotview-ticker".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if !on_tick() {
                            break;
                        }
                    }
                    // Stop message or owner gone
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            });

        match spawned {
            Ok(handle) => Self {
                stop: Some(stop_tx),
                handle: Some(handle),
            },
            Err(e) => {
                warn!("could not start progress ticker: {}", e);
                Self { stop: None, handle: None }
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    /// Stop the timer and wait for its thread. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Completed,
    Stopped,
}

/// Fuses synthetic and transport progress into one non-decreasing percentage.
pub struct ProgressController {
    displayed: u8,
    phase: Phase,
    cap: u8,
    max_step: u8,
    interval: Duration,
    ticker: Option<Ticker>,
    rng: StdRng,
}

impl ProgressController {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            displayed: 0,
            phase: Phase::Idle,
            cap: config.progress_cap.min(COMPLETE - 1),
            max_step: config.max_tick_step.max(1),
            interval: config.tick_interval,
            ticker: None,
            rng: StdRng::from_entropy(),
        }
    }

    /// Replace the random source, e.g. with a seeded one for reproducible runs.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn displayed(&self) -> u8 {
        self.displayed
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cap(&self) -> u8 {
        self.cap
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.as_ref().map(Ticker::is_running).unwrap_or(false)
    }

    /// Reset to 0 and start the synthetic ticker.
    ///
    /// `on_tick` runs on the ticker thread; it should only signal the owner
    /// (which then calls [`advance`](Self::advance)) and return `false` once
    /// nobody is listening.
    pub fn start<F>(&mut self, on_tick: F)
    where
        F: FnMut() -> bool + Send + 'static,
    {
        self.stop_ticker();
        self.displayed = 0;
        self.phase = Phase::Running;
        self.ticker = Some(Ticker::spawn(self.interval, on_tick));
        debug!(interval_ms = self.interval.as_millis() as u64, "progress ticker started");
    }

    /// Apply one synthetic tick: a random step of `1..=max_step`, capped.
    pub fn advance(&mut self) -> u8 {
        if self.phase != Phase::Running {
            return self.displayed;
        }
        let step = self.rng.gen_range(1..=self.max_step);
        let proposed = self.displayed.saturating_add(step).min(self.cap);
        self.raise(proposed)
    }

    /// Apply a transfer ratio in `[0, 1]`. Out-of-range ratios are clamped,
    /// NaN is ignored.
    pub fn on_transport_progress(&mut self, ratio: f64) -> u8 {
        if self.phase != Phase::Running || ratio.is_nan() {
            return self.displayed;
        }
        let percent = (ratio.clamp(0.0, 1.0) * 100.0).round() as u8;
        self.raise(percent.min(self.cap))
    }

    /// Server result received: stop ticking and show 100.
    pub fn complete(&mut self) -> u8 {
        if self.phase != Phase::Running {
            return self.displayed;
        }
        self.stop_ticker();
        self.displayed = COMPLETE;
        self.phase = Phase::Completed;
        self.displayed
    }

    /// Transport failed: stop ticking, leave the value where it is.
    pub fn fail(&mut self) {
        self.stop_ticker();
        if self.phase == Phase::Running {
            self.phase = Phase::Stopped;
        }
    }

    /// Teardown before any terminal response.
    pub fn cancel(&mut self) {
        self.fail();
    }

    fn raise(&mut self, proposed: u8) -> u8 {
        self.displayed = self.displayed.max(proposed);
        self.displayed
    }

    fn stop_ticker(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.cancel();
            debug!("progress ticker stopped");
        }
    }
}

impl Drop for ProgressController {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    // ==========================================================================
    // MONOTONIC MERGE
    // ==========================================================================
    //
    // Ticks and transport ratios race for the same value. Whatever the
    // interleaving, the displayed sequence must be non-decreasing and stay at
    // or below the cap until complete() is called.
    // ==========================================================================

    fn controller() -> ProgressController {
        // Long interval: tests drive ticks by hand
        let config = ClientConfig::new().with_tick_interval(Duration::from_secs(3600));
        ProgressController::new(&config).with_rng(StdRng::seed_from_u64(7))
    }

    #[test]
    fn test_start_resets_to_zero() {
        let mut c = controller();
        c.start(|| true);
        c.on_transport_progress(0.5);
        c.fail();

        c.start(|| true);
        assert_eq!(c.displayed(), 0);
        assert_eq!(c.phase(), Phase::Running);
        c.cancel();
    }

    #[test]
    fn test_transport_ratio_rounds_and_caps() {
        let mut c = controller();
        c.start(|| true);
        assert_eq!(c.on_transport_progress(0.424), 42);
        assert_eq!(c.on_transport_progress(0.426), 43);
        assert_eq!(c.on_transport_progress(0.95), 90);
        assert_eq!(c.on_transport_progress(1.0), 90);
        assert_eq!(c.on_transport_progress(7.0), 90);
        c.cancel();
    }

    #[test]
    fn test_late_low_ratio_does_not_revert() {
        let mut c = controller();
        c.start(|| true);
        c.on_transport_progress(0.6);
        assert_eq!(c.on_transport_progress(0.2), 60);
        assert_eq!(c.on_transport_progress(-1.0), 60);
        assert_eq!(c.on_transport_progress(f64::NAN), 60);
        c.cancel();
    }

    #[test]
    fn test_ticks_alone_never_exceed_cap() {
        let mut c = controller();
        c.start(|| true);
        for _ in 0..500 {
            assert!(c.advance() <= 90);
        }
        assert_eq!(c.displayed(), 90);
        c.cancel();
    }

    #[test]
    fn test_tick_continues_from_current_value() {
        let mut c = controller();
        c.start(|| true);
        c.on_transport_progress(0.5);
        let after = c.advance();
        assert!(after > 50 && after <= 55, "tick went to {}", after);
        c.cancel();
    }

    #[test]
    fn test_random_interleavings_are_monotonic() {
        let mut chooser = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let mut c = controller().with_rng(StdRng::seed_from_u64(chooser.gen()));
            c.start(|| true);
            let mut last = c.displayed();
            for _ in 0..60 {
                let value = if chooser.gen_bool(0.5) {
                    c.advance()
                } else {
                    c.on_transport_progress(chooser.gen_range(-0.2..1.2))
                };
                assert!(value >= last, "{} dropped to {}", last, value);
                assert!(value <= 90);
                last = value;
            }
            c.cancel();
        }
    }

    #[test]
    fn test_complete_sets_exactly_100_and_freezes() {
        let mut c = controller();
        c.start(|| true);
        c.on_transport_progress(0.3);
        assert_eq!(c.complete(), 100);
        assert_eq!(c.phase(), Phase::Completed);
        assert!(!c.is_ticking());

        assert_eq!(c.advance(), 100);
        assert_eq!(c.on_transport_progress(0.1), 100);
    }

    #[test]
    fn test_fail_keeps_value_and_stops() {
        let mut c = controller();
        c.start(|| true);
        c.on_transport_progress(0.4);
        c.fail();
        assert_eq!(c.displayed(), 40);
        assert_eq!(c.phase(), Phase::Stopped);
        assert!(!c.is_ticking());

        // complete() is not reachable after a failure
        assert_eq!(c.complete(), 40);
        assert_eq!(c.advance(), 40);
    }

    #[test]
    fn test_complete_before_start_is_noop() {
        let mut c = controller();
        assert_eq!(c.complete(), 0);
        assert_eq!(c.phase(), Phase::Idle);
    }

    // ==========================================================================
    // TICKER LIFETIME
    // ==========================================================================

    #[test]
    fn test_ticker_fires_then_stops_on_cancel() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let mut ticker = Ticker::spawn(Duration::from_millis(5), move || {
            seen.fetch_add(1, Ordering::SeqCst);
            true
        });

        while count.load(Ordering::SeqCst) < 3 {
            thread::sleep(Duration::from_millis(2));
        }
        ticker.cancel();
        assert!(!ticker.is_running());

        let frozen = count.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(count.load(Ordering::SeqCst), frozen);
    }

    #[test]
    fn test_ticker_stops_when_callback_declines() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let mut ticker = Ticker::spawn(Duration::from_millis(1), move || {
            seen.fetch_add(1, Ordering::SeqCst) < 1
        });

        while ticker.is_running() {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(count.load(Ordering::SeqCst), 2);
        ticker.cancel();
    }

    #[test]
    fn test_dropping_controller_stops_ticker() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let config = ClientConfig::new().with_tick_interval(Duration::from_millis(2));
        let mut c = ProgressController::new(&config);
        c.start(move || {
            seen.fetch_add(1, Ordering::SeqCst);
            true
        });
        assert!(c.is_ticking());
        drop(c);

        let frozen = count.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(count.load(Ordering::SeqCst), frozen);
    }
}

//! Per-category time scaling and pause handling.
//!
//! This module provides:
//! - Independent scale factors for enemy-owned and player-owned actors
//! - An `Unscaled` category fixed at 1.0
//! - Global pause/resume that snapshots and restores the factors
//! - Scaled clocks and a cooperative "wait N scaled seconds" future

use ahash::AHashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use tracing::{debug, warn};

/// Number of time categories.
const CATEGORY_COUNT: usize = 3;

/// Time-scale category of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TimeCategory {
    /// Enemy-owned actors and their bullets.
    Enemy,
    /// Player-owned actors and their bullets.
    Player,
    /// Always runs at real speed, ignores pause.
    #[default]
    Unscaled,
}

impl TimeCategory {
    /// All categories in index order.
    pub const ALL: [Self; CATEGORY_COUNT] = [Self::Enemy, Self::Player, Self::Unscaled];

    const fn index(self) -> usize {
        match self {
            Self::Enemy => 0,
            Self::Player => 1,
            Self::Unscaled => 2,
        }
    }
}

/// Copy of the scale factors taken once per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleSnapshot {
    factors: [f32; CATEGORY_COUNT],
}

impl Default for ScaleSnapshot {
    fn default() -> Self {
        Self::UNIT
    }
}

impl ScaleSnapshot {
    /// Every category at 1.0.
    pub const UNIT: Self = Self {
        factors: [1.0; CATEGORY_COUNT],
    };

    /// Scale factor of a category.
    #[must_use]
    pub const fn factor(&self, category: TimeCategory) -> f32 {
        self.factors[category.index()]
    }

    /// Converts a raw delta into the category's scaled delta.
    #[must_use]
    pub fn scale(&self, category: TimeCategory, raw_dt: f32) -> f32 {
        raw_dt * self.factor(category)
    }
}

/// Result of a scaled wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The requested scaled time elapsed.
    Elapsed,
    /// The wait was cancelled before it elapsed.
    Cancelled,
}

#[derive(Debug)]
struct Waiter {
    category: TimeCategory,
    deadline: f64,
    waker: Waker,
}

#[derive(Debug)]
struct ClockState {
    factors: [f32; CATEGORY_COUNT],
    /// Factors saved by `pause`, restored by `resume`.
    paused: Option<[f32; CATEGORY_COUNT]>,
    /// Accumulated scaled seconds per category.
    clocks: [f64; CATEGORY_COUNT],
    waiters: AHashMap<u64, Waiter>,
    next_waiter: u64,
}

impl ClockState {
    fn new(enemy: f32, player: f32) -> Self {
        Self {
            factors: [enemy, player, 1.0],
            paused: None,
            clocks: [0.0; CATEGORY_COUNT],
            waiters: AHashMap::new(),
            next_waiter: 1,
        }
    }
}

/// Shared provider of per-category time scales.
///
/// Cloning yields another handle onto the same clocks.
#[derive(Debug, Clone)]
pub struct TimeScaleProvider {
    state: Arc<Mutex<ClockState>>,
}

impl Default for TimeScaleProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeScaleProvider {
    /// Create a provider with every category at 1.0.
    #[must_use]
    pub fn new() -> Self {
        Self::with_scales(1.0, 1.0)
    }

    /// Create a provider with explicit enemy and player factors.
    #[must_use]
    pub fn with_scales(enemy: f32, player: f32) -> Self {
        Self {
            state: Arc::new(Mutex::new(ClockState::new(
                sanitize_factor(enemy),
                sanitize_factor(player),
            ))),
        }
    }

    /// Current scale factor of a category (0.0 while paused).
    #[must_use]
    pub fn scale(&self, category: TimeCategory) -> f32 {
        self.state.lock().factors[category.index()]
    }

    /// Set the scale factor of a category.
    ///
    /// While paused the new value goes into the pause snapshot and takes
    /// effect on `resume`. `Unscaled` cannot be changed.
    pub fn set_scale(&self, category: TimeCategory, factor: f32) {
        if category == TimeCategory::Unscaled {
            warn!("Ignoring attempt to rescale the unscaled clock");
            return;
        }
        let factor = sanitize_factor(factor);
        let mut state = self.state.lock();
        match state.paused.as_mut() {
            Some(saved) => saved[category.index()] = factor,
            None => state.factors[category.index()] = factor,
        }
    }

    /// Pause every scaled category. No-op when already paused.
    pub fn pause(&self) {
        let mut state = self.state.lock();
        if state.paused.is_some() {
            return;
        }
        state.paused = Some(state.factors);
        for category in [TimeCategory::Enemy, TimeCategory::Player] {
            state.factors[category.index()] = 0.0;
        }
        debug!("Time scales paused");
    }

    /// Restore the factors saved by `pause`. No-op when not paused.
    pub fn resume(&self) {
        let mut state = self.state.lock();
        if let Some(saved) = state.paused.take() {
            state.factors = saved;
            debug!("Time scales resumed");
        }
    }

    /// Check if paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state.lock().paused.is_some()
    }

    /// Take a copy of the current factors for one tick.
    #[must_use]
    pub fn snapshot(&self) -> ScaleSnapshot {
        ScaleSnapshot {
            factors: self.state.lock().factors,
        }
    }

    /// Scaled seconds accumulated by a category's clock.
    #[must_use]
    pub fn elapsed(&self, category: TimeCategory) -> f64 {
        self.state.lock().clocks[category.index()]
    }

    /// Advance every clock by one raw frame delta and wake finished waiters.
    pub fn advance(&self, raw_dt: f32) {
        if !raw_dt.is_finite() || raw_dt <= 0.0 {
            return;
        }
        let ready: Vec<Waker> = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            for (clock, factor) in state.clocks.iter_mut().zip(state.factors) {
                *clock += f64::from(raw_dt * factor);
            }
            let clocks = state.clocks;
            let done: Vec<u64> = state
                .waiters
                .iter()
                .filter(|(_, w)| clocks[w.category.index()] >= w.deadline)
                .map(|(key, _)| *key)
                .collect();
            done.iter()
                .filter_map(|key| state.waiters.remove(key))
                .map(|w| w.waker)
                .collect()
        };
        // Wake outside the lock so woken tasks can poll immediately.
        for waker in ready {
            waker.wake();
        }
    }

    /// Wait until `seconds` of the category's scaled time have passed.
    ///
    /// The future only makes progress while something calls [`advance`](Self::advance).
    #[must_use]
    pub fn wait_scaled(&self, category: TimeCategory, seconds: f32) -> ScaledDelay {
        let deadline = self.elapsed(category) + f64::from(seconds.max(0.0));
        ScaledDelay {
            provider: self.clone(),
            category,
            deadline,
            key: None,
            cancelled: false,
        }
    }

    /// Number of registered, still-pending waiters.
    #[must_use]
    pub fn pending_waiters(&self) -> usize {
        self.state.lock().waiters.len()
    }

    fn register(
        &self,
        key: Option<u64>,
        category: TimeCategory,
        deadline: f64,
        waker: &Waker,
    ) -> Option<u64> {
        let mut state = self.state.lock();
        if state.clocks[category.index()] >= deadline {
            if let Some(key) = key {
                state.waiters.remove(&key);
            }
            return None;
        }
        let key = key.unwrap_or_else(|| {
            let next = state.next_waiter;
            state.next_waiter += 1;
            next
        });
        state.waiters.insert(
            key,
            Waiter {
                category,
                deadline,
                waker: waker.clone(),
            },
        );
        Some(key)
    }

    fn deregister(&self, key: u64) {
        self.state.lock().waiters.remove(&key);
    }
}

/// Future returned by [`TimeScaleProvider::wait_scaled`].
#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct ScaledDelay {
    provider: TimeScaleProvider,
    category: TimeCategory,
    deadline: f64,
    key: Option<u64>,
    cancelled: bool,
}

impl ScaledDelay {
    /// Cancel the wait. The next poll resolves to [`WaitOutcome::Cancelled`].
    pub fn cancel(&mut self) {
        self.cancelled = true;
        if let Some(key) = self.key.take() {
            self.provider.deregister(key);
        }
    }

    /// Scaled seconds left before the wait completes.
    #[must_use]
    pub fn remaining(&self) -> f64 {
        (self.deadline - self.provider.elapsed(self.category)).max(0.0)
    }
}

impl Future for ScaledDelay {
    type Output = WaitOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if this.cancelled {
            return Poll::Ready(WaitOutcome::Cancelled);
        }
        match this
            .provider
            .register(this.key, this.category, this.deadline, cx.waker())
        {
            Some(key) => {
                this.key = Some(key);
                Poll::Pending
            },
            None => {
                this.key = None;
                Poll::Ready(WaitOutcome::Elapsed)
            },
        }
    }
}

impl Drop for ScaledDelay {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.provider.deregister(key);
        }
    }
}

fn sanitize_factor(factor: f32) -> f32 {
    if factor.is_finite() && factor >= 0.0 {
        factor
    } else {
        warn!("Invalid time scale {factor}, using 0");
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::task::noop_waker_ref;

    fn poll_once(delay: &mut ScaledDelay) -> Poll<WaitOutcome> {
        let mut cx = Context::from_waker(noop_waker_ref());
        Pin::new(delay).poll(&mut cx)
    }

    #[test]
    fn test_pause_resume_idempotent() {
        let time = TimeScaleProvider::with_scales(0.5, 2.0);

        time.pause();
        time.pause();
        assert_eq!(time.scale(TimeCategory::Enemy), 0.0);
        assert_eq!(time.scale(TimeCategory::Player), 0.0);
        assert_eq!(time.scale(TimeCategory::Unscaled), 1.0);

        time.resume();
        assert_eq!(time.scale(TimeCategory::Enemy), 0.5);
        assert_eq!(time.scale(TimeCategory::Player), 2.0);

        time.resume();
        assert_eq!(time.scale(TimeCategory::Enemy), 0.5);
        assert!(!time.is_paused());
    }

    #[test]
    fn test_set_scale_while_paused_applies_on_resume() {
        let time = TimeScaleProvider::new();
        time.pause();
        time.set_scale(TimeCategory::Enemy, 0.25);
        assert_eq!(time.scale(TimeCategory::Enemy), 0.0);
        time.resume();
        assert_eq!(time.scale(TimeCategory::Enemy), 0.25);
    }

    #[test]
    fn test_unscaled_is_fixed() {
        let time = TimeScaleProvider::new();
        time.set_scale(TimeCategory::Unscaled, 3.0);
        assert_eq!(time.scale(TimeCategory::Unscaled), 1.0);
    }

    #[test]
    fn test_invalid_factor_sanitized() {
        let time = TimeScaleProvider::new();
        time.set_scale(TimeCategory::Player, -2.0);
        assert_eq!(time.scale(TimeCategory::Player), 0.0);
    }

    #[test]
    fn test_snapshot_scales_delta() {
        let time = TimeScaleProvider::with_scales(0.5, 1.0);
        let snap = time.snapshot();
        assert_eq!(snap.scale(TimeCategory::Enemy, 0.1), 0.05);
        assert_eq!(snap.scale(TimeCategory::Unscaled, 0.1), 0.1);
    }

    #[test]
    fn test_clocks_follow_scales() {
        let time = TimeScaleProvider::with_scales(0.5, 1.0);
        time.advance(1.0);
        time.pause();
        time.advance(1.0);
        assert!((time.elapsed(TimeCategory::Enemy) - 0.5).abs() < 1e-9);
        assert!((time.elapsed(TimeCategory::Unscaled) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_wait_scaled_completes() {
        let time = TimeScaleProvider::with_scales(0.5, 1.0);
        let mut delay = time.wait_scaled(TimeCategory::Enemy, 1.0);

        assert!(poll_once(&mut delay).is_pending());
        assert_eq!(time.pending_waiters(), 1);
        assert!((delay.remaining() - 1.0).abs() < 1e-9);

        time.advance(1.0);
        assert!(poll_once(&mut delay).is_pending());
        assert!((delay.remaining() - 0.5).abs() < 1e-9);

        time.advance(1.0);
        assert_eq!(poll_once(&mut delay), Poll::Ready(WaitOutcome::Elapsed));
        assert_eq!(time.pending_waiters(), 0);
        assert_eq!(delay.remaining(), 0.0);
    }

    #[test]
    fn test_wait_scaled_stalls_while_paused() {
        let time = TimeScaleProvider::new();
        let mut delay = time.wait_scaled(TimeCategory::Player, 0.5);
        time.pause();
        time.advance(10.0);
        assert!(poll_once(&mut delay).is_pending());
        time.resume();
        time.advance(0.5);
        assert_eq!(poll_once(&mut delay), Poll::Ready(WaitOutcome::Elapsed));
    }

    #[test]
    fn test_wait_scaled_cancel_and_drop() {
        let time = TimeScaleProvider::new();
        let mut delay = time.wait_scaled(TimeCategory::Enemy, 5.0);
        assert!(poll_once(&mut delay).is_pending());
        delay.cancel();
        assert_eq!(time.pending_waiters(), 0);
        assert_eq!(poll_once(&mut delay), Poll::Ready(WaitOutcome::Cancelled));

        let mut other = time.wait_scaled(TimeCategory::Enemy, 5.0);
        assert!(poll_once(&mut other).is_pending());
        drop(other);
        assert_eq!(time.pending_waiters(), 0);
    }

    #[test]
    fn test_zero_wait_is_immediately_ready() {
        let time = TimeScaleProvider::new();
        let mut delay = time.wait_scaled(TimeCategory::Enemy, 0.0);
        assert_eq!(poll_once(&mut delay), Poll::Ready(WaitOutcome::Elapsed));
    }
}

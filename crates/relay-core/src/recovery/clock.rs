//! Time source abstraction
//!
//! Breaker cooldowns, retry backoff and per-attempt timeouts all read time
//! and sleep through a [`Clock`], so tests can drive them without waiting on
//! the wall clock.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

/// Source of `now` and of asynchronous delays
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current monotonic time
    fn now(&self) -> Instant;

    /// Resolve after `duration` has elapsed on this clock
    async fn sleep(&self, duration: Duration);
}

/// Clock backed by `tokio::time`.
///
/// Follows tokio's paused time, so `#[tokio::test(start_paused = true)]`
/// tests see virtual time here too.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl TokioClock {
    pub fn shared() -> Arc<dyn Clock> {
        Arc::new(TokioClock)
    }
}

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug)]
struct Waiter {
    id: u64,
    deadline: Duration,
    waker: Waker,
}

#[derive(Debug)]
struct ManualState {
    elapsed: Duration,
    sleeps: Vec<Duration>,
    waiters: Vec<Waiter>,
    next_id: u64,
    auto_advance: bool,
}

/// Manually driven clock.
///
/// Time only moves through [`ManualClock::advance`]. A `sleep` records the
/// requested delay and stays pending until `advance` carries time past its
/// deadline. A clock built with [`ManualClock::auto_advancing`] instead
/// moves time forward by each requested delay and completes the sleep on
/// its first poll; only use it with operations that never wait.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    state: Mutex<ManualState>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::build(false)
    }

    /// Clock whose sleeps complete at once after moving time forward
    pub fn auto_advancing() -> Self {
        Self::build(true)
    }

    fn build(auto_advance: bool) -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(ManualState {
                elapsed: Duration::ZERO,
                sleeps: Vec::new(),
                waiters: Vec::new(),
                next_id: 0,
                auto_advance,
            }),
        }
    }

    /// Move time forward, waking every sleep whose deadline has passed
    pub fn advance(&self, duration: Duration) {
        let due: Vec<Waker> = {
            let mut state = self.state.lock();
            state.elapsed += duration;
            let now = state.elapsed;
            let (due, pending) = std::mem::take(&mut state.waiters)
                .into_iter()
                .partition::<Vec<_>, _>(|waiter| waiter.deadline <= now);
            state.waiters = pending;
            due.into_iter().map(|waiter| waiter.waker).collect()
        };
        for waker in due {
            waker.wake();
        }
    }

    /// Total virtual time elapsed since creation
    pub fn elapsed(&self) -> Duration {
        self.state.lock().elapsed
    }

    /// Every delay requested through `sleep`, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().sleeps.clone()
    }

    /// Number of sleeps currently waiting on `advance`
    pub fn pending_sleeps(&self) -> usize {
        self.state.lock().waiters.len()
    }

    fn poll_deadline(&self, id: u64, deadline: Duration, cx: &mut Context<'_>) -> Poll<()> {
        let mut state = self.state.lock();
        if state.elapsed >= deadline {
            state.waiters.retain(|waiter| waiter.id != id);
            return Poll::Ready(());
        }
        match state.waiters.iter_mut().find(|waiter| waiter.id == id) {
            Some(waiter) => waiter.waker.clone_from(cx.waker()),
            None => state.waiters.push(Waiter {
                id,
                deadline,
                waker: cx.waker().clone(),
            }),
        }
        Poll::Pending
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Drops a sleep's registration when the sleep future goes away unfinished
struct WaiterGuard<'a> {
    clock: &'a ManualClock,
    id: u64,
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        let id = self.id;
        self.clock.state.lock().waiters.retain(|waiter| waiter.id != id);
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.state.lock().elapsed
    }

    async fn sleep(&self, duration: Duration) {
        let (id, deadline) = {
            let mut state = self.state.lock();
            state.sleeps.push(duration);
            if state.auto_advance {
                state.elapsed += duration;
                return;
            }
            state.next_id += 1;
            (state.next_id, state.elapsed + duration)
        };

        let _guard = WaiterGuard { clock: self, id };
        std::future::poll_fn(|cx| self.poll_deadline(id, deadline, cx)).await;
    }
}

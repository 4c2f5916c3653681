use std::time::{Duration, Instant};

/// Identifies one `schedule` request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// One-shot delayed notifications.
///
/// Callbacks are replaced by polling: the host calls [`Timer::take_expired`]
/// from its event loop and routes the handle to whoever scheduled it. A
/// handle is reported at most once, never before its delay and never after
/// it was cancelled.
pub trait Timer {
    fn schedule(&mut self, delay: Duration) -> TimerHandle;
    /// No-op for unknown or already fired handles.
    fn cancel(&mut self, handle: TimerHandle);
    fn cancel_all(&mut self);
    /// Removes and returns the earliest due request, if any.
    fn take_expired(&mut self) -> Option<TimerHandle>;
}

#[derive(Debug, Clone, Copy)]
struct Pending<T> {
    handle: TimerHandle,
    due: T,
}

fn pop_earliest_due<T: Ord + Copy>(pending: &mut Vec<Pending<T>>, now: T) -> Option<TimerHandle> {
    let (idx, _) = pending
        .iter()
        .enumerate()
        .filter(|(_, p)| p.due <= now)
        .min_by_key(|(_, p)| (p.due, p.handle))?;
    Some(pending.remove(idx).handle)
}

/// Wall-clock timer backed by `Instant` deadlines
#[derive(Debug, Default)]
pub struct DeadlineTimer {
    next_id: u64,
    pending: Vec<Pending<Instant>>,
}

impl DeadlineTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Time left until the earliest deadline, used to size the host tick.
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        self.pending
            .iter()
            .map(|p| p.due.saturating_duration_since(now))
            .min()
    }

    pub fn schedule_at(&mut self, now: Instant, delay: Duration) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.pending.push(Pending {
            handle,
            due: now + delay,
        });
        handle
    }

    pub fn take_expired_at(&mut self, now: Instant) -> Option<TimerHandle> {
        pop_earliest_due(&mut self.pending, now)
    }
}

impl Timer for DeadlineTimer {
    fn schedule(&mut self, delay: Duration) -> TimerHandle {
        self.schedule_at(Instant::now(), delay)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.pending.retain(|p| p.handle != handle);
    }

    fn cancel_all(&mut self) {
        self.pending.clear();
    }

    fn take_expired(&mut self) -> Option<TimerHandle> {
        self.take_expired_at(Instant::now())
    }
}

/// Deterministic timer driven by a virtual clock.
///
/// Nothing expires until the clock is moved with [`ManualTimer::advance`]
/// or [`ManualTimer::fire_next`].
#[derive(Debug, Default)]
pub struct ManualTimer {
    next_id: u64,
    now: Duration,
    pending: Vec<Pending<Duration>>,
    requested: Vec<Duration>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn advance(&mut self, by: Duration) {
        self.now += by;
    }

    /// Moves the clock to the earliest deadline without consuming it.
    /// Returns false when nothing is pending.
    pub fn advance_to_next(&mut self) -> bool {
        match self.pending.iter().map(|p| p.due).min() {
            Some(due) => {
                self.now = self.now.max(due);
                true
            }
            None => false,
        }
    }

    /// Jumps the clock to the earliest deadline and pops that request.
    pub fn fire_next(&mut self) -> Option<TimerHandle> {
        if !self.advance_to_next() {
            return None;
        }
        self.take_expired()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|p| p.handle == handle)
    }

    /// Remaining delay of each pending request, earliest first.
    pub fn pending_delays(&self) -> Vec<Duration> {
        let mut delays: Vec<Duration> = self
            .pending
            .iter()
            .map(|p| p.due.saturating_sub(self.now))
            .collect();
        delays.sort_unstable();
        delays
    }

    /// Every delay passed to `schedule`, in call order.
    pub fn requested_delays(&self) -> &[Duration] {
        &self.requested
    }
}

impl Timer for ManualTimer {
    fn schedule(&mut self, delay: Duration) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.pending.push(Pending {
            handle,
            due: self.now + delay,
        });
        self.requested.push(delay);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.pending.retain(|p| p.handle != handle);
    }

    fn cancel_all(&mut self) {
        self.pending.clear();
    }

    fn take_expired(&mut self) -> Option<TimerHandle> {
        pop_earliest_due(&mut self.pending, self.now)
    }
}

//! A single logical clock ordering timer expirations, market-data replay
//! events and order-execution events in timestamp order. Grounded in the
//! source system's `BacktesterEventHandler`/`BacktesterTimer`: a priority
//! queue keyed by (timestamp, arrival-ordinal), with timer cancellation
//! implemented as a suppression flag checked at execution time rather than
//! a queue removal.

use chrono::{DateTime, Utc};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

type Action = Box<dyn FnOnce(&mut BacktesterEventScheduler) + Send>;

struct ScheduledEvent {
    timestamp: DateTime<Utc>,
    ordinal: u64,
    action: Action,
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp && self.ordinal == other.ordinal
    }
}
impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp.cmp(&other.timestamp).then_with(|| self.ordinal.cmp(&other.ordinal))
    }
}

/// Result published to a [`TimerHandle`]'s caller once its event fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerResult {
    Expired,
    Canceled,
}

type ResultCallback = Box<dyn FnOnce(TimerResult) + Send>;

/// A live reference to a scheduled timer expiry. Dropping it leaves the
/// timer running; call [`TimerHandle::cancel`] to suppress the expiry and
/// fire [`TimerResult::Canceled`] instead.
pub struct TimerHandle {
    active: Arc<AtomicBool>,
    on_result: Arc<Mutex<Option<ResultCallback>>>,
}

impl TimerHandle {
    /// Fires `Canceled` immediately if the timer hasn't already expired;
    /// a no-op otherwise. The `active` flag is the single source of truth
    /// for which of expiry or cancellation wins the race.
    pub fn cancel(&self) {
        if self.active.swap(false, AtomicOrdering::SeqCst) {
            if let Some(on_result) = self.on_result.lock().unwrap().take() {
                on_result(TimerResult::Canceled);
            }
        }
    }
}

/// Drives logical time forward by repeatedly dequeuing the earliest
/// scheduled event and executing it, allowing each event to schedule
/// further events before the next dequeue.
pub struct BacktesterEventScheduler {
    now: DateTime<Utc>,
    end_time: DateTime<Utc>,
    queue: BinaryHeap<Reverse<ScheduledEvent>>,
    next_ordinal: u64,
}

impl BacktesterEventScheduler {
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        BacktesterEventScheduler { now: start_time, end_time, queue: BinaryHeap::new(), next_ordinal: 0 }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    /// Schedules `action` to run when logical time reaches `timestamp`.
    /// Events scheduled at the same timestamp run in the order they were
    /// submitted.
    pub fn schedule(&mut self, timestamp: DateTime<Utc>, action: impl FnOnce(&mut BacktesterEventScheduler) + Send + 'static) {
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        self.queue.push(Reverse(ScheduledEvent { timestamp, ordinal, action: Box::new(action) }));
    }

    /// Starts a virtual timer that fires `on_result` at `self.now() + interval`
    /// unless canceled first. Mirrors `BacktesterTimer::Start`/`Cancel`: a
    /// cancellation is itself scheduled (at the current logical time, so it
    /// is processed before any later-timestamped expiry) and flips the same
    /// suppression flag the expiry checks before firing.
    pub fn start_timer(
        &mut self,
        interval: chrono::Duration,
        on_result: impl FnOnce(TimerResult) + Send + 'static,
    ) -> TimerHandle {
        let active = Arc::new(AtomicBool::new(true));
        let on_result: Arc<Mutex<Option<ResultCallback>>> = Arc::new(Mutex::new(Some(Box::new(on_result))));
        let expiry_flag = active.clone();
        let expiry_callback = on_result.clone();
        self.schedule(self.now + interval, move |_scheduler| {
            if expiry_flag.swap(false, AtomicOrdering::SeqCst) {
                if let Some(on_result) = expiry_callback.lock().unwrap().take() {
                    on_result(TimerResult::Expired);
                }
            }
        });
        TimerHandle { active, on_result }
    }

    /// Runs until the queue is empty or the next event's timestamp exceeds
    /// `end_time`, advancing `now` to each event's timestamp before it runs.
    pub fn run(&mut self) {
        loop {
            let Some(Reverse(event)) = self.queue.peek() else { break };
            if event.timestamp > self.end_time {
                break;
            }
            let Reverse(event) = self.queue.pop().unwrap();
            self.now = event.timestamp;
            (event.action)(self);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

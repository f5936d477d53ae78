//! Discrete-event scheduler with a monotonic simulation clock

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::time::Duration;
use thiserror::Error;
use tracing::trace;

/// Cancelled entries are dropped lazily; the heap is rebuilt once they
/// outnumber live ones and it holds more than this many entries
const COMPACT_MIN_LEN: usize = 64;

/// Handle to a scheduled event, used to cancel it before it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventHandle(u64);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulerError {
    #[error("event at {at:?} would move the clock back from {now:?}")]
    ClockRegression { now: Duration, at: Duration },
}

struct Entry<E> {
    at: Duration,
    seq: u64,
    payload: E,
}

impl<E> PartialEq for Entry<E> {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl<E> Eq for Entry<E> {}

impl<E> PartialOrd for Entry<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Entry<E> {
    // BinaryHeap is a max-heap: reverse so the earliest (time, seq) pops first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .at
            .cmp(&self.at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority queue of timed events.
///
/// Events fire in non-decreasing time order; events sharing a fire time fire
/// in the order they were scheduled. The clock only moves by jumping to the
/// next event's fire time.
pub struct Scheduler<E> {
    now: Duration,
    next_seq: u64,
    queue: BinaryHeap<Entry<E>>,
    /// Sequence numbers scheduled and not yet fired or cancelled
    live: HashSet<u64>,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Scheduler {
            now: Duration::ZERO,
            next_seq: 0,
            queue: BinaryHeap::new(),
            live: HashSet::new(),
        }
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of pending (not cancelled) events
    pub fn pending(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Schedule `payload` to fire `delay` after the current time
    pub fn schedule(&mut self, delay: Duration, payload: E) -> EventHandle {
        let at = self.now.saturating_add(delay);
        self.schedule_at(at, payload)
    }

    /// Schedule `payload` at an absolute time. Times in the past are
    /// clamped to now and fire after the events already pending for now.
    pub fn schedule_at(&mut self, at: Duration, payload: E) -> EventHandle {
        let at = at.max(self.now);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Entry { at, seq, payload });
        self.live.insert(seq);
        EventHandle(seq)
    }

    /// Cancel a pending event. Returns false if it already fired or was
    /// cancelled before.
    pub fn cancel(&mut self, handle: EventHandle) -> bool {
        if !self.live.remove(&handle.0) {
            return false;
        }
        if self.queue.len() > COMPACT_MIN_LEN && self.queue.len() > 2 * self.live.len() {
            let live = &self.live;
            self.queue.retain(|entry| live.contains(&entry.seq));
            trace!(remaining = self.queue.len(), "compacted");
        }
        true
    }

    pub fn is_pending(&self, handle: EventHandle) -> bool {
        self.live.contains(&handle.0)
    }

    /// Fire time of the next live event
    pub fn peek_time(&mut self) -> Option<Duration> {
        self.discard_cancelled();
        self.queue.peek().map(|entry| entry.at)
    }

    /// Pop the next live event if it fires at or before `end`, advancing
    /// the clock to its fire time.
    pub fn pop_until(&mut self, end: Duration) -> Result<Option<(EventHandle, E)>, SchedulerError> {
        self.discard_cancelled();
        match self.queue.peek() {
            Some(entry) if entry.at <= end => {}
            _ => return Ok(None),
        }
        let Some(entry) = self.queue.pop() else {
            return Ok(None);
        };
        if entry.at < self.now {
            return Err(SchedulerError::ClockRegression {
                now: self.now,
                at: entry.at,
            });
        }
        self.live.remove(&entry.seq);
        self.now = entry.at;
        trace!(now = ?self.now, seq = entry.seq, "dispatch");
        Ok(Some((EventHandle(entry.seq), entry.payload)))
    }

    /// Dispatch events in order until the queue is empty or the next event
    /// lies past `end`. The handler may schedule or cancel further events.
    pub fn run_until<F>(&mut self, end: Duration, mut handler: F) -> Result<usize, SchedulerError>
    where
        F: FnMut(&mut Scheduler<E>, EventHandle, E),
    {
        let mut dispatched = 0;
        while let Some((handle, payload)) = self.pop_until(end)? {
            handler(self, handle, payload);
            dispatched += 1;
        }
        Ok(dispatched)
    }

    fn discard_cancelled(&mut self) {
        while let Some(entry) = self.queue.peek() {
            if self.live.contains(&entry.seq) {
                break;
            }
            self.queue.pop();
        }
    }
}

//! Deferred execution of command chains.
//!
//! The scheduler owns every live [`Queue`]. The host calls [`Scheduler::tick`]
//! at a fixed cadence; each tick either counts down a queue's wait or pops
//! and runs its head item. Items of one queue always run in order. Separate
//! queues advance independently, one step per tick each.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

/// Pseudo-command that pauses only its own queue.
pub const SLEEP_COMMAND: &str = "sleep";

/// Nested expansions (aliases, chains submitted by actions) deeper than this
/// are dropped. Stops an alias that expands to itself from looping forever.
pub const MAX_EXPANSION_DEPTH: u8 = 16;

// ── Queue items ─────────────────────────────────────────────────

/// One `(command, argument)` pair of a chain. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    name: String,
    argument: String,
    depth: u8,
}

impl QueueItem {
    pub fn new(name: impl Into<String>, argument: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            argument: argument.into(),
            depth: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn argument(&self) -> &str {
        &self.argument
    }

    /// How many expansions produced this item (0 for direct input).
    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub(crate) fn nested(mut self, depth: u8) -> Self {
        self.depth = depth;
        self
    }
}

// ── Queues ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueueId(u64);

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Waiting,
    Runnable,
    Drained,
}

#[derive(Debug)]
pub struct Queue {
    id: QueueId,
    items: VecDeque<QueueItem>,
    wait_remaining: Duration,
}

impl Queue {
    pub fn id(&self) -> QueueId {
        self.id
    }

    pub fn state(&self) -> QueueState {
        if !self.wait_remaining.is_zero() {
            QueueState::Waiting
        } else if self.items.is_empty() {
            QueueState::Drained
        } else {
            QueueState::Runnable
        }
    }

    pub fn wait_remaining(&self) -> Duration {
        self.wait_remaining
    }

    pub fn items(&self) -> impl Iterator<Item = &QueueItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Put `items` ahead of everything already queued, keeping their order.
    fn prepend(&mut self, items: Vec<QueueItem>) {
        for item in items.into_iter().rev() {
            self.items.push_front(item);
        }
    }
}

// ── Runner seam ─────────────────────────────────────────────────

/// Runs one popped item on behalf of the scheduler.
pub trait ItemRunner {
    /// Execute `item` from `queue`. The returned items are spliced onto the
    /// front of that queue (alias expansions, chains issued by the action).
    fn run(&mut self, queue: QueueId, item: &QueueItem) -> Vec<QueueItem>;

    /// A `sleep` whose argument is not a usable number of seconds.
    fn bad_sleep(&mut self, _queue: QueueId, _item: &QueueItem) {}
}

/// Seconds → duration for a `sleep` argument. Empty means one second.
pub fn sleep_duration(argument: &str) -> Option<Duration> {
    let argument = argument.trim();
    let seconds = if argument.is_empty() {
        1.0
    } else {
        argument.parse::<f64>().ok()?
    };
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(seconds).ok()
}

// ── Scheduler ───────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Scheduler {
    queues: Vec<Queue>,
    next_id: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new queue. Empty chains create nothing.
    pub fn enqueue(&mut self, items: Vec<QueueItem>) -> Option<QueueId> {
        if items.is_empty() {
            return None;
        }
        let id = QueueId(self.next_id);
        self.next_id += 1;
        self.queues.push(Queue {
            id,
            items: items.into(),
            wait_remaining: Duration::ZERO,
        });
        Some(id)
    }

    /// Prepend `items` to a live queue. Hands the items back if the queue is
    /// gone.
    pub fn extend_front(
        &mut self,
        id: QueueId,
        items: Vec<QueueItem>,
    ) -> Result<(), Vec<QueueItem>> {
        match self.queues.iter_mut().find(|q| q.id == id) {
            Some(queue) => {
                queue.prepend(items);
                Ok(())
            }
            None => Err(items),
        }
    }

    /// Abandon a queue. Items already run are not undone.
    pub fn cancel(&mut self, id: QueueId) -> bool {
        let before = self.queues.len();
        self.queues.retain(|q| q.id != id);
        self.queues.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.queues.clear();
    }

    pub fn get(&self, id: QueueId) -> Option<&Queue> {
        self.queues.iter().find(|q| q.id == id)
    }

    pub fn ids(&self) -> Vec<QueueId> {
        self.queues.iter().map(Queue::id).collect()
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Advance every live queue by one step. Never blocks.
    ///
    /// A waiting queue only counts down this tick, even if its wait reaches
    /// zero. A runnable queue pops its head: `sleep` sets the wait (only when
    /// more items follow), anything else goes to `runner`. Queues left empty
    /// are removed once the pass is over.
    pub fn tick<R: ItemRunner + ?Sized>(&mut self, elapsed: Duration, runner: &mut R) {
        let mut drained = Vec::new();

        for queue in &mut self.queues {
            if !queue.wait_remaining.is_zero() {
                queue.wait_remaining = queue.wait_remaining.saturating_sub(elapsed);
                continue;
            }

            let Some(item) = queue.items.pop_front() else {
                drained.push(queue.id);
                continue;
            };

            if item.name() == SLEEP_COMMAND {
                if !queue.items.is_empty() {
                    match sleep_duration(item.argument()) {
                        Some(wait) => queue.wait_remaining = wait,
                        None => runner.bad_sleep(queue.id, &item),
                    }
                }
            } else {
                let follow_up = runner.run(queue.id, &item);
                queue.prepend(follow_up);
            }

            if queue.items.is_empty() {
                drained.push(queue.id);
            }
        }

        if !drained.is_empty() {
            self.queues.retain(|q| !drained.contains(&q.id));
        }
    }
}

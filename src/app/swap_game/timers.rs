use std::{cmp::Reverse, collections::BinaryHeap};

/// Everything the round schedules for later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Timer {
    InstructionDismiss,
    CountdownTick,
    InactivityPoll,
    Unfreeze,
}

/// Pending timers ordered by due time, then by the order they were scheduled in.
#[derive(Debug, Default, Clone)]
pub struct TimerQueue {
    heap: BinaryHeap<Reverse<(u64, u64, Timer)>>,
    seq: u64,
}

impl TimerQueue {
    pub fn schedule(&mut self, at: u64, timer: Timer) {
        self.heap.push(Reverse((at, self.seq, timer)));
        self.seq += 1;
    }

    /// Removes and returns the earliest timer due at or before `now`.
    pub fn pop_due(&mut self, now: u64) -> Option<(u64, Timer)> {
        let Reverse((at, _, _)) = self.heap.peek()?;
        if *at > now {
            return None;
        }
        self.heap.pop().map(|Reverse((at, _, timer))| (at, timer))
    }

    pub fn next_due(&self) -> Option<u64> {
        self.heap.peek().map(|Reverse((at, _, _))| *at)
    }

    /// Drops every pending timer, returning how many there were.
    pub fn cancel_all(&mut self) -> usize {
        let n = self.heap.len();
        self.heap.clear();
        n
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

//! Scoped one-shot timers.
//!
//! A `OneShot` holds at most one pending deadline. Scheduling replaces
//! the previous deadline, so a stale expiry can never fire for a newer
//! schedule. Timers are polled from the frame loop
//! with the current `Instant`; nothing runs in the background.

use std::time::{Duration, Instant};

use crate::domain::content::NodeRef;

#[derive(Clone, Debug, Default)]
pub struct OneShot {
    deadline: Option<Instant>,
}

impl OneShot {
    pub fn new() -> Self {
        OneShot::default()
    }

    /// Schedule expiry `after` from `now`, cancelling any pending one.
    pub fn schedule(&mut self, now: Instant, after: Duration) {
        self.deadline = Some(now + after);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Pending and not yet expired at `now`.
    pub fn is_running(&self, now: Instant) -> bool {
        self.deadline.map_or(false, |d| now < d)
    }

    /// Consume the expiry if it is due. Returns true exactly once per schedule.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(d) if now >= d => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Which node is playing its "just appeared" animation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct AnimatingNode {
    pub pathway: usize,
    pub node: usize,
}

impl AnimatingNode {
    pub fn node_ref(self) -> NodeRef {
        NodeRef::Step {
            pathway: self.pathway,
            node: self.node,
        }
    }
}

/// Transient flag that clears itself a fixed delay after being set.
#[derive(Clone, Debug)]
pub struct AnimationFlag {
    current: Option<AnimatingNode>,
    timer: OneShot,
    delay: Duration,
}

impl AnimationFlag {
    pub fn new(delay: Duration) -> Self {
        AnimationFlag {
            current: None,
            timer: OneShot::new(),
            delay,
        }
    }

    pub fn set(&mut self, node: AnimatingNode, now: Instant) {
        self.current = Some(node);
        self.timer.schedule(now, self.delay);
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.timer.cancel();
    }

    pub fn get(&self) -> Option<AnimatingNode> {
        self.current
    }

    pub fn is_set(&self) -> bool {
        self.current.is_some()
    }

    /// Clear the flag if its timer expired. Returns true when it cleared.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.timer.poll(now) {
            self.current = None;
            true
        } else {
            false
        }
    }
}

//! Per-actor action queue and current-action slot

use std::collections::VecDeque;

use crate::actions::Action;

/// Queue of actions for an actor
///
/// At most one action is current. Queued actions start strictly in the order
/// they were pushed; the only way to jump the line is `preempt` or the
/// front-insertion of a composite's follow-ups.
#[derive(Debug, Default)]
pub struct ActionQueue {
    current: Option<Box<dyn Action>>,
    queued: VecDeque<Box<dyn Action>>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self {
            current: None,
            queued: VecDeque::new(),
        }
    }

    pub fn current(&self) -> Option<&dyn Action> {
        self.current.as_deref()
    }

    pub fn current_mut(&mut self) -> Option<&mut (dyn Action + 'static)> {
        self.current.as_deref_mut()
    }

    /// Append to the back of the queue
    pub fn push(&mut self, action: Box<dyn Action>) {
        self.queued.push_back(action);
    }

    /// Insert actions at the front, keeping their relative order
    pub fn push_front_all(&mut self, actions: Vec<Box<dyn Action>>) {
        for action in actions.into_iter().rev() {
            self.queued.push_front(action);
        }
    }

    /// Cancel the current action and put `action` next in line
    ///
    /// The current action stays current so it gets its final invocation.
    pub fn preempt(&mut self, action: Box<dyn Action>) {
        if let Some(current) = self.current.as_mut() {
            current.cancel();
        }
        self.queued.push_front(action);
    }

    /// If nothing is current, dequeue the next action. Returns true if an action is current.
    pub fn start_next(&mut self) -> bool {
        if self.current.is_none() {
            self.current = self.queued.pop_front();
        }
        self.current.is_some()
    }

    /// Take the current action out for execution
    pub fn take_current(&mut self) -> Option<Box<dyn Action>> {
        self.current.take()
    }

    /// Put a still-running action back in the current slot
    pub fn restore_current(&mut self, action: Box<dyn Action>) {
        debug_assert!(self.current.is_none());
        self.current = Some(action);
    }

    /// Drop everything without cancelling
    pub fn clear(&mut self) {
        self.current = None;
        self.queued.clear();
    }

    pub fn front(&self) -> Option<&dyn Action> {
        self.queued.front().map(|a| a.as_ref())
    }

    pub fn queued_names(&self) -> Vec<&'static str> {
        self.queued.iter().map(|a| a.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.queued.len() + usize::from(self.current.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_idle(&self) -> bool {
        self.current.is_none() && self.queued.is_empty()
    }
}

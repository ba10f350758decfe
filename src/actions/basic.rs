//! Timed primitives

use crate::actions::{Action, ActionContext, ActionStatus, CancelFlag};
use crate::entity::actor::Actor;

/// Do nothing for a number of ticks
#[derive(Debug)]
pub struct Wait {
    remaining: u32,
    canceled: CancelFlag,
}

impl Wait {
    pub fn new(ticks: u32) -> Self {
        Self {
            remaining: ticks,
            canceled: CancelFlag::default(),
        }
    }
}

impl Action for Wait {
    fn name(&self) -> &'static str {
        "wait"
    }

    fn execute(&mut self, _actor: &mut Actor, _ctx: &mut ActionContext<'_>) -> ActionStatus {
        if self.canceled.is_set() {
            return ActionStatus::Canceled;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            ActionStatus::Completed
        } else {
            ActionStatus::Running
        }
    }

    fn cancel(&mut self) {
        self.canceled.request();
    }

    fn is_cancel_requested(&self) -> bool {
        self.canceled.is_set()
    }
}

/// Knocked out for a number of ticks
///
/// Not cancelable: `cancel` is a no-op and the stun always runs to completion.
/// Anything that preempts a stunned actor waits behind it.
#[derive(Debug)]
pub struct Stun {
    remaining: u32,
}

impl Stun {
    pub fn new(ticks: u32) -> Self {
        Self { remaining: ticks }
    }
}

impl Action for Stun {
    fn name(&self) -> &'static str {
        "stun"
    }

    fn execute(&mut self, _actor: &mut Actor, _ctx: &mut ActionContext<'_>) -> ActionStatus {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            ActionStatus::Completed
        } else {
            ActionStatus::Running
        }
    }

    fn cancel(&mut self) {}

    fn is_cancel_requested(&self) -> bool {
        false
    }

    fn is_cancelable(&self) -> bool {
        false
    }
}

//! Strictly ordered, single-in-flight action queue
//!
//! The queue never runs anything itself. It hands the owner the action to
//! run together with a [`Ticket`]; the owner gives the ticket back through
//! [`ActionQueue::complete`] when the action is done, and gets the next
//! action (or a drained notification) in return. Because tickets are moved,
//! a step can only be completed once.
//!
//! [`ActionQueue::clear`] drops pending actions and bumps the queue's
//! generation. Tickets from before the clear become stale: completing them
//! is ignored, so an abandoned step can never start a second one alongside
//! whatever runs next.

use std::collections::VecDeque;

use log::trace;

/// Proof that a step is in flight; return it to [`ActionQueue::complete`]
#[derive(Debug, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
}

/// Outcome of [`ActionQueue::enqueue`]
#[must_use]
#[derive(Debug)]
pub enum Enqueued<A> {
    /// Queue was idle: the action starts now (empty -> busy transition)
    Started(A, Ticket),
    /// Another step is in flight; the action waits its turn
    Queued,
}

/// Outcome of [`ActionQueue::complete`]
#[must_use]
#[derive(Debug)]
pub enum Advance<A> {
    /// Next pending action, now in flight
    Next(A, Ticket),
    /// Nothing left: the queue went idle
    Drained,
    /// Ticket predates a `clear`; nothing changed
    Stale,
}

/// FIFO queue of actions of type `A`
#[derive(Debug)]
pub struct ActionQueue<A> {
    pending: VecDeque<A>,
    active: bool,
    generation: u64,
}

impl<A> Default for ActionQueue<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> ActionQueue<A> {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            active: false,
            generation: 0,
        }
    }

    /// Append an action, starting it immediately if the queue is idle
    pub fn enqueue(&mut self, action: A) -> Enqueued<A> {
        if self.active {
            self.pending.push_back(action);
            trace!("queue: action queued ({} pending)", self.pending.len());
            return Enqueued::Queued;
        }
        self.active = true;
        trace!("queue: started");
        Enqueued::Started(action, self.ticket())
    }

    /// Finish the step identified by `ticket` and move on
    pub fn complete(&mut self, ticket: Ticket) -> Advance<A> {
        if ticket.generation != self.generation || !self.active {
            trace!("queue: ignoring stale completion");
            return Advance::Stale;
        }
        match self.pending.pop_front() {
            Some(action) => Advance::Next(action, self.ticket()),
            None => {
                self.active = false;
                trace!("queue: drained");
                Advance::Drained
            }
        }
    }

    /// Drop all pending actions and go idle; the in-flight step is abandoned
    pub fn clear(&mut self) {
        self.pending.clear();
        self.active = false;
        self.generation += 1;
    }

    /// Whether a step is in flight
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Number of actions waiting behind the in-flight step
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn ticket(&self) -> Ticket {
        Ticket {
            generation: self.generation,
        }
    }
}

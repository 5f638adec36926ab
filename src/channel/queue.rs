//! Bounded FIFO message queue backing a channel.
//!
//! The queue is the single point of mutual exclusion in the pipeline: any
//! number of producers and consumers may operate on it concurrently, and
//! "who gets the next message" is decided entirely by FIFO arrival order.
//! A category-filtered receive takes the oldest matching message and skips
//! (does not discard) anything ahead of it with a different category.

use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::Notify;

use super::{ChannelError, ChannelId};
use crate::types::{Category, Message};

/// Shared queue state. Kept behind a std `Mutex` because every critical
/// section is a short scan-and-splice with no await points inside.
struct QueueState {
    messages: VecDeque<Message>,
    destroyed: bool,
}

/// A single named queue. Lives in the [`ChannelBus`](super::ChannelBus)
/// registry and outlives any individual role; handles hold an `Arc` to it.
pub(super) struct Queue {
    id: ChannelId,
    capacity: usize,
    state: Mutex<QueueState>,
    /// Signalled (waiters-only) whenever a message is pushed or the queue
    /// is destroyed. Receivers re-scan after every wake.
    arrival: Notify,
    /// Signalled whenever a message is popped or the queue is destroyed.
    vacancy: Notify,
}

impl Queue {
    pub(super) fn new(id: ChannelId, capacity: usize) -> Self {
        Self {
            id,
            capacity,
            state: Mutex::new(QueueState {
                messages: VecDeque::new(),
                destroyed: false,
            }),
            arrival: Notify::new(),
            vacancy: Notify::new(),
        }
    }

    pub(super) fn id(&self) -> ChannelId {
        self.id
    }

    /// Nonblocking send. `Full` when the bounded capacity is exceeded.
    pub(super) fn try_push(&self, message: Message) -> Result<(), ChannelError> {
        let mut state = self.state.lock().expect("channel queue lock poisoned");
        if state.destroyed {
            return Err(ChannelError::Unavailable(self.id));
        }
        if state.messages.len() >= self.capacity {
            return Err(ChannelError::Full);
        }
        state.messages.push_back(message);
        drop(state);
        self.arrival.notify_waiters();
        Ok(())
    }

    /// Blocking send: waits for space instead of failing with `Full`.
    pub(super) async fn push(&self, message: Message) -> Result<(), ChannelError> {
        let mut notified = std::pin::pin!(self.vacancy.notified());
        loop {
            match self.try_push(message) {
                Err(ChannelError::Full) => {}
                other => return other,
            }
            // Register interest, then re-check: a pop may have landed
            // between the failed attempt and the registration.
            notified.as_mut().enable();
            match self.try_push(message) {
                Err(ChannelError::Full) => {}
                other => return other,
            }
            notified.as_mut().await;
            notified.set(self.vacancy.notified());
        }
    }

    /// Nonblocking receive. `Empty` when no eligible message exists.
    ///
    /// Without a filter this is the FIFO head across all producers; with a
    /// filter it is the oldest message of that category, leaving everything
    /// else in place.
    pub(super) fn try_pop(&self, filter: Option<Category>) -> Result<Message, ChannelError> {
        let mut state = self.state.lock().expect("channel queue lock poisoned");
        if state.destroyed {
            return Err(ChannelError::Unavailable(self.id));
        }
        let index = match filter {
            None => {
                if state.messages.is_empty() {
                    return Err(ChannelError::Empty);
                }
                0
            }
            Some(category) => state
                .messages
                .iter()
                .position(|m| m.category == category)
                .ok_or(ChannelError::Empty)?,
        };
        let message = state
            .messages
            .remove(index)
            .expect("matched index must be in bounds");
        drop(state);
        self.vacancy.notify_waiters();
        Ok(message)
    }

    /// Blocking receive: suspends the caller until an eligible message
    /// arrives or the queue is destroyed out from under it.
    pub(super) async fn pop(&self, filter: Option<Category>) -> Result<Message, ChannelError> {
        let mut notified = std::pin::pin!(self.arrival.notified());
        loop {
            match self.try_pop(filter) {
                Err(ChannelError::Empty) => {}
                other => return other,
            }
            notified.as_mut().enable();
            match self.try_pop(filter) {
                Err(ChannelError::Empty) => {}
                other => return other,
            }
            notified.as_mut().await;
            notified.set(self.arrival.notified());
        }
    }

    /// Number of messages currently queued. Zero once destroyed.
    pub(super) fn len(&self) -> usize {
        let state = self.state.lock().expect("channel queue lock poisoned");
        state.messages.len()
    }

    /// Tear the queue down. Messages still in flight are dropped and every
    /// blocked sender/receiver is woken with `Unavailable`.
    pub(super) fn destroy(&self) -> usize {
        let dropped = {
            let mut state = self.state.lock().expect("channel queue lock poisoned");
            state.destroyed = true;
            let dropped = state.messages.len();
            state.messages.clear();
            dropped
        };
        self.arrival.notify_waiters();
        self.vacancy.notify_waiters();
        dropped
    }
}

//! Channel abstraction: named, durable FIFO message queues.
//!
//! A channel is the rendezvous point between otherwise unrelated concurrent
//! roles. There is no central directory: every participant derives the same
//! [`ChannelId`] from a shared [`Seed`], and whichever participant reaches
//! the bus first creates the queue while everyone else attaches to it
//! ([`ChannelBus::create_or_attach`]). Queues live in the bus, not in any
//! role, so replicas and their voter can start and stop in any order and a
//! crashed producer never takes the queue down with it.
//!
//! Destruction is a run-once shutdown operation owned by the orchestrator.
//! A role that touches a destroyed channel gets
//! [`ChannelError::Unavailable`], which is fatal to that role only.

mod queue;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::debug;

use crate::types::{Category, Message};
use queue::Queue;

/// Default bounded capacity of a freshly created channel, in messages.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Rendezvous token shared by every participant of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Seed(pub u8);

/// System-wide channel identity, derived deterministically from the bus
/// namespace and a seed. Two participants using the same seed always
/// resolve to the same identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(u64);

impl ChannelId {
    /// Content-addressed derivation: `hash(namespace, seed)` truncated to
    /// 64 bits. Collisions across the handful of seeds in one namespace
    /// are not a practical concern.
    fn derive(namespace: &str, seed: Seed) -> Self {
        let digest = md5::compute(format!("{namespace}:{}", seed.0));
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest.0[..8]);
        ChannelId(u64::from_be_bytes(bytes))
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Channel operation failures.
///
/// `Full` and `Empty` are expected outcomes of the nonblocking operations
/// and must be treated as normal control flow by callers. `Unavailable`
/// means the queue was destroyed while still referenced; the canonical
/// response is to terminate the affected role, not retry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("channel is full")]
    Full,
    #[error("no eligible message")]
    Empty,
    #[error("channel {0} no longer exists")]
    Unavailable(ChannelId),
}

/// Process-wide channel registry standing in for the kernel.
///
/// The bus outlives every role and owns every queue. Roles hold an
/// `Arc<ChannelBus>` plus the seeds they were configured with, and resolve
/// their handles at start via [`create_or_attach`](Self::create_or_attach).
pub struct ChannelBus {
    namespace: String,
    capacity: usize,
    channels: Mutex<HashMap<ChannelId, Arc<Queue>>>,
}

impl ChannelBus {
    pub fn new(namespace: impl Into<String>, capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            namespace: namespace.into(),
            capacity,
            channels: Mutex::new(HashMap::new()),
        })
    }

    /// Resolve a handle for the channel identified by `seed`, creating the
    /// queue if this caller is the first to reach it.
    ///
    /// An already-existing identity is an attach signal, never an error:
    /// concurrent exclusive-create attempts resolve to exactly one winner
    /// whose queue everyone else shares. The operation is idempotent.
    pub fn create_or_attach(self: &Arc<Self>, seed: Seed) -> ChannelHandle {
        let id = ChannelId::derive(&self.namespace, seed);
        let mut channels = self.channels.lock().expect("channel registry lock poisoned");
        let queue = channels
            .entry(id)
            .or_insert_with(|| {
                debug!(channel = %id, seed = seed.0, "channel created");
                Arc::new(Queue::new(id, self.capacity))
            })
            .clone();
        ChannelHandle { queue }
    }

    /// Release a channel's resources. Must only be called once no role will
    /// issue another send or receive on it: messages still queued are lost
    /// and any role still blocked on the channel observes `Unavailable`.
    pub fn destroy(&self, handle: &ChannelHandle) -> Result<(), ChannelError> {
        let id = handle.id();
        let removed = {
            let mut channels = self.channels.lock().expect("channel registry lock poisoned");
            channels.remove(&id)
        };
        match removed {
            Some(queue) => {
                let dropped = queue.destroy();
                if dropped > 0 {
                    debug!(channel = %id, dropped, "channel destroyed with messages in flight");
                } else {
                    debug!(channel = %id, "channel destroyed");
                }
                Ok(())
            }
            None => Err(ChannelError::Unavailable(id)),
        }
    }
}

/// Local handle bound to a channel identity after create-or-attach.
///
/// Handles are cheap to clone; all clones address the same queue.
#[derive(Clone)]
pub struct ChannelHandle {
    queue: Arc<Queue>,
}

impl ChannelHandle {
    pub fn id(&self) -> ChannelId {
        self.queue.id()
    }

    /// Nonblocking send. Fails with [`ChannelError::Full`] instead of
    /// waiting when the bounded capacity is exceeded.
    pub fn try_send(&self, message: Message) -> Result<(), ChannelError> {
        self.queue.try_push(message)
    }

    /// Blocking send: suspends the calling role until space is available.
    pub async fn send(&self, message: Message) -> Result<(), ChannelError> {
        self.queue.push(message).await
    }

    /// Nonblocking receive of the FIFO head, regardless of category.
    pub fn try_recv(&self) -> Result<Message, ChannelError> {
        self.queue.try_pop(None)
    }

    /// Nonblocking receive of the oldest message with `category`,
    /// skipping (not discarding) non-matching messages ahead of it.
    pub fn try_recv_category(&self, category: Category) -> Result<Message, ChannelError> {
        self.queue.try_pop(Some(category))
    }

    /// Blocking receive of the FIFO head.
    pub async fn recv(&self) -> Result<Message, ChannelError> {
        self.queue.pop(None).await
    }

    /// Blocking receive of the oldest message with `category`.
    pub async fn recv_category(&self, category: Category) -> Result<Message, ChannelError> {
        self.queue.pop(Some(category)).await
    }

    /// Messages currently queued (diagnostics only).
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

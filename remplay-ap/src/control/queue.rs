//! Command queue shared between connection handlers and the playback loop
//!
//! Handlers append decoded batches from any task; the playback session drains
//! everything pending once per loop iteration. Appends and drains take the
//! same lock, so a drain always observes a complete prefix of the arrival
//! order.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

/// Identifier of one accepted control connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Allocate a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let simple = self.0.simple().to_string();
        write!(f, "conn-{}", &simple[..8])
    }
}

/// Where a batch came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOrigin {
    /// A client connection
    Connection(ConnectionId),
    /// The daemon itself (e.g. signal handling)
    Internal,
}

/// One queued command batch (the payload of one frame)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBatch {
    /// Arrival order, strictly increasing per queue
    pub seq: u64,
    /// Originating connection
    pub origin: CommandOrigin,
    /// `;`-joined commands
    pub payload: String,
}

#[derive(Debug, Default)]
struct QueueInner {
    next_seq: u64,
    pending: VecDeque<CommandBatch>,
}

/// Unbounded FIFO of command batches.
///
/// Cloning yields another handle to the same queue.
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    inner: Arc<Mutex<QueueInner>>,
}

impl CommandQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        // A panicking writer cannot leave a half-written batch behind, so the
        // data is still consistent after poisoning.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a batch. Empty payloads are dropped.
    ///
    /// Returns the assigned sequence number.
    pub fn push(&self, origin: CommandOrigin, payload: impl Into<String>) -> Option<u64> {
        let payload = payload.into();
        if payload.trim().is_empty() {
            return None;
        }

        let mut inner = self.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.pending.push_back(CommandBatch {
            seq,
            origin,
            payload,
        });
        Some(seq)
    }

    /// Take every pending batch in arrival order. Never blocks on an empty queue.
    pub fn drain(&self) -> Vec<CommandBatch> {
        let mut inner = self.lock();
        std::mem::take(&mut inner.pending).into()
    }

    /// Number of pending batches
    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    /// True if nothing is pending
    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }
}

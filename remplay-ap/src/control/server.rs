//! TCP control server
//!
//! Accepts client connections and runs one handler task per connection.
//! Each handler decodes frames and appends command batches to the shared
//! [`CommandQueue`]. The server itself never interprets commands beyond the
//! connection-level words (handshake, `disconnect`, exit words).

use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use remplay_common::protocol::{self, FrameDecoder, DISCONNECT, HANDSHAKE_TOKEN};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::queue::{CommandBatch, CommandOrigin, CommandQueue, ConnectionId};
use super::CommandSource;
use crate::error::{Error, Result};

/// Read buffer size per connection.
const READ_BUF_SIZE: usize = 8 * 1024;

/// Pause after a failed accept before retrying.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Connection lifecycle as seen by its handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No frame received yet
    AwaitingFirstFrame,
    /// Handshake accepted, connection stays open
    Persistent,
    /// Handler must stop reading and close the socket
    Closing,
}

/// Apply one received payload to a connection.
///
/// Returns the next state and the batch to enqueue, if any.
pub fn route_payload(state: ConnectionState, payload: &str) -> (ConnectionState, Option<String>) {
    match state {
        ConnectionState::AwaitingFirstFrame => {
            if payload == HANDSHAKE_TOKEN {
                (ConnectionState::Persistent, None)
            } else {
                // One-shot client: this single batch, then close
                (ConnectionState::Closing, Some(payload.to_string()))
            }
        }
        ConnectionState::Persistent => {
            let (batch, disconnect) = truncate_at_disconnect(payload);
            let exit = protocol::split_batch(&batch)
                .into_iter()
                .any(protocol::is_exit_command);
            let next = if disconnect || exit {
                ConnectionState::Closing
            } else {
                ConnectionState::Persistent
            };
            (next, Some(batch))
        }
        ConnectionState::Closing => (ConnectionState::Closing, None),
    }
}

/// Cut a batch at its first `disconnect` command.
///
/// Returns the commands before it and whether a disconnect was found.
fn truncate_at_disconnect(payload: &str) -> (String, bool) {
    let commands: Vec<&str> = payload.split(protocol::COMMAND_SEPARATOR).collect();
    match commands.iter().position(|c| c.trim() == DISCONNECT) {
        Some(idx) => (commands[..idx].join(protocol::COMMAND_SEPARATOR), true),
        None => (payload.to_string(), false),
    }
}

/// Live connection handler tasks, keyed by connection
#[derive(Debug, Clone, Default)]
struct ConnectionSet {
    inner: Arc<Mutex<HashMap<ConnectionId, JoinHandle<()>>>>,
}

impl ConnectionSet {
    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, JoinHandle<()>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn a handler and register it.
    ///
    /// The map stays locked until the handle is inserted, so the handler's
    /// own [`Registration`] removal always runs after the insert.
    fn spawn<F>(&self, id: ConnectionId, handler: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut map = self.lock();
        let handle = tokio::spawn(handler);
        map.insert(id, handle);
    }

    fn remove(&self, id: ConnectionId) {
        self.lock().remove(&id);
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    /// Abort every handler. Returns how many were live.
    fn close_all(&self) -> usize {
        let handles: Vec<JoinHandle<()>> = {
            let mut map = self.lock();
            map.drain().map(|(_, handle)| handle).collect()
        };
        for handle in &handles {
            handle.abort();
        }
        handles.len()
    }
}

/// Deregisters a connection when its handler ends, however it ends.
struct Registration {
    id: ConnectionId,
    connections: ConnectionSet,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.connections.remove(self.id);
    }
}

/// Control server accepting command connections
#[derive(Debug)]
pub struct CommandServer {
    local_addr: SocketAddr,
    queue: CommandQueue,
    connections: ConnectionSet,
    accept_task: Mutex<Option<JoinHandle<()>>>,
    running: Arc<AtomicBool>,
}

impl CommandServer {
    /// Bind `address` and start accepting connections in the background.
    ///
    /// # Errors
    ///
    /// [`Error::Bind`] if the address is invalid or already in use.
    pub async fn start(address: &str, queue: CommandQueue) -> Result<Self> {
        let listener = TcpListener::bind(address).await.map_err(|source| Error::Bind {
            address: address.to_string(),
            source,
        })?;
        let local_addr = listener.local_addr()?;

        let connections = ConnectionSet::default();
        let running = Arc::new(AtomicBool::new(true));

        let accept_task = tokio::spawn(accept_loop(
            listener,
            queue.clone(),
            connections.clone(),
            Arc::clone(&running),
        ));

        info!("Control server listening on {}", local_addr);

        Ok(Self {
            local_addr,
            queue,
            connections,
            accept_task: Mutex::new(Some(accept_task)),
            running,
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of live connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// True until [`shutdown`](Self::shutdown) is called
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop listening and close every live connection. Idempotent.
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        let accept_task = self
            .accept_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = accept_task {
            task.abort();
        }

        let closed = self.connections.close_all();
        info!("Control server stopped ({} connections closed)", closed);
    }
}

impl CommandSource for CommandServer {
    fn update(&self) {
        // Handlers run on their own tasks; nothing to drive here.
    }

    fn drain(&self) -> Vec<CommandBatch> {
        self.queue.drain()
    }
}

impl Drop for CommandServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn accept_loop(
    listener: TcpListener,
    queue: CommandQueue,
    connections: ConnectionSet,
    running: Arc<AtomicBool>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                let id = ConnectionId::new();
                debug!("Client connected: {} from {}", id, peer);

                connections.spawn(
                    id,
                    handle_connection(id, stream, queue.clone(), connections.clone()),
                );
            }
            Err(e) => {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                warn!("Failed to accept connection: {}", e);
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
            }
        }
    }
    debug!("Accept loop exited");
}

async fn handle_connection(
    id: ConnectionId,
    mut stream: TcpStream,
    queue: CommandQueue,
    connections: ConnectionSet,
) {
    // Created on first poll; a handler dropped unpolled never touches the map
    let _registration = Registration { id, connections };

    let mut decoder = FrameDecoder::new();
    let mut buf = vec![0u8; READ_BUF_SIZE];
    let mut state = ConnectionState::AwaitingFirstFrame;

    'read: loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) => {
                debug!("{} closed by client", id);
                break;
            }
            Ok(n) => n,
            Err(e) if matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock) => {
                continue;
            }
            Err(e) => {
                warn!("{} read error: {}", id, e);
                break;
            }
        };

        let payloads = match decoder.feed(&buf[..n]) {
            Ok(payloads) => payloads,
            Err(e) => {
                warn!("{} protocol error, closing: {}", id, e);
                break;
            }
        };

        for payload in payloads {
            let (next, batch) = route_payload(state, &payload);
            if state == ConnectionState::AwaitingFirstFrame && next == ConnectionState::Persistent {
                debug!("{} handshake accepted", id);
            }
            if let Some(batch) = batch {
                if let Some(seq) = queue.push(CommandOrigin::Connection(id), batch) {
                    debug!("{} queued batch #{}", id, seq);
                }
            }
            state = next;
            if state == ConnectionState::Closing {
                break 'read;
            }
        }
    }

    if decoder.has_partial() {
        debug!("{} dropped incomplete frame", id);
    }
    debug!("{} disconnected", id);
}

//! Control channel client
//!
//! Connects to a running `remplay-ap` daemon and sends command batches.
//! Two modes:
//! - one-shot: all arguments joined with `;` are sent as a single frame, then
//!   the connection is closed (the server closes its side as well)
//! - interactive: the handshake token upgrades the connection to persistent,
//!   then each input line is sent as its own batch

use std::net::SocketAddr;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::protocol::{self, COMMAND_SEPARATOR, DISCONNECT, HANDSHAKE_TOKEN};
use crate::{Error, Result};

/// Client side of the control channel.
#[derive(Debug)]
pub struct CommandClient {
    stream: Option<TcpStream>,
    peer: SocketAddr,
}

impl CommandClient {
    /// Connect to the control server.
    ///
    /// # Errors
    ///
    /// [`Error::Connect`] if the server is unreachable. No retry is attempted.
    pub async fn connect(address: &str) -> Result<Self> {
        let stream = TcpStream::connect(address)
            .await
            .map_err(|source| Error::Connect {
                address: address.to_string(),
                source,
            })?;
        let peer = stream.peer_addr()?;
        debug!("Connected to control server at {}", peer);

        Ok(Self {
            stream: Some(stream),
            peer,
        })
    }

    /// Address of the server this client is connected to.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// True until [`CommandClient::destroy`] is called.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Encode and send one command batch. Empty batches are not sent.
    pub async fn send(&mut self, command_batch: &str) -> Result<()> {
        if command_batch.is_empty() {
            return Ok(());
        }

        let peer = self.peer;
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        let frame = protocol::encode_frame(command_batch);

        stream
            .write_all(&frame)
            .await
            .map_err(|source| Error::Send { peer, source })?;
        stream
            .flush()
            .await
            .map_err(|source| Error::Send { peer, source })?;

        debug!("Sent {} byte frame to {}", frame.len(), peer);
        Ok(())
    }

    /// Send every argument as one `;`-joined batch, then close the connection.
    pub async fn one_shot<S: AsRef<str>>(&mut self, arguments: &[S]) -> Result<()> {
        let batch = arguments
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(COMMAND_SEPARATOR);

        let result = self.send(&batch).await;
        self.destroy();
        result
    }

    /// Drive an interactive session.
    ///
    /// Sends the handshake token, then reads lines from `input` and sends each
    /// verbatim until the input ends or a line is `disconnect`, `exit` or `quit`.
    /// `prompt` receives a `> ` before every line is read.
    pub async fn interactive<R, W>(&mut self, mut input: R, mut prompt: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.send(HANDSHAKE_TOKEN).await?;
        info!("Interactive session with {} (type `disconnect` to leave)", self.peer);

        let mut raw = Vec::new();

        loop {
            prompt.write_all(b"> ").await?;
            prompt.flush().await?;

            raw.clear();
            if input.read_until(b'\n', &mut raw).await? == 0 {
                break;
            }

            let decoded = protocol::decode_payload(&raw);
            let line = decoded.trim_end_matches(['\r', '\n']);
            self.send(line).await?;

            let word = line.trim();
            if word == DISCONNECT || protocol::is_exit_command(word) {
                break;
            }
        }

        self.destroy();
        Ok(())
    }

    /// Close the socket. Safe to call more than once.
    pub fn destroy(&mut self) {
        if self.stream.take().is_some() {
            debug!("Closed connection to {}", self.peer);
        }
    }
}

impl Drop for CommandClient {
    fn drop(&mut self) {
        self.destroy();
    }
}

//! Test helpers for remplay-ap integration tests
//!
//! - RecordingBackend: audio backend that logs session calls
//! - audio_generator: WAV fixtures written with hound
//! - polling and socket utilities shared by the server and session tests

#![allow(dead_code)]

pub mod audio_generator;
pub mod recording_backend;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

pub use recording_backend::{Event, EventLog, RecordingBackend};

/// Upper bound for any wait in these tests
pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Poll `condition` until it holds, panicking after [`TIMEOUT`].
pub async fn wait_until<F>(what: &str, mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + TIMEOUT;
    while !condition() {
        if Instant::now() > deadline {
            panic!("Timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

/// Create empty files named `names` under `dir` and return their paths.
pub fn touch_tracks(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
    names
        .iter()
        .map(|name| {
            let path = dir.join(name);
            std::fs::write(&path, b"").unwrap();
            path
        })
        .collect()
}

/// Assert that the peer closes `stream` (EOF or reset) within [`TIMEOUT`].
pub async fn expect_closed(stream: &mut TcpStream) {
    let mut buf = [0u8; 64];
    match tokio::time::timeout(TIMEOUT, stream.read(&mut buf)).await {
        Ok(Ok(0)) | Ok(Err(_)) => {}
        Ok(Ok(n)) => panic!("Server sent {} unexpected bytes", n),
        Err(_) => panic!("Connection was not closed by the server"),
    }
}

/// Assert that `stream` stays open for `period`.
pub async fn expect_open(stream: &mut TcpStream, period: Duration) {
    let mut buf = [0u8; 64];
    if let Ok(result) = tokio::time::timeout(period, stream.read(&mut buf)).await {
        panic!("Connection unexpectedly finished: {:?}", result);
    }
}

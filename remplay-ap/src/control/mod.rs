//! Control channel: TCP server and the command queue it feeds

pub mod queue;
pub mod server;

use std::sync::Arc;

pub use queue::{CommandBatch, CommandOrigin, CommandQueue, ConnectionId};
pub use server::CommandServer;

/// Something the playback loop can pull command batches from.
pub trait CommandSource {
    /// Drive any pending I/O. Called once per loop iteration before [`drain`](Self::drain).
    fn update(&self) {}

    /// Take every pending batch in arrival order without blocking.
    fn drain(&self) -> Vec<CommandBatch>;
}

impl CommandSource for CommandQueue {
    fn drain(&self) -> Vec<CommandBatch> {
        CommandQueue::drain(self)
    }
}

impl<T: CommandSource + ?Sized> CommandSource for Arc<T> {
    fn update(&self) {
        (**self).update()
    }

    fn drain(&self) -> Vec<CommandBatch> {
        (**self).drain()
    }
}

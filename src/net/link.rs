//! Framed message channel over an established TCP stream.

use crate::net::NetEvent;
use crate::session::PeerMessage;
use derive_more::{Display, Error};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Error returned when queueing a message on a link whose peer is gone.
#[derive(Debug, Clone, Copy, Display, Error)]
#[display("peer link is closed")]
pub struct LinkClosed;

/// Outbound handle for one open peer connection.
///
/// Messages are newline-delimited JSON. A reader task forwards inbound
/// messages as [`NetEvent::Message`] and reports EOF as
/// [`NetEvent::Disconnected`]; a writer task drains the send queue.
/// Dropping the link stops the reader; the writer drains any queued
/// messages before exiting, so a resignation sent just before teardown
/// still reaches the peer.
#[derive(Debug)]
pub struct PeerLink {
    tx: mpsc::UnboundedSender<PeerMessage>,
    reader: Option<JoinHandle<()>>,
}

impl PeerLink {
    /// Splits the stream and spawns the reader and writer tasks.
    pub(crate) fn spawn(stream: TcpStream, events: mpsc::UnboundedSender<NetEvent>) -> Self {
        let (read, write) = stream.into_split();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(write_loop(write, rx));
        let reader = tokio::spawn(read_loop(read, events));
        Self {
            tx,
            reader: Some(reader),
        }
    }

    /// A link with no transport behind it, for exercising session logic.
    #[cfg(test)]
    pub(crate) fn pair() -> (Self, mpsc::UnboundedReceiver<PeerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, reader: None }, rx)
    }

    /// Queues a message for transmission.
    ///
    /// # Errors
    ///
    /// Fails only when the writer task has already exited.
    pub fn send(&self, message: PeerMessage) -> Result<(), LinkClosed> {
        self.tx.send(message).map_err(|_| LinkClosed)
    }
}

impl Drop for PeerLink {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

async fn write_loop(mut write: OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<PeerMessage>) {
    while let Some(message) = rx.recv().await {
        let mut line = match serde_json::to_string(&message) {
            Ok(line) => line,
            Err(error) => {
                warn!(%error, "failed to encode message");
                continue;
            }
        };
        line.push('\n');
        if let Err(error) = write.write_all(line.as_bytes()).await {
            warn!(%error, "write to peer failed");
            return;
        }
    }
}

async fn read_loop(read: OwnedReadHalf, events: mpsc::UnboundedSender<NetEvent>) {
    let mut lines = BufReader::new(read).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match serde_json::from_str::<PeerMessage>(&line) {
                Ok(message) => {
                    if events.send(NetEvent::Message(message)).is_err() {
                        return;
                    }
                }
                Err(error) => warn!(%error, line, "discarding malformed message"),
            },
            Ok(None) => break,
            Err(error) => {
                debug!(%error, "read from peer failed");
                break;
            }
        }
    }
    let _ = events.send(NetEvent::Disconnected);
}

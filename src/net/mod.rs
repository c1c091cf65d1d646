//! Peer transport: identity allocation and direct data channels.
//!
//! A player who hosts binds an [`Endpoint`]; its bound address doubles as
//! the peer identity shared out-of-band. The other player dials it with
//! [`connect`]. Either way the open connection is wrapped in a
//! [`PeerLink`], and everything the transport observes is delivered as a
//! [`NetEvent`] so the session coordinator stays single-threaded.

mod link;

pub use link::{LinkClosed, PeerLink};

use crate::session::PeerMessage;
use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

/// Opaque peer identity (`host:port`), shared out-of-band.
pub type PeerId = String;

/// Events delivered to the session coordinator's event loop.
#[derive(Debug)]
pub enum NetEvent {
    /// A peer opened a connection to our endpoint.
    Incoming(TcpStream),
    /// A protocol message arrived on the open link.
    Message(PeerMessage),
    /// The open link was lost.
    Disconnected,
}

/// Listening endpoint that owns the local peer identity.
///
/// Accepted connections are handed to the coordinator as
/// [`NetEvent::Incoming`] rather than wired up here, so the policy of what
/// to do with a second connection lives in one place.
#[derive(Debug)]
pub struct Endpoint {
    local_id: PeerId,
    accept_task: JoinHandle<()>,
}

impl Endpoint {
    /// Binds a listener and starts accepting connections.
    #[instrument(skip(events))]
    pub async fn bind(addr: &str, events: mpsc::UnboundedSender<NetEvent>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        let local_id = listener
            .local_addr()
            .context("listener has no local address")?
            .to_string();
        info!(peer_id = %local_id, "endpoint ready");
        let accept_task = tokio::spawn(accept_loop(listener, events));
        Ok(Self {
            local_id,
            accept_task,
        })
    }

    /// The identity to share with the remote player.
    pub fn local_id(&self) -> &PeerId {
        &self.local_id
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn accept_loop(listener: TcpListener, events: mpsc::UnboundedSender<NetEvent>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!(%addr, "inbound connection");
                if events.send(NetEvent::Incoming(stream)).is_err() {
                    return;
                }
            }
            Err(error) => warn!(%error, "accept failed"),
        }
    }
}

/// Dials a remote peer and returns the open link.
#[instrument(skip(events))]
pub async fn connect(
    remote: &str,
    events: mpsc::UnboundedSender<NetEvent>,
) -> anyhow::Result<PeerLink> {
    let stream = TcpStream::connect(remote)
        .await
        .with_context(|| format!("failed to connect to {remote}"))?;
    info!(%remote, "connected to peer");
    Ok(PeerLink::spawn(stream, events))
}

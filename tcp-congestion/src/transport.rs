//! The sender's view of the channel.
//!
//! A [`Transport`] can send one segment and wait, for at most a given time,
//! for one acknowledgement.  `Ok(None)` from [`Transport::recv`] is the
//! timeout signal; there are no retries inside the primitive.
//!
//! - [`UdpTransport`] talks to a [`crate::server::ReceiverServer`] over a real
//!   socket.
//! - [`LoopbackTransport`] hands segments straight to an in-process
//!   [`LossyReceiver`]; a receive with nothing queued times out immediately,
//!   which makes whole sessions deterministic and fast.

use std::collections::VecDeque;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::time::{timeout_at, Instant};

use crate::packet::{Ack, Segment};
use crate::simulator::LossyReceiver;
use crate::socket::{Socket, TransportError};

pub trait Transport {
    fn send(
        &mut self,
        segment: Segment,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Wait up to `timeout` for the next acknowledgement.
    fn recv(
        &mut self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Option<Ack>, TransportError>> + Send;
}

// ---------------------------------------------------------------------------
// UdpTransport
// ---------------------------------------------------------------------------

/// One socket endpoint bound to a single receiver address.
#[derive(Debug)]
pub struct UdpTransport {
    socket: Socket,
    peer: SocketAddr,
}

impl UdpTransport {
    /// Bind an ephemeral loopback port for talking to `peer`.
    pub async fn connect(peer: SocketAddr) -> Result<Self, TransportError> {
        let local: SocketAddr = if peer.is_ipv4() {
            SocketAddr::from(([127, 0, 0, 1], 0))
        } else {
            SocketAddr::from(([0u16, 0, 0, 0, 0, 0, 0, 1], 0))
        };
        let socket = Socket::bind(local).await?;
        Ok(Self::new(socket, peer))
    }

    pub fn new(socket: Socket, peer: SocketAddr) -> Self {
        Self { socket, peer }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

impl Transport for UdpTransport {
    async fn send(&mut self, segment: Segment) -> Result<(), TransportError> {
        self.socket.send_segment(segment, self.peer).await
    }

    async fn recv(&mut self, timeout: Duration) -> Result<Option<Ack>, TransportError> {
        let deadline = Instant::now() + timeout;
        loop {
            match timeout_at(deadline, self.socket.recv_raw()).await {
                Err(_elapsed) => return Ok(None),
                Ok(Ok((bytes, addr))) if addr == self.peer => {
                    return Ok(Some(Ack::decode(&bytes)?));
                }
                Ok(Ok((bytes, addr))) => {
                    log::warn!(
                        "[transport] ignoring {} byte datagram from unexpected peer {addr}",
                        bytes.len()
                    );
                }
                Ok(Err(e)) => return Err(e),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// LoopbackTransport
// ---------------------------------------------------------------------------

/// In-memory channel to a [`LossyReceiver`].
#[derive(Debug)]
pub struct LoopbackTransport {
    receiver: LossyReceiver,
    acks: VecDeque<Ack>,
}

impl LoopbackTransport {
    pub fn new(receiver: LossyReceiver) -> Self {
        Self {
            receiver,
            acks: VecDeque::new(),
        }
    }

    pub fn receiver(&self) -> &LossyReceiver {
        &self.receiver
    }

    /// Hand the receiver back, e.g. to serve another session.
    pub fn into_receiver(self) -> LossyReceiver {
        self.receiver
    }
}

impl Transport for LoopbackTransport {
    async fn send(&mut self, segment: Segment) -> Result<(), TransportError> {
        if let Some(ack) = self.receiver.on_segment(segment.seq) {
            self.acks.push_back(ack);
        }
        Ok(())
    }

    async fn recv(&mut self, _timeout: Duration) -> Result<Option<Ack>, TransportError> {
        Ok(self.acks.pop_front())
    }
}

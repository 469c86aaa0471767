//! Datagram I/O for segments and ACKs.
//!
//! [`Socket`] wraps `tokio::net::UdpSocket` and encodes or decodes
//! [`Segment`] and [`Ack`] at the boundary.  Congestion logic never sees
//! bytes.

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::UdpSocket;

use crate::packet::{Ack, PacketError, Segment};

/// Receive buffer size; both datagram kinds are a handful of ASCII bytes.
const MAX_DATAGRAM: usize = 1024;

/// Failure to move a datagram or to make sense of one.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The received datagram could not be decoded.
    #[error("malformed datagram: {0}")]
    Packet(#[from] PacketError),
}

/// UDP endpoint speaking the text wire format.
#[derive(Debug)]
pub struct Socket {
    /// Resolved bound address, including an OS-chosen port.
    pub local_addr: SocketAddr,
    inner: UdpSocket,
}

impl Socket {
    /// Bind `local_addr`; port `0` picks an ephemeral port.
    pub async fn bind(local_addr: SocketAddr) -> Result<Self, TransportError> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self { local_addr, inner })
    }

    pub async fn send_segment(
        &self,
        segment: Segment,
        dest: SocketAddr,
    ) -> Result<(), TransportError> {
        self.inner.send_to(&segment.encode(), dest).await?;
        Ok(())
    }

    pub async fn send_ack(&self, ack: Ack, dest: SocketAddr) -> Result<(), TransportError> {
        self.inner.send_to(&ack.encode(), dest).await?;
        Ok(())
    }

    /// Receive the next datagram and decode it as a [`Segment`].
    pub async fn recv_segment(&self) -> Result<(Segment, SocketAddr), TransportError> {
        let (bytes, addr) = self.recv_raw().await?;
        Ok((Segment::decode(&bytes)?, addr))
    }

    /// Receive the next datagram and decode it as an [`Ack`].
    ///
    /// Datagrams that fail to decode are returned as `Err`; the caller
    /// decides whether that is fatal.
    pub async fn recv_ack(&self) -> Result<(Ack, SocketAddr), TransportError> {
        let (bytes, addr) = self.recv_raw().await?;
        Ok((Ack::decode(&bytes)?, addr))
    }

    /// Send bytes that bypass the wire format.  Exists for tests that
    /// inject malformed traffic.
    #[doc(hidden)]
    pub async fn send_raw(&self, bytes: &[u8], dest: SocketAddr) -> Result<(), TransportError> {
        self.inner.send_to(bytes, dest).await?;
        Ok(())
    }

    /// Receive the next datagram without decoding it.
    pub(crate) async fn recv_raw(&self) -> Result<(Vec<u8>, SocketAddr), TransportError> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (n, addr) = self.inner.recv_from(&mut buf).await?;
        buf.truncate(n);
        Ok((buf, addr))
    }
}

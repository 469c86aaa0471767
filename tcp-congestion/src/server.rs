//! UDP receiver endpoint.
//!
//! Serves one sender at a time: every decodable segment goes through the
//! [`LossyReceiver`], and the resulting ACK goes back to whichever address
//! the segment came from.  Receiver state is kept for the lifetime of the
//! server, so a second sender session continues from the previous frontier.

use std::net::SocketAddr;

use thiserror::Error;
use tokio::sync::watch;

use crate::config::{ConfigError, ReceiverConfig};
use crate::simulator::{LossyReceiver, ReceiverStats};
use crate::socket::{Socket, TransportError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid receiver configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug)]
pub struct ReceiverServer {
    socket: Socket,
    receiver: LossyReceiver,
}

impl ReceiverServer {
    /// Bind `addr` and build the receiver from `config`.
    pub async fn bind(addr: SocketAddr, config: &ReceiverConfig) -> Result<Self, ServerError> {
        let receiver = LossyReceiver::from_config(config)?;
        let socket = Socket::bind(addr).await?;
        log::info!(
            "[receiver] listening on {} (loss rate {:.2})",
            socket.local_addr,
            config.loss_rate
        );
        Ok(Self { socket, receiver })
    }

    /// Wrap an already bound socket.
    pub fn new(socket: Socket, config: &ReceiverConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            socket,
            receiver: LossyReceiver::from_config(config)?,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr
    }

    pub fn stats(&self) -> &ReceiverStats {
        self.receiver.stats()
    }

    /// Serve until `stop` carries `true`.
    ///
    /// A datagram that is not a valid segment ends the loop with an error.
    pub async fn serve(
        mut self,
        mut stop: watch::Receiver<bool>,
    ) -> Result<ReceiverStats, TransportError> {
        loop {
            if *stop.borrow_and_update() {
                break;
            }
            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() {
                        // Stop handle dropped.
                        break;
                    }
                }
                received = self.socket.recv_segment() => {
                    let (segment, from) = received.inspect_err(|e| {
                        log::error!("[receiver] {e}");
                    })?;
                    if let Some(ack) = self.receiver.on_segment(segment.seq) {
                        self.socket.send_ack(ack, from).await?;
                    }
                }
            }
        }
        let stats = self.receiver.stats().clone();
        log::info!(
            "[receiver] stopped: {} received, {} dropped, {} ACKs sent",
            stats.received,
            stats.dropped,
            stats.acks_sent
        );
        Ok(stats)
    }
}

//! Network loss simulation on the receive path.
//!
//! Real loopback traffic is never lost, so the receiver drops inbound
//! segments itself before they reach the cumulative-ACK state machine.  A
//! dropped segment produces no ACK at all, which is what eventually drives
//! the sender into duplicate ACKs or a timeout.
//!
//! The RNG can be seeded so a lossy run is reproducible end to end.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{ConfigError, ReceiverConfig};
use crate::packet::Ack;
use crate::receiver::Receiver;

/// Independent per-segment drop decision.
#[derive(Debug)]
pub struct LossModel {
    loss_rate: f64,
    rng: StdRng,
}

impl LossModel {
    /// `loss_rate` is clamped into `[0.0, 1.0]`.
    pub fn new(loss_rate: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            loss_rate: loss_rate.clamp(0.0, 1.0),
            rng,
        }
    }

    pub fn loss_rate(&self) -> f64 {
        self.loss_rate
    }

    /// Decide whether the next segment is lost.
    pub fn should_drop(&mut self) -> bool {
        self.loss_rate > 0.0 && self.rng.gen_bool(self.loss_rate)
    }
}

/// Counters kept by a [`LossyReceiver`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    pub received: u64,
    pub dropped: u64,
    pub acks_sent: u64,
    pub frontier: Option<u32>,
}

/// A [`Receiver`] behind a [`LossModel`].
///
/// The state persists across sender sessions for as long as this value
/// lives; it serves a single sender at a time.
#[derive(Debug)]
pub struct LossyReceiver {
    receiver: Receiver,
    loss: LossModel,
    stats: ReceiverStats,
}

impl LossyReceiver {
    pub fn new(loss: LossModel) -> Self {
        Self {
            receiver: Receiver::new(),
            loss,
            stats: ReceiverStats::default(),
        }
    }

    pub fn from_config(config: &ReceiverConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(LossModel::new(config.loss_rate, config.seed)))
    }

    /// Handle one inbound segment.  Returns the ACK to send, or `None` when
    /// the segment was dropped.
    pub fn on_segment(&mut self, seq: u32) -> Option<Ack> {
        self.stats.received += 1;
        if self.loss.should_drop() {
            self.stats.dropped += 1;
            log::debug!("[receiver] simulating loss for segment {seq}");
            return None;
        }
        let ack = self.receiver.on_segment(seq);
        self.stats.acks_sent += 1;
        self.stats.frontier = ack.frontier;
        log::debug!("[receiver] segment {seq} -> {ack}");
        Some(ack)
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }
}

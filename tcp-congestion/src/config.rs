//! Session and receiver configuration.
//!
//! Both structs are plain values handed to the constructors; there are no
//! process-wide defaults beyond the `Default` impls below.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::state::MIN_SSTHRESH;

/// Highest loss rate the receiver accepts.
pub const MAX_LOSS_RATE: f64 = 0.9;

/// Congestion-control algorithm of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Variant {
    Tahoe,
    Reno,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Tahoe => f.write_str("TCP Tahoe"),
            Variant::Reno => f.write_str("TCP Reno"),
        }
    }
}

/// Sender-side parameters.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub variant: Variant,
    /// Size of the sequence space `0 .. total_packets`.
    pub total_packets: u32,
    pub initial_cwnd: f64,
    pub initial_ssthresh: f64,
    /// How long one receive may block before it counts as a timeout.
    pub recv_timeout: Duration,
    /// Loss-recovery events (timeouts and fast retransmits) tolerated before
    /// the session gives up.
    pub max_retransmissions: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            variant: Variant::Reno,
            total_packets: 100,
            initial_cwnd: 1.0,
            initial_ssthresh: 16.0,
            recv_timeout: Duration::from_millis(500),
            max_retransmissions: 50,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_packets == 0 {
            return Err(ConfigError::NoPackets);
        }
        if !self.initial_cwnd.is_finite() || self.initial_cwnd < 1.0 {
            return Err(ConfigError::InitialWindow(self.initial_cwnd));
        }
        if !self.initial_ssthresh.is_finite() || self.initial_ssthresh < MIN_SSTHRESH {
            return Err(ConfigError::InitialThreshold(self.initial_ssthresh));
        }
        if self.recv_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

/// Receiver-side parameters.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Probability in `[0.0, 0.9]` that an inbound segment is dropped.
    pub loss_rate: f64,
    /// Seed for the loss RNG; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            loss_rate: 0.1,
            seed: None,
        }
    }
}

impl ReceiverConfig {
    pub fn lossless() -> Self {
        Self {
            loss_rate: 0.0,
            seed: None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=MAX_LOSS_RATE).contains(&self.loss_rate) {
            return Err(ConfigError::LossRate(self.loss_rate));
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("total packet count must be at least 1")]
    NoPackets,
    #[error("initial cwnd must be at least 1 segment, got {0}")]
    InitialWindow(f64),
    #[error("initial ssthresh must be at least 2, got {0}")]
    InitialThreshold(f64),
    #[error("receive timeout must be non-zero")]
    ZeroTimeout,
    #[error("loss rate must be within 0.0..=0.9, got {0}")]
    LossRate(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let session = SessionConfig::default();
        assert_eq!(session.total_packets, 100);
        assert_eq!(session.initial_cwnd, 1.0);
        assert_eq!(session.initial_ssthresh, 16.0);
        assert_eq!(session.recv_timeout, Duration::from_millis(500));
        assert_eq!(session.max_retransmissions, 50);
        assert_eq!(session.validate(), Ok(()));

        let receiver = ReceiverConfig::default();
        assert_eq!(receiver.loss_rate, 0.1);
        assert_eq!(receiver.validate(), Ok(()));
    }

    #[test]
    fn rejects_bad_session_values() {
        let base = SessionConfig::default();

        let c = SessionConfig {
            total_packets: 0,
            ..base.clone()
        };
        assert_eq!(c.validate(), Err(ConfigError::NoPackets));

        let c = SessionConfig {
            initial_cwnd: 0.5,
            ..base.clone()
        };
        assert_eq!(c.validate(), Err(ConfigError::InitialWindow(0.5)));

        let c = SessionConfig {
            initial_ssthresh: 1.0,
            ..base.clone()
        };
        assert_eq!(c.validate(), Err(ConfigError::InitialThreshold(1.0)));

        let c = SessionConfig {
            recv_timeout: Duration::ZERO,
            ..base
        };
        assert_eq!(c.validate(), Err(ConfigError::ZeroTimeout));
    }

    #[test]
    fn nan_window_is_rejected() {
        let c = SessionConfig {
            initial_cwnd: f64::NAN,
            ..SessionConfig::default()
        };
        assert!(matches!(c.validate(), Err(ConfigError::InitialWindow(_))));
    }

    #[test]
    fn loss_rate_bounds() {
        for ok in [0.0, 0.45, 0.9] {
            let c = ReceiverConfig { loss_rate: ok, seed: None };
            assert_eq!(c.validate(), Ok(()));
        }
        for bad in [-0.1, 0.95, 1.0] {
            let c = ReceiverConfig { loss_rate: bad, seed: None };
            assert_eq!(c.validate(), Err(ConfigError::LossRate(bad)));
        }
    }
}

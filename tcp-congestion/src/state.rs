//! Congestion-window state shared by every controller.
//!
//! [`Window`] is a plain value type.  The state transitions that both
//! variants need (slow-start / congestion-avoidance growth and the loss
//! reset) live here as small methods so each controller calls them
//! explicitly instead of inheriting them.
//!
//! ```text
//!               cwnd >= ssthresh
//!  SLOW_START ───────────────────▶ CONGESTION_AVOIDANCE
//!      ▲  ▲                               │
//!      │  └────────── timeout ────────────┘
//!      │                                  │ 3rd dup ACK (Reno)
//!      │ timeout                          ▼
//!      └──────────────────────────── FAST_RECOVERY
//!                                         │ new ACK: cwnd = ssthresh
//!                                         ▼
//!                                 (SS or CA by comparison)
//! ```

use std::fmt;

/// Lower bound applied to `ssthresh` on every loss event.
pub const MIN_SSTHRESH: f64 = 2.0;

/// Value `cwnd` collapses to on a timeout.
pub const LOSS_WINDOW: f64 = 1.0;

/// Segments by which the window is inflated on entering fast recovery.
pub const FAST_RECOVERY_INFLATION: f64 = 3.0;

/// Which growth regime the window is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    SlowStart,
    CongestionAvoidance,
    /// Reno only: window explicitly held after a fast retransmit.
    FastRecovery,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::SlowStart => "slow-start",
            Phase::CongestionAvoidance => "congestion-avoidance",
            Phase::FastRecovery => "fast-recovery",
        };
        f.write_str(name)
    }
}

/// Sender window in segments.
///
/// `cwnd` is continuous; the driver allows `floor(cwnd)` segments in flight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub cwnd: f64,
    pub ssthresh: f64,
    fast_recovery: bool,
}

impl Window {
    pub fn new(cwnd: f64, ssthresh: f64) -> Self {
        Self {
            cwnd: cwnd.max(LOSS_WINDOW),
            ssthresh,
            fast_recovery: false,
        }
    }

    /// Current phase.  Outside fast recovery the phase is implied by the
    /// `cwnd` / `ssthresh` comparison.
    pub fn phase(&self) -> Phase {
        if self.fast_recovery {
            Phase::FastRecovery
        } else if self.cwnd < self.ssthresh {
            Phase::SlowStart
        } else {
            Phase::CongestionAvoidance
        }
    }

    pub fn in_fast_recovery(&self) -> bool {
        self.fast_recovery
    }

    /// Number of segments that may be outstanding.
    pub fn allowed_in_flight(&self) -> usize {
        self.cwnd.floor().max(0.0) as usize
    }

    /// Growth rule for one newly-acknowledging ACK: double below
    /// `ssthresh`, otherwise add `1 / cwnd`.
    pub fn grow(&mut self) {
        if self.cwnd < self.ssthresh {
            self.cwnd *= 2.0;
        } else {
            self.cwnd += 1.0 / self.cwnd;
        }
    }

    /// `ssthresh = max(cwnd / 2, 2)`.
    pub fn halve_threshold(&mut self) {
        self.ssthresh = (self.cwnd / 2.0).max(MIN_SSTHRESH);
    }

    /// Timeout transition, identical for both variants.
    pub fn reset_on_timeout(&mut self) {
        self.halve_threshold();
        self.cwnd = LOSS_WINDOW;
        self.fast_recovery = false;
    }

    /// Fast-retransmit transition: `cwnd = ssthresh + 3`.
    pub fn enter_fast_recovery(&mut self) {
        self.halve_threshold();
        self.cwnd = self.ssthresh + FAST_RECOVERY_INFLATION;
        self.fast_recovery = true;
    }

    /// One more duplicate ACK has left the network.
    pub fn inflate(&mut self) {
        self.cwnd += 1.0;
    }

    /// Deflate to `ssthresh` and leave fast recovery.
    pub fn exit_fast_recovery(&mut self) {
        self.cwnd = self.ssthresh;
        self.fast_recovery = false;
    }
}

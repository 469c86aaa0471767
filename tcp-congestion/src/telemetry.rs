//! Progress events pushed by a running session.
//!
//! The stream is meant for an external observer (a plotter, a log file, a
//! test).  Nothing in the session depends on anyone listening.
//!
//! # Rounds
//!
//! A round is one burst of new segments issued by a single pass of the
//! driver's send phase.  Retransmissions triggered between bursts are
//! counted in the round that is still open.

use std::fmt;
use std::time::Duration;

use crate::session::Report;
use crate::state::{Phase, Window};

/// Congestion events worth marking on a cwnd plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CongestionEvent {
    /// Receive timeout: `cwnd` collapsed to one segment.
    Timeout,
    /// Third duplicate ACK: fast retransmit and entry into fast recovery.
    FastRetransmit,
}

impl fmt::Display for CongestionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CongestionEvent::Timeout => f.write_str("timeout"),
            CongestionEvent::FastRetransmit => f.write_str("fast-retransmit"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Telemetry {
    Sent {
        round: u32,
        seq: u32,
        cwnd: f64,
        ssthresh: f64,
        phase: Phase,
        packets_in_round: u32,
        retransmission: bool,
    },
    Congestion {
        round: u32,
        event: CongestionEvent,
        /// Window after the transition.
        cwnd: f64,
        ssthresh: f64,
    },
    RttSample {
        round: u32,
        rtt: Duration,
        srtt: Duration,
    },
    Finished(Report),
}

impl fmt::Display for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Telemetry::Sent {
                round,
                seq,
                cwnd,
                ssthresh,
                phase,
                packets_in_round,
                retransmission,
            } => {
                let kind = if *retransmission { "resend" } else { "send" };
                write!(
                    f,
                    "round={round} {kind} seq={seq} cwnd={cwnd:.2} ssthresh={ssthresh:.2} \
                     phase={phase} in_round={packets_in_round}"
                )
            }
            Telemetry::Congestion {
                round,
                event,
                cwnd,
                ssthresh,
            } => write!(
                f,
                "round={round} event={event} cwnd={cwnd:.2} ssthresh={ssthresh:.2}"
            ),
            Telemetry::RttSample { round, rtt, srtt } => {
                write!(f, "round={round} rtt={rtt:?} srtt={srtt:?}")
            }
            Telemetry::Finished(report) => write!(f, "finished: {}", report.outcome),
        }
    }
}

/// Round counter owned by the session driver.
#[derive(Debug, Default)]
pub struct Rounds {
    round: u32,
    packets_in_round: u32,
    burst_open: bool,
}

impl Rounds {
    /// Called before the send phase; the next new segment opens a round.
    pub fn begin_burst(&mut self) {
        self.burst_open = false;
    }

    /// Account for one transmission and return `(round, packets_in_round)`.
    pub fn on_send(&mut self, retransmission: bool) -> (u32, u32) {
        if !retransmission && !self.burst_open {
            self.round += 1;
            self.packets_in_round = 0;
            self.burst_open = true;
        }
        self.packets_in_round += 1;
        (self.round, self.packets_in_round)
    }

    pub fn current(&self) -> u32 {
        self.round
    }
}

/// Build the `Sent` event for a transmission.
pub(crate) fn sent_event(
    rounds: &mut Rounds,
    seq: u32,
    window: &Window,
    retransmission: bool,
) -> Telemetry {
    let (round, packets_in_round) = rounds.on_send(retransmission);
    Telemetry::Sent {
        round,
        seq,
        cwnd: window.cwnd,
        ssthresh: window.ssthresh,
        phase: window.phase(),
        packets_in_round,
        retransmission,
    }
}

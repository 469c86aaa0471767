//! The congestion-controller interface.
//!
//! A controller owns a [`Window`] and decides, for every ACK and every
//! receive timeout, how the window changes and what (if anything) the
//! session driver should put back on the wire.  The in-flight set itself
//! belongs to [`SendState`]; controllers receive it by reference.
//!
//! Implementations: [`crate::tahoe::Tahoe`] and [`crate::reno::Reno`].  They
//! share no code through the trait; both call the same [`Window`] methods
//! and [`SendState::acknowledge_through`].

use crate::config::{SessionConfig, Variant};
use crate::packet::Ack;
use crate::reno::Reno;
use crate::sender::{Acked, SendState};
use crate::state::Window;
use crate::tahoe::Tahoe;

/// What the driver must do after a controller callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    /// Resend this sequence number.
    Retransmit(u32),
    /// Send the next unsent sequence number, if one remains.
    SendNext,
}

pub trait CongestionControl: Send {
    fn variant(&self) -> Variant;

    fn window(&self) -> &Window;

    /// A segment left the sender.  No window mutation.
    fn on_send(&mut self, flight: &mut SendState, seq: u32) {
        flight.record_sent(seq);
    }

    /// An acknowledgement arrived.
    fn on_ack(&mut self, ack: Ack, flight: &mut SendState) -> Action;

    /// The receive timeout elapsed without an acknowledgement.
    fn on_timeout(&mut self, flight: &SendState) -> Action;

    /// Fast-recovery episodes entered so far (always `0` for Tahoe).
    fn fast_recoveries(&self) -> u32 {
        0
    }
}

/// Build the controller selected by `config.variant`.
pub fn new_controller(config: &SessionConfig) -> Box<dyn CongestionControl> {
    let window = Window::new(config.initial_cwnd, config.initial_ssthresh);
    match config.variant {
        Variant::Tahoe => Box::new(Tahoe::new(window)),
        Variant::Reno => Box::new(Reno::new(window)),
    }
}

/// Cumulative acknowledgement followed by the growth rule, shared by both
/// variants when they are not in fast recovery.
pub(crate) fn acknowledge_and_grow(window: &mut Window, ack: Ack, flight: &mut SendState) -> Acked {
    let acked = flight.acknowledge_through(ack);
    if !acked.is_empty() && !window.in_fast_recovery() {
        window.grow();
    }
    acked
}

/// Timeout recovery target: the oldest outstanding segment, or fresh data
/// when nothing is outstanding.
pub(crate) fn timeout_action(flight: &SendState) -> Action {
    match flight.oldest_in_flight() {
        Some(seq) => Action::Retransmit(seq),
        None => Action::SendNext,
    }
}

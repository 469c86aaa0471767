//! TCP Tahoe: slow start, congestion avoidance, and a full collapse to one
//! segment on every timeout.  Duplicate ACKs carry no special meaning.

use crate::config::Variant;
use crate::congestion::{acknowledge_and_grow, timeout_action, Action, CongestionControl};
use crate::packet::Ack;
use crate::sender::SendState;
use crate::state::Window;

#[derive(Debug)]
pub struct Tahoe {
    window: Window,
}

impl Tahoe {
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl CongestionControl for Tahoe {
    fn variant(&self) -> Variant {
        Variant::Tahoe
    }

    fn window(&self) -> &Window {
        &self.window
    }

    fn on_ack(&mut self, ack: Ack, flight: &mut SendState) -> Action {
        let acked = acknowledge_and_grow(&mut self.window, ack, flight);
        if !acked.is_empty() {
            log::debug!(
                "[tahoe] {ack} acknowledged {} segment(s); cwnd={:.2} ssthresh={:.2}",
                acked.count(),
                self.window.cwnd,
                self.window.ssthresh
            );
        }
        Action::None
    }

    fn on_timeout(&mut self, flight: &SendState) -> Action {
        self.window.reset_on_timeout();
        let action = timeout_action(flight);
        log::debug!(
            "[tahoe] timeout; ssthresh={:.2} cwnd={:.2} -> {action:?}",
            self.window.ssthresh,
            self.window.cwnd
        );
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flight_with(seqs: impl IntoIterator<Item = u32>) -> SendState {
        let mut flight = SendState::new(100);
        for seq in seqs {
            flight.record_sent(seq);
        }
        flight
    }

    #[test]
    fn each_new_ack_doubles_in_slow_start() {
        let mut cc = Tahoe::new(Window::new(1.0, 16.0));
        let mut flight = flight_with(0..8);
        for (frontier, expected) in [(0, 2.0), (1, 4.0), (2, 8.0), (3, 16.0)] {
            assert_eq!(cc.on_ack(Ack::new(Some(frontier)), &mut flight), Action::None);
            assert_eq!(cc.window().cwnd, expected);
        }
    }

    #[test]
    fn growth_is_per_ack_not_per_segment() {
        let mut cc = Tahoe::new(Window::new(2.0, 16.0));
        let mut flight = flight_with(0..4);
        cc.on_ack(Ack::new(Some(3)), &mut flight);
        assert_eq!(flight.acknowledged(), 4);
        assert_eq!(cc.window().cwnd, 4.0);
    }

    #[test]
    fn additive_increase_above_threshold() {
        let mut cc = Tahoe::new(Window::new(16.0, 16.0));
        let mut flight = flight_with(0..4);
        cc.on_ack(Ack::new(Some(0)), &mut flight);
        assert_eq!(cc.window().cwnd, 16.0 + 1.0 / 16.0);
        let before = cc.window().cwnd;
        cc.on_ack(Ack::new(Some(1)), &mut flight);
        assert_eq!(cc.window().cwnd, before + 1.0 / before);
    }

    #[test]
    fn duplicate_acks_leave_window_alone() {
        let mut cc = Tahoe::new(Window::new(8.0, 16.0));
        let mut flight = flight_with(6..14);
        for _ in 0..5 {
            assert_eq!(cc.on_ack(Ack::new(Some(5)), &mut flight), Action::None);
        }
        assert_eq!(cc.window().cwnd, 8.0);
        assert_eq!(cc.window().ssthresh, 16.0);
    }

    #[test]
    fn timeout_at_eight_resets_window() {
        let mut cc = Tahoe::new(Window::new(8.0, 16.0));
        let flight = flight_with([3, 4, 5]);
        assert_eq!(cc.on_timeout(&flight), Action::Retransmit(3));
        assert_eq!(cc.window().ssthresh, 4.0);
        assert_eq!(cc.window().cwnd, 1.0);
    }

    #[test]
    fn timeout_with_nothing_outstanding_sends_fresh_data() {
        let mut cc = Tahoe::new(Window::new(4.0, 16.0));
        let flight = SendState::new(10);
        assert_eq!(cc.on_timeout(&flight), Action::SendNext);
        assert_eq!(cc.window().ssthresh, 2.0);
    }
}

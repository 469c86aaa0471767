//! TCP Reno: Tahoe plus fast retransmit and fast recovery.
//!
//! Every ACK is first classified against the last new frontier seen:
//!
//! - **duplicate** (`ack == last_ack`): count it.  The third consecutive
//!   duplicate halves `ssthresh`, sets `cwnd = ssthresh + 3`, enters fast
//!   recovery, and retransmits the segment right after the frontier.  Every
//!   further duplicate while recovering inflates `cwnd` by one.
//! - **new**: reset the counter.  If recovering, deflate to `ssthresh` and
//!   leave fast recovery, then acknowledge and grow exactly like Tahoe.
//!
//! A timeout degrades to Tahoe behaviour and abandons any recovery.

use crate::config::Variant;
use crate::congestion::{acknowledge_and_grow, timeout_action, Action, CongestionControl};
use crate::packet::Ack;
use crate::sender::SendState;
use crate::state::Window;

/// Duplicate ACKs that trigger fast retransmit.
pub const DUP_ACK_THRESHOLD: u32 = 3;

/// Duplicate-ACK tracker.
///
/// `last_ack` starts at the empty frontier, so a receiver that is still
/// waiting for segment `0` produces duplicates of the initial state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DupAckTracker {
    pub last_ack: Ack,
    pub dup_count: u32,
}

impl DupAckTracker {
    /// Classify `ack`; returns `true` for a duplicate.
    fn observe(&mut self, ack: Ack) -> bool {
        if ack == self.last_ack {
            self.dup_count += 1;
            true
        } else {
            self.last_ack = ack;
            self.dup_count = 0;
            false
        }
    }
}

#[derive(Debug)]
pub struct Reno {
    window: Window,
    tracker: DupAckTracker,
    fast_recoveries: u32,
}

impl Reno {
    pub fn new(window: Window) -> Self {
        Self {
            window,
            tracker: DupAckTracker::default(),
            fast_recoveries: 0,
        }
    }

    pub fn tracker(&self) -> &DupAckTracker {
        &self.tracker
    }

    fn on_duplicate(&mut self, ack: Ack) -> Action {
        let dups = self.tracker.dup_count;
        log::debug!("[reno] duplicate {ack} (count: {dups})");

        if dups == DUP_ACK_THRESHOLD {
            self.window.enter_fast_recovery();
            self.fast_recoveries += 1;
            let lost = ack.next_expected();
            log::debug!(
                "[reno] fast retransmit {lost}; ssthresh={:.2} cwnd={:.2}",
                self.window.ssthresh,
                self.window.cwnd
            );
            return Action::Retransmit(lost);
        }

        if dups > DUP_ACK_THRESHOLD && self.window.in_fast_recovery() {
            self.window.inflate();
            log::debug!("[reno] fast recovery: inflating cwnd to {:.2}", self.window.cwnd);
        }
        Action::None
    }
}

impl CongestionControl for Reno {
    fn variant(&self) -> Variant {
        Variant::Reno
    }

    fn window(&self) -> &Window {
        &self.window
    }

    fn on_ack(&mut self, ack: Ack, flight: &mut SendState) -> Action {
        let action = if self.tracker.observe(ack) {
            self.on_duplicate(ack)
        } else {
            if self.window.in_fast_recovery() {
                self.window.exit_fast_recovery();
                log::debug!("[reno] exiting fast recovery, cwnd={:.2}", self.window.cwnd);
            }
            Action::None
        };

        let acked = acknowledge_and_grow(&mut self.window, ack, flight);
        if !acked.is_empty() {
            log::debug!(
                "[reno] {ack} acknowledged {} segment(s); cwnd={:.2} ssthresh={:.2}",
                acked.count(),
                self.window.cwnd,
                self.window.ssthresh
            );
        }
        action
    }

    fn on_timeout(&mut self, flight: &SendState) -> Action {
        self.window.reset_on_timeout();
        self.tracker.dup_count = 0;
        let action = timeout_action(flight);
        log::debug!(
            "[reno] timeout, slow start; ssthresh={:.2} cwnd={:.2} -> {action:?}",
            self.window.ssthresh,
            self.window.cwnd
        );
        action
    }

    fn fast_recoveries(&self) -> u32 {
        self.fast_recoveries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Phase;

    /// Reno that has already seen `ACK:5` as a new frontier, with segments
    /// `6..14` outstanding.
    fn primed(cwnd: f64, ssthresh: f64) -> (Reno, SendState) {
        let mut cc = Reno::new(Window::new(cwnd, ssthresh));
        let mut flight = SendState::new(100);
        for seq in 6..14 {
            flight.record_sent(seq);
        }
        // Covers nothing outstanding, so no growth.
        assert_eq!(cc.on_ack(Ack::new(Some(5)), &mut flight), Action::None);
        assert_eq!(cc.window().cwnd, cwnd);
        (cc, flight)
    }

    #[test]
    fn third_duplicate_triggers_fast_retransmit() {
        let (mut cc, mut flight) = primed(8.0, 16.0);
        let five = Ack::new(Some(5));

        assert_eq!(cc.on_ack(five, &mut flight), Action::None);
        assert_eq!(cc.on_ack(five, &mut flight), Action::None);
        assert_eq!(cc.window().cwnd, 8.0);

        assert_eq!(cc.on_ack(five, &mut flight), Action::Retransmit(6));
        assert_eq!(cc.window().ssthresh, 4.0);
        assert_eq!(cc.window().cwnd, 7.0);
        assert_eq!(cc.window().phase(), Phase::FastRecovery);
        assert_eq!(cc.fast_recoveries(), 1);
    }

    #[test]
    fn later_duplicates_inflate_without_retransmitting() {
        let (mut cc, mut flight) = primed(8.0, 16.0);
        let five = Ack::new(Some(5));
        for _ in 0..3 {
            cc.on_ack(five, &mut flight);
        }
        for expected in [8.0, 9.0, 10.0] {
            assert_eq!(cc.on_ack(five, &mut flight), Action::None);
            assert_eq!(cc.window().cwnd, expected);
        }
        assert_eq!(cc.window().ssthresh, 4.0);
        assert_eq!(cc.fast_recoveries(), 1);
    }

    #[test]
    fn new_ack_deflates_before_growth() {
        let (mut cc, mut flight) = primed(8.0, 16.0);
        let five = Ack::new(Some(5));
        for _ in 0..5 {
            cc.on_ack(five, &mut flight);
        }
        assert_eq!(cc.window().cwnd, 9.0);

        assert_eq!(cc.on_ack(Ack::new(Some(9)), &mut flight), Action::None);
        // Deflated to ssthresh = 4, then congestion avoidance adds 1/4.
        assert_eq!(cc.window().cwnd, 4.25);
        assert!(!cc.window().in_fast_recovery());
        assert_eq!(cc.tracker().dup_count, 0);
        assert_eq!(flight.oldest_in_flight(), Some(10));
    }

    #[test]
    fn slow_start_doubling_matches_tahoe() {
        let mut cc = Reno::new(Window::new(1.0, 16.0));
        let mut flight = SendState::new(100);
        for seq in 0..8 {
            flight.record_sent(seq);
        }
        for (frontier, expected) in [(0, 2.0), (1, 4.0), (2, 8.0)] {
            cc.on_ack(Ack::new(Some(frontier)), &mut flight);
            assert_eq!(cc.window().cwnd, expected);
        }
    }

    #[test]
    fn missing_first_segment_is_fast_retransmitted() {
        let mut cc = Reno::new(Window::new(4.0, 16.0));
        let mut flight = SendState::new(100);
        for seq in 0..4 {
            flight.record_sent(seq);
        }
        let none = Ack::new(None);
        // The tracker starts at the empty frontier, so these are duplicates.
        assert_eq!(cc.on_ack(none, &mut flight), Action::None);
        assert_eq!(cc.on_ack(none, &mut flight), Action::None);
        assert_eq!(cc.on_ack(none, &mut flight), Action::Retransmit(0));
        assert_eq!(cc.window().cwnd, 5.0);
    }

    #[test]
    fn timeout_abandons_fast_recovery() {
        let (mut cc, mut flight) = primed(8.0, 16.0);
        let five = Ack::new(Some(5));
        for _ in 0..4 {
            cc.on_ack(five, &mut flight);
        }
        assert_eq!(cc.window().cwnd, 8.0);

        assert_eq!(cc.on_timeout(&flight), Action::Retransmit(6));
        assert_eq!(cc.window().ssthresh, 4.0);
        assert_eq!(cc.window().cwnd, 1.0);
        assert!(!cc.window().in_fast_recovery());
        assert_eq!(cc.tracker().dup_count, 0);
    }

    #[test]
    fn duplicates_after_timeout_start_a_new_episode() {
        let (mut cc, mut flight) = primed(8.0, 16.0);
        let five = Ack::new(Some(5));
        cc.on_timeout(&flight);
        assert_eq!(cc.on_ack(five, &mut flight), Action::None);
        assert_eq!(cc.on_ack(five, &mut flight), Action::None);
        assert_eq!(cc.on_ack(five, &mut flight), Action::Retransmit(6));
        assert_eq!(cc.window().ssthresh, 2.0);
        assert_eq!(cc.window().cwnd, 5.0);
        assert_eq!(cc.fast_recoveries(), 1);
    }
}

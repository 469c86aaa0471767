//! Receive-side cumulative-acknowledgement state machine.
//!
//! [`Receiver`] keeps the highest sequence number below which nothing is
//! missing (the frontier) and buffers segments that arrived past a gap.
//! After every accepted segment the caller sends back an ACK carrying the
//! frontier, never a per-segment acknowledgement:
//!
//! | Arrival                  | Effect                                   | ACK           |
//! |--------------------------|------------------------------------------|---------------|
//! | `seq <= frontier`        | none                                     | frontier      |
//! | `seq == frontier + 1`    | advance, then drain the buffered run     | new frontier  |
//! | `seq >  frontier + 1`    | buffer `seq`                             | frontier (dup)|
//!
//! Loss simulation is layered on top in [`crate::simulator::LossyReceiver`];
//! all socket I/O is the caller's responsibility.

use std::collections::BTreeSet;

use crate::packet::Ack;

#[derive(Debug, Default)]
pub struct Receiver {
    /// Highest in-order sequence number, `None` until `0` arrives.
    last_acknowledged: Option<u32>,
    /// Segments received past a gap.
    out_of_order: BTreeSet<u32>,
}

impl Receiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one accepted segment and return the ACK to send.
    pub fn on_segment(&mut self, seq: u32) -> Ack {
        let expected = self.ack().next_expected();

        if self.ack().covers(seq) {
            log::trace!("[receiver] duplicate segment {seq}");
        } else if seq == expected {
            let mut frontier = seq;
            while frontier
                .checked_add(1)
                .is_some_and(|next| self.out_of_order.remove(&next))
            {
                frontier += 1;
            }
            self.last_acknowledged = Some(frontier);
            log::trace!("[receiver] acknowledged up to {frontier}");
        } else {
            self.out_of_order.insert(seq);
            log::trace!("[receiver] out-of-order segment {seq} buffered");
        }
        self.ack()
    }

    /// Cumulative ACK for the current frontier.
    pub fn ack(&self) -> Ack {
        Ack::new(self.last_acknowledged)
    }

    pub fn last_acknowledged(&self) -> Option<u32> {
        self.last_acknowledged
    }

    pub fn buffered(&self) -> usize {
        self.out_of_order.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state() {
        let r = Receiver::new();
        assert_eq!(r.last_acknowledged(), None);
        assert_eq!(r.ack(), Ack::new(None));
        assert_eq!(r.buffered(), 0);
    }

    #[test]
    fn in_order_segments_advance_frontier() {
        let mut r = Receiver::new();
        for seq in 0..5 {
            assert_eq!(r.on_segment(seq), Ack::new(Some(seq)));
        }
    }

    #[test]
    fn gap_produces_duplicate_acks() {
        let mut r = Receiver::new();
        r.on_segment(0);
        r.on_segment(1);
        // 2 is missing.
        for seq in [3, 4, 5] {
            assert_eq!(r.on_segment(seq), Ack::new(Some(1)));
        }
        assert_eq!(r.buffered(), 3);
    }

    #[test]
    fn filling_gap_consolidates_buffered_run() {
        let mut r = Receiver::new();
        r.on_segment(0);
        for seq in [2, 3, 5] {
            r.on_segment(seq);
        }
        assert_eq!(r.on_segment(1), Ack::new(Some(3)));
        assert_eq!(r.buffered(), 1);
        assert_eq!(r.on_segment(4), Ack::new(Some(5)));
        assert_eq!(r.buffered(), 0);
    }

    #[test]
    fn missing_first_segment_reports_empty_frontier() {
        let mut r = Receiver::new();
        assert_eq!(r.on_segment(1), Ack::new(None));
        assert_eq!(r.on_segment(2), Ack::new(None));
        assert_eq!(r.on_segment(0), Ack::new(Some(2)));
    }

    #[test]
    fn resending_old_segment_never_moves_frontier_back() {
        let mut r = Receiver::new();
        for seq in 0..4 {
            r.on_segment(seq);
        }
        for old in [0, 2, 3] {
            assert_eq!(r.on_segment(old), Ack::new(Some(3)));
        }
        assert_eq!(r.last_acknowledged(), Some(3));
    }

    #[test]
    fn frontier_is_largest_contiguous_prefix() {
        // Arbitrary arrival order with repeats.
        let arrivals = [4, 1, 7, 0, 4, 2, 6, 9, 3, 1, 5];
        let mut r = Receiver::new();
        let mut seen = BTreeSet::new();
        let mut previous: Option<u32> = None;
        for seq in arrivals {
            seen.insert(seq);
            let ack = r.on_segment(seq);
            assert!(ack.frontier >= previous, "frontier went backwards");
            previous = ack.frontier;

            let contiguous = (0u32..).take_while(|s| seen.contains(s)).last();
            assert_eq!(ack.frontier, contiguous);
        }
        assert_eq!(r.last_acknowledged(), Some(7));
    }
}

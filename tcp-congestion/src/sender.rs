//! Send-side bookkeeping for the segment sequence space `0 .. total`.
//!
//! [`SendState`] tracks which segments are in flight, which have been
//! acknowledged, and how many transmissions have happened in total.  It
//! makes no congestion decisions and does no I/O: controllers call
//! [`SendState::acknowledge_through`] and the session driver calls
//! [`SendState::record_sent`] around the socket.
//!
//! # Sequence-number layout
//!
//! ```text
//!   acknowledged        in flight          unsent
//!  ──────────────┼──────────────────┼──────────────────▶ seq space
//!                │ <── ≤ ⌊cwnd⌋ ──▶ │
//!                                next_seq            total
//! ```
//!
//! Invariant: a sequence number is never both in flight and acknowledged.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use crate::packet::Ack;
use crate::timer::RttEstimator;

/// A single in-flight segment.
#[derive(Debug, Clone)]
pub struct FlightEntry {
    /// Total number of times this segment has been transmitted.
    pub tx_count: u32,
    /// Wall-clock time of the most recent transmission.
    pub sent_at: Instant,
}

/// Result of applying one cumulative ACK.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Acked {
    /// Segments moved from in flight to acknowledged, ascending.
    pub seqs: Vec<u32>,
    /// RTT sample taken from the newest segment that was sent only once.
    pub rtt_sample: Option<Duration>,
}

impl Acked {
    pub fn count(&self) -> usize {
        self.seqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seqs.is_empty()
    }
}

#[derive(Debug)]
pub struct SendState {
    total: u32,
    /// Sequence number to use for the next new segment.
    next_seq: u32,
    in_flight: BTreeMap<u32, FlightEntry>,
    acknowledged: BTreeSet<u32>,
    /// Transmissions including retransmissions.
    sent: u64,
    rtt: RttEstimator,
}

impl SendState {
    pub fn new(total: u32) -> Self {
        Self {
            total,
            next_seq: 0,
            in_flight: BTreeMap::new(),
            acknowledged: BTreeSet::new(),
            sent: 0,
            rtt: RttEstimator::new(),
        }
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn next_seq(&self) -> u32 {
        self.next_seq
    }

    /// `true` while some sequence number has never been sent.
    pub fn has_unsent(&self) -> bool {
        self.next_seq < self.total
    }

    /// Claim the next unsent sequence number, if any.
    pub fn take_next(&mut self) -> Option<u32> {
        if !self.has_unsent() {
            return None;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        Some(seq)
    }

    /// Record one transmission of `seq`.
    ///
    /// A segment that is already acknowledged is counted as sent but does not
    /// re-enter the in-flight set.
    pub fn record_sent(&mut self, seq: u32) {
        self.sent += 1;
        if self.acknowledged.contains(&seq) {
            return;
        }
        let now = Instant::now();
        self.in_flight
            .entry(seq)
            .and_modify(|e| {
                e.tx_count += 1;
                e.sent_at = now;
            })
            .or_insert(FlightEntry {
                tx_count: 1,
                sent_at: now,
            });
    }

    /// Move every in-flight segment covered by `ack` to the acknowledged set.
    ///
    /// Returns an empty [`Acked`] for a duplicate ACK or one that covers
    /// nothing outstanding.
    pub fn acknowledge_through(&mut self, ack: Ack) -> Acked {
        let Some(frontier) = ack.frontier else {
            return Acked::default();
        };

        let still_in_flight = match frontier.checked_add(1) {
            Some(split) => self.in_flight.split_off(&split),
            None => BTreeMap::new(),
        };
        let covered = std::mem::replace(&mut self.in_flight, still_in_flight);

        let now = Instant::now();
        let mut acked = Acked::default();
        for (seq, entry) in covered {
            // Karn's rule: retransmitted segments give ambiguous samples.
            if entry.tx_count == 1 {
                acked.rtt_sample = Some(now.saturating_duration_since(entry.sent_at));
            }
            self.acknowledged.insert(seq);
            acked.seqs.push(seq);
        }
        if let Some(sample) = acked.rtt_sample {
            self.rtt.record_sample(sample);
        }
        acked
    }

    /// Oldest outstanding segment.
    pub fn oldest_in_flight(&self) -> Option<u32> {
        self.in_flight.keys().next().copied()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_in_flight(&self, seq: u32) -> bool {
        self.in_flight.contains_key(&seq)
    }

    pub fn has_unacked(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Transmission count of an in-flight segment, `0` if not in flight.
    pub fn tx_count(&self, seq: u32) -> u32 {
        self.in_flight.get(&seq).map_or(0, |e| e.tx_count)
    }

    pub fn acknowledged(&self) -> usize {
        self.acknowledged.len()
    }

    pub fn is_acknowledged(&self, seq: u32) -> bool {
        self.acknowledged.contains(&seq)
    }

    /// Every segment of the sequence space has been acknowledged.
    pub fn is_complete(&self) -> bool {
        self.acknowledged.len() as u64 >= u64::from(self.total)
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn rtt(&self) -> &RttEstimator {
        &self.rtt
    }
}

//! Round-trip-time estimation.
//!
//! The receive timeout of a session is fixed, so nothing here arms a timer.
//! [`RttEstimator`] only keeps the smoothed estimate that the report and the
//! telemetry stream show, using Jacobson's algorithm (RFC 6298 §2).
//!
//! Samples must come from segments transmitted exactly once (Karn's rule);
//! [`crate::sender::SendState`] enforces that before calling in.

use std::time::Duration;

/// Smoothed RTT and variance.
#[derive(Debug, Clone, Default)]
pub struct RttEstimator {
    /// Smoothed RTT estimate (SRTT).
    srtt: Option<Duration>,
    /// RTT variance estimate (RTTVAR).
    rttvar: Option<Duration>,
    /// Most recent raw sample.
    latest: Option<Duration>,
    samples: u64,
}

impl RttEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new RTT sample and update SRTT / RTTVAR.
    ///
    /// On the first sample:  SRTT = R,  RTTVAR = R/2.
    /// Subsequent samples:   RTTVAR = 3/4·RTTVAR + 1/4·|SRTT − R|
    ///                       SRTT   = 7/8·SRTT   + 1/8·R
    pub fn record_sample(&mut self, sample: Duration) {
        match (self.srtt, self.rttvar) {
            (Some(srtt), Some(rttvar)) => {
                let diff = sample.abs_diff(srtt);
                self.rttvar = Some(rttvar * 3 / 4 + diff / 4);
                self.srtt = Some(srtt * 7 / 8 + sample / 8);
            }
            _ => {
                self.srtt = Some(sample);
                self.rttvar = Some(sample / 2);
            }
        }
        self.latest = Some(sample);
        self.samples += 1;
    }

    pub fn srtt(&self) -> Option<Duration> {
        self.srtt
    }

    pub fn rttvar(&self) -> Option<Duration> {
        self.rttvar
    }

    pub fn latest(&self) -> Option<Duration> {
        self.latest
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }
}

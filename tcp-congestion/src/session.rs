//! Session driver: one sender pushing `0 .. total_packets` through a
//! congestion controller.
//!
//! # Architecture
//!
//! ```text
//!  Observer                          SessionHandle (spawned mode)
//!      ▲  Telemetry                   ┌────────────────────────┐
//!      └──────────────────────────────│ events   (mpsc)        │
//!                                     │ stop     (watch)       │
//!                                     └───────────┬────────────┘
//!                                                 │ tokio task
//!  Session<T: Transport>                          │
//!    ├── Box<dyn CongestionControl>  (Tahoe/Reno) │
//!    ├── SendState   (in flight, acknowledged)    │
//!    └── T           (UDP or loopback) ───────────┘
//! ```
//!
//! Each [`Session::step`] is one strictly sequential cycle:
//!
//! 1. send new segments while `in_flight < floor(cwnd)`;
//! 2. wait up to `recv_timeout` for one ACK;
//! 3. hand the ACK (or the timeout) to the controller;
//! 4. carry out the controller's [`Action`].
//!
//! The receive in step 2 is the only suspension point.  Stopping is
//! cooperative: a stop request is honoured before the next cycle.

use std::fmt;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::{ConfigError, SessionConfig, Variant};
use crate::congestion::{new_controller, Action, CongestionControl};
use crate::packet::Segment;
use crate::sender::SendState;
use crate::socket::TransportError;
use crate::state::Window;
use crate::telemetry::{sent_event, CongestionEvent, Rounds, Telemetry};
use crate::transport::Transport;

// ---------------------------------------------------------------------------
// Outcome / Report
// ---------------------------------------------------------------------------

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every segment was acknowledged.
    Completed,
    /// The retransmission ceiling was exceeded; the result is partial.
    RetransmitLimit,
    /// An external stop request ended the run.
    Stopped,
    /// A transport fault ended the run.
    Failed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Completed => "completed",
            Outcome::RetransmitLimit => "stopped after too many retransmissions",
            Outcome::Stopped => "stopped by request",
            Outcome::Failed => "transport fault",
        };
        f.write_str(s)
    }
}

/// Final summary of a session, produced however it ended.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub variant: Variant,
    pub outcome: Outcome,
    pub total_packets: u32,
    /// Transmissions including retransmissions.
    pub sent: u64,
    pub acknowledged: usize,
    pub retransmissions: u32,
    pub fast_recoveries: u32,
    pub final_cwnd: f64,
    pub final_ssthresh: f64,
    pub rounds: u32,
    pub elapsed: Duration,
    pub srtt: Option<Duration>,
}

impl Report {
    /// Acknowledged segments per transmission.
    pub fn goodput(&self) -> f64 {
        self.acknowledged as f64 / self.sent.max(1) as f64
    }

    /// Acknowledged segments per second.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.acknowledged as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} Results ({}):", self.variant, self.outcome)?;
        writeln!(
            f,
            "Sent: {}, Received: {}/{}, Retransmissions: {}",
            self.sent, self.acknowledged, self.total_packets, self.retransmissions
        )?;
        writeln!(
            f,
            "Final cwnd: {:.2}, Final ssthresh: {:.2}",
            self.final_cwnd, self.final_ssthresh
        )?;
        writeln!(f, "Throughput: {:.2} packets/sec", self.throughput())?;
        writeln!(f, "Goodput: {:.2}", self.goodput())?;
        if self.variant == Variant::Reno {
            writeln!(f, "Fast Recovery events: {}", self.fast_recoveries)?;
        }
        if let Some(srtt) = self.srtt {
            writeln!(f, "Smoothed RTT: {:.3} ms", srtt.as_secs_f64() * 1e3)?;
        }
        write!(
            f,
            "Total rounds: {}, Total time: {:.2} seconds",
            self.rounds,
            self.elapsed.as_secs_f64()
        )
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid session configuration: {0}")]
    Config(#[from] ConfigError),
    /// Fatal for this session; `report` holds what was achieved.
    #[error("transport fault: {source}")]
    Transport {
        source: TransportError,
        report: Box<Report>,
    },
    #[error("session task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl SessionError {
    /// Partial report of a session that died on a transport fault.
    pub fn report(&self) -> Option<&Report> {
        match self {
            SessionError::Transport { report, .. } => Some(report),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Result of one [`Session::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Finished(Outcome),
}

pub struct Session<T> {
    config: SessionConfig,
    transport: T,
    cc: Box<dyn CongestionControl>,
    flight: SendState,
    rounds: Rounds,
    /// Loss-recovery events acted upon (timeouts and fast retransmits).
    retransmissions: u32,
    started: Option<Instant>,
    telemetry: Option<mpsc::UnboundedSender<Telemetry>>,
}

impl<T: Transport> Session<T> {
    pub fn new(config: SessionConfig, transport: T) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            cc: new_controller(&config),
            flight: SendState::new(config.total_packets),
            config,
            transport,
            rounds: Rounds::default(),
            retransmissions: 0,
            started: None,
            telemetry: None,
        })
    }

    /// Push progress events into `tx`.
    pub fn with_telemetry(mut self, tx: mpsc::UnboundedSender<Telemetry>) -> Self {
        self.telemetry = Some(tx);
        self
    }

    pub fn window(&self) -> &Window {
        self.cc.window()
    }

    pub fn flight(&self) -> &SendState {
        &self.flight
    }

    pub fn retransmissions(&self) -> u32 {
        self.retransmissions
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run one send/receive/update cycle.
    pub async fn step(&mut self) -> Result<Step, TransportError> {
        self.started.get_or_insert_with(Instant::now);

        if self.flight.is_complete() {
            return Ok(Step::Finished(Outcome::Completed));
        }

        self.rounds.begin_burst();
        while self.flight.in_flight() < self.cc.window().allowed_in_flight() {
            let Some(seq) = self.flight.take_next() else {
                break;
            };
            self.transmit(seq, false).await?;
        }

        if !self.flight.has_unacked() && !self.flight.has_unsent() {
            return Ok(Step::Finished(Outcome::Completed));
        }

        match self.transport.recv(self.config.recv_timeout).await? {
            Some(ack) => {
                let samples = self.flight.rtt().samples();
                let action = match self.cc.on_ack(ack, &mut self.flight) {
                    Action::Retransmit(seq) if seq >= self.flight.next_seq() => {
                        log::debug!("[session] {ack}: segment {seq} was never sent");
                        Action::None
                    }
                    action => action,
                };
                if self.flight.rtt().samples() > samples {
                    self.emit_rtt_sample();
                }
                if let Action::Retransmit(_) = action {
                    // The controller has already entered fast recovery; a
                    // refused retransmit leaves that window in the report.
                    if self.ceiling_reached() {
                        return Ok(Step::Finished(Outcome::RetransmitLimit));
                    }
                    self.retransmissions += 1;
                    self.emit_congestion(CongestionEvent::FastRetransmit);
                }
                self.execute(action).await?;
            }
            None => {
                if self.ceiling_reached() {
                    return Ok(Step::Finished(Outcome::RetransmitLimit));
                }
                self.retransmissions += 1;
                let action = self.cc.on_timeout(&self.flight);
                self.emit_congestion(CongestionEvent::Timeout);
                self.execute(action).await?;
            }
        }

        if self.flight.is_complete() {
            return Ok(Step::Finished(Outcome::Completed));
        }
        Ok(Step::Continue)
    }

    /// Run to completion.
    pub async fn run(self) -> Result<Report, SessionError> {
        let (_stop, stop_rx) = watch::channel(false);
        self.run_until_stopped(stop_rx).await
    }

    /// Run until done or until `stop` carries `true`.
    pub async fn run_until_stopped(
        mut self,
        stop: watch::Receiver<bool>,
    ) -> Result<Report, SessionError> {
        log::info!(
            "[session] {} starting: {} packets, cwnd={} ssthresh={}",
            self.config.variant,
            self.config.total_packets,
            self.config.initial_cwnd,
            self.config.initial_ssthresh
        );
        loop {
            let stopped = *stop.borrow();
            if stopped {
                return Ok(self.finish(Outcome::Stopped));
            }
            match self.step().await {
                Ok(Step::Continue) => {}
                Ok(Step::Finished(outcome)) => return Ok(self.finish(outcome)),
                Err(source) => {
                    log::error!("[session] {}: {source}", self.config.variant);
                    let report = Box::new(self.finish(Outcome::Failed));
                    return Err(SessionError::Transport { source, report });
                }
            }
        }
    }

    /// Snapshot of the counters so far.
    pub fn report(&self, outcome: Outcome) -> Report {
        let window = self.cc.window();
        Report {
            variant: self.cc.variant(),
            outcome,
            total_packets: self.config.total_packets,
            sent: self.flight.sent(),
            acknowledged: self.flight.acknowledged(),
            retransmissions: self.retransmissions,
            fast_recoveries: self.cc.fast_recoveries(),
            final_cwnd: window.cwnd,
            final_ssthresh: window.ssthresh,
            rounds: self.rounds.current(),
            elapsed: self.started.map(|t| t.elapsed()).unwrap_or_default(),
            srtt: self.flight.rtt().srtt(),
        }
    }

    fn finish(&mut self, outcome: Outcome) -> Report {
        let report = self.report(outcome);
        log::info!(
            "[session] {} {}: {}/{} acknowledged, {} sent, {} retransmissions",
            report.variant,
            outcome,
            report.acknowledged,
            report.total_packets,
            report.sent,
            report.retransmissions
        );
        self.emit(Telemetry::Finished(report.clone()));
        report
    }

    async fn execute(&mut self, action: Action) -> Result<(), TransportError> {
        match action {
            Action::None => {}
            Action::Retransmit(seq) => self.transmit(seq, true).await?,
            Action::SendNext => {
                if let Some(seq) = self.flight.take_next() {
                    self.transmit(seq, false).await?;
                }
            }
        }
        Ok(())
    }

    async fn transmit(&mut self, seq: u32, retransmission: bool) -> Result<(), TransportError> {
        self.transport.send(Segment::new(seq)).await?;
        self.cc.on_send(&mut self.flight, seq);
        log::trace!(
            "[session] {} segment {seq}, cwnd={:.2}",
            if retransmission { "resent" } else { "sent" },
            self.cc.window().cwnd
        );
        let event = sent_event(&mut self.rounds, seq, self.cc.window(), retransmission);
        self.emit(event);
        Ok(())
    }

    /// `true` once `max_retransmissions` loss-recovery events were acted on.
    fn ceiling_reached(&self) -> bool {
        let reached = self.retransmissions >= self.config.max_retransmissions;
        if reached {
            log::warn!(
                "[session] {}: exiting due to excessive retransmissions ({})",
                self.config.variant,
                self.retransmissions
            );
        }
        reached
    }

    fn emit_congestion(&mut self, event: CongestionEvent) {
        let window = *self.cc.window();
        self.emit(Telemetry::Congestion {
            round: self.rounds.current(),
            event,
            cwnd: window.cwnd,
            ssthresh: window.ssthresh,
        });
    }

    fn emit_rtt_sample(&mut self) {
        let rtt = self.flight.rtt();
        if let (Some(sample), Some(srtt)) = (rtt.latest(), rtt.srtt()) {
            self.emit(Telemetry::RttSample {
                round: self.rounds.current(),
                rtt: sample,
                srtt,
            });
        }
    }

    fn emit(&mut self, event: Telemetry) {
        if let Some(tx) = &self.telemetry {
            if tx.send(event).is_err() {
                // Observer went away; keep running without it.
                self.telemetry = None;
            }
        }
    }
}

impl<T: Transport + Send + 'static> Session<T> {
    /// Run on a dedicated tokio task and return a [`SessionHandle`].
    pub fn spawn(self) -> SessionHandle {
        let (events_tx, events) = mpsc::unbounded_channel();
        let (stop, stop_rx) = watch::channel(false);
        let session = self.with_telemetry(events_tx);
        let handle = tokio::spawn(session.run_until_stopped(stop_rx));
        SessionHandle {
            events,
            stop,
            handle,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// Handle returned by [`Session::spawn`].
pub struct SessionHandle {
    /// Telemetry pushed by the session task.  Ends after `Finished`.
    pub events: mpsc::UnboundedReceiver<Telemetry>,
    stop: watch::Sender<bool>,
    handle: JoinHandle<Result<Report, SessionError>>,
}

impl SessionHandle {
    /// Ask the session to stop before its next cycle.
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }

    /// Next telemetry event, `None` once the session is gone.
    pub async fn next_event(&mut self) -> Option<Telemetry> {
        self.events.recv().await
    }

    /// Wait for the session task and return its report.
    pub async fn join(self) -> Result<Report, SessionError> {
        self.handle.await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::{LossModel, LossyReceiver};
    use crate::transport::LoopbackTransport;

    fn lossless() -> LoopbackTransport {
        LoopbackTransport::new(LossyReceiver::new(LossModel::new(0.0, Some(0))))
    }

    fn config(variant: Variant, total_packets: u32) -> SessionConfig {
        SessionConfig {
            variant,
            total_packets,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn goodput_guards_against_zero_sent() {
        let session = Session::new(config(Variant::Tahoe, 5), lossless()).unwrap();
        let report = session.report(Outcome::Stopped);
        assert_eq!(report.sent, 0);
        assert_eq!(report.goodput(), 0.0);
        assert_eq!(report.throughput(), 0.0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let bad = SessionConfig {
            total_packets: 0,
            ..SessionConfig::default()
        };
        assert!(matches!(
            Session::new(bad, lossless()),
            Err(ConfigError::NoPackets)
        ));
    }

    #[tokio::test]
    async fn first_step_sends_one_segment() {
        let mut session = Session::new(config(Variant::Reno, 10), lossless()).unwrap();
        assert_eq!(session.step().await.unwrap(), Step::Continue);
        assert_eq!(session.flight().sent(), 1);
        assert_eq!(session.flight().acknowledged(), 1);
        assert_eq!(session.window().cwnd, 2.0);
    }

    #[tokio::test]
    async fn stepping_reaches_completion() {
        let mut session = Session::new(config(Variant::Tahoe, 10), lossless()).unwrap();
        let mut steps = 0;
        while session.step().await.unwrap() == Step::Continue {
            steps += 1;
            assert!(steps < 100, "session did not converge");
        }
        assert!(session.flight().is_complete());
        assert_eq!(session.retransmissions(), 0);
    }

    #[tokio::test]
    async fn stop_before_first_cycle_sends_nothing() {
        let session = Session::new(config(Variant::Reno, 10), lossless()).unwrap();
        let (stop, stop_rx) = watch::channel(true);
        let report = session.run_until_stopped(stop_rx).await.unwrap();
        drop(stop);
        assert_eq!(report.outcome, Outcome::Stopped);
        assert_eq!(report.sent, 0);
    }

    #[test]
    fn report_renders_like_a_summary() {
        let report = Report {
            variant: Variant::Reno,
            outcome: Outcome::Completed,
            total_packets: 10,
            sent: 12,
            acknowledged: 10,
            retransmissions: 2,
            fast_recoveries: 1,
            final_cwnd: 4.25,
            final_ssthresh: 4.0,
            rounds: 6,
            elapsed: Duration::from_secs(2),
            srtt: None,
        };
        let text = report.to_string();
        assert!(text.starts_with("TCP Reno Results (completed):"));
        assert!(text.contains("Sent: 12, Received: 10/10, Retransmissions: 2"));
        assert!(text.contains("Throughput: 5.00 packets/sec"));
        assert!(text.contains("Goodput: 0.83"));
        assert!(text.contains("Fast Recovery events: 1"));
        assert!(text.ends_with("Total rounds: 6, Total time: 2.00 seconds"));
    }
}

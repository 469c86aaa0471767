//! `tcp-congestion`: TCP Tahoe and Reno congestion control simulated over UDP.
//!
//! # Architecture
//!
//! ```text
//!  ┌───────────────┐  segments  ┌──────────────────┐
//!  │ Session       │───────────▶│ ReceiverServer   │
//!  │  (driver)     │            │  LossyReceiver   │
//!  └──┬─────────┬──┘◀───────────└──────────────────┘
//!     │         │      ACKs
//!     │   ┌─────▼──────────────────────┐
//!     │   │ CongestionControl          │
//!     │   │  Tahoe | Reno   (Window)   │
//!     │   └────────────────────────────┘
//!     │ Transport (UDP or in-memory loopback)
//!  ┌──▼────────┐
//!  │  Socket   │  (thin async wrapper around tokio UdpSocket)
//!  └───────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`packet`]      wire format of segments and ACKs
//! - [`state`]       congestion window value type and its transitions
//! - [`congestion`]  controller trait and variant selection
//! - [`tahoe`]       TCP Tahoe controller
//! - [`reno`]        TCP Reno controller (fast retransmit / fast recovery)
//! - [`sender`]      in-flight and acknowledged bookkeeping
//! - [`timer`]       RTT estimation
//! - [`receiver`]    cumulative-ACK receiver with out-of-order buffer
//! - [`simulator`]   probabilistic loss in front of the receiver
//! - [`session`]     the send / receive / update loop
//! - [`telemetry`]   progress events for an external observer
//! - [`transport`]   sender-side channel abstraction
//! - [`server`]      UDP receiver endpoint
//! - [`socket`]      async UDP socket abstraction
//! - [`config`]      session and receiver parameters

pub mod config;
pub mod congestion;
pub mod packet;
pub mod receiver;
pub mod reno;
pub mod sender;
pub mod server;
pub mod session;
pub mod simulator;
pub mod socket;
pub mod state;
pub mod tahoe;
pub mod telemetry;
pub mod timer;
pub mod transport;

pub use config::{ReceiverConfig, SessionConfig, Variant};
pub use session::{Outcome, Report, Session, SessionError, SessionHandle};

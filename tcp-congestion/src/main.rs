//! Entry point for `tcp-congestion`.
//!
//! Parses CLI arguments and dispatches into **receiver**, **sender** or
//! **simulate** mode.  All protocol work is delegated to library modules;
//! `main.rs` owns only process setup (logging, signal handling, argument
//! parsing).

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio::sync::watch;

use tcp_congestion::server::ReceiverServer;
use tcp_congestion::transport::UdpTransport;
use tcp_congestion::{ReceiverConfig, Report, Session, SessionConfig, Variant};

/// TCP Tahoe / Reno congestion control over UDP.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Run the loss-simulating receiver until Ctrl-C.
    Receiver {
        /// Local address to bind.
        #[arg(short, long, default_value = "127.0.0.1:12345")]
        bind: SocketAddr,
        #[command(flatten)]
        loss: LossArgs,
    },
    /// Run one sender session against a running receiver.
    Sender {
        /// Receiver address.
        #[arg(short, long, default_value = "127.0.0.1:12345")]
        server: SocketAddr,
        #[arg(short, long, value_enum, default_value_t = Variant::Reno)]
        variant: Variant,
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Run Tahoe and Reno side by side, each against its own local receiver.
    Simulate {
        #[command(flatten)]
        session: SessionArgs,
        #[command(flatten)]
        loss: LossArgs,
    },
}

#[derive(Args)]
struct SessionArgs {
    /// Number of segments to deliver.
    #[arg(short, long, default_value_t = 100)]
    packets: u32,
    /// Initial congestion window.
    #[arg(long, default_value_t = 1.0)]
    cwnd: f64,
    /// Initial slow-start threshold.
    #[arg(long, default_value_t = 16.0)]
    ssthresh: f64,
    /// Receive timeout per ACK, in milliseconds.
    #[arg(long, default_value_t = 500)]
    timeout_ms: u64,
    /// Loss-recovery events tolerated before giving up.
    #[arg(long, default_value_t = 50)]
    max_retransmissions: u32,
    /// Print every telemetry event.
    #[arg(long)]
    trace: bool,
}

impl SessionArgs {
    fn config(&self, variant: Variant) -> SessionConfig {
        SessionConfig {
            variant,
            total_packets: self.packets,
            initial_cwnd: self.cwnd,
            initial_ssthresh: self.ssthresh,
            recv_timeout: Duration::from_millis(self.timeout_ms),
            max_retransmissions: self.max_retransmissions,
        }
    }
}

#[derive(Args)]
struct LossArgs {
    /// Probability of dropping each inbound segment (0.0 - 0.9).
    #[arg(short, long, default_value_t = 0.1)]
    loss_rate: f64,
    /// Seed for the loss model; random when omitted.
    #[arg(long)]
    seed: Option<u64>,
}

impl LossArgs {
    fn config(&self) -> ReceiverConfig {
        ReceiverConfig {
            loss_rate: self.loss_rate,
            seed: self.seed,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();

    let (stop_tx, stop) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Ctrl-C received, stopping");
            let _ = stop_tx.send(true);
        }
    });

    match cli.mode {
        Mode::Receiver { bind, loss } => {
            let server = ReceiverServer::bind(bind, &loss.config()).await?;
            let stats = server.serve(stop).await?;
            println!(
                "Received: {}, Dropped: {}, ACKs sent: {}",
                stats.received, stats.dropped, stats.acks_sent
            );
        }
        Mode::Sender {
            server,
            variant,
            session,
        } => {
            let report = run_sender(server, session.config(variant), session.trace, stop).await?;
            println!("{report}");
        }
        Mode::Simulate { session, loss } => {
            let (tahoe, reno) = tokio::try_join!(
                simulate(Variant::Tahoe, &session, &loss, stop.clone()),
                simulate(Variant::Reno, &session, &loss, stop),
            )?;
            println!("{tahoe}\n\n{reno}");
        }
    }
    Ok(())
}

async fn run_sender(
    server: SocketAddr,
    config: SessionConfig,
    trace: bool,
    mut stop: watch::Receiver<bool>,
) -> anyhow::Result<Report> {
    let variant = config.variant;
    let transport = UdpTransport::connect(server)
        .await
        .with_context(|| format!("binding sender socket for {server}"))?;
    let mut handle = Session::new(config, transport)?.spawn();

    let mut watching = true;
    loop {
        tokio::select! {
            event = handle.next_event() => match event {
                Some(event) if trace => println!("[{variant}] {event}"),
                Some(_) => {}
                None => break,
            },
            changed = stop.changed(), if watching => match changed {
                Ok(()) if *stop.borrow() => {
                    handle.stop();
                    watching = false;
                }
                Ok(()) => {}
                Err(_) => watching = false,
            },
        }
    }
    Ok(handle.join().await?)
}

/// One receiver on an ephemeral loopback port plus one session against it.
async fn simulate(
    variant: Variant,
    session: &SessionArgs,
    loss: &LossArgs,
    stop: watch::Receiver<bool>,
) -> anyhow::Result<Report> {
    let server = ReceiverServer::bind(SocketAddr::from(([127, 0, 0, 1], 0)), &loss.config()).await?;
    let addr = server.local_addr();
    let (server_stop, server_stop_rx) = watch::channel(false);
    let serving = tokio::spawn(server.serve(server_stop_rx));

    let report = run_sender(addr, session.config(variant), session.trace, stop).await;

    let _ = server_stop.send(true);
    let stats = serving.await??;
    log::info!(
        "[{variant}] receiver: {} received, {} dropped",
        stats.received,
        stats.dropped
    );
    report
}

//! 可靠 UDP 发送端
//!
//! 把一个文件通过 UDP 发给接收端（累计 ACK + fin 终止握手），结束后打印传输指标。

use std::fs;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use rdt_rs::cc::Policy;
use rdt_rs::config::{ConfigFile, DEFAULT_HOST, DEFAULT_PORT, SenderConfig};
use rdt_rs::metrics::MetricsSummary;
use rdt_rs::net::UdpLink;
use rdt_rs::payload::PayloadSource;
use rdt_rs::sender::Sender;
use rdt_rs::{Error, Result};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    name = "rdt-send",
    about = "Send a file over UDP with cumulative ACKs and a pluggable congestion-control policy"
)]
struct Args {
    /// Receiver host
    #[arg(long, env = "RECEIVER_HOST")]
    host: Option<String>,

    /// Receiver UDP port
    #[arg(long, env = "RECEIVER_PORT")]
    port: Option<u16>,

    /// Payload file; falls back to $TEST_FILE, then $PAYLOAD_FILE
    #[arg(long)]
    payload: Option<PathBuf>,

    /// stop-and-wait, fixed-window, tahoe or tahoe-vegas
    #[arg(long)]
    policy: Option<Policy>,

    /// JSON config file; command-line flags take precedence over it
    #[arg(long)]
    config: Option<PathBuf>,

    /// ACK timeout (ms); defaults depend on the policy
    #[arg(long)]
    ack_timeout_ms: Option<u64>,

    /// Window size for fixed-window (segments)
    #[arg(long)]
    window: Option<usize>,

    /// Pause before the first datagram (ms)
    #[arg(long)]
    start_delay_ms: Option<u64>,

    /// Keep answering repeated fin for this long after FIN/ACK (ms)
    #[arg(long)]
    fin_linger_ms: Option<u64>,

    /// Write the raw report and derived metrics as JSON
    #[arg(long)]
    report_json: Option<PathBuf>,

    /// Record congestion-window samples into the JSON report
    #[arg(long, default_value_t = false)]
    cwnd_trace: bool,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    report: &'a rdt_rs::sender::TransferReport,
    metrics: &'a MetricsSummary,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    let label = args.policy.map_or("rdt", Policy::name);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{label} sender error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let file = match &args.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };

    let policy = args.policy.or(file.policy).unwrap_or_default();
    let mut cfg = SenderConfig::for_policy(policy);
    cfg.apply_file(&file);
    if let Some(ms) = args.ack_timeout_ms {
        cfg.ack_timeout = Duration::from_millis(ms);
    }
    if let Some(w) = args.window {
        cfg.fixed_window = w;
    }
    if let Some(ms) = args.start_delay_ms {
        cfg.start_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = args.fin_linger_ms {
        cfg.fin_linger = Duration::from_millis(ms);
    }
    cfg.record_cwnd |= args.cwnd_trace;

    let host = args
        .host
        .or_else(|| file.host.clone())
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = args.port.or(file.port).unwrap_or(DEFAULT_PORT);
    cfg.receiver = resolve(&host, port)?;
    cfg.validate()?;

    let (path, payload) = PayloadSource::from_env(args.payload).load()?;
    info!(
        receiver = %cfg.receiver,
        policy = %cfg.policy,
        payload = %path.display(),
        bytes = payload.len(),
        "准备发送"
    );

    let link = UdpLink::connect(cfg.receiver)?;
    let mut sender = Sender::new(cfg, &payload, link)?;
    let report = sender.run()?;
    let metrics = MetricsSummary::from_report(&report);

    println!();
    println!("{metrics}");

    if let Some(path) = args.report_json {
        let json = serde_json::to_string_pretty(&JsonReport {
            report: &report,
            metrics: &metrics,
        })
        .map_err(Error::ReportEncode)?;
        fs::write(&path, json).map_err(|source| Error::ReportWrite {
            path: path.clone(),
            source,
        })?;
        eprintln!("wrote transfer report to {}", path.display());
    }
    Ok(())
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .map_err(|e| Error::InvalidConfig(format!("cannot resolve {host}:{port}: {e}")))?
        .next()
        .ok_or_else(|| Error::InvalidConfig(format!("{host}:{port} resolved to no address")))
}

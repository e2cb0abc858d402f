mod config;
mod link;

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::cc::Policy;
use crate::config::SenderConfig;

/// Config for in-memory runs: no start delay, everything else at its default.
fn quick_config(policy: Policy) -> SenderConfig {
    let mut cfg = SenderConfig::for_policy(policy);
    cfg.start_delay = Duration::ZERO;
    cfg
}

/// Deterministic payload of `len` bytes.
fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "rdt-rs-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

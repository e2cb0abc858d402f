use serde_json::Value;
use std::fs;
use std::net::UdpSocket;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

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

fn write_payload(dir: &Path, len: usize) -> (PathBuf, Vec<u8>) {
    let data: Vec<u8> = (0..len).map(|i| (i * 7 % 256) as u8).collect();
    let path = dir.join("payload.bin");
    fs::write(&path, &data).expect("write payload");
    (path, data)
}

fn datagram(seq: i32, text: &[u8]) -> Vec<u8> {
    let mut out = seq.to_be_bytes().to_vec();
    out.extend_from_slice(text);
    out
}

/// Minimal cumulative-ACK receiver on loopback. Returns the bytes delivered in order.
fn spawn_receiver() -> (u16, JoinHandle<Vec<u8>>) {
    let sock = UdpSocket::bind("127.0.0.1:0").expect("bind receiver");
    sock.set_read_timeout(Some(Duration::from_secs(20)))
        .expect("set read timeout");
    let port = sock.local_addr().expect("local addr").port();

    let handle = thread::spawn(move || {
        let mut buf = [0_u8; 2048];
        let mut data = Vec::new();
        let mut expected: i32 = 0;
        loop {
            let (n, from) = sock.recv_from(&mut buf).expect("receiver timed out");
            let seq = i32::from_be_bytes(buf[..4].try_into().expect("seq field"));
            let payload = &buf[4..n];
            if payload.starts_with(b"FIN/ACK") {
                return data;
            }
            if seq == expected {
                if payload.is_empty() {
                    sock.send_to(&datagram(expected, b"ack"), from).expect("send ack");
                    sock.send_to(&datagram(expected, b"fin"), from).expect("send fin");
                    continue;
                }
                data.extend_from_slice(payload);
                expected += payload.len() as i32;
            }
            sock.send_to(&datagram(expected, b"ack"), from).expect("send ack");
        }
    });
    (port, handle)
}

fn rdt_send() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rdt_send"));
    cmd.env_remove("TEST_FILE")
        .env_remove("PAYLOAD_FILE")
        .env_remove("RECEIVER_HOST")
        .env_remove("RECEIVER_PORT")
        .env("RUST_LOG", "warn");
    cmd
}

fn assert_success(out: &Output) {
    assert!(
        out.status.success(),
        "status={:?}\nstdout:\n{}\nstderr:\n{}",
        out.status,
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
}

#[test]
fn every_policy_delivers_the_file_and_prints_metrics() {
    for policy in ["stop-and-wait", "fixed-window", "tahoe", "tahoe-vegas"] {
        let dir = unique_temp_dir(&format!("send-{policy}"));
        let (payload, data) = write_payload(&dir, 12_345);
        let report_path = dir.join("report.json");
        let (port, receiver) = spawn_receiver();

        let out = rdt_send()
            .args(["--host", "127.0.0.1", "--port", &port.to_string()])
            .arg("--payload")
            .arg(&payload)
            .args(["--policy", policy, "--start-delay-ms", "0"])
            .args(["--ack-timeout-ms", "500", "--cwnd-trace"])
            .arg("--report-json")
            .arg(&report_path)
            .output()
            .expect("run rdt_send");
        assert_success(&out);

        let received = receiver.join().expect("receiver thread");
        assert_eq!(received, data, "{policy}: receiver got different bytes");

        let stdout = String::from_utf8_lossy(&out.stdout);
        assert!(stdout.contains("Metrics:"), "stdout:\n{stdout}");
        let csv = stdout
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .expect("csv line");
        let fields: Vec<f64> = csv
            .split(',')
            .map(|f| f.parse().expect("numeric metric"))
            .collect();
        assert_eq!(fields.len(), 4, "csv line: {csv}");
        assert!(fields[0] > 0.0);

        let json: Value =
            serde_json::from_str(&fs::read_to_string(&report_path).expect("read report"))
                .expect("parse report");
        assert_eq!(json["report"]["policy"], policy);
        assert_eq!(json["report"]["total_bytes"], 12_345);
        // 13 data segments + EOF
        assert_eq!(
            json["report"]["rtts"].as_array().expect("rtts").len(),
            14
        );
        assert_eq!(json["report"]["stats"]["fin_acks_sent"], 1);
        assert!(json["metrics"]["throughput"].as_f64().expect("throughput") > 0.0);
        let trace = json["report"]["cwnd_trace"].as_array().expect("trace");
        assert_eq!(trace[0]["reason"], "start");
    }
}

#[test]
fn config_file_selects_policy_and_receiver() {
    let dir = unique_temp_dir("send-config");
    let (payload, data) = write_payload(&dir, 4_000);
    let report_path = dir.join("report.json");
    let (port, receiver) = spawn_receiver();
    let config = dir.join("sender.json");
    fs::write(
        &config,
        format!(
            r#"{{ "host": "127.0.0.1", "port": {port}, "policy": "fixed-window",
                "fixed_window": 2, "start_delay_ms": 0 }}"#
        ),
    )
    .expect("write config");

    let out = rdt_send()
        .arg("--config")
        .arg(&config)
        .env("TEST_FILE", &payload)
        .arg("--report-json")
        .arg(&report_path)
        .output()
        .expect("run rdt_send");
    assert_success(&out);
    assert_eq!(receiver.join().expect("receiver thread"), data);

    let json: Value =
        serde_json::from_str(&fs::read_to_string(&report_path).expect("read report"))
            .expect("parse report");
    assert_eq!(json["report"]["policy"], "fixed-window");
}

#[test]
fn missing_payload_fails_with_policy_label() {
    let dir = unique_temp_dir("send-missing");
    let out = rdt_send()
        .args(["--policy", "stop-and-wait", "--start-delay-ms", "0"])
        .arg("--payload")
        .arg(dir.join("nope.bin"))
        .output()
        .expect("run rdt_send");

    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(
        stderr.contains("stop-and-wait sender error: could not find payload file"),
        "stderr:\n{stderr}"
    );
}

#[test]
fn invalid_config_file_fails() {
    let dir = unique_temp_dir("send-bad-config");
    let (payload, _) = write_payload(&dir, 100);
    let config = dir.join("sender.json");
    fs::write(&config, r#"{ "packet_size": 2 }"#).expect("write config");

    let out = rdt_send()
        .arg("--config")
        .arg(&config)
        .arg("--payload")
        .arg(&payload)
        .output()
        .expect("run rdt_send");

    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("invalid config"), "stderr:\n{stderr}");
}

#[test]
fn silent_receiver_exhausts_stop_and_wait_retries() {
    let dir = unique_temp_dir("send-silent");
    let (payload, _) = write_payload(&dir, 100);
    // bound but never read
    let silent = UdpSocket::bind("127.0.0.1:0").expect("bind");
    let port = silent.local_addr().expect("local addr").port();

    let out = rdt_send()
        .args(["--port", &port.to_string(), "--policy", "stop-and-wait"])
        .args(["--start-delay-ms", "0", "--ack-timeout-ms", "50"])
        .arg("--payload")
        .arg(&payload)
        .output()
        .expect("run rdt_send");

    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(
        stderr.contains("receiver did not respond"),
        "stderr:\n{stderr}"
    );
    drop(silent);
}

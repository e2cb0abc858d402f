use std::fs;
use std::time::Duration;

use crate::Error;
use crate::cc::Policy;
use crate::config::{ConfigFile, SenderConfig, VegasConfig};
use crate::net::{MAX_SEGMENT_SIZE, PACKET_SIZE};

use super::unique_temp_dir;

#[test]
fn defaults_match_the_wire_constants() {
    let cfg = SenderConfig::default();
    assert_eq!(cfg.policy, Policy::TahoeVegas);
    assert_eq!(cfg.packet_size, PACKET_SIZE);
    assert_eq!(cfg.max_segment_size(), MAX_SEGMENT_SIZE);
    assert_eq!(cfg.init_cwnd, 1.0);
    assert_eq!(cfg.init_ssthresh, 64);
    assert_eq!(cfg.fast_retransmit_threshold, 3);
    assert_eq!(cfg.fixed_window, 100);
    assert_eq!(cfg.max_retries, 3);
    assert_eq!(cfg.start_delay, Duration::from_millis(500));
    assert_eq!(cfg.fin_linger, Duration::ZERO);
    assert_eq!(cfg.receiver.port(), 5001);
    cfg.validate().expect("defaults are valid");

    let v = VegasConfig::default();
    assert_eq!((v.alpha, v.beta, v.step), (2.0, 4.0, 1.0));
    assert_eq!((v.recent_samples, v.min_samples), (10, 3));
    assert_eq!(v.floor, 2.0);
}

#[test]
fn ack_timeout_depends_on_policy() {
    assert_eq!(
        SenderConfig::for_policy(Policy::FixedWindow).ack_timeout,
        Duration::from_secs(2)
    );
    assert_eq!(
        SenderConfig::for_policy(Policy::StopAndWait).ack_timeout,
        Duration::from_secs(5)
    );
}

#[test]
fn validate_rejects_out_of_range_values() {
    let cases: [(&str, fn(&mut SenderConfig)); 12] = [
        ("packet too small", |c: &mut SenderConfig| c.packet_size = 4),
        ("packet too large", |c: &mut SenderConfig| c.packet_size = 65_508),
        ("zero timeout", |c: &mut SenderConfig| c.ack_timeout = Duration::ZERO),
        ("cwnd below one", |c: &mut SenderConfig| c.init_cwnd = 0.5),
        ("cwnd nan", |c: &mut SenderConfig| c.init_cwnd = f64::NAN),
        ("zero ssthresh", |c: &mut SenderConfig| c.init_ssthresh = 0),
        ("zero threshold", |c: &mut SenderConfig| c.fast_retransmit_threshold = 0),
        ("zero window", |c: &mut SenderConfig| c.fixed_window = 0),
        ("alpha above beta", |c: &mut SenderConfig| c.vegas.alpha = 5.0),
        ("no recent samples", |c: &mut SenderConfig| c.vegas.recent_samples = 0),
        ("min above recent", |c: &mut SenderConfig| c.vegas.min_samples = 11),
        ("floor below one", |c: &mut SenderConfig| c.vegas.floor = 0.0),
    ];
    for (name, mutate) in cases {
        let mut cfg = SenderConfig::default();
        mutate(&mut cfg);
        assert!(
            matches!(cfg.validate(), Err(Error::InvalidConfig(_))),
            "{name} should be rejected"
        );
    }

    let mut cfg = SenderConfig::default();
    cfg.packet_size = 65_507;
    cfg.validate().expect("largest UDP payload is allowed");
}

#[test]
fn file_overrides_only_the_fields_it_names() {
    let file: ConfigFile = serde_json::from_str(
        r#"{
            "policy": "fixed-window",
            "port": 6000,
            "ack_timeout_ms": 750,
            "fixed_window": 16,
            "fin_linger_ms": 200,
            "vegas": { "alpha": 1.0 }
        }"#,
    )
    .expect("parse");
    assert_eq!(file.policy, Some(Policy::FixedWindow));
    assert_eq!(file.port, Some(6000));
    assert_eq!(file.host, None);

    let mut cfg = SenderConfig::for_policy(Policy::FixedWindow);
    cfg.apply_file(&file);
    assert_eq!(cfg.ack_timeout, Duration::from_millis(750));
    assert_eq!(cfg.fixed_window, 16);
    assert_eq!(cfg.fin_linger, Duration::from_millis(200));
    assert_eq!(cfg.vegas.alpha, 1.0);
    assert_eq!(cfg.vegas.beta, 4.0);
    assert_eq!(cfg.packet_size, PACKET_SIZE);
    assert_eq!(cfg.max_retries, 3);
}

#[test]
fn unknown_keys_are_rejected() {
    let err = serde_json::from_str::<ConfigFile>(r#"{ "windw": 3 }"#);
    assert!(err.is_err());
}

#[test]
fn load_reports_read_and_parse_failures() {
    let dir = unique_temp_dir("config");

    let missing = dir.join("missing.json");
    assert!(matches!(
        ConfigFile::load(&missing),
        Err(Error::ConfigRead { .. })
    ));

    let broken = dir.join("broken.json");
    fs::write(&broken, "{ not json").expect("write");
    assert!(matches!(
        ConfigFile::load(&broken),
        Err(Error::ConfigParse { .. })
    ));

    let good = dir.join("good.json");
    fs::write(&good, r#"{ "policy": "tahoe", "init_ssthresh": 32 }"#).expect("write");
    let file = ConfigFile::load(&good).expect("load");
    assert_eq!(file.policy, Some(Policy::Tahoe));
    assert_eq!(file.init_ssthresh, Some(32));
}

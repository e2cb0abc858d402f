//! 发送端配置
//!
//! [`SenderConfig`] 是传给引擎的唯一配置对象，所有数值常量（超时、包长、阈值）
//! 都集中在这里。[`ConfigFile`] 是可选的 JSON 覆盖层，字段全部可省略。

use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cc::Policy;
use crate::error::{Error, Result};
use crate::net::{PACKET_SIZE, SEQ_ID_SIZE};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5001;

/// IPv4 UDP 单个数据报的最大载荷
const MAX_UDP_PAYLOAD: usize = 65_507;

/// 基于时延的窗口调整参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VegasConfig {
    /// 吞吐差低于 alpha：网络未充分利用，增大窗口
    pub alpha: f64,
    /// 吞吐差高于 beta：网络过载，减小窗口
    pub beta: f64,
    /// 每次调整的段数
    pub step: f64,
    /// 用于求平均 RTT 的最近样本数
    pub recent_samples: usize,
    /// 至少积累这么多最近样本才开始调整
    pub min_samples: usize,
    /// 减小窗口时的下限
    pub floor: f64,
}

impl Default for VegasConfig {
    fn default() -> Self {
        Self {
            alpha: 2.0,
            beta: 4.0,
            step: 1.0,
            recent_samples: 10,
            min_samples: 3,
            floor: 2.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// 接收端地址
    pub receiver: SocketAddr,
    pub policy: Policy,
    /// 单个数据报上限（字节），载荷上限为 packet_size - 4
    pub packet_size: usize,
    /// 等待一个 ACK 数据报的固定超时（不随 RTT 自适应）
    pub ack_timeout: Duration,
    /// 发出第一个数据报前的等待，给同时启动的接收端留出时间
    pub start_delay: Duration,
    /// 初始 cwnd（段）
    pub init_cwnd: f64,
    /// 初始 ssthresh（段）
    pub init_ssthresh: u32,
    /// 触发快速重传的重复 ACK 数
    pub fast_retransmit_threshold: u32,
    /// FixedWindow 策略的窗口（段）
    pub fixed_window: usize,
    /// StopAndWait 策略在同一段上允许的超时重试次数
    pub max_retries: u32,
    pub vegas: VegasConfig,
    /// 所有段确认后等待 fin 时允许的连续超时次数
    pub fin_wait_timeouts: u32,
    /// 回复 FIN/ACK 后继续应答重复 fin 的时长；0 表示立即退出
    pub fin_linger: Duration,
    /// 记录 cwnd 轨迹
    pub record_cwnd: bool,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self::for_policy(Policy::default())
    }
}

impl SenderConfig {
    pub fn for_policy(policy: Policy) -> Self {
        Self {
            receiver: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            policy,
            packet_size: PACKET_SIZE,
            ack_timeout: policy.default_ack_timeout(),
            start_delay: Duration::from_millis(500),
            init_cwnd: 1.0,
            init_ssthresh: 64,
            fast_retransmit_threshold: 3,
            fixed_window: 100,
            max_retries: 3,
            vegas: VegasConfig::default(),
            fin_wait_timeouts: 3,
            fin_linger: Duration::ZERO,
            record_cwnd: false,
        }
    }

    /// 非 EOF 段的最大载荷
    pub fn max_segment_size(&self) -> usize {
        self.packet_size.saturating_sub(SEQ_ID_SIZE)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidConfig(msg));
        if self.packet_size <= SEQ_ID_SIZE || self.packet_size > MAX_UDP_PAYLOAD {
            return invalid(format!(
                "packet_size must be in ({SEQ_ID_SIZE}, {MAX_UDP_PAYLOAD}], got {}",
                self.packet_size
            ));
        }
        if self.ack_timeout.is_zero() {
            return invalid("ack_timeout must be positive".to_string());
        }
        if self.init_cwnd.is_nan() || self.init_cwnd < 1.0 {
            return invalid(format!("init_cwnd must be >= 1, got {}", self.init_cwnd));
        }
        if self.init_ssthresh == 0 {
            return invalid("init_ssthresh must be >= 1".to_string());
        }
        if self.fast_retransmit_threshold == 0 {
            return invalid("fast_retransmit_threshold must be >= 1".to_string());
        }
        if self.fixed_window == 0 {
            return invalid("fixed_window must be >= 1".to_string());
        }
        let v = &self.vegas;
        if v.alpha > v.beta {
            return invalid(format!(
                "vegas.alpha ({}) must not exceed vegas.beta ({})",
                v.alpha, v.beta
            ));
        }
        if v.recent_samples == 0 {
            return invalid("vegas.recent_samples must be >= 1".to_string());
        }
        if v.min_samples > v.recent_samples {
            return invalid(format!(
                "vegas.min_samples ({}) exceeds vegas.recent_samples ({})",
                v.min_samples, v.recent_samples
            ));
        }
        if v.floor.is_nan() || v.floor < 1.0 {
            return invalid(format!("vegas.floor must be >= 1, got {}", v.floor));
        }
        Ok(())
    }

    /// 用配置文件中出现的字段覆盖当前值（接收端地址由调用方解析后填入）
    pub fn apply_file(&mut self, file: &ConfigFile) {
        if let Some(v) = file.packet_size {
            self.packet_size = v;
        }
        if let Some(ms) = file.ack_timeout_ms {
            self.ack_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = file.start_delay_ms {
            self.start_delay = Duration::from_millis(ms);
        }
        if let Some(v) = file.init_cwnd {
            self.init_cwnd = v;
        }
        if let Some(v) = file.init_ssthresh {
            self.init_ssthresh = v;
        }
        if let Some(v) = file.fast_retransmit_threshold {
            self.fast_retransmit_threshold = v;
        }
        if let Some(v) = file.fixed_window {
            self.fixed_window = v;
        }
        if let Some(v) = file.max_retries {
            self.max_retries = v;
        }
        if let Some(v) = &file.vegas {
            self.vegas = v.clone();
        }
        if let Some(v) = file.fin_wait_timeouts {
            self.fin_wait_timeouts = v;
        }
        if let Some(ms) = file.fin_linger_ms {
            self.fin_linger = Duration::from_millis(ms);
        }
        if let Some(v) = file.record_cwnd {
            self.record_cwnd = v;
        }
    }
}

/// JSON 配置文件
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub policy: Option<Policy>,
    #[serde(default)]
    pub packet_size: Option<usize>,
    #[serde(default)]
    pub ack_timeout_ms: Option<u64>,
    #[serde(default)]
    pub start_delay_ms: Option<u64>,
    #[serde(default)]
    pub init_cwnd: Option<f64>,
    #[serde(default)]
    pub init_ssthresh: Option<u32>,
    #[serde(default)]
    pub fast_retransmit_threshold: Option<u32>,
    #[serde(default)]
    pub fixed_window: Option<usize>,
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub vegas: Option<VegasConfig>,
    #[serde(default)]
    pub fin_wait_timeouts: Option<u32>,
    #[serde(default)]
    pub fin_linger_ms: Option<u64>,
    #[serde(default)]
    pub record_cwnd: Option<bool>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

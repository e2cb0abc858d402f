//! 传输结果
//!
//! 引擎只产出原始数据：总字节数、耗时、逐段 RTT，外加计数器和可选的 cwnd 轨迹；
//! 格式化交给 [`crate::metrics`]。

use serde::Serialize;

use crate::cc::{Phase, Policy};

/// 触发 cwnd 采样的事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CwndReason {
    Start,
    NewAck,
    FastRetransmit,
    Timeout,
}

/// 拥塞窗口采样（用于离线绘图）
#[derive(Debug, Clone, Serialize)]
pub struct CwndSample {
    pub elapsed_secs: f64,
    pub cwnd: f64,
    pub ssthresh: Option<u32>,
    pub phase: Phase,
    pub reason: CwndReason,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TransferStats {
    /// 发出的数据段（含重传，不含 FIN/ACK）
    pub packets_sent: u64,
    pub retransmissions: u64,
    pub timeouts: u64,
    pub fast_retransmits: u64,
    pub duplicate_acks: u64,
    /// 被忽略的陈旧/无法识别的 ACK
    pub stale_acks: u64,
    pub fin_acks_sent: u64,
    pub final_cwnd: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferReport {
    pub policy: Policy,
    pub total_bytes: u64,
    pub elapsed_secs: f64,
    /// 逐段 RTT（秒），按确认顺序
    pub rtts: Vec<f64>,
    pub stats: TransferStats,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cwnd_trace: Vec<CwndSample>,
}

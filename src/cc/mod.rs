//! 拥塞控制
//!
//! 驱动循环只和 [`CongestionControl`] 打交道；四种策略是同一配置轴上的四个点：
//! - [`StopAndWait`]：窗口恒为 1，按段限制重试次数
//! - [`FixedWindow`]：窗口恒定，超时只回退到 base
//! - [`Tahoe`]：慢启动 + 拥塞避免 + 3 dupACK 快速重传
//! - [`Tahoe::with_vegas`]：Tahoe 之上叠加基于时延（Vegas 风格）的窗口调整
//!
//! 窗口以“段”为单位，内部用实数保存，只在决定可在途段数时向下取整。

mod fixed_window;
mod rtt;
mod stop_and_wait;
mod tahoe;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::SenderConfig;

pub use fixed_window::FixedWindow;
pub use rtt::RttSampler;
pub use stop_and_wait::StopAndWait;
pub use tahoe::Tahoe;

/// 拥塞控制状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    SlowStart,
    CongestionAvoidance,
    DelayBasedAvoidance,
    /// 窗口固定，不做拥塞控制
    Fixed,
}

/// 发送策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Policy {
    StopAndWait,
    FixedWindow,
    Tahoe,
    #[default]
    TahoeVegas,
}

impl Policy {
    pub const ALL: [Policy; 4] = [
        Policy::StopAndWait,
        Policy::FixedWindow,
        Policy::Tahoe,
        Policy::TahoeVegas,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Policy::StopAndWait => "stop-and-wait",
            Policy::FixedWindow => "fixed-window",
            Policy::Tahoe => "tahoe",
            Policy::TahoeVegas => "tahoe-vegas",
        }
    }

    /// 各策略默认的 ACK 超时
    pub fn default_ack_timeout(self) -> Duration {
        match self {
            Policy::FixedWindow => Duration::from_secs(2),
            Policy::StopAndWait | Policy::Tahoe | Policy::TahoeVegas => Duration::from_secs(5),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase().replace('_', "-");
        Policy::ALL
            .into_iter()
            .find(|p| p.name() == norm)
            .ok_or_else(|| {
                format!(
                    "unknown policy {s:?} (expected one of: stop-and-wait, fixed-window, tahoe, tahoe-vegas)"
                )
            })
    }
}

/// 拥塞控制策略。事件只在处理累计 ACK、超时或快速重传时到达。
pub trait CongestionControl: fmt::Debug {
    fn policy(&self) -> Policy;

    /// 当前拥塞窗口（段，实数）
    fn window(&self) -> f64;

    fn ssthresh(&self) -> Option<u32> {
        None
    }

    fn phase(&self) -> Phase;

    /// 允许同时在途的段数：窗口向下取整，至少为 1
    fn send_limit(&self) -> usize {
        (self.window().floor() as usize).max(1)
    }

    /// 一批新确认了 `newly_acked` 个段（≥ 1），`rtt` 已包含这批段的样本
    fn on_ack(&mut self, newly_acked: usize, rtt: &RttSampler);

    /// ACK 超时
    fn on_timeout(&mut self);

    /// 重复 ACK 达到阈值，base 处的段已被重传
    fn on_fast_retransmit(&mut self) {}

    /// 是否对重复 ACK 做快速重传
    fn fast_retransmit(&self) -> bool {
        false
    }

    /// 同一个 base 段允许的最大连续超时次数；`None` 表示不限
    fn retry_limit(&self) -> Option<u32> {
        None
    }
}

/// 按配置构造策略对象
pub fn build(cfg: &SenderConfig) -> Box<dyn CongestionControl> {
    match cfg.policy {
        Policy::StopAndWait => Box::new(StopAndWait::new(cfg.max_retries)),
        Policy::FixedWindow => Box::new(FixedWindow::new(cfg.fixed_window)),
        Policy::Tahoe => Box::new(Tahoe::new(cfg.init_cwnd, cfg.init_ssthresh)),
        Policy::TahoeVegas => Box::new(Tahoe::with_vegas(
            cfg.init_cwnd,
            cfg.init_ssthresh,
            cfg.vegas.clone(),
        )),
    }
}

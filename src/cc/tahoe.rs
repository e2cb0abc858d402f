//! TCP Tahoe（简化版），可选叠加 Vegas 风格的时延调整
//!
//! - 慢启动：每确认一个段 cwnd += 1（按 ACK 计，而不是按 RTT 计）
//! - 拥塞避免：cwnd += k / cwnd
//! - 超时：ssthresh = max(cwnd/2, 1)，cwnd 回到初始值
//! - 3 dupACK：ssthresh = max(cwnd/2, 2)，cwnd 回到初始值
//!
//! 混合模式下，慢启动越过 ssthresh 时“武装”时延阶段；此后用最近 RTT 的平均值
//! 与最小 RTT 比较期望/实际吞吐，决定 cwnd 加一、减一或保持。任何超时或快速
//! 重传都会解除武装，只有重新爬过慢启动才会恢复。

use tracing::trace;

use super::{CongestionControl, Phase, Policy, RttSampler};
use crate::config::VegasConfig;

#[derive(Debug, Clone)]
pub struct Tahoe {
    cwnd: f64,
    ssthresh: u32,
    init_cwnd: f64,
    vegas: Option<VegasConfig>,
    vegas_armed: bool,
}

impl Tahoe {
    pub fn new(init_cwnd: f64, init_ssthresh: u32) -> Self {
        let init_cwnd = init_cwnd.max(1.0);
        Self {
            cwnd: init_cwnd,
            ssthresh: init_ssthresh.max(1),
            init_cwnd,
            vegas: None,
            vegas_armed: false,
        }
    }

    pub fn with_vegas(init_cwnd: f64, init_ssthresh: u32, vegas: VegasConfig) -> Self {
        Self {
            vegas: Some(vegas),
            ..Self::new(init_cwnd, init_ssthresh)
        }
    }

    pub fn vegas_armed(&self) -> bool {
        self.vegas_armed
    }

    fn in_slow_start(&self) -> bool {
        self.cwnd < f64::from(self.ssthresh)
    }

    fn halved(&self, floor: u32) -> u32 {
        ((self.cwnd / 2.0).floor() as u32).max(floor)
    }
}

impl CongestionControl for Tahoe {
    fn policy(&self) -> Policy {
        if self.vegas.is_some() {
            Policy::TahoeVegas
        } else {
            Policy::Tahoe
        }
    }

    fn window(&self) -> f64 {
        self.cwnd
    }

    fn ssthresh(&self) -> Option<u32> {
        Some(self.ssthresh)
    }

    fn phase(&self) -> Phase {
        if self.in_slow_start() {
            Phase::SlowStart
        } else if self.vegas_armed {
            Phase::DelayBasedAvoidance
        } else {
            Phase::CongestionAvoidance
        }
    }

    fn on_ack(&mut self, newly_acked: usize, rtt: &RttSampler) {
        if newly_acked == 0 {
            return;
        }
        let k = newly_acked as f64;

        if self.in_slow_start() {
            self.cwnd += k;
            if self.vegas.is_some() && !self.in_slow_start() {
                self.vegas_armed = true;
            }
            return;
        }

        match &self.vegas {
            Some(v) if self.vegas_armed => self.cwnd = vegas_window(self.cwnd, v, rtt),
            _ => self.cwnd += k / self.cwnd,
        }
    }

    fn on_timeout(&mut self) {
        self.ssthresh = self.halved(1);
        self.cwnd = self.init_cwnd;
        self.vegas_armed = false;
    }

    fn on_fast_retransmit(&mut self) {
        self.ssthresh = self.halved(2);
        self.cwnd = self.init_cwnd;
        self.vegas_armed = false;
    }

    fn fast_retransmit(&self) -> bool {
        true
    }
}

/// 时延阶段的新窗口：样本不足或 RTT 无效时保持不变
fn vegas_window(cwnd: f64, v: &VegasConfig, rtt: &RttSampler) -> f64 {
    if rtt.recent_len() < v.min_samples {
        return cwnd;
    }
    let (Some(min_rtt), Some(avg_rtt)) = (rtt.min(), rtt.recent_avg()) else {
        return cwnd;
    };
    if min_rtt <= 0.0 || avg_rtt <= 0.0 {
        return cwnd;
    }
    let expected = cwnd / min_rtt;
    let actual = cwnd / avg_rtt;
    let diff = (expected - actual) * min_rtt;
    trace!(diff, min_rtt, avg_rtt, cwnd, "Vegas 吞吐差");
    if diff < v.alpha {
        cwnd + v.step
    } else if diff > v.beta {
        (cwnd - v.step).max(v.floor)
    } else {
        cwnd
    }
}

//! RTT 采样
//!
//! 同时维护两份样本：
//! - 全部样本（按确认顺序，不设上限），交给报告/指标使用
//! - 最近 N 个样本的滑动窗口，供基于时延的窗口调整求平均
//!
//! 另外维护整个传输过程中的最小 RTT。单位均为秒。

use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RttSampler {
    samples: Vec<f64>,
    recent: VecDeque<f64>,
    recent_cap: usize,
    min: Option<f64>,
}

impl RttSampler {
    pub fn new(recent_cap: usize) -> Self {
        Self {
            samples: Vec::new(),
            recent: VecDeque::with_capacity(recent_cap),
            recent_cap,
            min: None,
        }
    }

    pub fn record(&mut self, rtt: Duration) {
        self.record_secs(rtt.as_secs_f64());
    }

    pub fn record_secs(&mut self, rtt: f64) {
        self.samples.push(rtt);
        self.min = Some(self.min.map_or(rtt, |m| m.min(rtt)));
        if self.recent_cap == 0 {
            return;
        }
        if self.recent.len() == self.recent_cap {
            self.recent.pop_front();
        }
        self.recent.push_back(rtt);
    }

    /// 全部样本，按记录顺序
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn recent_len(&self) -> usize {
        self.recent.len()
    }

    /// 最近窗口内样本的平均值
    pub fn recent_avg(&self) -> Option<f64> {
        if self.recent.is_empty() {
            return None;
        }
        Some(self.recent.iter().sum::<f64>() / self.recent.len() as f64)
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }
}

use super::{CongestionControl, Phase, Policy, RttSampler};

/// 固定滑动窗口：窗口既不增长也不收缩，丢包只靠超时回退到 base 恢复。
#[derive(Debug, Clone)]
pub struct FixedWindow {
    size: usize,
}

impl FixedWindow {
    pub fn new(size: usize) -> Self {
        Self { size: size.max(1) }
    }
}

impl CongestionControl for FixedWindow {
    fn policy(&self) -> Policy {
        Policy::FixedWindow
    }

    fn window(&self) -> f64 {
        self.size as f64
    }

    fn phase(&self) -> Phase {
        Phase::Fixed
    }

    fn send_limit(&self) -> usize {
        self.size
    }

    fn on_ack(&mut self, _newly_acked: usize, _rtt: &RttSampler) {}

    fn on_timeout(&mut self) {}
}

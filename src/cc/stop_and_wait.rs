use super::{CongestionControl, Phase, Policy, RttSampler};

/// 停等：一次只有一个段在途，超时后原样重发，连续超时超过上限即失败。
#[derive(Debug, Clone)]
pub struct StopAndWait {
    max_retries: u32,
}

impl StopAndWait {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }
}

impl CongestionControl for StopAndWait {
    fn policy(&self) -> Policy {
        Policy::StopAndWait
    }

    fn window(&self) -> f64 {
        1.0
    }

    fn phase(&self) -> Phase {
        Phase::Fixed
    }

    fn on_ack(&mut self, _newly_acked: usize, _rtt: &RttSampler) {}

    fn on_timeout(&mut self) {}

    fn retry_limit(&self) -> Option<u32> {
        Some(self.max_retries)
    }
}

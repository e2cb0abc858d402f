//! 传输指标
//!
//! 从 [`TransferReport`] 的原始数据推导吞吐、平均时延、平均抖动和综合得分：
//! `score = throughput/2000 + 15/jitter + 35/delay`（分母为 0 的项省略）。

use std::fmt;

use serde::Serialize;

use crate::sender::TransferReport;

/// 耗时下限，避免除以 0
const MIN_DURATION_SECS: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub duration_secs: f64,
    /// 字节/秒
    pub throughput: f64,
    pub avg_delay: f64,
    pub avg_jitter: f64,
    pub score: f64,
}

impl MetricsSummary {
    pub fn from_report(report: &TransferReport) -> Self {
        Self::from_parts(report.total_bytes, report.elapsed_secs, &report.rtts)
    }

    pub fn from_parts(total_bytes: u64, elapsed_secs: f64, rtts: &[f64]) -> Self {
        let duration_secs = elapsed_secs.max(MIN_DURATION_SECS);
        let throughput = total_bytes as f64 / duration_secs;
        let avg_delay = average_delay(rtts);
        let avg_jitter = average_jitter(rtts);

        let mut score = throughput / 2000.0;
        if avg_jitter > 0.0 {
            score += 15.0 / avg_jitter;
        }
        if avg_delay > 0.0 {
            score += 35.0 / avg_delay;
        }

        Self {
            duration_secs,
            throughput,
            avg_delay,
            avg_jitter,
            score,
        }
    }

    /// 逗号分隔的机器可读行：throughput,delay,jitter,score
    pub fn csv_line(&self) -> String {
        format!(
            "{:.7},{:.7},{:.7},{:.7}",
            self.throughput, self.avg_delay, self.avg_jitter, self.score
        )
    }
}

impl fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Metrics:")?;
        writeln!(
            f,
            "duration={:.3}s throughput={:.2} bytes/sec",
            self.duration_secs, self.throughput
        )?;
        writeln!(
            f,
            "avg_delay={:.6}s avg_jitter={:.6}s",
            self.avg_delay, self.avg_jitter
        )?;
        write!(f, "{}", self.csv_line())
    }
}

/// 平均 RTT；没有样本时为 0
pub fn average_delay(rtts: &[f64]) -> f64 {
    if rtts.is_empty() {
        return 0.0;
    }
    rtts.iter().sum::<f64>() / rtts.len() as f64
}

/// 相邻 RTT 差的绝对值的平均；少于 2 个样本时为 0
pub fn average_jitter(rtts: &[f64]) -> f64 {
    if rtts.len() < 2 {
        return 0.0;
    }
    let total: f64 = rtts.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
    total / (rtts.len() - 1) as f64
}

//! 发送窗口
//!
//! ```text
//!   0          base            next              len
//!   │  已确认   │ <── 在途 ──> │ <── 未发送 ──> │
//! ```
//!
//! 不变式：`0 ≤ base ≤ next ≤ len`。发送时间表按段偏移记录“最近一次”发送时刻，
//! 重传会覆盖旧值，因此 RTT 总是相对最后一次发送计算。

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::net::Segment;

/// 一次累计 ACK 滑动的结果
#[derive(Debug, Default)]
pub struct Slide {
    /// 本次新确认的段数
    pub acked: usize,
    /// 这些段的 RTT，按段顺序
    pub rtts: Vec<Duration>,
}

#[derive(Debug)]
pub struct TxWindow {
    segments: Vec<Segment>,
    base: usize,
    next: usize,
    /// 至少发送过一次的段数（用于区分首发与重传）
    high_water: usize,
    sent_at: HashMap<u32, Instant>,
}

impl TxWindow {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            base: 0,
            next: 0,
            high_water: 0,
            sent_at: HashMap::new(),
        }
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn next(&self) -> usize {
        self.next
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// 所有段（含 EOF）均已确认
    pub fn is_complete(&self) -> bool {
        self.base >= self.segments.len()
    }

    pub fn in_flight(&self) -> usize {
        self.next - self.base
    }

    pub fn segment(&self, idx: usize) -> Option<&Segment> {
        self.segments.get(idx)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// 在 `limit` 个在途段的约束下，下一个可发送的段
    pub fn next_sendable(&self, limit: usize) -> Option<usize> {
        let window_end = self.base.saturating_add(limit).min(self.segments.len());
        (self.next < window_end).then_some(self.next)
    }

    /// 记录段 `idx` 在 `now` 被发出；返回是否为重传。
    pub fn mark_sent(&mut self, idx: usize, now: Instant) -> bool {
        let retransmission = idx < self.high_water;
        if let Some(seg) = self.segments.get(idx) {
            self.sent_at.insert(seg.offset, now);
        }
        if idx == self.next {
            self.next += 1;
        }
        self.high_water = self.high_water.max(idx + 1);
        retransmission
    }

    /// 超时后从 base 开始重发
    pub fn rewind(&mut self) {
        self.next = self.base;
    }

    /// 把 base 滑过所有被 `ack_id` 覆盖的段。
    pub fn slide(&mut self, ack_id: i32, now: Instant) -> Slide {
        let mut out = Slide::default();
        while let Some(seg) = self.segments.get(self.base) {
            if !seg.covered_by(ack_id) {
                break;
            }
            if let Some(at) = self.sent_at.remove(&seg.offset) {
                out.rtts.push(now.saturating_duration_since(at));
            }
            self.base += 1;
            out.acked += 1;
        }
        // 超时回退后迟到的 ACK 可能越过 next
        self.next = self.next.max(self.base);
        out
    }

    /// 载荷总字节数（不含 EOF）
    pub fn total_bytes(&self) -> u64 {
        self.segments.iter().map(|s| s.len() as u64).sum()
    }
}

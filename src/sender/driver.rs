//! 连接驱动（事件循环）
//!
//! 每轮循环：
//! 1. 填充窗口：发送 `[next, base + floor(cwnd))` 内尚未发送的段，记录发送时刻
//! 2. 在 ACK 超时内阻塞等待一个数据报
//! 3. 超时：交给拥塞控制处理，并把 next 回退到 base
//! 4. 收到 ACK：新 ACK 滑动窗口并采样 RTT；重复 ACK 计数，达到阈值则快速重传
//!
//! base 越过 EOF 段后进入终止阶段，只等待 `fin`。任何时候收到 `fin` 都直接回复
//! `FIN/ACK` 并结束。整个连接只有一个线程，状态全部归驱动独占。

use std::thread;
use std::time::Instant;

use tracing::{debug, info, trace, warn};

use super::report::{CwndReason, CwndSample, TransferReport, TransferStats};
use super::window::TxWindow;
use crate::cc::{self, CongestionControl, RttSampler};
use crate::config::SenderConfig;
use crate::error::{Error, Result};
use crate::net::{
    AckKind, AckPacket, DatagramLink, Segment, decode_ack, encode, encode_fin_ack,
    segment_payload,
};

/// 一次 [`Sender::poll`] 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 超时内没有收到任何数据报
    Timeout,
    /// 新的累计 ACK，确认了 `acked` 个段（可能为 0）
    NewAck { ack_id: i32, acked: usize },
    /// 与上一个 ACK 相同
    DupAck { ack_id: i32, count: u32 },
    /// 重复 ACK 达到阈值，base 处的段已重传
    FastRetransmit { ack_id: i32 },
    /// 比已见过的 ACK 更旧，或文本无法识别
    Stale { ack_id: i32 },
    /// 接收端宣告结束
    Fin { ack_id: i32 },
}

#[derive(Debug)]
pub struct Sender<L> {
    cfg: SenderConfig,
    link: L,
    window: TxWindow,
    cc: Box<dyn CongestionControl>,
    rtt: RttSampler,
    last_ack: Option<i32>,
    dup_acks: u32,
    /// 当前 base 段上的连续超时次数
    base_timeouts: u32,
    stats: TransferStats,
    started: Instant,
    cwnd_log: Option<Vec<CwndSample>>,
    recv_buf: Vec<u8>,
}

impl<L: DatagramLink> Sender<L> {
    pub fn new(cfg: SenderConfig, payload: &[u8], link: L) -> Result<Self> {
        cfg.validate()?;
        let segments = segment_payload(payload, cfg.max_segment_size())?;
        let cc = cc::build(&cfg);
        let rtt = RttSampler::new(cfg.vegas.recent_samples);
        let cwnd_log = cfg.record_cwnd.then(Vec::new);
        let recv_buf = vec![0; cfg.packet_size];
        Ok(Self {
            cfg,
            link,
            window: TxWindow::new(segments),
            cc,
            rtt,
            last_ack: None,
            dup_acks: 0,
            base_timeouts: 0,
            stats: TransferStats::default(),
            started: Instant::now(),
            cwnd_log,
            recv_buf,
        })
    }

    pub fn config(&self) -> &SenderConfig {
        &self.cfg
    }

    pub fn window(&self) -> &TxWindow {
        &self.window
    }

    pub fn congestion(&self) -> &dyn CongestionControl {
        self.cc.as_ref()
    }

    pub fn rtt(&self) -> &RttSampler {
        &self.rtt
    }

    pub fn stats(&self) -> &TransferStats {
        &self.stats
    }

    pub fn dup_acks(&self) -> u32 {
        self.dup_acks
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// 完整地跑完一次传输，直到终止握手完成或发生致命错误。
    #[tracing::instrument(skip(self), fields(policy = %self.cc.policy(), segments = self.window.len()))]
    pub fn run(&mut self) -> Result<TransferReport> {
        if !self.cfg.start_delay.is_zero() {
            thread::sleep(self.cfg.start_delay);
        }
        self.started = Instant::now();
        self.record_cwnd(CwndReason::Start);
        info!(total_bytes = self.window.total_bytes(), "▶️  开始传输");

        while !self.window.is_complete() {
            self.fill()?;
            if let Outcome::Fin { ack_id } = self.poll()? {
                info!(ack_id, base = self.window.base(), "传输中途收到 fin");
                return self.finish(ack_id);
            }
        }

        let ack_id = self.await_fin()?;
        self.finish(ack_id)
    }

    /// 发送窗口内所有尚未发送的段，返回本次发送的段数。
    pub fn fill(&mut self) -> Result<usize> {
        let limit = self.cc.send_limit();
        let mut sent = 0;
        while let Some(idx) = self.window.next_sendable(limit) {
            self.transmit(idx)?;
            sent += 1;
        }
        if sent > 0 {
            trace!(
                sent,
                limit,
                base = self.window.base(),
                next = self.window.next(),
                "窗口已填充"
            );
        }
        Ok(sent)
    }

    /// 等待一个数据报（或超时）并处理。
    pub fn poll(&mut self) -> Result<Outcome> {
        let received = self
            .link
            .recv(&mut self.recv_buf, self.cfg.ack_timeout)
            .map_err(Error::Recv)?;
        match received {
            None => self.on_timeout(),
            Some(n) => {
                let ack = decode_ack(&self.recv_buf[..n]);
                self.on_ack(ack)
            }
        }
    }

    fn transmit(&mut self, idx: usize) -> Result<()> {
        let Some(seg) = self.window.segment(idx) else {
            return Ok(());
        };
        let seq = seg.seq();
        let bytes = seg.len();
        let datagram = encode(seq, &seg.payload);

        let retrans = self.window.mark_sent(idx, Instant::now());
        self.link
            .send(&datagram)
            .map_err(|source| Error::Send { seq, source })?;

        self.stats.packets_sent += 1;
        if retrans {
            self.stats.retransmissions += 1;
        }
        trace!(seq, bytes, retrans, "发送数据段");
        Ok(())
    }

    fn on_ack(&mut self, ack: AckPacket) -> Result<Outcome> {
        let ack_id = ack.ack_id;
        match ack.kind() {
            AckKind::Fin => {
                debug!(ack_id, "收到 fin");
                Ok(Outcome::Fin { ack_id })
            }
            AckKind::Other => {
                self.stats.stale_acks += 1;
                debug!(ack_id, message = %ack.message.trim(), "无法识别的 ACK，忽略");
                Ok(Outcome::Stale { ack_id })
            }
            AckKind::Ack => match self.last_ack {
                Some(last) if ack_id == last => self.on_dup_ack(ack_id),
                Some(last) if ack_id < last => {
                    self.stats.stale_acks += 1;
                    trace!(ack_id, last, "陈旧 ACK，忽略");
                    Ok(Outcome::Stale { ack_id })
                }
                _ => Ok(self.on_new_ack(ack_id)),
            },
        }
    }

    fn on_new_ack(&mut self, ack_id: i32) -> Outcome {
        self.dup_acks = 0;
        self.last_ack = Some(ack_id);

        let slide = self.window.slide(ack_id, Instant::now());
        for rtt in &slide.rtts {
            self.rtt.record(*rtt);
        }
        if slide.acked > 0 {
            self.base_timeouts = 0;
            self.cc.on_ack(slide.acked, &self.rtt);
            self.record_cwnd(CwndReason::NewAck);
        }

        debug!(
            ack_id,
            acked = slide.acked,
            base = self.window.base(),
            next = self.window.next(),
            cwnd = self.cc.window(),
            ssthresh = ?self.cc.ssthresh(),
            phase = ?self.cc.phase(),
            "收到新的累计 ACK"
        );
        Outcome::NewAck {
            ack_id,
            acked: slide.acked,
        }
    }

    fn on_dup_ack(&mut self, ack_id: i32) -> Result<Outcome> {
        self.stats.duplicate_acks += 1;
        self.dup_acks = self.dup_acks.saturating_add(1);
        let count = self.dup_acks;
        if !self.cc.fast_retransmit() || count < self.cfg.fast_retransmit_threshold {
            trace!(ack_id, count, "重复 ACK");
            return Ok(Outcome::DupAck { ack_id, count });
        }

        self.dup_acks = 0;
        let base = self.window.base();
        if !self.window.is_complete() {
            self.transmit(base)?;
        }
        self.cc.on_fast_retransmit();
        self.stats.fast_retransmits += 1;
        self.record_cwnd(CwndReason::FastRetransmit);
        warn!(
            ack_id,
            base,
            cwnd = self.cc.window(),
            ssthresh = ?self.cc.ssthresh(),
            "⚡ 快速重传"
        );
        Ok(Outcome::FastRetransmit { ack_id })
    }

    fn on_timeout(&mut self) -> Result<Outcome> {
        self.stats.timeouts += 1;
        self.base_timeouts += 1;
        if let Some(limit) = self.cc.retry_limit() {
            if self.base_timeouts > limit {
                let seq = self
                    .window
                    .segment(self.window.base())
                    .map_or(-1, Segment::seq);
                return Err(Error::RetriesExhausted {
                    seq,
                    retries: self.base_timeouts,
                });
            }
        }

        self.cc.on_timeout();
        self.dup_acks = 0;
        self.window.rewind();
        self.record_cwnd(CwndReason::Timeout);
        warn!(
            base = self.window.base(),
            attempt = self.base_timeouts,
            cwnd = self.cc.window(),
            ssthresh = ?self.cc.ssthresh(),
            "⏰ ACK 超时，从 base 重发"
        );
        Ok(Outcome::Timeout)
    }

    /// 所有段已确认：只等待 fin。超时会重发 EOF 段促使接收端再次宣告结束。
    fn await_fin(&mut self) -> Result<i32> {
        debug!("所有段已确认，等待 fin");
        let eof = self.window.len().saturating_sub(1);
        let mut timeouts = 0;
        loop {
            let received = self
                .link
                .recv(&mut self.recv_buf, self.cfg.ack_timeout)
                .map_err(Error::Recv)?;
            let Some(n) = received else {
                timeouts += 1;
                self.stats.timeouts += 1;
                if timeouts > self.cfg.fin_wait_timeouts {
                    return Err(Error::FinTimeout { timeouts });
                }
                warn!(timeouts, "等待 fin 超时，重发 EOF 段");
                self.transmit(eof)?;
                continue;
            };
            timeouts = 0;
            let ack = decode_ack(&self.recv_buf[..n]);
            if ack.kind() == AckKind::Fin {
                return Ok(ack.ack_id);
            }
            self.stats.stale_acks += 1;
            trace!(ack_id = ack.ack_id, "等待 fin 期间忽略 ACK");
        }
    }

    fn finish(&mut self, ack_id: i32) -> Result<TransferReport> {
        self.send_fin_ack(ack_id)?;
        let elapsed = self.started.elapsed();
        if !self.cfg.fin_linger.is_zero() {
            self.linger();
        }

        self.stats.final_cwnd = self.cc.window();
        let report = TransferReport {
            policy: self.cc.policy(),
            total_bytes: self.window.total_bytes(),
            elapsed_secs: elapsed.as_secs_f64(),
            rtts: self.rtt.samples().to_vec(),
            stats: self.stats.clone(),
            cwnd_trace: self.cwnd_log.clone().unwrap_or_default(),
        };
        info!(
            total_bytes = report.total_bytes,
            elapsed_secs = report.elapsed_secs,
            rtt_samples = report.rtts.len(),
            retransmissions = report.stats.retransmissions,
            "✅ 传输完成"
        );
        Ok(report)
    }

    fn send_fin_ack(&mut self, ack_id: i32) -> Result<()> {
        self.link
            .send(&encode_fin_ack(ack_id))
            .map_err(|source| Error::Send {
                seq: ack_id,
                source,
            })?;
        self.stats.fin_acks_sent += 1;
        debug!(ack_id, "回复 FIN/ACK");
        Ok(())
    }

    /// 回复 FIN/ACK 后继续监听一段时间，对每个重复的 fin 再回复一次。
    /// 此时传输已经完成，链路错误只记录不上抛。
    fn linger(&mut self) {
        let deadline = Instant::now() + self.cfg.fin_linger;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return;
            }
            let n = match self.link.recv(&mut self.recv_buf, remaining) {
                Ok(Some(n)) => n,
                Ok(None) => return,
                Err(e) => {
                    warn!(error = %e, "linger 期间接收失败");
                    return;
                }
            };
            let ack = decode_ack(&self.recv_buf[..n]);
            if ack.kind() != AckKind::Fin {
                continue;
            }
            if let Err(e) = self.send_fin_ack(ack.ack_id) {
                warn!(error = %e, "linger 期间回复 FIN/ACK 失败");
                return;
            }
        }
    }

    fn record_cwnd(&mut self, reason: CwndReason) {
        let Some(log) = &mut self.cwnd_log else {
            return;
        };
        log.push(CwndSample {
            elapsed_secs: self.started.elapsed().as_secs_f64(),
            cwnd: self.cc.window(),
            ssthresh: self.cc.ssthresh(),
            phase: self.cc.phase(),
            reason,
        });
    }
}

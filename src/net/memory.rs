//! 内存链路：确定性地驱动发送端，不依赖真实 socket 和墙钟等待。
//!
//! 两种应答方式：
//! - [`MemoryLink::receiver`]：内置一个只接受按序数据的累计 ACK 接收端，
//!   收到 EOF 后回 `ack` + `fin`；可以指定某些序号的首次发送丢失。
//! - [`MemoryLink::scripted`]：按预先给定的顺序逐个交付应答，与发出的内容无关。
//!
//! 接收队列为空时 `recv` 立即返回超时；连续空转超过上限后返回 I/O 错误，
//! 防止测试在永远等不到应答的策略上死循环。

use std::collections::{HashSet, VecDeque};
use std::io;
use std::time::Duration;

use super::link::DatagramLink;
use super::packet::{FIN_ACK, decode, encode};

/// 连续超时达到该次数后，`recv` 返回错误
pub const DEFAULT_MAX_IDLE: u32 = 64;

/// 累计确认应答
pub fn ack_datagram(ack_id: i32) -> Vec<u8> {
    encode(ack_id, b"ack")
}

/// 流结束应答
pub fn fin_datagram(ack_id: i32) -> Vec<u8> {
    encode(ack_id, b"fin")
}

#[derive(Debug, Default)]
struct ReceiverModel {
    expected: i64,
    finished: bool,
    lose_once: HashSet<i32>,
}

impl ReceiverModel {
    fn on_datagram(&mut self, datagram: &[u8], inbox: &mut VecDeque<Vec<u8>>) {
        let Some((seq, payload)) = decode(datagram) else {
            return;
        };
        if !payload.starts_with(FIN_ACK) && self.lose_once.remove(&seq) {
            return;
        }
        if self.finished {
            // 对 EOF 重传再次宣告结束；FIN/ACK 本身不需要应答
            if !payload.starts_with(FIN_ACK) {
                inbox.push_back(fin_datagram(self.expected as i32));
            }
            return;
        }
        if i64::from(seq) == self.expected {
            self.expected += payload.len() as i64;
            if payload.is_empty() {
                self.finished = true;
                inbox.push_back(ack_datagram(self.expected as i32));
                inbox.push_back(fin_datagram(self.expected as i32));
                return;
            }
        }
        inbox.push_back(ack_datagram(self.expected as i32));
    }
}

#[derive(Debug)]
pub struct MemoryLink {
    receiver: Option<ReceiverModel>,
    inbox: VecDeque<Vec<u8>>,
    sent: Vec<Vec<u8>>,
    send_budget: Option<usize>,
    idle: u32,
    max_idle: u32,
    timeouts: u32,
}

impl MemoryLink {
    /// 内置累计 ACK 接收端
    pub fn receiver() -> Self {
        Self::with_receiver(Some(ReceiverModel::default()), VecDeque::new())
    }

    /// 按顺序交付给定的应答数据报
    pub fn scripted<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        Self::with_receiver(None, replies.into_iter().collect())
    }

    fn with_receiver(receiver: Option<ReceiverModel>, inbox: VecDeque<Vec<u8>>) -> Self {
        Self {
            receiver,
            inbox,
            sent: Vec::new(),
            send_budget: None,
            idle: 0,
            max_idle: DEFAULT_MAX_IDLE,
            timeouts: 0,
        }
    }

    /// 序号为 `seq` 的下一次发送在链路上丢失（仅对内置接收端生效）
    pub fn lose_once(mut self, seq: i32) -> Self {
        if let Some(rx) = self.receiver.as_mut() {
            rx.lose_once.insert(seq);
        }
        self
    }

    /// 只允许成功发送 `n` 个数据报，之后的发送返回错误
    pub fn fail_sends_after(mut self, n: usize) -> Self {
        self.send_budget = Some(n);
        self
    }

    pub fn max_idle(mut self, n: u32) -> Self {
        self.max_idle = n;
        self
    }

    /// 追加一个待交付的应答
    pub fn push_reply(&mut self, datagram: Vec<u8>) {
        self.inbox.push_back(datagram);
    }

    /// 发送端发出的所有数据报（含重传与 FIN/ACK）
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    /// 发出的数据段序号，按发送顺序，不含 FIN/ACK
    pub fn sent_seqs(&self) -> Vec<i32> {
        self.sent
            .iter()
            .filter_map(|d| decode(d))
            .filter(|(_, payload)| !payload.starts_with(FIN_ACK))
            .map(|(seq, _)| seq)
            .collect()
    }

    /// 发出的 FIN/ACK 的序号字段
    pub fn fin_acks(&self) -> Vec<i32> {
        self.sent
            .iter()
            .filter_map(|d| decode(d))
            .filter(|(_, payload)| payload.starts_with(FIN_ACK))
            .map(|(seq, _)| seq)
            .collect()
    }

    /// 按序送达给内置接收端的字节数
    pub fn delivered_bytes(&self) -> Option<i64> {
        self.receiver.as_ref().map(|rx| rx.expected)
    }

    /// `recv` 返回超时的次数
    pub fn timeouts(&self) -> u32 {
        self.timeouts
    }

    pub fn pending_replies(&self) -> usize {
        self.inbox.len()
    }
}

impl DatagramLink for MemoryLink {
    fn send(&mut self, datagram: &[u8]) -> io::Result<()> {
        if let Some(budget) = self.send_budget.as_mut() {
            if *budget == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    "memory link refused send",
                ));
            }
            *budget -= 1;
        }
        self.sent.push(datagram.to_vec());
        if let Some(rx) = self.receiver.as_mut() {
            rx.on_datagram(datagram, &mut self.inbox);
        }
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8], _timeout: Duration) -> io::Result<Option<usize>> {
        let Some(datagram) = self.inbox.pop_front() else {
            self.timeouts += 1;
            self.idle += 1;
            if self.idle > self.max_idle {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "memory link idle for too long",
                ));
            }
            return Ok(None);
        };
        self.idle = 0;
        let n = datagram.len().min(buf.len());
        buf[..n].copy_from_slice(&datagram[..n]);
        Ok(Some(n))
    }
}

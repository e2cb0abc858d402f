//! 报文编解码
//!
//! 线上格式：4 字节大端有符号序号字段 + 原始载荷，一个 UDP 数据报就是一个报文，
//! 长度由数据报边界隐式给出，不带校验和。
//!
//! 同一个序号字段在两个方向上复用：
//! - 发送端 → 接收端：段的字节偏移
//! - 接收端 → 发送端：累计 ACK（下一个期望的字节偏移）

/// 单个数据报的最大长度（字节）
pub const PACKET_SIZE: usize = 1024;
/// 序号字段长度（字节）
pub const SEQ_ID_SIZE: usize = 4;
/// 非 EOF 段的最大载荷
pub const MAX_SEGMENT_SIZE: usize = PACKET_SIZE - SEQ_ID_SIZE;
/// 终止握手中发送端回复的载荷前缀
pub const FIN_ACK: &[u8] = b"FIN/ACK";

/// 编码一个报文：序号 + 载荷。
pub fn encode(seq: i32, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(SEQ_ID_SIZE + payload.len());
    out.extend_from_slice(&seq.to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// 对接收端 `fin` 的回复，序号字段回显对方的 ack_id。
pub fn encode_fin_ack(ack_id: i32) -> Vec<u8> {
    encode(ack_id, FIN_ACK)
}

/// 拆出序号与载荷；不足 4 字节时返回 `None`。
pub fn decode(datagram: &[u8]) -> Option<(i32, &[u8])> {
    let (head, payload) = datagram.split_first_chunk::<SEQ_ID_SIZE>()?;
    Some((i32::from_be_bytes(*head), payload))
}

/// ACK 报文的分类（按文本前缀）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckKind {
    /// `ack…`：累计确认
    Ack,
    /// `fin…`：接收端宣告流结束
    Fin,
    /// 其它任何文本：视为陈旧/重复，不推进状态
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckPacket {
    pub ack_id: i32,
    pub message: String,
}

impl AckPacket {
    pub fn kind(&self) -> AckKind {
        if self.message.starts_with("ack") {
            AckKind::Ack
        } else if self.message.starts_with("fin") {
            AckKind::Fin
        } else {
            AckKind::Other
        }
    }
}

/// 解码 ACK 数据报。永不失败：非法 UTF-8 字节被直接丢弃，
/// 过短的数据报得到 `ack_id = -1` 和空文本（归类为 [`AckKind::Other`]）。
pub fn decode_ack(datagram: &[u8]) -> AckPacket {
    let Some((ack_id, rest)) = decode(datagram) else {
        return AckPacket {
            ack_id: -1,
            message: String::new(),
        };
    };
    let mut message = String::with_capacity(rest.len());
    for chunk in rest.utf8_chunks() {
        message.push_str(chunk.valid());
    }
    AckPacket { ack_id, message }
}

//! 分段器
//!
//! 把载荷切成不超过 MSS 的段，序号是字节偏移（不是包编号），末尾追加一个
//! 长度为 0 的 EOF 段，其偏移等于载荷总长度。

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// 载荷第一个字节在字节流中的位置
    pub offset: u32,
    pub payload: Vec<u8>,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_eof(&self) -> bool {
        self.payload.is_empty()
    }

    /// 该段之后的下一个字节偏移；累计 ACK ≥ end 即表示该段已送达。
    pub fn end(&self) -> u32 {
        // 总长度在分段时已校验不超过 i32::MAX
        self.offset + self.payload.len() as u32
    }

    /// 线上序号字段
    pub fn seq(&self) -> i32 {
        self.offset as i32
    }

    /// 累计 ACK 是否覆盖了整个段
    pub fn covered_by(&self, ack_id: i32) -> bool {
        i64::from(ack_id) >= i64::from(self.end())
    }
}

/// 按 `max_segment` 切分载荷，返回的最后一个元素总是 EOF 段。
pub fn segment_payload(data: &[u8], max_segment: usize) -> Result<Vec<Segment>> {
    if max_segment == 0 {
        return Err(Error::InvalidConfig(
            "maximum segment size must be positive".to_string(),
        ));
    }
    if data.is_empty() {
        return Err(Error::EmptyPayload);
    }
    if data.len() > i32::MAX as usize {
        return Err(Error::PayloadTooLarge { len: data.len() });
    }

    let mut segments = Vec::with_capacity(data.len().div_ceil(max_segment) + 1);
    let mut offset = 0_u32;
    for chunk in data.chunks(max_segment) {
        segments.push(Segment {
            offset,
            payload: chunk.to_vec(),
        });
        offset += chunk.len() as u32;
    }
    segments.push(Segment {
        offset,
        payload: Vec::new(),
    });
    Ok(segments)
}

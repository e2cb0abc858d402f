//! 错误类型
//!
//! 所有致命错误都沿调用栈返回到 `main`，由二进制打印到 stderr 并以非零码退出。
//! 超时、重复 ACK、无法识别的 ACK 文本都不是错误，由驱动循环自行处理。

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// 没有任何候选路径指向存在的载荷文件
    #[error("could not find payload file (tried {})", join_paths(.tried))]
    NoPayload { tried: Vec<PathBuf> },

    /// 载荷为空：拒绝“成功地”传输 0 字节
    #[error("payload is empty")]
    EmptyPayload,

    #[error("failed to read payload file {}: {source}", .path.display())]
    PayloadRead { path: PathBuf, source: io::Error },

    /// 载荷长度超出 4 字节有符号序号字段的表示范围
    #[error("payload of {len} bytes does not fit the signed 32-bit sequence field")]
    PayloadTooLarge { len: usize },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("failed to read config file {}: {source}", .path.display())]
    ConfigRead { path: PathBuf, source: io::Error },

    #[error("failed to parse config file {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to bind UDP socket: {0}")]
    Bind(#[source] io::Error),

    /// 底层发送失败：不在这一层重试
    #[error("failed to send packet (seq_id: {seq}): {source}")]
    Send { seq: i32, source: io::Error },

    #[error("failed to receive datagram: {0}")]
    Recv(#[source] io::Error),

    /// Stop-and-Wait 在同一个段上连续超时次数超过上限
    #[error("receiver did not respond (seq_id {seq} timed out {retries} times)")]
    RetriesExhausted { seq: i32, retries: u32 },

    /// 所有段均已确认，但接收端始终没有发送 fin
    #[error("receiver never sent fin ({timeouts} consecutive timeouts after EOF)")]
    FinTimeout { timeouts: u32 },

    #[error("failed to encode transfer report: {0}")]
    ReportEncode(#[source] serde_json::Error),

    #[error("failed to write transfer report {}: {source}", .path.display())]
    ReportWrite { path: PathBuf, source: io::Error },
}

fn join_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "no candidates".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

//! 可靠传输引擎：发送窗口 + 连接驱动

mod driver;
mod report;
mod window;

pub use driver::{Outcome, Sender};
pub use report::{CwndReason, CwndSample, TransferReport, TransferStats};
pub use window::{Slide, TxWindow};

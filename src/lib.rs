pub mod cc;
pub mod config;
pub mod error;
pub mod metrics;
pub mod net;
pub mod payload;
pub mod sender;

pub use error::{Error, Result};

#[cfg(test)]
mod test;

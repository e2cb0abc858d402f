//! 载荷来源
//!
//! 依次尝试候选路径（显式指定、`TEST_FILE`、`PAYLOAD_FILE`），读取第一个存在的
//! 文件。一个都找不到或文件为空都是致命的启动错误。

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// 按顺序查找载荷文件的环境变量
pub const PAYLOAD_ENV_VARS: [&str; 2] = ["TEST_FILE", "PAYLOAD_FILE"];

#[derive(Debug, Clone, Default)]
pub struct PayloadSource {
    candidates: Vec<PathBuf>,
}

impl PayloadSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// 显式路径优先，其后是环境变量中非空的路径
    pub fn from_env(explicit: Option<PathBuf>) -> Self {
        let mut src = Self::new();
        if let Some(p) = explicit {
            src = src.with_candidate(p);
        }
        for var in PAYLOAD_ENV_VARS {
            if let Some(v) = env::var_os(var).filter(|v| !v.is_empty()) {
                src = src.with_candidate(v);
            }
        }
        src
    }

    pub fn with_candidate(mut self, path: impl Into<PathBuf>) -> Self {
        self.candidates.push(path.into());
        self
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// 第一个存在的候选路径（已展开 `~/`）
    pub fn resolve(&self) -> Option<PathBuf> {
        self.candidates
            .iter()
            .map(|p| expand_home(p))
            .find(|p| p.is_file())
    }

    pub fn load(&self) -> Result<(PathBuf, Vec<u8>)> {
        let Some(path) = self.resolve() else {
            return Err(Error::NoPayload {
                tried: self.candidates.clone(),
            });
        };
        let data = fs::read(&path).map_err(|source| Error::PayloadRead {
            path: path.clone(),
            source,
        })?;
        if data.is_empty() {
            return Err(Error::EmptyPayload);
        }
        debug!(path = %path.display(), bytes = data.len(), "载荷已读取");
        Ok((path, data))
    }
}

fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::core::error::{DBError, DBResult};
use crate::query::grouper::GrouperAlias;
use crate::query::sorter::SorterAlias;

/// 匹配结果的交付方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ExecutionMode {
    /// 先物化完整的结果表，再分组 / 排序
    #[default]
    Materialized,
    /// 逐行流入每个工作线程的本地状态，最后一个线程结束时合并
    HalfStreamed,
    /// 逐行流入所有工作线程共享的状态
    Streamed,
}

impl ExecutionMode {
    pub const ALL: [ExecutionMode; 3] = [
        ExecutionMode::Materialized,
        ExecutionMode::HalfStreamed,
        ExecutionMode::Streamed,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ExecutionMode::Materialized => "materialized",
            ExecutionMode::HalfStreamed => "half_streamed",
            ExecutionMode::Streamed => "streamed",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ExecutionMode {
    type Err = DBError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        ExecutionMode::ALL
            .into_iter()
            .find(|mode| mode.name() == name)
            .ok_or_else(|| DBError::config(format!("unknown execution mode '{}'", name)))
    }
}

impl TryFrom<String> for ExecutionMode {
    type Error = DBError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}

impl From<ExecutionMode> for String {
    fn from(mode: ExecutionMode) -> Self {
        mode.name().to_string()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ExecutionConfig {
    pub thread_count: usize,
    /// 每次从分发器领取的起点顶点数
    pub vertices_per_thread: usize,
    pub grouper: GrouperAlias,
    pub sorter: SorterAlias,
    pub mode: ExecutionMode,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            thread_count: num_cpus::get(),
            vertices_per_thread: 512,
            grouper: GrouperAlias::default(),
            sorter: SorterAlias::default(),
            mode: ExecutionMode::default(),
        }
    }
}

impl ExecutionConfig {
    pub fn validate(&self) -> DBResult<()> {
        if self.thread_count == 0 {
            return Err(DBError::config("thread_count must be at least 1"));
        }
        if self.vertices_per_thread == 0 {
            return Err(DBError::config("vertices_per_thread must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub dir: String,
    pub file: String,
    pub max_file_size: u64,
    pub max_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: "logs".to_string(),
            file: "pgql".to_string(),
            max_file_size: 100 * 1024 * 1024, // 100MB
            max_files: 5,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub execution: ExecutionConfig,
    pub log: LogConfig,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> DBResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.execution.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> DBResult<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

//! 查询层错误类型
//!
//! 涵盖查询解析、规划和执行过程中的错误

use thiserror::Error;

/// 查询操作结果类型别名
pub type QueryResult<T> = Result<T, QueryError>;

/// 查询层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// 解析器无法消费全部 token；附带出错 token 的下标与完整 token 转储
    #[error("解析错误: {message} (token {position}); tokens: {tokens}")]
    Parse {
        message: String,
        position: usize,
        tokens: String,
    },

    #[error("unknown aggregate function '{0}'")]
    UnknownAggregate(String),

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("unknown property '{0}'")]
    UnknownProperty(String),

    #[error("unknown table '{0}'")]
    UnknownTable(String),

    #[error("无效查询: {0}")]
    InvalidQuery(String),

    #[error("unsupported expression: {0}")]
    UnsupportedExpression(String),

    #[error("执行错误: {0}")]
    Execution(String),
}

impl QueryError {
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        QueryError::InvalidQuery(message.into())
    }

    pub fn execution<S: Into<String>>(message: S) -> Self {
        QueryError::Execution(message.into())
    }
}

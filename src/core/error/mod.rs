//! 统一错误处理系统
//!
//! ## 设计理念
//!
//! 1. **按层划分**：图构建错误（加载期）与查询错误（解析、规划、执行期）分开定义
//! 2. **缺值不是错误**：属性缺失通过 `Option` 表达，参与 NULL 排序与哈希规则，从不构造错误
//! 3. **统一接口**：`DBResult<T>` 提供统一的返回类型，简化错误传播

use thiserror::Error;

pub mod graph;
pub mod query;

pub use graph::{GraphError, GraphResult};
pub use query::{QueryError, QueryResult};

/// 统一的引擎错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DBError {
    #[error("图构建错误: {0}")]
    Graph(#[from] GraphError),

    #[error("查询错误: {0}")]
    Query(#[from] QueryError),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("IO错误: {0}")]
    Io(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 统一的结果类型
pub type DBResult<T> = Result<T, DBError>;

impl DBError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        DBError::Config(message.into())
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        DBError::Internal(message.into())
    }
}

// ==================== 外部错误转换实现 ====================

impl From<std::io::Error> for DBError {
    fn from(err: std::io::Error) -> Self {
        DBError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for DBError {
    fn from(err: serde_json::Error) -> Self {
        DBError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for DBError {
    fn from(err: toml::de::Error) -> Self {
        DBError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for DBError {
    fn from(err: toml::ser::Error) -> Self {
        DBError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_graph_error() {
        let err: DBError = GraphError::NonPositiveVertexId(-3).into();
        assert!(matches!(err, DBError::Graph(GraphError::NonPositiveVertexId(-3))));
        assert!(err.to_string().contains("-3"));
    }

    #[test]
    fn test_from_query_error() {
        let err: DBError = QueryError::UnknownAggregate("median".to_string()).into();
        assert!(err.to_string().contains("median"));
    }
}

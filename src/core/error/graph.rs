//! 图构建层错误类型
//!
//! 这些错误只会在加载期出现，属于不可恢复的构建不变量违背

use thiserror::Error;

/// 图构建操作结果类型别名
pub type GraphResult<T> = Result<T, GraphError>;

/// 图构建错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("duplicate element id {0}")]
    DuplicateId(i64),

    #[error("vertex id must be positive, got {0}")]
    NonPositiveVertexId(i64),

    #[error("edge id must be positive, got {0}")]
    NonPositiveEdgeId(i64),

    #[error("unknown table '{0}'")]
    UnknownTable(String),

    #[error("duplicate table '{0}'")]
    DuplicateTable(String),

    #[error("unknown property type token '{0}'")]
    UnknownPropertyType(String),

    #[error("property '{property}' is not declared on table '{table}'")]
    UndeclaredProperty { table: String, property: String },

    #[error("property '{property}' already registered with type {existing}, cannot redeclare as {requested}")]
    ConflictingPropertyType {
        property: String,
        existing: String,
        requested: String,
    },

    #[error("property '{property}' expects a value of type {expected}")]
    PropertyTypeMismatch { property: String, expected: String },

    #[error("edge {edge} references missing vertex {vertex}")]
    MissingEndpoint { edge: i64, vertex: i64 },

    #[error("element {0} is not present in its table")]
    MissingElement(i64),
}

//! 核心类型：错误体系与标量值

pub mod error;
pub mod value;

pub use error::{DBError, DBResult, GraphError, QueryError};
pub use value::{ScalarType, Value};

//! 表达式求值
//!
//! 带静态类型的表达式树、聚合函数及其累加器，以及表达式读取数据的 `RowSource` 抽象。

pub mod aggregate;
pub mod holder;
pub mod node;
pub mod source;

pub use aggregate::{Aggregate, AggregateBucketResult, AggregateFunction, AggregateListResults};
pub use holder::ExpressionHolder;
pub use node::ExprNode;
pub use source::{RowSource, SingleRow};

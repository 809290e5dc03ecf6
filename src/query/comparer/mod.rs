//! 行比较器、哈希器与分组键
//!
//! 带缓存的组件只能在单个线程内使用；跨线程共享的是 `KeyTemplate`。

pub mod expression_comparer;
pub mod group_key;
pub mod hasher;
pub mod row_comparer;
pub mod template;

pub use expression_comparer::{compare_optional, ComparisonKey, ExpressionComparer};
pub use group_key::{GroupDictKey, RowEqualityComparerGroupKey};
pub use hasher::{table_hash, RowHasher};
pub use row_comparer::RowComparer;
pub use template::KeyTemplate;

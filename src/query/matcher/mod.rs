//! 深度优先模式匹配
//!
//! 单线程与并行（按起点顶点区间分发）两种搜索，物化与流式两种输出。

pub mod dfs;
pub mod parallel;
pub mod pattern;
pub mod processor;

pub use dfs::DfsMatcher;
pub use parallel::{PatternMatcher, VertexDistributor};
pub use pattern::{EdgeDirection, MatchPattern, PatternChain, PatternStep};
pub use processor::{HalfCloseCounter, ResultProcessor, TableCollector};

//! 只读图存储
//!
//! 图在加载期构建一次，之后在查询执行期间只读共享。

pub mod builder;
pub mod graph;
pub mod loader;
pub mod table;

pub use builder::GraphBuilder;
pub use graph::{Edge, ElementRef, Graph, Vertex};
pub use loader::{from_json_str, load_graph};
pub use table::{PropertyCatalog, PropertyColumn, PropertyId, Table, TableId};

//! 表达式求值的数据源
//!
//! 结果表、分组结果以及流式模式下的单行都实现 `RowSource`，
//! 表达式只通过行下标访问数据，从不复制行。

use crate::core::Value;
use crate::storage::{ElementRef, Graph};

pub trait RowSource {
    fn graph(&self) -> &Graph;

    /// 行下标处的元素数组；下标越界时返回空切片
    fn row(&self, index: usize) -> &[ElementRef];

    fn row_count(&self) -> usize;

    /// 分组结果中聚合值的读取入口，普通结果表没有聚合值
    fn aggregate_value(&self, _index: usize, _position: usize) -> Option<Value> {
        None
    }
}

/// 流式模式下尚未物化的单行
pub struct SingleRow<'a> {
    graph: &'a Graph,
    row: &'a [ElementRef],
}

impl<'a> SingleRow<'a> {
    pub fn new(graph: &'a Graph, row: &'a [ElementRef]) -> Self {
        Self { graph, row }
    }
}

impl RowSource for SingleRow<'_> {
    fn graph(&self) -> &Graph {
        self.graph
    }

    fn row(&self, _index: usize) -> &[ElementRef] {
        self.row
    }

    fn row_count(&self) -> usize {
        1
    }
}

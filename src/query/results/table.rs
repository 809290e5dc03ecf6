//! 匹配结果表
//!
//! 行以扁平数组存放（每行 `width` 个元素），行下标是比较器、哈希器和排序器
//! 使用的稳定句柄。排序只产生一个下标置换，通过 `add_order` 附加为逻辑视图。

use std::sync::Arc;

use crate::expression::RowSource;
use crate::storage::{ElementRef, Graph};

#[derive(Debug, Clone)]
pub struct ResultTable {
    graph: Arc<Graph>,
    width: usize,
    elements: Vec<ElementRef>,
    rows: usize,
    order: Option<Vec<usize>>,
}

impl ResultTable {
    pub fn new(graph: Arc<Graph>, width: usize) -> Self {
        Self {
            graph,
            width,
            elements: Vec::new(),
            rows: 0,
            order: None,
        }
    }

    pub fn with_capacity(graph: Arc<Graph>, width: usize, rows: usize) -> Self {
        Self {
            graph,
            width,
            elements: Vec::with_capacity(width * rows),
            rows: 0,
            order: None,
        }
    }

    pub fn graph_arc(&self) -> &Arc<Graph> {
        &self.graph
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// 追加一行，返回其行下标
    #[inline]
    pub fn add_row(&mut self, row: &[ElementRef]) -> usize {
        debug_assert_eq!(row.len(), self.width);
        self.elements.extend_from_slice(row);
        self.rows += 1;
        self.rows - 1
    }

    /// 把另一张同宽度表的行整体追加到末尾，返回追加前的行数
    pub fn append(&mut self, other: &ResultTable) -> usize {
        debug_assert_eq!(other.width, self.width);
        let offset = self.rows;
        self.elements.extend_from_slice(&other.elements);
        self.rows += other.rows;
        offset
    }

    /// 清空所有行，保留已分配的空间
    pub fn clear(&mut self) {
        self.elements.clear();
        self.rows = 0;
        self.order = None;
    }

    /// 附加排序后的行下标置换
    pub fn add_order(&mut self, order: Vec<usize>) {
        debug_assert_eq!(order.len(), self.rows);
        self.order = Some(order);
    }

    pub fn order(&self) -> Option<&[usize]> {
        self.order.as_deref()
    }

    /// 按最终顺序给出行下标
    pub fn ordered_indices(&self) -> Vec<usize> {
        match &self.order {
            Some(order) => order.clone(),
            None => (0..self.rows).collect(),
        }
    }

    /// 按最终顺序遍历各行
    pub fn iter(&self) -> impl Iterator<Item = &[ElementRef]> + '_ {
        self.ordered_indices().into_iter().map(move |i| self.row(i))
    }

    pub fn number_of_matched_elements(&self) -> usize {
        self.rows * self.width
    }
}

impl RowSource for ResultTable {
    fn graph(&self) -> &Graph {
        &self.graph
    }

    #[inline]
    fn row(&self, index: usize) -> &[ElementRef] {
        let start = index * self.width;
        self.elements.get(start..start + self.width).unwrap_or(&[])
    }

    fn row_count(&self) -> usize {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::GraphBuilder;

    fn graph() -> Arc<Graph> {
        let mut builder = GraphBuilder::new();
        builder.add_table("V").expect("add_table should succeed");
        for id in 1..=3 {
            builder
                .add_vertex(id, "V", std::iter::empty())
                .expect("add_vertex should succeed");
        }
        Arc::new(builder.build().expect("build should succeed"))
    }

    #[test]
    fn test_rows_and_order() {
        let mut table = ResultTable::new(graph(), 2);
        table.add_row(&[ElementRef::Vertex(0), ElementRef::Vertex(1)]);
        table.add_row(&[ElementRef::Vertex(2), ElementRef::Vertex(0)]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.number_of_matched_elements(), 4);

        table.add_order(vec![1, 0]);
        let firsts: Vec<ElementRef> = table.iter().map(|r| r[0]).collect();
        assert_eq!(firsts, vec![ElementRef::Vertex(2), ElementRef::Vertex(0)]);
        assert_eq!(table.row(0)[0], ElementRef::Vertex(0));
    }

    #[test]
    fn test_zero_width_rows_are_counted() {
        let mut table = ResultTable::new(graph(), 0);
        table.add_row(&[]);
        table.add_row(&[]);
        assert_eq!(table.row_count(), 2);
        assert!(table.row(1).is_empty());
    }

    #[test]
    fn test_append_offsets() {
        let g = graph();
        let mut a = ResultTable::new(Arc::clone(&g), 1);
        a.add_row(&[ElementRef::Vertex(0)]);
        let mut b = ResultTable::new(g, 1);
        b.add_row(&[ElementRef::Vertex(1)]);
        b.add_row(&[ElementRef::Vertex(2)]);
        assert_eq!(a.append(&b), 1);
        assert_eq!(a.row_count(), 3);
        assert_eq!(a.row(2), &[ElementRef::Vertex(2)]);
    }
}

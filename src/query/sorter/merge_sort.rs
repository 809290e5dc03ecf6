//! 稳定的下标排序
//!
//! 只重排行下标置换，不移动行数据。相等的键保持原有相对顺序。

use rayon::slice::ParallelSliceMut;

use crate::core::error::{DBError, DBResult};
use crate::expression::RowSource;
use crate::query::comparer::KeyTemplate;

/// 不小于该长度的输入才启用并行排序
pub const PARALLEL_THRESHOLD: usize = 4096;

#[derive(Debug, Clone)]
pub struct MergeSorter {
    template: KeyTemplate,
    thread_count: usize,
}

impl MergeSorter {
    pub fn new(template: KeyTemplate, thread_count: usize) -> Self {
        Self {
            template,
            thread_count: thread_count.max(1),
        }
    }

    /// 返回 `[0, row_count)` 排序后的置换
    pub fn sort<S>(&self, source: &S) -> DBResult<Vec<usize>>
    where
        S: RowSource + Sync + ?Sized,
    {
        let mut order: Vec<usize> = (0..source.row_count()).collect();
        if self.thread_count > 1 && order.len() >= PARALLEL_THRESHOLD {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.thread_count)
                .build()
                .map_err(|e| DBError::internal(format!("排序线程池创建失败: {}", e)))?;
            let template = &self.template;
            // par_sort_by 是稳定排序
            pool.install(|| order.par_sort_by(|&x, &y| template.compare(source, x, y)));
        } else {
            let comparer = self.template.row_comparer(true);
            order.sort_by(|&x, &y| comparer.compare(source, x, y));
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::{ScalarType, Value};
    use crate::expression::{ExprNode, ExpressionHolder};
    use crate::query::results::ResultTable;
    use crate::storage::{ElementRef, GraphBuilder, PropertyId};

    /// `count` 个顶点，score 只有 10 种取值，每 7 个缺一个
    fn repeated_scores(count: usize) -> (ResultTable, PropertyId) {
        let mut builder = GraphBuilder::new();
        builder.add_table("V").expect("add_table should succeed");
        let score = builder
            .declare_property("V", "score", ScalarType::Int)
            .expect("declare_property should succeed");
        for i in 0..count {
            let props: Vec<(&str, Value)> = if i % 7 == 3 {
                Vec::new()
            } else {
                vec![("score", Value::Int((i * 7919 % 10) as i64))]
            };
            builder
                .add_vertex(i as i64 + 1, "V", props)
                .expect("add_vertex should succeed");
        }
        let graph = Arc::new(builder.build().expect("build should succeed"));
        let mut table = ResultTable::new(graph, 1);
        for v in 0..count as u32 {
            table.add_row(&[ElementRef::Vertex(v)]);
        }
        (table, score)
    }

    fn template(score: PropertyId, descending: bool) -> KeyTemplate {
        let holder = Arc::new(ExpressionHolder::new(
            ExprNode::VariableProperty {
                slot: 0,
                property: score,
                ty: ScalarType::Int,
            },
            "x.score",
        ));
        KeyTemplate::for_order_by(&[(holder, descending)])
    }

    fn assert_stable(table: &ResultTable, score: PropertyId, order: &[usize], descending: bool) {
        let key = |row: usize| match table
            .graph_arc()
            .try_get_property_value(ElementRef::Vertex(row as u32), score)
        {
            Some(Value::Int(v)) => Some(v),
            _ => None,
        };
        for pair in order.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            match (key(a), key(b)) {
                (Some(x), Some(y)) if x == y => assert!(a < b, "相等键的行顺序被打乱: {} {}", a, b),
                (Some(x), Some(y)) => assert!(if descending { x > y } else { x < y }),
                (Some(_), None) => {}
                (None, None) => assert!(a < b),
                (None, Some(_)) => panic!("NULL 排在了非 NULL 之前"),
            }
        }
    }

    #[test]
    fn test_stable_on_equal_keys() {
        let (table, score) = repeated_scores(200);
        for descending in [false, true] {
            let order = MergeSorter::new(template(score, descending), 1)
                .sort(&table)
                .expect("sort should succeed");
            assert_eq!(order.len(), 200);
            assert_stable(&table, score, &order, descending);
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (table, score) = repeated_scores(PARALLEL_THRESHOLD * 2 + 17);
        let sequential = MergeSorter::new(template(score, true), 1)
            .sort(&table)
            .expect("sort should succeed");
        let parallel = MergeSorter::new(template(score, true), 4)
            .sort(&table)
            .expect("sort should succeed");
        assert_stable(&table, score, &parallel, true);
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_small_inputs() {
        let (empty, score) = repeated_scores(0);
        let order = MergeSorter::new(template(score, false), 4)
            .sort(&empty)
            .expect("sort should succeed");
        assert!(order.is_empty());

        let (single, score) = repeated_scores(1);
        let order = MergeSorter::new(template(score, false), 4)
            .sort(&single)
            .expect("sort should succeed");
        assert_eq!(order, vec![0]);
    }
}

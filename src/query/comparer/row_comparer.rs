//! 多键行比较器（ORDER BY）

use std::cmp::Ordering;

use crate::expression::RowSource;
use crate::query::comparer::expression_comparer::ExpressionComparer;

/// 按声明顺序依次比较各键，第一个不相等的结果胜出
#[derive(Debug)]
pub struct RowComparer {
    comparers: Vec<ExpressionComparer>,
}

impl RowComparer {
    pub fn new(comparers: Vec<ExpressionComparer>) -> Self {
        Self { comparers }
    }

    pub fn clone_with_cache(&self, cache_results: bool) -> Self {
        Self {
            comparers: self
                .comparers
                .iter()
                .map(|c| c.clone_with_cache(cache_results))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.comparers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comparers.is_empty()
    }

    #[inline]
    pub fn compare<S: RowSource + ?Sized>(&self, source: &S, x: usize, y: usize) -> Ordering {
        for comparer in &self.comparers {
            let ordering = comparer.compare(source, x, y);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

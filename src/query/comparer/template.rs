//! 可跨线程共享的键模板
//!
//! 模板本身不带缓存（`Send + Sync`），既提供无缓存的直接比较/判等/哈希，
//! 也负责为每个工作线程构造各自带缓存的比较器与哈希器。

use std::cmp::Ordering;
use std::sync::Arc;

use crate::core::error::{QueryError, QueryResult};
use crate::core::Value;
use crate::expression::{ExpressionHolder, RowSource};
use crate::query::comparer::expression_comparer::{ComparisonKey, ExpressionComparer};
use crate::query::comparer::group_key::RowEqualityComparerGroupKey;
use crate::query::comparer::hasher::{combine, value_hash, ExpressionHasher, RowHasher, HASH_SEED};
use crate::query::comparer::row_comparer::RowComparer;
use crate::storage::{ElementRef, Graph};

#[derive(Debug, Clone)]
pub struct KeyTemplate {
    keys: Arc<[ComparisonKey]>,
}

impl KeyTemplate {
    /// 分组键不能含聚合
    pub fn for_group_keys(exprs: &[Arc<ExpressionHolder>]) -> QueryResult<Self> {
        if let Some(expr) = exprs.iter().find(|e| e.contains_aggregate()) {
            return Err(QueryError::UnsupportedExpression(format!(
                "aggregate '{}' cannot be used as a grouping key",
                expr.text()
            )));
        }
        Ok(Self {
            keys: exprs
                .iter()
                .map(|e| ComparisonKey::new(Arc::clone(e), false))
                .collect(),
        })
    }

    /// 排序键，`true` 表示降序
    pub fn for_order_by(keys: &[(Arc<ExpressionHolder>, bool)]) -> Self {
        Self {
            keys: keys
                .iter()
                .map(|(e, descending)| ComparisonKey::new(Arc::clone(e), *descending))
                .collect(),
        }
    }

    pub fn keys(&self) -> &[ComparisonKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[inline]
    pub fn compare<S: RowSource + ?Sized>(&self, source: &S, x: usize, y: usize) -> Ordering {
        for key in self.keys.iter() {
            let ordering = key.compare(source, x, y);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    #[inline]
    pub fn equals<S: RowSource + ?Sized>(&self, source: &S, x: usize, y: usize) -> bool {
        self.keys.iter().all(|k| k.compare(source, x, y).is_eq())
    }

    #[inline]
    pub fn hash<S: RowSource + ?Sized>(&self, source: &S, row: usize) -> i32 {
        self.keys.iter().fold(HASH_SEED, |hash, key| {
            combine(hash, value_hash(key.expr().evaluate(source, row).as_ref()))
        })
    }

    /// 在尚未物化的行上求出全部键值
    pub fn evaluate_row(&self, graph: &Graph, row: &[ElementRef]) -> Vec<Option<Value>> {
        self.keys
            .iter()
            .map(|k| k.expr().evaluate_row(graph, row))
            .collect()
    }

    pub fn row_comparer(&self, cache_results: bool) -> RowComparer {
        RowComparer::new(self.expression_comparers(cache_results))
    }

    pub fn group_key_comparer(&self, cache_results: bool) -> RowEqualityComparerGroupKey {
        RowEqualityComparerGroupKey::new(self.expression_comparers(cache_results))
    }

    pub fn row_hasher(&self) -> RowHasher {
        RowHasher::new(
            self.keys
                .iter()
                .map(|k| ExpressionHasher::new(Arc::clone(k.expr())))
                .collect(),
        )
    }

    /// 一个工作线程的分组键判等器与哈希器，二者共享缓存
    pub fn worker_group_keys(&self) -> (RowEqualityComparerGroupKey, RowHasher) {
        let comparer = self.group_key_comparer(true);
        let mut hasher = self.row_hasher();
        hasher.set_cache(&comparer);
        (comparer, hasher)
    }

    fn expression_comparers(&self, cache_results: bool) -> Vec<ExpressionComparer> {
        self.keys
            .iter()
            .map(|k| ExpressionComparer::new(k.clone(), cache_results))
            .collect()
    }
}

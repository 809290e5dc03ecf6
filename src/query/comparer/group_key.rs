//! 分组字典键与键判等
//!
//! 哈希在插入前算好并存进键里，探测时不再重算；哈希冲突时用代表行重新求值判等。

use crate::expression::RowSource;
use crate::query::comparer::expression_comparer::ExpressionComparer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupDictKey {
    pub hash: i32,
    /// 代表行下标
    pub row: usize,
}

impl GroupDictKey {
    pub fn new(hash: i32, row: usize) -> Self {
        Self { hash, row }
    }
}

/// 比较两个分组键的代表行，遇到第一个不相等的键表达式即返回
#[derive(Debug)]
pub struct RowEqualityComparerGroupKey {
    comparers: Vec<ExpressionComparer>,
}

impl RowEqualityComparerGroupKey {
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

    pub fn comparers(&self) -> &[ExpressionComparer] {
        &self.comparers
    }

    /// 键已存哈希，直接返回
    #[inline]
    pub fn hash(&self, key: &GroupDictKey) -> i32 {
        key.hash
    }

    /// `existing` 为字典中已有的键，`candidate` 为正在探测的键
    #[inline]
    pub fn equals<S: RowSource + ?Sized>(
        &self,
        source: &S,
        existing: &GroupDictKey,
        candidate: &GroupDictKey,
    ) -> bool {
        if existing.hash != candidate.hash {
            return false;
        }
        self.comparers
            .iter()
            .all(|c| c.compare(source, existing.row, candidate.row).is_eq())
    }
}

//! 行哈希器
//!
//! djb2 组合：种子 5381，`hash = ((hash << 5) + hash) ^ h_i`，按声明的键顺序，
//! 使用回绕的 i32 运算；无值的表达式哈希为 0。

use std::sync::Arc;

use crate::core::Value;
use crate::expression::{ExpressionHolder, RowSource};
use crate::query::comparer::expression_comparer::SharedCache;
use crate::query::comparer::group_key::RowEqualityComparerGroupKey;

pub const HASH_SEED: i32 = 5381;

#[inline]
pub fn combine(hash: i32, value_hash: i32) -> i32 {
    hash.wrapping_shl(5).wrapping_add(hash) ^ value_hash
}

#[inline]
pub fn value_hash(value: Option<&Value>) -> i32 {
    value.map_or(0, Value::hash_code)
}

/// 把 32 位行哈希扩展为哈希表使用的 64 位哈希，高位参与控制字节
#[inline]
pub fn table_hash(hash: i32) -> u64 {
    (hash as u32 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

#[derive(Debug)]
pub struct ExpressionHasher {
    expr: Arc<ExpressionHolder>,
    cache: Option<SharedCache>,
}

impl ExpressionHasher {
    pub fn new(expr: Arc<ExpressionHolder>) -> Self {
        Self { expr, cache: None }
    }

    /// 求得的值写入比较器缓存的 y 槽位
    pub fn set_cache(&mut self, cache: Option<SharedCache>) {
        self.cache = cache;
    }

    #[inline]
    pub fn hash<S: RowSource + ?Sized>(&self, source: &S, row: usize) -> i32 {
        let value = self.expr.evaluate(source, row);
        let hash = value_hash(value.as_ref());
        if let Some(cache) = &self.cache {
            cache.borrow_mut().store_y(row, value);
        }
        hash
    }
}

#[derive(Debug)]
pub struct RowHasher {
    hashers: Vec<ExpressionHasher>,
}

impl RowHasher {
    pub fn new(hashers: Vec<ExpressionHasher>) -> Self {
        Self { hashers }
    }

    /// 与分组键比较器共享缓存
    pub fn set_cache(&mut self, comparer: &RowEqualityComparerGroupKey) {
        for (hasher, expr_comparer) in self.hashers.iter_mut().zip(comparer.comparers()) {
            hasher.set_cache(expr_comparer.cache().cloned());
        }
    }

    #[inline]
    pub fn hash<S: RowSource + ?Sized>(&self, source: &S, row: usize) -> i32 {
        self.hashers
            .iter()
            .fold(HASH_SEED, |hash, h| combine(hash, h.hash(source, row)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_djb2_combination() {
        assert_eq!(combine(HASH_SEED, 0), 5381 * 33);
        let folded = [7, 0].iter().fold(HASH_SEED, |h, v| combine(h, *v));
        assert_eq!(folded, (5381 * 33 ^ 7) * 33);
        assert_eq!(value_hash(None), 0);
    }

    #[test]
    fn test_combination_wraps() {
        let hash = (0..64).fold(HASH_SEED, |h, _| combine(h, i32::MAX));
        // 不会溢出 panic
        assert_eq!(hash, (0..64).fold(HASH_SEED, |h, _| combine(h, i32::MAX)));
    }
}

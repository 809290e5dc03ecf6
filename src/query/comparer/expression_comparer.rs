//! 单表达式比较器
//!
//! 比较规则：有值排在无值之前（升序与降序都如此），降序只反转两边都有值的情况。
//! 若两行在表达式用到的所有槽位上绑定了同一批元素，直接判等而不求值。
//!
//! 缓存保存在 `Rc<RefCell<_>>` 中，带缓存的比较器因此不是 `Send`/`Sync`，
//! 并行工作线程必须从可共享的 `ComparisonKey` 各自构造自己的比较器。

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;
use std::sync::Arc;

use crate::core::Value;
use crate::expression::{ExpressionHolder, RowSource};

type CachedSlot = Option<(usize, Option<Value>)>;

/// 最近一次求值的 x 行与 y 行的值
#[derive(Debug, Default)]
pub struct ComparerCache {
    x: CachedSlot,
    y: CachedSlot,
}

impl ComparerCache {
    /// 哈希器在计算哈希时顺便写入 y 槽位，紧接着的判等可以直接复用
    pub fn store_y(&mut self, row: usize, value: Option<Value>) {
        self.y = Some((row, value));
    }

    pub fn clear(&mut self) {
        self.x = None;
        self.y = None;
    }
}

pub type SharedCache = Rc<RefCell<ComparerCache>>;

fn cached<'c>(
    slot: &'c mut CachedSlot,
    row: usize,
    evaluate: impl FnOnce() -> Option<Value>,
) -> Option<&'c Value> {
    match slot {
        Some((cached_row, _)) if *cached_row == row => {}
        _ => *slot = Some((row, evaluate())),
    }
    slot.as_ref().and_then(|(_, v)| v.as_ref())
}

/// 按"有值优先"约定比较两个可选值
#[inline]
pub fn compare_optional(x: Option<&Value>, y: Option<&Value>, descending: bool) -> Ordering {
    match (x, y) {
        (Some(a), Some(b)) => {
            let ordering = a.compare(b);
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// 可跨线程共享的单个比较键
#[derive(Debug, Clone)]
pub struct ComparisonKey {
    expr: Arc<ExpressionHolder>,
    used_vars: Arc<[usize]>,
    descending: bool,
}

impl ComparisonKey {
    pub fn new(expr: Arc<ExpressionHolder>, descending: bool) -> Self {
        let used_vars = expr.collect_used_vars().into();
        Self {
            expr,
            used_vars,
            descending,
        }
    }

    pub fn expr(&self) -> &Arc<ExpressionHolder> {
        &self.expr
    }

    pub fn is_descending(&self) -> bool {
        self.descending
    }

    /// 两行在用到的槽位上是否绑定了相同元素
    #[inline]
    fn same_elements<S: RowSource + ?Sized>(&self, source: &S, x: usize, y: usize) -> bool {
        if x == y {
            return true;
        }
        if self.expr.contains_aggregate() {
            return false;
        }
        let (rx, ry) = (source.row(x), source.row(y));
        self.used_vars.iter().all(|&slot| rx.get(slot) == ry.get(slot))
    }

    /// 不带缓存的比较，可在任意线程调用
    #[inline]
    pub fn compare<S: RowSource + ?Sized>(&self, source: &S, x: usize, y: usize) -> Ordering {
        if self.same_elements(source, x, y) {
            return Ordering::Equal;
        }
        let xv = self.expr.evaluate(source, x);
        let yv = self.expr.evaluate(source, y);
        compare_optional(xv.as_ref(), yv.as_ref(), self.descending)
    }
}

/// 带可选缓存的单表达式比较器
#[derive(Debug)]
pub struct ExpressionComparer {
    key: ComparisonKey,
    cache: Option<SharedCache>,
}

impl ExpressionComparer {
    pub fn new(key: ComparisonKey, cache_results: bool) -> Self {
        Self {
            key,
            cache: cache_results.then(SharedCache::default),
        }
    }

    /// 构造一个独立的比较器，缓存全新
    pub fn clone_with_cache(&self, cache_results: bool) -> Self {
        Self::new(self.key.clone(), cache_results)
    }

    pub fn key(&self) -> &ComparisonKey {
        &self.key
    }

    pub fn cache(&self) -> Option<&SharedCache> {
        self.cache.as_ref()
    }

    #[inline]
    pub fn compare<S: RowSource + ?Sized>(&self, source: &S, x: usize, y: usize) -> Ordering {
        let Some(cache) = &self.cache else {
            return self.key.compare(source, x, y);
        };
        if self.key.same_elements(source, x, y) {
            return Ordering::Equal;
        }
        let mut cache = cache.borrow_mut();
        let ComparerCache { x: x_slot, y: y_slot } = &mut *cache;
        let expr = &self.key.expr;
        let xv = cached(x_slot, x, || expr.evaluate(source, x));
        let yv = cached(y_slot, y, || expr.evaluate(source, y));
        compare_optional(xv, yv, self.key.descending)
    }
}

//! 单线程分组字典
//!
//! 键是 `GroupDictKey`（预先算好的哈希 + 代表行），判等通过代表行重新求值。
//! 聚合值的存放方式由 `GroupStore` 决定：桶存储把累加器数组直接放在字典里，
//! 列存储在字典里只放分组位置。

use std::sync::Arc;

use hashbrown::HashTable;

use crate::expression::{Aggregate, RowSource};
use crate::query::comparer::{table_hash, GroupDictKey, RowEqualityComparerGroupKey, RowHasher};
use crate::query::grouper::results::{GroupByResults, GroupValues};
use crate::query::results::ResultTable;

pub trait GroupStore: Send + Sync {
    type Slot: Send + Sync;

    fn new(aggregates: &[Aggregate]) -> Self;

    /// 为新分组分配初始累加器
    fn open(&mut self, aggregates: &[Aggregate]) -> Self::Slot;

    fn accumulate<S: RowSource + ?Sized>(
        &mut self,
        slot: &mut Self::Slot,
        aggregates: &[Aggregate],
        source: &S,
        row: usize,
    );

    /// 把另一个存储中某个分组的部分结果合并进来
    fn absorb(&mut self, slot: &mut Self::Slot, other: &Self, other_slot: &Self::Slot);

    /// 按 `slots` 的顺序产出聚合值
    fn finish(self, slots: Vec<Self::Slot>) -> GroupValues;
}

pub struct GroupDictionary<S: GroupStore> {
    table: HashTable<(GroupDictKey, S::Slot)>,
    store: S,
}

impl<S: GroupStore> GroupDictionary<S> {
    pub fn new(aggregates: &[Aggregate]) -> Self {
        Self {
            table: HashTable::new(),
            store: S::new(aggregates),
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn entries(&self) -> impl Iterator<Item = &(GroupDictKey, S::Slot)> {
        self.table.iter()
    }

    /// 把一行归入其分组并累加
    pub fn accumulate(
        &mut self,
        source: &ResultTable,
        row: usize,
        aggregates: &[Aggregate],
        comparer: &RowEqualityComparerGroupKey,
        hasher: &RowHasher,
    ) {
        let key = GroupDictKey::new(hasher.hash(source, row), row);
        let hash = table_hash(key.hash);
        match self
            .table
            .find_mut(hash, |(existing, _)| comparer.equals(source, existing, &key))
        {
            Some((_, slot)) => self.store.accumulate(slot, aggregates, source, row),
            None => {
                let mut slot = self.store.open(aggregates);
                self.store.accumulate(&mut slot, aggregates, source, row);
                self.table
                    .insert_unique(hash, (key, slot), |(k, _)| table_hash(k.hash));
            }
        }
    }

    /// 合并另一个字典里的一个分组；键自带哈希，不重新计算
    pub fn absorb(
        &mut self,
        source: &ResultTable,
        key: GroupDictKey,
        other: &S,
        other_slot: &S::Slot,
        aggregates: &[Aggregate],
        comparer: &RowEqualityComparerGroupKey,
    ) {
        let hash = table_hash(key.hash);
        match self
            .table
            .find_mut(hash, |(existing, _)| comparer.equals(source, existing, &key))
        {
            Some((_, slot)) => self.store.absorb(slot, other, other_slot),
            None => {
                let mut slot = self.store.open(aggregates);
                self.store.absorb(&mut slot, other, other_slot);
                self.table
                    .insert_unique(hash, (key, slot), |(k, _)| table_hash(k.hash));
            }
        }
    }

    pub fn absorb_all(
        &mut self,
        source: &ResultTable,
        other: &GroupDictionary<S>,
        aggregates: &[Aggregate],
        comparer: &RowEqualityComparerGroupKey,
    ) {
        for (key, slot) in other.entries() {
            self.absorb(source, *key, &other.store, slot, aggregates, comparer);
        }
    }

    /// 代表行取自 `source`
    pub fn finish(self, source: &ResultTable) -> GroupByResults {
        let mut representatives = ResultTable::with_capacity(
            Arc::clone(source.graph_arc()),
            source.width(),
            self.table.len(),
        );
        let mut slots = Vec::with_capacity(self.table.len());
        for (key, slot) in self.table {
            representatives.add_row(source.row(key.row));
            slots.push(slot);
        }
        GroupByResults::new(representatives, self.store.finish(slots))
    }
}

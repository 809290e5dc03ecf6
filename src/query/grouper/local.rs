//! 本地字典分组
//!
//! 每个工作线程在自己的行分区上建立独立字典，之后单线程把所有本地字典合并为一个。

use std::marker::PhantomData;

use crate::core::error::DBResult;
use crate::expression::RowSource;
use crate::query::grouper::dictionary::{GroupDictionary, GroupStore};
use crate::query::grouper::results::GroupByResults;
use crate::query::grouper::{Grouper, GroupingDefinition};
use crate::query::results::ResultTable;
use crate::utils::thread::{partition, run_workers};

pub struct LocalGrouper<S: GroupStore> {
    definition: GroupingDefinition,
    thread_count: usize,
    _store: PhantomData<fn() -> S>,
}

impl<S: GroupStore> LocalGrouper<S> {
    pub fn new(definition: GroupingDefinition, thread_count: usize) -> Self {
        Self {
            definition,
            thread_count: thread_count.max(1),
            _store: PhantomData,
        }
    }
}

/// 各工作线程在自己的分区上建立本地字典
pub fn build_local_dictionaries<S: GroupStore>(
    definition: &GroupingDefinition,
    table: &ResultTable,
    thread_count: usize,
) -> DBResult<Vec<GroupDictionary<S>>> {
    let ranges = partition(table.row_count(), thread_count);
    run_workers(thread_count, |worker_id| {
        let aggregates = definition.aggregates();
        let (comparer, hasher) = definition.keys().worker_group_keys();
        let mut dictionary = GroupDictionary::<S>::new(aggregates);
        for row in ranges[worker_id].clone() {
            dictionary.accumulate(table, row, aggregates, &comparer, &hasher);
        }
        dictionary
    })
}

impl<S: GroupStore> Grouper for LocalGrouper<S> {
    fn group(&self, table: &ResultTable) -> DBResult<GroupByResults> {
        let aggregates = self.definition.aggregates();
        let mut locals = build_local_dictionaries::<S>(&self.definition, table, self.thread_count)?;
        let local_sizes: Vec<usize> = locals.iter().map(GroupDictionary::len).collect();

        // 以最大的本地字典为合并目标
        let target_index = local_sizes
            .iter()
            .enumerate()
            .max_by_key(|(_, len)| **len)
            .map(|(i, _)| i)
            .unwrap_or(0);
        let mut merged = locals.swap_remove(target_index);
        let comparer = self.definition.keys().group_key_comparer(true);
        for local in &locals {
            merged.absorb_all(table, local, aggregates, &comparer);
        }

        log::debug!(
            "local grouping: partial dictionaries {:?} merged into {} groups",
            local_sizes,
            merged.len()
        );
        Ok(merged.finish(table))
    }
}

//! 两阶段分组
//!
//! 第一阶段与本地字典分组相同；第二阶段并行合并：按 `hash % thread_count`
//! 把分组分片，每个工作线程只合并属于自己分片的分组，最后拼接各分片结果。

use std::marker::PhantomData;

use crate::core::error::DBResult;
use crate::query::grouper::dictionary::{GroupDictionary, GroupStore};
use crate::query::grouper::local::build_local_dictionaries;
use crate::query::grouper::results::GroupByResults;
use crate::query::grouper::{Grouper, GroupingDefinition};
use crate::query::results::ResultTable;
use crate::utils::thread::run_workers;

pub struct TwoWayGrouper<S: GroupStore> {
    definition: GroupingDefinition,
    thread_count: usize,
    _store: PhantomData<fn() -> S>,
}

impl<S: GroupStore> TwoWayGrouper<S> {
    pub fn new(definition: GroupingDefinition, thread_count: usize) -> Self {
        Self {
            definition,
            thread_count: thread_count.max(1),
            _store: PhantomData,
        }
    }
}

#[inline]
fn shard_of(hash: i32, shards: usize) -> usize {
    hash.rem_euclid(shards as i32) as usize
}

impl<S: GroupStore> Grouper for TwoWayGrouper<S> {
    fn group(&self, table: &ResultTable) -> DBResult<GroupByResults> {
        let locals = build_local_dictionaries::<S>(&self.definition, table, self.thread_count)?;
        let shards = self.thread_count;

        let merged = run_workers(shards, |shard| {
            let aggregates = self.definition.aggregates();
            let comparer = self.definition.keys().group_key_comparer(true);
            let mut dictionary = GroupDictionary::<S>::new(aggregates);
            for local in &locals {
                for (key, slot) in local.entries() {
                    if shard_of(key.hash, shards) == shard {
                        dictionary.absorb(table, *key, local.store(), slot, aggregates, &comparer);
                    }
                }
            }
            dictionary.finish(table)
        })?;

        let mut shards_iter = merged.into_iter();
        let mut results = match shards_iter.next() {
            Some(first) => first,
            None => GroupDictionary::<S>::new(self.definition.aggregates()).finish(table),
        };
        for shard in shards_iter {
            results.append(shard);
        }
        log::debug!(
            "two-way grouping merged {} shards into {} groups",
            shards,
            results.group_count()
        );
        Ok(results)
    }
}

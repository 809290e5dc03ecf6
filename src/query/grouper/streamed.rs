//! 流式分组
//!
//! 行由匹配器逐个推入，从不物化。分组键在行到达时就求成标量，键判等是直接的
//! 标量比较。每个工作线程有自己的 `CandidateBuffer`：键先写进草稿缓冲区，
//! 探测命中则更新聚合、草稿原地复用；未命中则把草稿移入字典（状态变为
//! `Committed`），下一行再分配新的草稿。
//!
//! 半流式：每个工作线程一个本地字典，最后一次半关闭时合并。
//! 全流式：所有工作线程共享一个 `DashMap`。

use std::borrow::Borrow;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use dashmap::DashMap;
use hashbrown::HashTable;
use parking_lot::Mutex;

use crate::core::Value;
use crate::expression::{Aggregate, AggregateBucketResult, SingleRow};
use crate::query::comparer::hasher::{combine, value_hash, HASH_SEED};
use crate::query::comparer::{table_hash, KeyTemplate};
use crate::query::grouper::bucket::{accumulate_bucket, merge_bucket, open_bucket};
use crate::query::grouper::results::{GroupByResults, GroupValues};
use crate::query::grouper::GroupingDefinition;
use crate::query::matcher::{HalfCloseCounter, ResultProcessor};
use crate::query::results::ResultTable;
use crate::storage::{ElementRef, Graph};

/// 已求值的分组键
///
/// `hash` 是 djb2 行哈希，供本地字典使用；`Hash` 实现只哈希 `values`，
/// 与 `Borrow<[Option<Value>]>` 保持一致，共享字典可以直接用草稿切片探测
#[derive(Debug, Clone)]
pub struct StreamedKey {
    hash: i32,
    values: Box<[Option<Value>]>,
}

impl StreamedKey {
    pub fn hash_code(&self) -> i32 {
        self.hash
    }

    pub fn values(&self) -> &[Option<Value>] {
        &self.values
    }
}

impl Hash for StreamedKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.values.hash(state);
    }
}

impl PartialEq for StreamedKey {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl Eq for StreamedKey {}

impl Borrow<[Option<Value>]> for StreamedKey {
    fn borrow(&self) -> &[Option<Value>] {
        &self.values
    }
}

#[derive(Debug, Clone, Default)]
pub struct StreamedGroup {
    representative: Box<[ElementRef]>,
    aggregates: Box<[AggregateBucketResult]>,
}

impl StreamedGroup {
    fn new(row: &[ElementRef], aggregates: &[Aggregate]) -> Self {
        Self {
            representative: row.into(),
            aggregates: open_bucket(aggregates),
        }
    }

    #[inline]
    fn accumulate(&mut self, aggregates: &[Aggregate], graph: &Graph, row: &[ElementRef]) {
        accumulate_bucket(&mut self.aggregates, aggregates, &SingleRow::new(graph, row), 0);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateState {
    /// 草稿可以原地复用
    Scratch,
    /// 草稿已移入字典，下一行需要新的缓冲区
    Committed,
}

/// 工作线程私有的候选键缓冲区
#[derive(Debug)]
pub struct CandidateBuffer {
    scratch: Vec<Option<Value>>,
    state: CandidateState,
    key_count: usize,
}

impl CandidateBuffer {
    pub fn new(key_count: usize) -> Self {
        Self {
            scratch: Vec::with_capacity(key_count),
            state: CandidateState::Scratch,
            key_count,
        }
    }

    pub fn state(&self) -> CandidateState {
        self.state
    }

    /// 在草稿上求出本行的键值，返回行哈希
    pub fn prepare(&mut self, keys: &KeyTemplate, graph: &Graph, row: &[ElementRef]) -> i32 {
        match self.state {
            CandidateState::Committed => {
                self.scratch = Vec::with_capacity(self.key_count);
                self.state = CandidateState::Scratch;
            }
            CandidateState::Scratch => self.scratch.clear(),
        }
        let mut hash = HASH_SEED;
        for key in keys.keys() {
            let value = key.expr().evaluate_row(graph, row);
            hash = combine(hash, value_hash(value.as_ref()));
            self.scratch.push(value);
        }
        hash
    }

    pub fn values(&self) -> &[Option<Value>] {
        &self.scratch
    }

    /// 把草稿交给字典
    pub fn commit(&mut self, hash: i32) -> StreamedKey {
        self.state = CandidateState::Committed;
        StreamedKey {
            hash,
            values: std::mem::take(&mut self.scratch).into_boxed_slice(),
        }
    }
}

type LocalGroups = HashTable<(StreamedKey, StreamedGroup)>;

struct WorkerGroups {
    buffer: CandidateBuffer,
    groups: LocalGroups,
}

fn insert_or_merge(groups: &mut LocalGroups, key: StreamedKey, group: StreamedGroup) {
    let hash = table_hash(key.hash);
    match groups.find_mut(hash, |(existing, _)| existing.values == key.values) {
        Some((_, target)) => merge_bucket(&mut target.aggregates, &group.aggregates),
        None => {
            groups.insert_unique(hash, (key, group), |(k, _)| table_hash(k.hash));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupSharing {
    /// 每个工作线程一个本地字典
    PerWorker,
    /// 所有工作线程共享一个字典
    Shared,
}

pub struct StreamedGrouper {
    graph: Arc<Graph>,
    width: usize,
    definition: GroupingDefinition,
    sharing: GroupSharing,
    workers: Vec<Mutex<WorkerGroups>>,
    shared: DashMap<StreamedKey, StreamedGroup>,
    counter: HalfCloseCounter,
    result: Mutex<Option<GroupByResults>>,
}

impl StreamedGrouper {
    pub fn new(
        graph: Arc<Graph>,
        width: usize,
        definition: GroupingDefinition,
        sharing: GroupSharing,
        thread_count: usize,
    ) -> Self {
        let thread_count = thread_count.max(1);
        let key_count = definition.keys().len();
        Self {
            graph,
            width,
            definition,
            sharing,
            workers: (0..thread_count)
                .map(|_| {
                    Mutex::new(WorkerGroups {
                        buffer: CandidateBuffer::new(key_count),
                        groups: HashTable::new(),
                    })
                })
                .collect(),
            shared: DashMap::new(),
            counter: HalfCloseCounter::new(thread_count),
            result: Mutex::new(None),
        }
    }

    /// 所有工作线程半关闭后取出结果
    pub fn take_results(&self) -> Option<GroupByResults> {
        self.result.lock().take()
    }

    fn accumulate_local(&self, worker: &mut WorkerGroups, row: &[ElementRef]) {
        let aggregates = self.definition.aggregates();
        let WorkerGroups { buffer, groups } = worker;
        let hash = buffer.prepare(self.definition.keys(), &self.graph, row);
        let probe = table_hash(hash);
        match groups.find_mut(probe, |(key, _)| *key.values == *buffer.values()) {
            Some((_, group)) => group.accumulate(aggregates, &self.graph, row),
            None => {
                let key = buffer.commit(hash);
                let mut group = StreamedGroup::new(row, aggregates);
                group.accumulate(aggregates, &self.graph, row);
                groups.insert_unique(probe, (key, group), |(k, _)| table_hash(k.hash));
            }
        }
    }

    fn accumulate_shared(&self, buffer: &mut CandidateBuffer, row: &[ElementRef]) {
        let aggregates = self.definition.aggregates();
        let hash = buffer.prepare(self.definition.keys(), &self.graph, row);
        let hit = match self.shared.get_mut(buffer.values()) {
            Some(mut group) => {
                group.accumulate(aggregates, &self.graph, row);
                true
            }
            None => false,
        };
        if !hit {
            let key = buffer.commit(hash);
            let mut group = self
                .shared
                .entry(key)
                .or_insert_with(|| StreamedGroup::new(row, aggregates));
            group.accumulate(aggregates, &self.graph, row);
        }
    }

    fn finish(&self) {
        let mut groups: Vec<StreamedGroup> = Vec::new();
        match self.sharing {
            GroupSharing::PerWorker => {
                let mut merged = LocalGroups::new();
                for worker in &self.workers {
                    let local = std::mem::take(&mut worker.lock().groups);
                    for (key, group) in local {
                        insert_or_merge(&mut merged, key, group);
                    }
                }
                groups.extend(merged.into_iter().map(|(_, group)| group));
            }
            GroupSharing::Shared => {
                self.shared.retain(|_, group| {
                    groups.push(std::mem::take(group));
                    false
                });
            }
        }

        let aggregates = self.definition.aggregates();
        let results = if groups.is_empty() && self.definition.keys().is_empty() {
            GroupByResults::single_group(Arc::clone(&self.graph), self.width, open_bucket(aggregates))
        } else {
            let mut representatives =
                ResultTable::with_capacity(Arc::clone(&self.graph), self.width, groups.len());
            let mut buckets = Vec::with_capacity(groups.len());
            for group in groups {
                representatives.add_row(&group.representative);
                buckets.push(group.aggregates);
            }
            GroupByResults::new(representatives, GroupValues::Bucket(buckets))
        };
        log::debug!(
            "streamed grouping ({:?}) finished with {} groups",
            self.sharing,
            results.group_count()
        );
        *self.result.lock() = Some(results);
    }
}

impl ResultProcessor for StreamedGrouper {
    fn process(&self, worker_id: usize, row: Option<&[ElementRef]>) {
        match row {
            Some(row) => {
                let mut worker = self.workers[worker_id].lock();
                match self.sharing {
                    GroupSharing::PerWorker => self.accumulate_local(&mut worker, row),
                    GroupSharing::Shared => self.accumulate_shared(&mut worker.buffer, row),
                }
            }
            None => {
                if self.counter.close() {
                    self.finish();
                }
            }
        }
    }
}

//! 全局字典分组
//!
//! 所有工作线程直接共享一个 `DashMap`，没有合并阶段，代价是字典上的争用。
//! 键里带着判等所需的上下文（键模板 + 结果表），判等使用不带缓存的模板比较。

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::core::error::DBResult;
use crate::expression::{AggregateBucketResult, AggregateListResults, RowSource};
use crate::query::comparer::KeyTemplate;
use crate::query::grouper::bucket::{accumulate_bucket, open_bucket};
use crate::query::grouper::results::{GroupByResults, GroupValues};
use crate::query::grouper::{Grouper, GroupingDefinition};
use crate::query::results::ResultTable;
use crate::utils::thread::{partition, run_workers};

struct KeyContext<'a> {
    template: &'a KeyTemplate,
    table: &'a ResultTable,
}

#[derive(Clone, Copy)]
struct GlobalKey<'a> {
    hash: i32,
    row: usize,
    context: &'a KeyContext<'a>,
}

impl<'a> GlobalKey<'a> {
    fn new(context: &'a KeyContext<'a>, row: usize) -> Self {
        Self {
            hash: context.template.hash(context.table, row),
            row,
            context,
        }
    }
}

impl Hash for GlobalKey<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_i32(self.hash);
    }
}

impl PartialEq for GlobalKey<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
            && self
                .context
                .template
                .equals(self.context.table, self.row, other.row)
    }
}

impl Eq for GlobalKey<'_> {}

/// 共享字典直接存放累加器数组
pub struct GlobalBucketGrouper {
    definition: GroupingDefinition,
    thread_count: usize,
}

impl GlobalBucketGrouper {
    pub fn new(definition: GroupingDefinition, thread_count: usize) -> Self {
        Self {
            definition,
            thread_count: thread_count.max(1),
        }
    }
}

impl Grouper for GlobalBucketGrouper {
    fn group(&self, table: &ResultTable) -> DBResult<GroupByResults> {
        let aggregates = self.definition.aggregates();
        let context = KeyContext {
            template: self.definition.keys(),
            table,
        };
        let map: DashMap<GlobalKey<'_>, Box<[AggregateBucketResult]>> = DashMap::new();
        let ranges = partition(table.row_count(), self.thread_count);

        run_workers(self.thread_count, |worker_id| {
            for row in ranges[worker_id].clone() {
                let key = GlobalKey::new(&context, row);
                let mut bucket = map.entry(key).or_insert_with(|| open_bucket(aggregates));
                accumulate_bucket(&mut bucket, aggregates, table, row);
            }
        })?;

        let mut representatives =
            ResultTable::with_capacity(Arc::clone(table.graph_arc()), table.width(), map.len());
        let mut buckets = Vec::with_capacity(map.len());
        for (key, bucket) in map {
            representatives.add_row(table.row(key.row));
            buckets.push(bucket);
        }
        log::debug!(
            "global bucket grouping produced {} groups on {} threads",
            buckets.len(),
            self.thread_count
        );
        Ok(GroupByResults::new(representatives, GroupValues::Bucket(buckets)))
    }
}

struct ListState {
    representatives: ResultTable,
    columns: Vec<AggregateListResults>,
}

/// 共享字典只存分组位置，聚合列受互斥锁保护
pub struct GlobalListGrouper {
    definition: GroupingDefinition,
    thread_count: usize,
}

impl GlobalListGrouper {
    pub fn new(definition: GroupingDefinition, thread_count: usize) -> Self {
        Self {
            definition,
            thread_count: thread_count.max(1),
        }
    }
}

impl Grouper for GlobalListGrouper {
    fn group(&self, table: &ResultTable) -> DBResult<GroupByResults> {
        let aggregates = self.definition.aggregates();
        let context = KeyContext {
            template: self.definition.keys(),
            table,
        };
        let positions: DashMap<GlobalKey<'_>, usize> = DashMap::new();
        let state = Mutex::new(ListState {
            representatives: ResultTable::new(Arc::clone(table.graph_arc()), table.width()),
            columns: aggregates.iter().map(AggregateListResults::new).collect(),
        });
        let ranges = partition(table.row_count(), self.thread_count);

        run_workers(self.thread_count, |worker_id| {
            for row in ranges[worker_id].clone() {
                let key = GlobalKey::new(&context, row);
                // 新分组在持有分片写锁时登记，保证同一分组只登记一次
                let position = *positions.entry(key).or_insert_with(|| {
                    let mut state = state.lock();
                    for column in &mut state.columns {
                        column.push_group();
                    }
                    state.representatives.add_row(table.row(row))
                });
                let mut state = state.lock();
                for (column, aggregate) in state.columns.iter_mut().zip(aggregates) {
                    column.accumulate(position, aggregate, table, row);
                }
            }
        })?;

        let ListState {
            representatives,
            columns,
        } = state.into_inner();
        log::debug!(
            "global list grouping produced {} groups on {} threads",
            representatives.row_count(),
            self.thread_count
        );
        Ok(GroupByResults::new(representatives, GroupValues::List(columns)))
    }
}

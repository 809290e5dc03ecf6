//! 单分组聚合（有聚合、没有 GROUP BY）
//!
//! `COUNT(*)` 直接取行数，不遍历；其余聚合把行区间切成 `thread_count` 段连续分区
//! （余数并入最后一段），各分区独立累加，再顺序合并进最后一个分区的结果。

use std::sync::Arc;

use crate::core::error::DBResult;
use crate::expression::{AggregateBucketResult, RowSource};
use crate::query::grouper::bucket::merge_bucket;
use crate::query::grouper::results::GroupByResults;
use crate::query::grouper::{Grouper, GroupingDefinition};
use crate::query::results::ResultTable;
use crate::utils::thread::{partition, run_workers};

pub struct SingleGroupGrouper {
    definition: GroupingDefinition,
    thread_count: usize,
}

impl SingleGroupGrouper {
    pub fn new(definition: GroupingDefinition, thread_count: usize) -> Self {
        Self {
            definition,
            thread_count: thread_count.max(1),
        }
    }
}

impl Grouper for SingleGroupGrouper {
    fn group(&self, table: &ResultTable) -> DBResult<GroupByResults> {
        let aggregates = self.definition.aggregates();
        let row_count = table.row_count();
        let needs_scan = aggregates.iter().any(|a| !a.is_count_star());

        let mut values: Box<[AggregateBucketResult]> = aggregates.iter().map(|a| a.init()).collect();
        if needs_scan {
            let ranges = partition(row_count, self.thread_count);
            let mut partials = run_workers(self.thread_count, |worker_id| {
                let mut partial: Box<[AggregateBucketResult]> =
                    aggregates.iter().map(|a| a.init()).collect();
                for row in ranges[worker_id].clone() {
                    for (acc, aggregate) in partial.iter_mut().zip(aggregates) {
                        if !aggregate.is_count_star() {
                            aggregate.accumulate(acc, table, row);
                        }
                    }
                }
                partial
            })?;
            if let Some(mut last) = partials.pop() {
                for partial in &partials {
                    merge_bucket(&mut last, partial);
                }
                values = last;
            }
        }

        for (acc, aggregate) in values.iter_mut().zip(aggregates) {
            if aggregate.is_count_star() {
                *acc = AggregateBucketResult::Count {
                    count: row_count as i64,
                };
            }
        }

        log::debug!(
            "single-group aggregation over {} rows ({} partitions)",
            row_count,
            if needs_scan { self.thread_count } else { 0 }
        );
        Ok(GroupByResults::single_group(
            Arc::clone(table.graph_arc()),
            table.width(),
            values,
        ))
    }
}

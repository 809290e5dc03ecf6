//! 分组结果
//!
//! 每个分组有一个代表行（保存在结果表里，位置即分组号）以及各聚合的值，
//! 聚合值按桶（每组一个累加器数组）或按列（每个聚合一列）存放。

use std::sync::Arc;

use crate::core::Value;
use crate::expression::{AggregateBucketResult, AggregateListResults, RowSource};
use crate::query::results::ResultTable;
use crate::storage::{ElementRef, Graph};

#[derive(Debug, Clone)]
pub enum GroupValues {
    Bucket(Vec<Box<[AggregateBucketResult]>>),
    List(Vec<AggregateListResults>),
}

impl GroupValues {
    #[inline]
    pub fn get(&self, group: usize, position: usize) -> Option<Value> {
        match self {
            GroupValues::Bucket(groups) => groups.get(group)?.get(position)?.value(),
            GroupValues::List(columns) => columns.get(position)?.value(group),
        }
    }

    fn append(&mut self, other: GroupValues) {
        match (self, other) {
            (GroupValues::Bucket(groups), GroupValues::Bucket(more)) => groups.extend(more),
            (GroupValues::List(columns), GroupValues::List(more)) => {
                for (column, extra) in columns.iter_mut().zip(&more) {
                    column.extend_from(extra);
                }
            }
            (into, from) => panic!(
                "cannot append {} group values to {}",
                from.kind(),
                into.kind()
            ),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            GroupValues::Bucket(_) => "bucket",
            GroupValues::List(_) => "list",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GroupByResults {
    representatives: ResultTable,
    values: GroupValues,
    group_count: usize,
    order: Option<Vec<usize>>,
}

impl GroupByResults {
    /// 代表行的位置与聚合值的分组位置一一对应
    pub fn new(representatives: ResultTable, values: GroupValues) -> Self {
        let group_count = representatives.row_count();
        Self {
            representatives,
            values,
            group_count,
            order: None,
        }
    }

    /// 没有 GROUP BY 时的唯一分组，代表行为空
    pub fn single_group(graph: Arc<Graph>, width: usize, values: Box<[AggregateBucketResult]>) -> Self {
        Self {
            representatives: ResultTable::new(graph, width),
            values: GroupValues::Bucket(vec![values]),
            group_count: 1,
            order: None,
        }
    }

    pub fn group_count(&self) -> usize {
        self.group_count
    }

    pub fn is_empty(&self) -> bool {
        self.group_count == 0
    }

    pub fn values(&self) -> &GroupValues {
        &self.values
    }

    pub fn representatives(&self) -> &ResultTable {
        &self.representatives
    }

    #[inline]
    pub fn get_value(&self, group: usize, aggregate_position: usize) -> Option<Value> {
        self.values.get(group, aggregate_position)
    }

    pub fn representative(&self, group: usize) -> &[ElementRef] {
        self.representatives.row(group)
    }

    /// 把另一份分组结果拼接到末尾
    pub fn append(&mut self, other: GroupByResults) {
        self.representatives.append(&other.representatives);
        self.values.append(other.values);
        self.group_count += other.group_count;
        self.order = None;
    }

    pub fn add_order(&mut self, order: Vec<usize>) {
        debug_assert_eq!(order.len(), self.group_count);
        self.order = Some(order);
    }

    pub fn order(&self) -> Option<&[usize]> {
        self.order.as_deref()
    }

    /// 按最终顺序给出分组号
    pub fn ordered_groups(&self) -> Vec<usize> {
        match &self.order {
            Some(order) => order.clone(),
            None => (0..self.group_count).collect(),
        }
    }
}

impl RowSource for GroupByResults {
    fn graph(&self) -> &Graph {
        self.representatives.graph()
    }

    #[inline]
    fn row(&self, index: usize) -> &[ElementRef] {
        self.representatives.row(index)
    }

    fn row_count(&self) -> usize {
        self.group_count
    }

    #[inline]
    fn aggregate_value(&self, index: usize, position: usize) -> Option<Value> {
        self.get_value(index, position)
    }
}

//! 列存储：字典里只放分组位置，每个聚合一列累加器

use crate::expression::{Aggregate, AggregateListResults, RowSource};
use crate::query::grouper::dictionary::GroupStore;
use crate::query::grouper::results::GroupValues;

#[derive(Debug)]
pub struct ListStore {
    columns: Vec<AggregateListResults>,
    groups: usize,
}

impl ListStore {
    pub fn columns(&self) -> &[AggregateListResults] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<AggregateListResults> {
        self.columns
    }
}

impl GroupStore for ListStore {
    type Slot = usize;

    fn new(aggregates: &[Aggregate]) -> Self {
        Self {
            columns: aggregates.iter().map(AggregateListResults::new).collect(),
            groups: 0,
        }
    }

    fn open(&mut self, _aggregates: &[Aggregate]) -> usize {
        for column in &mut self.columns {
            column.push_group();
        }
        self.groups += 1;
        self.groups - 1
    }

    #[inline]
    fn accumulate<S: RowSource + ?Sized>(
        &mut self,
        slot: &mut usize,
        aggregates: &[Aggregate],
        source: &S,
        row: usize,
    ) {
        for (column, aggregate) in self.columns.iter_mut().zip(aggregates) {
            column.accumulate(*slot, aggregate, source, row);
        }
    }

    fn absorb(&mut self, slot: &mut usize, other: &Self, other_slot: &usize) {
        for (column, from) in self.columns.iter_mut().zip(&other.columns) {
            column.merge_at(*slot, from, *other_slot);
        }
    }

    fn finish(self, slots: Vec<usize>) -> GroupValues {
        let in_order = slots.iter().enumerate().all(|(i, &s)| i == s);
        if in_order {
            return GroupValues::List(self.columns);
        }
        GroupValues::List(self.columns.iter().map(|c| c.select(&slots)).collect())
    }
}

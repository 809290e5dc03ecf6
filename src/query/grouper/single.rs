//! 单线程分组：一个线程，一个字典

use std::marker::PhantomData;

use crate::core::error::DBResult;
use crate::expression::RowSource;
use crate::query::grouper::dictionary::{GroupDictionary, GroupStore};
use crate::query::grouper::results::GroupByResults;
use crate::query::grouper::{Grouper, GroupingDefinition};
use crate::query::results::ResultTable;

pub struct SingleThreadGrouper<S: GroupStore> {
    definition: GroupingDefinition,
    _store: PhantomData<fn() -> S>,
}

impl<S: GroupStore> SingleThreadGrouper<S> {
    pub fn new(definition: GroupingDefinition) -> Self {
        Self {
            definition,
            _store: PhantomData,
        }
    }
}

impl<S: GroupStore> Grouper for SingleThreadGrouper<S> {
    fn group(&self, table: &ResultTable) -> DBResult<GroupByResults> {
        let aggregates = self.definition.aggregates();
        let (comparer, hasher) = self.definition.keys().worker_group_keys();
        let mut dictionary = GroupDictionary::<S>::new(aggregates);
        for row in 0..table.row_count() {
            dictionary.accumulate(table, row, aggregates, &comparer, &hasher);
        }
        log::debug!(
            "single-threaded grouping produced {} groups from {} rows",
            dictionary.len(),
            table.row_count()
        );
        Ok(dictionary.finish(table))
    }
}

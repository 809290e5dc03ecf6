//! 桶存储：每个分组一个累加器数组

use crate::expression::{Aggregate, AggregateBucketResult, RowSource};
use crate::query::grouper::dictionary::GroupStore;
use crate::query::grouper::results::GroupValues;

pub fn open_bucket(aggregates: &[Aggregate]) -> Box<[AggregateBucketResult]> {
    aggregates.iter().map(Aggregate::init).collect()
}

#[inline]
pub fn accumulate_bucket<S: RowSource + ?Sized>(
    bucket: &mut [AggregateBucketResult],
    aggregates: &[Aggregate],
    source: &S,
    row: usize,
) {
    for (acc, aggregate) in bucket.iter_mut().zip(aggregates) {
        aggregate.accumulate(acc, source, row);
    }
}

pub fn merge_bucket(into: &mut [AggregateBucketResult], from: &[AggregateBucketResult]) {
    for (acc, partial) in into.iter_mut().zip(from) {
        acc.merge(partial);
    }
}

#[derive(Debug, Default)]
pub struct BucketStore;

impl GroupStore for BucketStore {
    type Slot = Box<[AggregateBucketResult]>;

    fn new(_aggregates: &[Aggregate]) -> Self {
        BucketStore
    }

    fn open(&mut self, aggregates: &[Aggregate]) -> Self::Slot {
        open_bucket(aggregates)
    }

    #[inline]
    fn accumulate<S: RowSource + ?Sized>(
        &mut self,
        slot: &mut Self::Slot,
        aggregates: &[Aggregate],
        source: &S,
        row: usize,
    ) {
        accumulate_bucket(slot, aggregates, source, row);
    }

    fn absorb(&mut self, slot: &mut Self::Slot, _other: &Self, other_slot: &Self::Slot) {
        merge_bucket(slot, other_slot);
    }

    fn finish(self, slots: Vec<Self::Slot>) -> GroupValues {
        GroupValues::Bucket(slots)
    }
}

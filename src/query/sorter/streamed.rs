//! 流式排序
//!
//! 每个工作线程有自己的结果表和 AB 树，行到达时立即插入；最后一次半关闭时
//! 把各线程的表拼接起来（树里的下标按偏移平移），再对各有序段做 k 路归并。

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::query::comparer::KeyTemplate;
use crate::query::matcher::{HalfCloseCounter, ResultProcessor};
use crate::query::results::ResultTable;
use crate::query::sorter::abtree::AbTree;
use crate::storage::{ElementRef, Graph};

struct WorkerRun {
    table: ResultTable,
    tree: AbTree,
}

pub struct StreamedSorter {
    graph: Arc<Graph>,
    width: usize,
    template: KeyTemplate,
    workers: Vec<Mutex<WorkerRun>>,
    counter: HalfCloseCounter,
    result: Mutex<Option<ResultTable>>,
}

/// 堆中的段首元素；`Ord` 反转后 `BinaryHeap` 弹出最小的行
struct RunHead<'a, F> {
    row: usize,
    run: usize,
    compare: &'a F,
}

impl<F> RunHead<'_, F>
where
    F: Fn(usize, usize) -> Ordering,
{
    fn key_order(&self, other: &Self) -> Ordering {
        (self.compare)(self.row, other.row).then(self.run.cmp(&other.run))
    }
}

impl<F> PartialEq for RunHead<'_, F>
where
    F: Fn(usize, usize) -> Ordering,
{
    fn eq(&self, other: &Self) -> bool {
        self.key_order(other) == Ordering::Equal
    }
}

impl<F> Eq for RunHead<'_, F> where F: Fn(usize, usize) -> Ordering {}

impl<F> PartialOrd for RunHead<'_, F>
where
    F: Fn(usize, usize) -> Ordering,
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<F> Ord for RunHead<'_, F>
where
    F: Fn(usize, usize) -> Ordering,
{
    fn cmp(&self, other: &Self) -> Ordering {
        other.key_order(self)
    }
}

/// 合并若干有序段；键相等时段号小的在前
pub fn k_way_merge<F>(runs: Vec<Vec<usize>>, compare: F) -> Vec<usize>
where
    F: Fn(usize, usize) -> Ordering,
{
    let total = runs.iter().map(Vec::len).sum();
    let mut merged = Vec::with_capacity(total);
    let mut heads = vec![0usize; runs.len()];
    let mut heap = BinaryHeap::with_capacity(runs.len());
    for (run, rows) in runs.iter().enumerate() {
        if let Some(&row) = rows.first() {
            heap.push(RunHead {
                row,
                run,
                compare: &compare,
            });
        }
    }
    while let Some(RunHead { row, run, .. }) = heap.pop() {
        merged.push(row);
        heads[run] += 1;
        if let Some(&next) = runs[run].get(heads[run]) {
            heap.push(RunHead {
                row: next,
                run,
                compare: &compare,
            });
        }
    }
    merged
}

impl StreamedSorter {
    pub fn new(graph: Arc<Graph>, width: usize, template: KeyTemplate, thread_count: usize) -> Self {
        let thread_count = thread_count.max(1);
        Self {
            workers: (0..thread_count)
                .map(|_| {
                    Mutex::new(WorkerRun {
                        table: ResultTable::new(Arc::clone(&graph), width),
                        tree: AbTree::new(),
                    })
                })
                .collect(),
            graph,
            width,
            template,
            counter: HalfCloseCounter::new(thread_count),
            result: Mutex::new(None),
        }
    }

    /// 所有工作线程半关闭后取出排好序的结果表
    pub fn take_results(&self) -> Option<ResultTable> {
        self.result.lock().take()
    }

    fn finish(&self) {
        let mut merged = ResultTable::new(Arc::clone(&self.graph), self.width);
        let mut runs = Vec::with_capacity(self.workers.len());
        for worker in &self.workers {
            let run = worker.lock();
            let offset = merged.append(&run.table);
            runs.push(run.tree.iter().map(|row| row + offset).collect::<Vec<_>>());
        }
        let order = k_way_merge(runs, |x, y| self.template.compare(&merged, x, y));
        log::debug!(
            "streamed sort merged {} runs into {} rows",
            self.workers.len(),
            order.len()
        );
        merged.add_order(order);
        *self.result.lock() = Some(merged);
    }
}

impl ResultProcessor for StreamedSorter {
    fn process(&self, worker_id: usize, row: Option<&[ElementRef]>) {
        match row {
            Some(row) => {
                let mut run = self.workers[worker_id].lock();
                let WorkerRun { table, tree } = &mut *run;
                let index = table.add_row(row);
                let template = &self.template;
                tree.insert(index, |x, y| template.compare(&*table, x, y));
            }
            None => {
                if self.counter.close() {
                    self.finish();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_k_way_merge_prefers_earlier_run_on_ties() {
        let keys = [1, 3, 5, 1, 3, 4, 2];
        let runs = vec![vec![0, 1, 2], vec![3, 4, 5], vec![6]];
        let merged = k_way_merge(runs, |a, b| keys[a].cmp(&keys[b]));
        assert_eq!(merged, vec![0, 3, 6, 1, 4, 5, 2]);
    }

    #[test]
    fn test_k_way_merge_empty_runs() {
        let merged = k_way_merge(vec![vec![], vec![0], vec![]], |a: usize, b: usize| a.cmp(&b));
        assert_eq!(merged, vec![0]);
        assert!(k_way_merge(Vec::new(), |a: usize, b: usize| a.cmp(&b)).is_empty());
    }

    #[test]
    fn test_k_way_merge_many_runs_stays_stable() {
        // 32 段，每段 50 行，键只有 5 种
        let keys: Vec<u32> = (0..1600).map(|i| (i * 31 % 5) as u32).collect();
        let runs: Vec<Vec<usize>> = (0..32)
            .map(|run| {
                let mut rows: Vec<usize> = (run * 50..(run + 1) * 50).collect();
                rows.sort_by_key(|&row| keys[row]);
                rows
            })
            .collect();
        let merged = k_way_merge(runs, |a, b| keys[a].cmp(&keys[b]));
        assert_eq!(merged.len(), 1600);
        for pair in merged.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            assert!(keys[a] < keys[b] || (keys[a] == keys[b] && a < b));
        }
    }
}

//! 流式结果处理器
//!
//! 流式执行时匹配器不物化结果表，而是把每个匹配推给处理器。
//! `process(worker_id, None)` 表示该工作线程的流已经结束（半关闭），
//! 处理器在最后一个工作线程半关闭时完成收尾。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::expression::RowSource;
use crate::query::results::ResultTable;
use crate::storage::{ElementRef, Graph};

pub trait ResultProcessor: Sync {
    fn process(&self, worker_id: usize, row: Option<&[ElementRef]>);
}

/// 半关闭计数
#[derive(Debug)]
pub struct HalfCloseCounter {
    closed: AtomicUsize,
    total: usize,
}

impl HalfCloseCounter {
    pub fn new(total: usize) -> Self {
        Self {
            closed: AtomicUsize::new(0),
            total: total.max(1),
        }
    }

    /// 记录一次半关闭，是最后一个时返回 `true`
    pub fn close(&self) -> bool {
        self.closed.fetch_add(1, Ordering::AcqRel) + 1 == self.total
    }

    pub fn is_finished(&self) -> bool {
        self.closed.load(Ordering::Acquire) >= self.total
    }
}

/// 把流式行收集为结果表：每个工作线程写自己的表，最后一次半关闭时拼接
pub struct TableCollector {
    graph: Arc<Graph>,
    width: usize,
    workers: Vec<Mutex<ResultTable>>,
    counter: HalfCloseCounter,
    result: Mutex<Option<ResultTable>>,
}

impl TableCollector {
    pub fn new(graph: Arc<Graph>, width: usize, thread_count: usize) -> Self {
        let thread_count = thread_count.max(1);
        Self {
            workers: (0..thread_count)
                .map(|_| Mutex::new(ResultTable::new(Arc::clone(&graph), width)))
                .collect(),
            graph,
            width,
            counter: HalfCloseCounter::new(thread_count),
            result: Mutex::new(None),
        }
    }

    /// 所有工作线程半关闭后取出结果
    pub fn take_results(&self) -> Option<ResultTable> {
        self.result.lock().take()
    }
}

impl ResultProcessor for TableCollector {
    fn process(&self, worker_id: usize, row: Option<&[ElementRef]>) {
        match row {
            Some(row) => {
                self.workers[worker_id].lock().add_row(row);
            }
            None => {
                if self.counter.close() {
                    let mut merged = ResultTable::new(Arc::clone(&self.graph), self.width);
                    for worker in &self.workers {
                        merged.append(&worker.lock());
                    }
                    log::debug!("streamed collector finished with {} rows", merged.row_count());
                    *self.result.lock() = Some(merged);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_close_wins() {
        let counter = HalfCloseCounter::new(3);
        assert!(!counter.close());
        assert!(!counter.close());
        assert!(!counter.is_finished());
        assert!(counter.close());
        assert!(counter.is_finished());
    }
}

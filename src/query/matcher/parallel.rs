//! 并行匹配
//!
//! 起点顶点按 `vertices_per_thread` 大小的区间分发，工作线程通过原子计数器
//! 领取互不重叠的区间；每个工作线程持有自己的匹配器实例。

use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_utils::CachePadded;
use parking_lot::Mutex;

use crate::core::error::DBResult;
use crate::expression::RowSource;
use crate::query::matcher::dfs::DfsMatcher;
use crate::query::matcher::pattern::MatchPattern;
use crate::query::matcher::processor::ResultProcessor;
use crate::query::results::ResultTable;
use crate::storage::Graph;
use crate::utils::thread::run_workers;

/// 起点顶点分发器
#[derive(Debug)]
pub struct VertexDistributor {
    next: CachePadded<AtomicUsize>,
    total: usize,
    chunk: usize,
}

impl VertexDistributor {
    pub fn new(total: usize, chunk: usize) -> Self {
        Self {
            next: CachePadded::new(AtomicUsize::new(0)),
            total,
            chunk: chunk.max(1),
        }
    }

    /// 领取下一段起点区间，分完返回 `None`
    pub fn next_range(&self) -> Option<Range<u32>> {
        let start = self.next.fetch_add(self.chunk, Ordering::Relaxed);
        if start >= self.total {
            return None;
        }
        let end = (start + self.chunk).min(self.total);
        Some(start as u32..end as u32)
    }
}

#[derive(Debug, Clone)]
pub struct PatternMatcher {
    graph: Arc<Graph>,
    pattern: Arc<MatchPattern>,
    thread_count: usize,
    vertices_per_thread: usize,
}

impl PatternMatcher {
    pub fn new(
        graph: Arc<Graph>,
        pattern: Arc<MatchPattern>,
        thread_count: usize,
        vertices_per_thread: usize,
    ) -> Self {
        Self {
            graph,
            pattern,
            thread_count: thread_count.max(1),
            vertices_per_thread: vertices_per_thread.max(1),
        }
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// 物化搜索：所有匹配写入一张结果表
    pub fn search(&self) -> DBResult<ResultTable> {
        let started = Instant::now();
        let width = self.pattern.width();
        let vertex_count = self.graph.vertex_count();

        if self.thread_count == 1 {
            let mut matcher = DfsMatcher::new(Arc::clone(&self.graph), Arc::clone(&self.pattern));
            let mut table = ResultTable::new(Arc::clone(&self.graph), width);
            matcher.search(0..vertex_count as u32, |row| {
                table.add_row(row);
            });
            log::debug!(
                "single-threaded match found {} rows in {:?}",
                table.row_count(),
                started.elapsed()
            );
            return Ok(table);
        }

        let distributor = VertexDistributor::new(vertex_count, self.vertices_per_thread);
        let shared = Mutex::new(ResultTable::new(Arc::clone(&self.graph), width));
        let per_worker = run_workers(self.thread_count, |_worker_id| {
            let mut matcher = DfsMatcher::new(Arc::clone(&self.graph), Arc::clone(&self.pattern));
            let mut local = ResultTable::new(Arc::clone(&self.graph), width);
            let mut found = 0;
            while let Some(range) = distributor.next_range() {
                found += matcher.search(range, |row| {
                    local.add_row(row);
                });
                // 每个区间结束后把本地结果刷入共享表
                if !local.is_empty() {
                    shared.lock().append(&local);
                    local.clear();
                }
            }
            found
        })?;

        let table = shared.into_inner();
        log::debug!(
            "parallel match on {} threads found {} rows {:?} in {:?}",
            self.thread_count,
            table.row_count(),
            per_worker,
            started.elapsed()
        );
        Ok(table)
    }

    /// 流式搜索：每个匹配推给处理器，工作线程结束时半关闭
    pub fn search_streamed<P>(&self, processor: &P) -> DBResult<()>
    where
        P: ResultProcessor + ?Sized,
    {
        let started = Instant::now();
        let vertex_count = self.graph.vertex_count();
        let distributor = VertexDistributor::new(vertex_count, self.vertices_per_thread);
        let found = run_workers(self.thread_count, |worker_id| {
            let mut matcher = DfsMatcher::new(Arc::clone(&self.graph), Arc::clone(&self.pattern));
            let mut found = 0;
            while let Some(range) = distributor.next_range() {
                found += matcher.search(range, |row| processor.process(worker_id, Some(row)));
            }
            processor.process(worker_id, None);
            found
        })?;
        log::debug!(
            "streamed match on {} threads pushed {} rows in {:?}",
            self.thread_count,
            found.iter().sum::<usize>(),
            started.elapsed()
        );
        Ok(())
    }
}

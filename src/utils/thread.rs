//! 固定数量工作线程的分派与汇合
//!
//! 调用线程本身作为 0 号工作线程参与计算，其余线程在作用域线程中运行，
//! 返回前全部汇合。

use std::thread;

use crate::core::error::{DBError, DBResult};

/// 在 `thread_count` 个工作线程上运行 `work(worker_id)`，按工作线程编号返回结果
pub fn run_workers<T, F>(thread_count: usize, work: F) -> DBResult<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> T + Sync,
{
    let thread_count = thread_count.max(1);
    if thread_count == 1 {
        return Ok(vec![work(0)]);
    }

    let work = &work;
    thread::scope(|scope| {
        let handles: Vec<_> = (1..thread_count)
            .map(|worker_id| {
                thread::Builder::new()
                    .name(format!("pgql-worker-{}", worker_id))
                    .spawn_scoped(scope, move || work(worker_id))
            })
            .collect();

        let first = work(0);
        let mut results = Vec::with_capacity(thread_count);
        results.push(first);
        for handle in handles {
            let handle = handle.map_err(|e| DBError::internal(format!("线程创建失败: {}", e)))?;
            let result = handle
                .join()
                .map_err(|e| DBError::internal(format!("线程执行失败: {:?}", e)))?;
            results.push(result);
        }
        Ok(results)
    })
}

/// 把 `[0, len)` 切成 `parts` 段连续区间，余数并入最后一段
pub fn partition(len: usize, parts: usize) -> Vec<std::ops::Range<usize>> {
    let parts = parts.max(1);
    let chunk = len / parts;
    (0..parts)
        .map(|i| {
            let start = i * chunk;
            let end = if i + 1 == parts { len } else { start + chunk };
            start..end
        })
        .collect()
}

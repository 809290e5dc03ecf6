//! 集成测试共享工具模块
//!
//! 提供测试基础设施和辅助函数，供所有集成测试使用

#![allow(dead_code)]

pub mod assertions;
pub mod data_fixtures;

use std::sync::Arc;

use pgql_engine::config::{ExecutionConfig, ExecutionMode};
use pgql_engine::query::grouper::GrouperAlias;
use pgql_engine::query::sorter::SorterAlias;
use pgql_engine::query::{Query, ResultSet};
use pgql_engine::storage::Graph;

/// 测试用执行配置；每次只领取少量起点顶点，让多个工作线程都能分到工作
pub fn execution_config(
    mode: ExecutionMode,
    grouper: GrouperAlias,
    sorter: SorterAlias,
    threads: usize,
) -> ExecutionConfig {
    ExecutionConfig {
        thread_count: threads,
        vertices_per_thread: 3,
        grouper,
        sorter,
        mode,
    }
}

pub fn run_query(graph: &Arc<Graph>, text: &str, config: &ExecutionConfig) -> ResultSet {
    let query = Query::new(Arc::clone(graph), text, config)
        .unwrap_or_else(|e| panic!("查询构建失败 '{}': {}", text, e));
    query
        .run()
        .unwrap_or_else(|e| panic!("查询执行失败 '{}': {}", text, e))
}

/// 所有执行模式、所有分组器、所有排序器与给定线程数的组合
pub fn all_configs(threads: &[usize]) -> Vec<ExecutionConfig> {
    let mut configs = Vec::new();
    for mode in ExecutionMode::ALL {
        for grouper in GrouperAlias::ALL {
            for sorter in SorterAlias::ALL {
                for &t in threads {
                    configs.push(execution_config(mode, grouper, sorter, t));
                }
            }
        }
    }
    configs
}

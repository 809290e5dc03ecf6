//! 查询执行
//!
//! 解析和规划在 `Query::new` 中完成，`execute` 按执行模式把匹配结果交给
//! 分组器和排序器：物化模式先得到完整结果表；流式模式边匹配边分组或排序。

use std::sync::Arc;
use std::time::Instant;

use crate::config::{ExecutionConfig, ExecutionMode};
use crate::core::error::{DBError, DBResult};
use crate::core::Value;
use crate::expression::RowSource;
use crate::query::grouper::{create_grouper, GroupByResults, GroupSharing, StreamedGrouper};
use crate::query::matcher::{PatternMatcher, TableCollector};
use crate::query::parser::parse_query;
use crate::query::plan::QueryPlan;
use crate::query::results::ResultTable;
use crate::query::sorter::{RowSorter, SorterAlias, StreamedSorter};
use crate::storage::Graph;

/// 执行结果：未分组查询得到结果表，分组查询得到分组结果
#[derive(Debug)]
pub enum QueryResults {
    Table(ResultTable),
    Groups(GroupByResults),
}

impl QueryResults {
    pub fn source(&self) -> &dyn RowSource {
        match self {
            QueryResults::Table(table) => table,
            QueryResults::Groups(groups) => groups,
        }
    }

    pub fn row_count(&self) -> usize {
        self.source().row_count()
    }

    /// 按最终顺序给出行（或分组）下标
    pub fn ordered_indices(&self) -> Vec<usize> {
        match self {
            QueryResults::Table(table) => table.ordered_indices(),
            QueryResults::Groups(groups) => groups.ordered_groups(),
        }
    }
}

/// 求值后的输出
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Option<Value>>>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug)]
pub struct Query {
    graph: Arc<Graph>,
    plan: QueryPlan,
    config: ExecutionConfig,
}

impl Query {
    pub fn new(graph: Arc<Graph>, text: &str, config: &ExecutionConfig) -> DBResult<Self> {
        config.validate()?;
        let ast = parse_query(text)?;
        let plan = QueryPlan::build(&graph, &ast)?;
        Ok(Self {
            graph,
            plan,
            config: config.clone(),
        })
    }

    pub fn plan(&self) -> &QueryPlan {
        &self.plan
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn header(&self) -> Vec<String> {
        self.plan.header()
    }

    pub fn execute(&self) -> DBResult<QueryResults> {
        let started = Instant::now();
        let matcher = PatternMatcher::new(
            Arc::clone(&self.graph),
            Arc::clone(self.plan.pattern()),
            self.config.thread_count,
            self.config.vertices_per_thread,
        );
        let results = match self.config.mode {
            ExecutionMode::Materialized => self.execute_materialized(&matcher)?,
            ExecutionMode::HalfStreamed | ExecutionMode::Streamed => self.execute_streamed(&matcher)?,
        };
        log::info!(
            "query finished in {} mode with {} result rows in {:?}",
            self.config.mode,
            results.row_count(),
            started.elapsed()
        );
        Ok(results)
    }

    /// 执行并对 SELECT 列表求值
    pub fn run(&self) -> DBResult<ResultSet> {
        let results = self.execute()?;
        Ok(self.evaluate(&results))
    }

    pub fn evaluate(&self, results: &QueryResults) -> ResultSet {
        let source = results.source();
        let rows = results
            .ordered_indices()
            .into_iter()
            .map(|index| {
                self.plan
                    .select()
                    .iter()
                    .map(|holder| holder.evaluate(source, index))
                    .collect()
            })
            .collect();
        ResultSet {
            header: self.header(),
            rows,
        }
    }

    fn execute_materialized(&self, matcher: &PatternMatcher) -> DBResult<QueryResults> {
        let mut table = matcher.search()?;
        if self.plan.is_grouped() {
            let started = Instant::now();
            let grouper = create_grouper(
                self.config.grouper,
                self.plan.grouping_definition()?,
                self.config.thread_count,
            );
            let groups = grouper.group(&table)?;
            log::debug!(
                "grouped {} rows into {} groups in {:?}",
                table.row_count(),
                groups.group_count(),
                started.elapsed()
            );
            return self.sort_groups(groups);
        }
        if self.plan.is_ordered() {
            let order = self.sorter().sort(&table)?;
            table.add_order(order);
        }
        Ok(QueryResults::Table(table))
    }

    fn execute_streamed(&self, matcher: &PatternMatcher) -> DBResult<QueryResults> {
        let width = self.plan.width();
        let threads = matcher.thread_count();

        if self.plan.is_grouped() {
            let sharing = match self.config.mode {
                ExecutionMode::Streamed => GroupSharing::Shared,
                _ => GroupSharing::PerWorker,
            };
            let grouper = StreamedGrouper::new(
                Arc::clone(&self.graph),
                width,
                self.plan.grouping_definition()?,
                sharing,
                threads,
            );
            matcher.search_streamed(&grouper)?;
            let groups = grouper
                .take_results()
                .ok_or_else(|| DBError::internal("streamed grouper finished without results"))?;
            return self.sort_groups(groups);
        }

        if self.plan.is_ordered() && self.config.sorter == SorterAlias::AbTree {
            let sorter = StreamedSorter::new(Arc::clone(&self.graph), width, self.plan.order_template(), threads);
            matcher.search_streamed(&sorter)?;
            let table = sorter
                .take_results()
                .ok_or_else(|| DBError::internal("streamed sorter finished without results"))?;
            return Ok(QueryResults::Table(table));
        }

        let collector = TableCollector::new(Arc::clone(&self.graph), width, threads);
        matcher.search_streamed(&collector)?;
        let mut table = collector
            .take_results()
            .ok_or_else(|| DBError::internal("streamed collector finished without results"))?;
        if self.plan.is_ordered() {
            let order = self.sorter().sort(&table)?;
            table.add_order(order);
        }
        Ok(QueryResults::Table(table))
    }

    fn sort_groups(&self, mut groups: GroupByResults) -> DBResult<QueryResults> {
        if self.plan.is_ordered() {
            let order = self.sorter().sort(&groups)?;
            groups.add_order(order);
        }
        Ok(QueryResults::Groups(groups))
    }

    fn sorter(&self) -> RowSorter {
        RowSorter::new(self.config.sorter, self.plan.order_template(), self.config.thread_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::QueryError;
    use crate::core::ScalarType;
    use crate::storage::GraphBuilder;

    /// 1->2, 1->3, 2->3, 3->1；age: 1=30, 2=20, 3=无
    fn graph() -> Arc<Graph> {
        let mut builder = GraphBuilder::new();
        builder.add_table("Person").expect("add_table should succeed");
        builder.add_table("knows").expect("add_table should succeed");
        builder
            .declare_property("Person", "age", ScalarType::Int)
            .expect("declare_property should succeed");
        builder
            .add_vertex(1, "Person", vec![("age", Value::Int(30))])
            .expect("add_vertex should succeed");
        builder
            .add_vertex(2, "Person", vec![("age", Value::Int(20))])
            .expect("add_vertex should succeed");
        builder
            .add_vertex(3, "Person", Vec::<(&str, Value)>::new())
            .expect("add_vertex should succeed");
        for (id, from, to) in [(10, 1, 2), (11, 1, 3), (12, 2, 3), (13, 3, 1)] {
            builder
                .add_edge(id, "knows", from, to, Vec::<(&str, Value)>::new())
                .expect("add_edge should succeed");
        }
        Arc::new(builder.build().expect("build should succeed"))
    }

    fn config(mode: ExecutionMode, threads: usize) -> ExecutionConfig {
        ExecutionConfig {
            thread_count: threads,
            vertices_per_thread: 1,
            mode,
            ..ExecutionConfig::default()
        }
    }

    #[test]
    fn test_ordered_projection() {
        let query = Query::new(
            graph(),
            "SELECT x, x.age AS age MATCH (x) ORDER BY x.age DESC",
            &config(ExecutionMode::Materialized, 1),
        )
        .expect("query should build");
        let results = query.run().expect("query should run");
        assert_eq!(results.header, vec!["x", "age"]);
        assert_eq!(
            results.rows,
            vec![
                vec![Some(Value::Int(1)), Some(Value::Int(30))],
                vec![Some(Value::Int(2)), Some(Value::Int(20))],
                vec![Some(Value::Int(3)), None],
            ]
        );
    }

    #[test]
    fn test_grouped_count_every_mode() {
        for mode in ExecutionMode::ALL {
            for threads in [1, 3] {
                let query = Query::new(
                    graph(),
                    "SELECT x, COUNT(*) AS out MATCH (x)->(y) GROUP BY x ORDER BY COUNT(*) DESC, x",
                    &config(mode, threads),
                )
                .expect("query should build");
                let results = query.run().expect("query should run");
                assert_eq!(
                    results.rows,
                    vec![
                        vec![Some(Value::Int(1)), Some(Value::Int(2))],
                        vec![Some(Value::Int(2)), Some(Value::Int(1))],
                        vec![Some(Value::Int(3)), Some(Value::Int(1))],
                    ],
                    "mode = {}, threads = {}",
                    mode,
                    threads
                );
            }
        }
    }

    #[test]
    fn test_single_group_without_matches() {
        let query = Query::new(
            graph(),
            "SELECT COUNT(*), MAX(x.age) MATCH (x)->(y)->(z)->(w)->(x:Nobody)",
            &config(ExecutionMode::Materialized, 2),
        );
        assert!(matches!(
            query,
            Err(DBError::Query(QueryError::UnknownTable(_)))
        ));

        for mode in ExecutionMode::ALL {
            let query = Query::new(
                graph(),
                "SELECT COUNT(*), MAX(x.age) MATCH (x)-[e]->(x)",
                &config(mode, 2),
            )
            .expect("query should build");
            let results = query.run().expect("query should run");
            assert_eq!(results.rows, vec![vec![Some(Value::Int(0)), None]], "mode = {}", mode);
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut bad = config(ExecutionMode::Materialized, 1);
        bad.thread_count = 0;
        assert!(matches!(
            Query::new(graph(), "SELECT * MATCH (x)", &bad),
            Err(DBError::Config(_))
        ));
    }
}

//! 分组与聚合
//!
//! | 别名 | 行为 |
//! |---|---|
//! | `single_bucket` / `single_list` | 单线程、单个字典 |
//! | `global_bucket` / `global_list` | 所有工作线程共享一个 `DashMap` |
//! | `local_bucket` / `local_list` | 每线程本地字典，单线程合并 |
//! | `two_way_bucket` / `two_way_list` | 每线程本地字典，按哈希分片并行合并 |
//!
//! 有聚合但没有 GROUP BY 时不论别名都走单分组路径。

pub mod bucket;
pub mod dictionary;
pub mod global;
pub mod list;
pub mod local;
pub mod results;
pub mod single;
pub mod single_group;
pub mod streamed;
pub mod two_way;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::error::{DBError, DBResult};
use crate::expression::Aggregate;
use crate::query::comparer::KeyTemplate;
use crate::query::results::ResultTable;

pub use bucket::BucketStore;
pub use dictionary::{GroupDictionary, GroupStore};
pub use global::{GlobalBucketGrouper, GlobalListGrouper};
pub use list::ListStore;
pub use local::LocalGrouper;
pub use results::{GroupByResults, GroupValues};
pub use single::SingleThreadGrouper;
pub use single_group::SingleGroupGrouper;
pub use streamed::{CandidateBuffer, CandidateState, GroupSharing, StreamedGrouper, StreamedKey};
pub use two_way::TwoWayGrouper;

pub trait Grouper {
    fn group(&self, table: &ResultTable) -> DBResult<GroupByResults>;
}

/// 分组键与聚合列表
#[derive(Debug, Clone)]
pub struct GroupingDefinition {
    keys: KeyTemplate,
    aggregates: Arc<[Aggregate]>,
}

impl GroupingDefinition {
    pub fn new(keys: KeyTemplate, aggregates: Vec<Aggregate>) -> Self {
        Self {
            keys,
            aggregates: aggregates.into(),
        }
    }

    pub fn keys(&self) -> &KeyTemplate {
        &self.keys
    }

    pub fn aggregates(&self) -> &[Aggregate] {
        &self.aggregates
    }

    pub fn is_single_group(&self) -> bool {
        self.keys.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum GrouperAlias {
    SingleBucket,
    SingleList,
    GlobalBucket,
    GlobalList,
    LocalBucket,
    LocalList,
    TwoWayBucket,
    TwoWayList,
}

impl GrouperAlias {
    pub const ALL: [GrouperAlias; 8] = [
        GrouperAlias::SingleBucket,
        GrouperAlias::SingleList,
        GrouperAlias::GlobalBucket,
        GrouperAlias::GlobalList,
        GrouperAlias::LocalBucket,
        GrouperAlias::LocalList,
        GrouperAlias::TwoWayBucket,
        GrouperAlias::TwoWayList,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            GrouperAlias::SingleBucket => "single_bucket",
            GrouperAlias::SingleList => "single_list",
            GrouperAlias::GlobalBucket => "global_bucket",
            GrouperAlias::GlobalList => "global_list",
            GrouperAlias::LocalBucket => "local_bucket",
            GrouperAlias::LocalList => "local_list",
            GrouperAlias::TwoWayBucket => "two_way_bucket",
            GrouperAlias::TwoWayList => "two_way_list",
        }
    }
}

impl Default for GrouperAlias {
    fn default() -> Self {
        GrouperAlias::TwoWayBucket
    }
}

impl fmt::Display for GrouperAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for GrouperAlias {
    type Err = DBError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        GrouperAlias::ALL
            .into_iter()
            .find(|alias| alias.name() == name)
            .ok_or_else(|| DBError::config(format!("unknown grouper alias '{}'", name)))
    }
}

impl TryFrom<String> for GrouperAlias {
    type Error = DBError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}

impl From<GrouperAlias> for String {
    fn from(alias: GrouperAlias) -> Self {
        alias.name().to_string()
    }
}

/// 按别名构造分组器
pub fn create_grouper(
    alias: GrouperAlias,
    definition: GroupingDefinition,
    thread_count: usize,
) -> Box<dyn Grouper> {
    if definition.is_single_group() {
        log::debug!("no grouping keys, using single-group aggregation");
        return Box::new(SingleGroupGrouper::new(definition, thread_count));
    }
    log::debug!("using grouper {} with {} threads", alias, thread_count);
    match alias {
        GrouperAlias::SingleBucket => Box::new(SingleThreadGrouper::<BucketStore>::new(definition)),
        GrouperAlias::SingleList => Box::new(SingleThreadGrouper::<ListStore>::new(definition)),
        GrouperAlias::GlobalBucket => Box::new(GlobalBucketGrouper::new(definition, thread_count)),
        GrouperAlias::GlobalList => Box::new(GlobalListGrouper::new(definition, thread_count)),
        GrouperAlias::LocalBucket => {
            Box::new(LocalGrouper::<BucketStore>::new(definition, thread_count))
        }
        GrouperAlias::LocalList => Box::new(LocalGrouper::<ListStore>::new(definition, thread_count)),
        GrouperAlias::TwoWayBucket => {
            Box::new(TwoWayGrouper::<BucketStore>::new(definition, thread_count))
        }
        GrouperAlias::TwoWayList => Box::new(TwoWayGrouper::<ListStore>::new(definition, thread_count)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::core::{ScalarType, Value};
    use crate::expression::{AggregateFunction, ExprNode, ExpressionHolder, RowSource};
    use crate::storage::{ElementRef, Graph, GraphBuilder, PropertyId};

    /// 20 个顶点，group = id % 3，score = id（id 为 7 的顶点没有 score）
    fn fixture() -> (ResultTable, PropertyId, PropertyId) {
        let mut builder = GraphBuilder::new();
        builder.add_table("V").expect("add_table should succeed");
        let group = builder
            .declare_property("V", "group", ScalarType::Int)
            .expect("declare_property should succeed");
        let score = builder
            .declare_property("V", "score", ScalarType::Double)
            .expect("declare_property should succeed");
        for id in 1..=20i64 {
            let mut props = vec![("group", Value::Int(id % 3))];
            if id != 7 {
                props.push(("score", Value::Double(id as f64)));
            }
            builder.add_vertex(id, "V", props).expect("add_vertex should succeed");
        }
        let graph: Arc<Graph> = Arc::new(builder.build().expect("build should succeed"));
        let mut table = ResultTable::new(graph, 1);
        for v in 0..20 {
            table.add_row(&[ElementRef::Vertex(v)]);
        }
        (table, group, score)
    }

    fn definition(group: PropertyId, score: PropertyId) -> GroupingDefinition {
        let key = Arc::new(ExpressionHolder::new(
            ExprNode::VariableProperty {
                slot: 0,
                property: group,
                ty: ScalarType::Int,
            },
            "x.group",
        ));
        let score_arg = ExprNode::VariableProperty {
            slot: 0,
            property: score,
            ty: ScalarType::Double,
        };
        GroupingDefinition::new(
            KeyTemplate::for_group_keys(&[key]).expect("template should build"),
            vec![
                Aggregate::count_star(),
                Aggregate::new(AggregateFunction::Count, Some(score_arg.clone()))
                    .expect("aggregate should build"),
                Aggregate::new(AggregateFunction::Avg, Some(score_arg.clone()))
                    .expect("aggregate should build"),
                Aggregate::new(AggregateFunction::Max, Some(score_arg))
                    .expect("aggregate should build"),
            ],
        )
    }

    /// 分组键 -> 各聚合值
    fn summarize(results: &GroupByResults, group: PropertyId) -> BTreeMap<i64, Vec<Option<Value>>> {
        (0..results.group_count())
            .map(|g| {
                let element = results.representative(g)[0];
                let key = results
                    .graph()
                    .try_get_property_value(element, group)
                    .and_then(|v| v.as_int())
                    .unwrap_or(-1);
                (key, (0..4).map(|p| results.get_value(g, p)).collect())
            })
            .collect()
    }

    #[test]
    fn test_every_alias_agrees() {
        let (table, group, score) = fixture();
        let reference = create_grouper(GrouperAlias::SingleBucket, definition(group, score), 1)
            .group(&table)
            .expect("grouping should succeed");
        let expected = summarize(&reference, group);
        assert_eq!(expected.len(), 3);
        // group 1: 1,4,7,10,13,16,19，7 没有 score
        assert_eq!(
            expected[&1],
            vec![
                Some(Value::Int(7)),
                Some(Value::Int(6)),
                Some(Value::Double(63.0 / 6.0)),
                Some(Value::Double(19.0)),
            ]
        );

        for alias in GrouperAlias::ALL {
            for threads in [1, 2, 4] {
                let results = create_grouper(alias, definition(group, score), threads)
                    .group(&table)
                    .expect("grouping should succeed");
                assert_eq!(
                    summarize(&results, group),
                    expected,
                    "alias = {}, threads = {}",
                    alias,
                    threads
                );
            }
        }
    }

    #[test]
    fn test_single_group_count_star_and_avg() {
        let (table, _group, score) = fixture();
        let avg = Aggregate::new(
            AggregateFunction::Avg,
            Some(ExprNode::VariableProperty {
                slot: 0,
                property: score,
                ty: ScalarType::Double,
            }),
        )
        .expect("aggregate should build");
        let definition = GroupingDefinition::new(
            KeyTemplate::for_group_keys(&[]).expect("template should build"),
            vec![Aggregate::count_star(), avg],
        );
        let single = create_grouper(GrouperAlias::SingleBucket, definition.clone(), 1)
            .group(&table)
            .expect("grouping should succeed");
        // 分区大小 {0, 1, 多个}：20 行分 32 段时前 31 段为空
        for threads in [1, 19, 32] {
            let results = create_grouper(GrouperAlias::LocalList, definition.clone(), threads)
                .group(&table)
                .expect("grouping should succeed");
            assert_eq!(results.group_count(), 1);
            assert_eq!(results.get_value(0, 0), Some(Value::Int(20)));
            assert_eq!(results.get_value(0, 1), single.get_value(0, 1));
        }

        let empty = ResultTable::new(Arc::clone(table.graph_arc()), 1);
        let results = create_grouper(GrouperAlias::GlobalBucket, definition, 4)
            .group(&empty)
            .expect("grouping should succeed");
        assert_eq!(results.group_count(), 1);
        assert_eq!(results.get_value(0, 0), Some(Value::Int(0)));
        assert_eq!(results.get_value(0, 1), None);
    }

    #[test]
    fn test_alias_names_round_trip() {
        for alias in GrouperAlias::ALL {
            assert_eq!(alias.name().parse::<GrouperAlias>().ok(), Some(alias));
        }
        assert!(matches!(
            "hash_bucket".parse::<GrouperAlias>(),
            Err(DBError::Config(_))
        ));
    }
}

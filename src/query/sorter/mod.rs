//! ORDER BY 排序
//!
//! 排序器只产出行下标的置换，不搬动行本身。NULL 在升序和降序下都排在最后，
//! 键完全相等的行保持原有的相对顺序。

pub mod abtree;
pub mod merge_sort;
pub mod streamed;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::{DBError, DBResult};
use crate::expression::RowSource;
use crate::query::comparer::KeyTemplate;

pub use abtree::{AbTree, AbTreeSorter};
pub use merge_sort::MergeSorter;
pub use streamed::{k_way_merge, StreamedSorter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SorterAlias {
    #[default]
    MergeSort,
    AbTree,
}

impl SorterAlias {
    pub const ALL: [SorterAlias; 2] = [SorterAlias::MergeSort, SorterAlias::AbTree];

    pub fn name(&self) -> &'static str {
        match self {
            SorterAlias::MergeSort => "merge_sort",
            SorterAlias::AbTree => "abtree",
        }
    }
}

impl fmt::Display for SorterAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SorterAlias {
    type Err = DBError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        SorterAlias::ALL
            .into_iter()
            .find(|alias| alias.name() == name)
            .ok_or_else(|| DBError::config(format!("unknown sorter alias '{}'", name)))
    }
}

impl TryFrom<String> for SorterAlias {
    type Error = DBError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}

impl From<SorterAlias> for String {
    fn from(alias: SorterAlias) -> Self {
        alias.name().to_string()
    }
}

/// 物化模式下的排序入口
#[derive(Debug, Clone)]
pub enum RowSorter {
    MergeSort(MergeSorter),
    AbTree(AbTreeSorter),
}

impl RowSorter {
    pub fn new(alias: SorterAlias, template: KeyTemplate, thread_count: usize) -> Self {
        log::debug!("using sorter {} with {} threads", alias, thread_count);
        match alias {
            SorterAlias::MergeSort => RowSorter::MergeSort(MergeSorter::new(template, thread_count)),
            SorterAlias::AbTree => RowSorter::AbTree(AbTreeSorter::new(template)),
        }
    }

    pub fn sort<S>(&self, source: &S) -> DBResult<Vec<usize>>
    where
        S: RowSource + Sync + ?Sized,
    {
        match self {
            RowSorter::MergeSort(sorter) => sorter.sort(source),
            RowSorter::AbTree(sorter) => sorter.sort(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::{ScalarType, Value};
    use crate::expression::{ExprNode, ExpressionHolder};
    use crate::query::results::ResultTable;
    use crate::storage::{ElementRef, GraphBuilder, PropertyId};

    /// 顶点 1..=6，score 依次为 3, 无, 1, 3, 无, 2
    fn fixture() -> (ResultTable, PropertyId) {
        let mut builder = GraphBuilder::new();
        builder.add_table("V").expect("add_table should succeed");
        let score = builder
            .declare_property("V", "score", ScalarType::Int)
            .expect("declare_property should succeed");
        let scores = [Some(3), None, Some(1), Some(3), None, Some(2)];
        for (i, s) in scores.iter().enumerate() {
            let props: Vec<(&str, Value)> = s.map(|v| ("score", Value::Int(v))).into_iter().collect();
            builder
                .add_vertex(i as i64 + 1, "V", props)
                .expect("add_vertex should succeed");
        }
        let graph = Arc::new(builder.build().expect("build should succeed"));
        let mut table = ResultTable::new(graph, 1);
        for v in 0..scores.len() as u32 {
            table.add_row(&[ElementRef::Vertex(v)]);
        }
        (table, score)
    }

    fn template(score: PropertyId, descending: bool) -> KeyTemplate {
        let holder = Arc::new(ExpressionHolder::new(
            ExprNode::VariableProperty {
                slot: 0,
                property: score,
                ty: ScalarType::Int,
            },
            "x.score",
        ));
        KeyTemplate::for_order_by(&[(holder, descending)])
    }

    #[test]
    fn test_nulls_last_both_directions() {
        let (table, score) = fixture();
        for alias in SorterAlias::ALL {
            let ascending = RowSorter::new(alias, template(score, false), 2)
                .sort(&table)
                .expect("sort should succeed");
            assert_eq!(ascending, vec![2, 5, 0, 3, 1, 4], "alias = {}", alias);

            let descending = RowSorter::new(alias, template(score, true), 2)
                .sort(&table)
                .expect("sort should succeed");
            assert_eq!(descending, vec![0, 3, 5, 2, 1, 4], "alias = {}", alias);
        }
    }

    #[test]
    fn test_alias_round_trip() {
        for alias in SorterAlias::ALL {
            assert_eq!(alias.name().parse::<SorterAlias>(), Ok(alias));
        }
        assert!("quick_sort".parse::<SorterAlias>().is_err());
        assert_eq!(SorterAlias::default(), SorterAlias::MergeSort);
    }
}

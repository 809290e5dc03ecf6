//! 表达式节点
//!
//! 类型集合是封闭的（int / string / double），节点在计划期带上静态类型，
//! 求值时不做任何运行期类型分派。

use crate::core::{ScalarType, Value};
use crate::expression::source::RowSource;
use crate::storage::{ElementRef, Graph, PropertyId};

#[derive(Debug, Clone, PartialEq)]
pub enum ExprNode {
    /// 变量绑定元素的ID，总能求值成功
    VariableId { slot: usize },
    /// 变量绑定元素的属性，元素没有该属性时无值
    VariableProperty {
        slot: usize,
        property: PropertyId,
        ty: ScalarType,
    },
    /// 分组结果中第 `position` 个聚合的值
    Aggregate { position: usize, ty: ScalarType },
}

impl ExprNode {
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            ExprNode::VariableId { .. } => ScalarType::Int,
            ExprNode::VariableProperty { ty, .. } | ExprNode::Aggregate { ty, .. } => *ty,
        }
    }

    pub fn contains_aggregate(&self) -> bool {
        matches!(self, ExprNode::Aggregate { .. })
    }

    #[inline]
    pub fn evaluate<S: RowSource + ?Sized>(&self, source: &S, index: usize) -> Option<Value> {
        match self {
            ExprNode::Aggregate { position, .. } => source.aggregate_value(index, *position),
            _ => self.evaluate_row(source.graph(), source.row(index)),
        }
    }

    /// 直接在元素数组上求值；聚合节点在普通行上无值
    #[inline]
    pub fn evaluate_row(&self, graph: &Graph, row: &[ElementRef]) -> Option<Value> {
        match self {
            ExprNode::VariableId { slot } => {
                row.get(*slot).map(|e| Value::Int(graph.element_id(*e)))
            }
            ExprNode::VariableProperty { slot, property, .. } => {
                let element = row.get(*slot)?;
                graph.try_get_property_value(*element, *property)
            }
            ExprNode::Aggregate { .. } => None,
        }
    }

    /// 收集表达式读取的行槽位
    pub fn collect_used_vars(&self, vars: &mut Vec<usize>) {
        match self {
            ExprNode::VariableId { slot } | ExprNode::VariableProperty { slot, .. } => {
                if !vars.contains(slot) {
                    vars.push(*slot);
                }
            }
            ExprNode::Aggregate { .. } => {}
        }
    }
}

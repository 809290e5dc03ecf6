//! 表达式持有者
//!
//! 包装一个表达式节点、它的静态类型以及显示标签。计划对象和比较器通过
//! `Arc<ExpressionHolder>` 共享同一个实例。

use std::fmt;

use crate::core::{ScalarType, Value};
use crate::expression::node::ExprNode;
use crate::expression::source::RowSource;
use crate::storage::{ElementRef, Graph};

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionHolder {
    node: ExprNode,
    text: String,
    alias: Option<String>,
}

impl ExpressionHolder {
    /// `text` 为表达式在查询中的原始写法
    pub fn new(node: ExprNode, text: impl Into<String>) -> Self {
        Self {
            node,
            text: text.into(),
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: Option<String>) -> Self {
        self.alias = alias;
        self
    }

    pub fn node(&self) -> &ExprNode {
        &self.node
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn scalar_type(&self) -> ScalarType {
        self.node.scalar_type()
    }

    pub fn contains_aggregate(&self) -> bool {
        self.node.contains_aggregate()
    }

    #[inline]
    pub fn evaluate<S: RowSource + ?Sized>(&self, source: &S, index: usize) -> Option<Value> {
        self.node.evaluate(source, index)
    }

    #[inline]
    pub fn evaluate_row(&self, graph: &Graph, row: &[ElementRef]) -> Option<Value> {
        self.node.evaluate_row(graph, row)
    }

    pub fn collect_used_vars(&self) -> Vec<usize> {
        let mut vars = Vec::new();
        self.node.collect_used_vars(&mut vars);
        vars
    }
}

impl fmt::Display for ExpressionHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{}", alias),
            None => write!(f, "{}", self.text),
        }
    }
}

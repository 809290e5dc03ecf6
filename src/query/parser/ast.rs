//! 查询语法树
//!
//! 只描述文法本身，名字解析和类型检查在 `query::plan` 中完成。

use crate::expression::AggregateFunction;
use crate::query::matcher::EdgeDirection;

#[derive(Debug, Clone, PartialEq)]
pub struct QueryAst {
    pub select: SelectClause,
    pub patterns: Vec<PathPattern>,
    pub group_by: Vec<Expr>,
    pub order_by: Vec<OrderItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectClause {
    Star,
    Items(Vec<SelectItem>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub expr: Expr,
    pub descending: bool,
}

/// 表达式及其在查询中的原始写法
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Variable(String),
    Property { variable: String, property: String },
    /// `argument` 为 `None` 表示 `*`
    Aggregate {
        function: AggregateFunction,
        argument: Option<Box<Expr>>,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodePattern {
    pub variable: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgePattern {
    pub variable: Option<String>,
    pub label: Option<String>,
    pub direction: EdgeDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathPattern {
    pub start: NodePattern,
    pub hops: Vec<(EdgePattern, NodePattern)>,
}

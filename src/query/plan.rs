//! 查询计划
//!
//! 把语法树解析为变量槽位、带类型的表达式、聚合列表和编译好的匹配模式。
//! 所有名字（变量、表、属性、聚合函数）都在这里解析，执行期不再查找。

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::error::{QueryError, QueryResult};
use crate::expression::{Aggregate, ExprNode, ExpressionHolder};
use crate::query::comparer::KeyTemplate;
use crate::query::grouper::GroupingDefinition;
use crate::query::matcher::{MatchPattern, PatternChain, PatternStep};
use crate::query::parser::{Expr, ExprKind, QueryAst, SelectClause};
use crate::storage::Graph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Vertex,
    Edge,
}

/// 具名模式变量到行槽位的映射，槽位按首次出现的顺序分配
#[derive(Debug, Clone, Default)]
pub struct VariableMap {
    names: Vec<String>,
    kinds: Vec<VariableKind>,
    slots: HashMap<String, usize>,
}

impl VariableMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记变量并返回槽位；同一名字既作顶点又作边时报错
    pub fn declare(&mut self, name: &str, kind: VariableKind) -> QueryResult<usize> {
        if let Some(&slot) = self.slots.get(name) {
            if self.kinds[slot] != kind {
                return Err(QueryError::invalid(format!(
                    "variable '{}' is used both as a vertex and as an edge",
                    name
                )));
            }
            return Ok(slot);
        }
        let slot = self.names.len();
        self.names.push(name.to_string());
        self.kinds.push(kind);
        self.slots.insert(name.to_string(), slot);
        Ok(slot)
    }

    pub fn slot(&self, name: &str) -> Option<usize> {
        self.slots.get(name).copied()
    }

    pub fn name(&self, slot: usize) -> Option<&str> {
        self.names.get(slot).map(String::as_str)
    }

    pub fn kind(&self, slot: usize) -> Option<VariableKind> {
        self.kinds.get(slot).copied()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct QueryPlan {
    variables: VariableMap,
    pattern: Arc<MatchPattern>,
    select: Vec<Arc<ExpressionHolder>>,
    group_keys: Vec<Arc<ExpressionHolder>>,
    aggregates: Vec<Aggregate>,
    order_by: Vec<(Arc<ExpressionHolder>, bool)>,
}

impl QueryPlan {
    pub fn build(graph: &Graph, ast: &QueryAst) -> QueryResult<Self> {
        let mut builder = PlanBuilder {
            graph,
            variables: VariableMap::new(),
            aggregates: Vec::new(),
        };
        let pattern = builder.compile_pattern(ast)?;

        let group_keys = ast
            .group_by
            .iter()
            .map(|expr| builder.holder(expr, None))
            .collect::<QueryResult<Vec<_>>>()?;

        let select = match &ast.select {
            SelectClause::Star => builder.expand_star(),
            SelectClause::Items(items) => items
                .iter()
                .map(|item| builder.holder(&item.expr, item.alias.clone()))
                .collect::<QueryResult<Vec<_>>>()?,
        };

        let order_by = ast
            .order_by
            .iter()
            .map(|item| {
                let holder = match builder.select_alias(&item.expr, &select) {
                    Some(holder) => holder,
                    None => builder.holder(&item.expr, None)?,
                };
                Ok::<_, QueryError>((holder, item.descending))
            })
            .collect::<QueryResult<Vec<_>>>()?;

        let plan = Self {
            variables: builder.variables,
            pattern: Arc::new(pattern),
            select,
            group_keys,
            aggregates: builder.aggregates,
            order_by,
        };
        plan.check_grouping()?;
        log::debug!(
            "planned query: {} variables, {} group keys, {} aggregates, {} order keys",
            plan.variables.len(),
            plan.group_keys.len(),
            plan.aggregates.len(),
            plan.order_by.len()
        );
        Ok(plan)
    }

    pub fn variables(&self) -> &VariableMap {
        &self.variables
    }

    pub fn pattern(&self) -> &Arc<MatchPattern> {
        &self.pattern
    }

    /// 结果行宽度，即具名变量个数
    pub fn width(&self) -> usize {
        self.variables.len()
    }

    pub fn select(&self) -> &[Arc<ExpressionHolder>] {
        &self.select
    }

    pub fn group_keys(&self) -> &[Arc<ExpressionHolder>] {
        &self.group_keys
    }

    pub fn aggregates(&self) -> &[Aggregate] {
        &self.aggregates
    }

    pub fn order_by(&self) -> &[(Arc<ExpressionHolder>, bool)] {
        &self.order_by
    }

    pub fn is_grouped(&self) -> bool {
        !self.group_keys.is_empty() || !self.aggregates.is_empty()
    }

    pub fn is_ordered(&self) -> bool {
        !self.order_by.is_empty()
    }

    pub fn header(&self) -> Vec<String> {
        self.select.iter().map(|holder| holder.to_string()).collect()
    }

    pub fn grouping_definition(&self) -> QueryResult<GroupingDefinition> {
        Ok(GroupingDefinition::new(
            KeyTemplate::for_group_keys(&self.group_keys)?,
            self.aggregates.clone(),
        ))
    }

    pub fn order_template(&self) -> KeyTemplate {
        KeyTemplate::for_order_by(&self.order_by)
    }

    /// 分组查询中，聚合之外的表达式必须由分组键决定
    fn check_grouping(&self) -> QueryResult<()> {
        KeyTemplate::for_group_keys(&self.group_keys)?;
        if !self.is_grouped() {
            return Ok(());
        }
        let outputs = self
            .select
            .iter()
            .chain(self.order_by.iter().map(|(holder, _)| holder));
        for holder in outputs {
            if holder.contains_aggregate() || self.determined_by_group_keys(holder.node()) {
                continue;
            }
            return Err(QueryError::invalid(format!(
                "'{}' must appear in GROUP BY or inside an aggregate",
                holder.text()
            )));
        }
        Ok(())
    }

    fn determined_by_group_keys(&self, node: &ExprNode) -> bool {
        self.group_keys.iter().any(|key| match (key.node(), node) {
            (k, n) if k == n => true,
            // 按元素分组时，该元素的属性在组内不变
            (ExprNode::VariableId { slot: k }, ExprNode::VariableProperty { slot: n, .. }) => k == n,
            _ => false,
        })
    }
}

struct PlanBuilder<'g> {
    graph: &'g Graph,
    variables: VariableMap,
    aggregates: Vec<Aggregate>,
}

impl PlanBuilder<'_> {
    fn compile_pattern(&mut self, ast: &QueryAst) -> QueryResult<MatchPattern> {
        let mut chains = Vec::with_capacity(ast.patterns.len());
        for path in &ast.patterns {
            let start = self.step(&path.start.variable, &path.start.label, VariableKind::Vertex)?;
            let mut chain = PatternChain::new(start);
            for (edge, vertex) in &path.hops {
                let edge_step = self.step(&edge.variable, &edge.label, VariableKind::Edge)?;
                let vertex_step = self.step(&vertex.variable, &vertex.label, VariableKind::Vertex)?;
                chain.push_hop(edge_step, edge.direction, vertex_step);
            }
            chains.push(chain);
        }
        Ok(MatchPattern::compile(chains, self.variables.len()))
    }

    fn step(
        &mut self,
        variable: &Option<String>,
        label: &Option<String>,
        kind: VariableKind,
    ) -> QueryResult<PatternStep> {
        let slot = variable
            .as_deref()
            .map(|name| self.variables.declare(name, kind))
            .transpose()?;
        let table = label
            .as_deref()
            .map(|name| {
                self.graph
                    .table_id(name)
                    .ok_or_else(|| QueryError::UnknownTable(name.to_string()))
            })
            .transpose()?;
        Ok(PatternStep::new(slot, table))
    }

    fn holder(&mut self, expr: &Expr, alias: Option<String>) -> QueryResult<Arc<ExpressionHolder>> {
        let node = self.resolve(expr)?;
        Ok(Arc::new(ExpressionHolder::new(node, expr.text.clone()).with_alias(alias)))
    }

    fn resolve(&mut self, expr: &Expr) -> QueryResult<ExprNode> {
        match &expr.kind {
            ExprKind::Variable(name) => Ok(ExprNode::VariableId {
                slot: self.slot(name)?,
            }),
            ExprKind::Property { variable, property } => {
                let slot = self.slot(variable)?;
                let (property, ty) = self
                    .graph
                    .catalog()
                    .lookup(property)
                    .ok_or_else(|| QueryError::UnknownProperty(property.clone()))?;
                Ok(ExprNode::VariableProperty { slot, property, ty })
            }
            ExprKind::Aggregate { function, argument } => {
                let argument = argument
                    .as_deref()
                    .map(|arg| self.resolve(arg))
                    .transpose()?;
                let aggregate = Aggregate::new(*function, argument)?;
                let ty = aggregate.result_type();
                let position = match self.aggregates.iter().position(|a| *a == aggregate) {
                    Some(position) => position,
                    None => {
                        self.aggregates.push(aggregate);
                        self.aggregates.len() - 1
                    }
                };
                Ok(ExprNode::Aggregate { position, ty })
            }
        }
    }

    /// ORDER BY 中引用 SELECT 别名的裸名字；同名变量优先
    fn select_alias(&self, expr: &Expr, select: &[Arc<ExpressionHolder>]) -> Option<Arc<ExpressionHolder>> {
        let ExprKind::Variable(name) = &expr.kind else {
            return None;
        };
        if self.variables.slot(name).is_some() {
            return None;
        }
        select
            .iter()
            .find(|holder| holder.alias() == Some(name.as_str()))
            .cloned()
    }

    fn slot(&self, name: &str) -> QueryResult<usize> {
        self.variables
            .slot(name)
            .ok_or_else(|| QueryError::UnknownVariable(name.to_string()))
    }

    /// `SELECT *` 展开为每个具名变量的ID
    fn expand_star(&self) -> Vec<Arc<ExpressionHolder>> {
        self.variables
            .names()
            .iter()
            .enumerate()
            .map(|(slot, name)| Arc::new(ExpressionHolder::new(ExprNode::VariableId { slot }, name.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ScalarType, Value};
    use crate::query::parser::parse_query;
    use crate::storage::GraphBuilder;

    fn graph() -> Graph {
        let mut builder = GraphBuilder::new();
        builder.add_table("Person").expect("add_table should succeed");
        builder.add_table("knows").expect("add_table should succeed");
        builder
            .declare_property("Person", "age", ScalarType::Int)
            .expect("declare_property should succeed");
        builder
            .declare_property("Person", "name", ScalarType::String)
            .expect("declare_property should succeed");
        builder
            .add_vertex(1, "Person", vec![("age", Value::Int(30))])
            .expect("add_vertex should succeed");
        builder.build().expect("build should succeed")
    }

    fn plan(text: &str) -> QueryResult<QueryPlan> {
        QueryPlan::build(&graph(), &parse_query(text)?)
    }

    #[test]
    fn test_slots_follow_first_appearance() {
        let plan = plan("SELECT * MATCH (a)-[e]->(b)-(), (b)<-(c)").expect("plan should build");
        assert_eq!(plan.variables().names(), &["a", "e", "b", "c"]);
        assert_eq!(plan.variables().kind(1), Some(VariableKind::Edge));
        assert_eq!(plan.width(), 4);
        assert_eq!(plan.header(), vec!["a", "e", "b", "c"]);
        assert!(!plan.is_grouped());
    }

    #[test]
    fn test_vertex_edge_conflict() {
        assert!(matches!(
            plan("SELECT * MATCH (a)-[a]->(b)"),
            Err(QueryError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_name_resolution_errors() {
        assert_eq!(
            plan("SELECT * MATCH (a:Animal)").unwrap_err(),
            QueryError::UnknownTable("Animal".to_string())
        );
        assert_eq!(
            plan("SELECT a.height MATCH (a)").unwrap_err(),
            QueryError::UnknownProperty("height".to_string())
        );
        assert_eq!(
            plan("SELECT b MATCH (a)").unwrap_err(),
            QueryError::UnknownVariable("b".to_string())
        );
    }

    #[test]
    fn test_aggregates_are_shared_by_position() {
        let plan = plan("SELECT a.name, COUNT(*), AVG(a.age) MATCH (a) GROUP BY a.name ORDER BY COUNT(*) DESC")
            .expect("plan should build");
        assert_eq!(plan.aggregates().len(), 2);
        assert_eq!(
            plan.order_by()[0].0.node(),
            &ExprNode::Aggregate {
                position: 0,
                ty: ScalarType::Int
            }
        );
        assert_eq!(plan.select()[2].scalar_type(), ScalarType::Double);
        assert!(plan.is_grouped());
    }

    #[test]
    fn test_grouping_validation() {
        assert!(matches!(
            plan("SELECT a.age, COUNT(*) MATCH (a)-(b) GROUP BY a.name"),
            Err(QueryError::InvalidQuery(_))
        ));
        assert!(matches!(
            plan("SELECT b, COUNT(*) MATCH (a)-(b)"),
            Err(QueryError::InvalidQuery(_))
        ));
        plan("SELECT a.age, COUNT(b) MATCH (a)-(b) GROUP BY a").expect("property of a group key element");
    }

    #[test]
    fn test_aggregate_in_group_by_rejected() {
        assert!(matches!(
            plan("SELECT COUNT(*) MATCH (a) GROUP BY COUNT(*)"),
            Err(QueryError::UnsupportedExpression(_))
        ));
    }

    #[test]
    fn test_order_by_select_alias() {
        let plan = plan("SELECT a.age AS years MATCH (a) ORDER BY years DESC").expect("plan should build");
        assert!(Arc::ptr_eq(&plan.order_by()[0].0, &plan.select()[0]));
        assert!(plan.order_by()[0].1);
    }

    #[test]
    fn test_alias_and_text() {
        let plan = plan("SELECT a.age AS years, min( a.age ) MATCH (a)").expect("plan should build");
        assert_eq!(plan.header(), vec!["years", "min( a.age )"]);
    }
}

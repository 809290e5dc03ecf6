//! 图构建器
//!
//! 加载期的唯一写入口：登记表与属性、顶点与边，最后一次性生成不可变的 `Graph`。
//! 任何不变量违背（重复ID、非正顶点ID、缺失端点、类型不符）都会立即失败。

use std::collections::{HashMap, HashSet};

use crate::core::error::{GraphError, GraphResult};
use crate::core::{ScalarType, Value};
use crate::storage::graph::{Edge, Graph, Vertex};
use crate::storage::table::{PropertyCatalog, PropertyId, Table, TableId};

struct PendingVertex {
    id: i64,
    table: TableId,
    position: usize,
}

struct PendingEdge {
    id: i64,
    table: TableId,
    position: usize,
    from: i64,
    to: i64,
}

#[derive(Default)]
pub struct GraphBuilder {
    tables: Vec<Table>,
    table_names: HashMap<String, TableId>,
    catalog: PropertyCatalog,
    vertices: Vec<PendingVertex>,
    edges: Vec<PendingEdge>,
    ids: HashSet<i64>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&mut self, name: &str) -> GraphResult<TableId> {
        if self.table_names.contains_key(name) {
            return Err(GraphError::DuplicateTable(name.to_string()));
        }
        let id = self.tables.len();
        self.tables.push(Table::new(id, name));
        self.table_names.insert(name.to_string(), id);
        Ok(id)
    }

    /// 返回已有表或新建表
    pub fn table_or_insert(&mut self, name: &str) -> TableId {
        match self.table_names.get(name) {
            Some(&id) => id,
            None => {
                let id = self.tables.len();
                self.tables.push(Table::new(id, name));
                self.table_names.insert(name.to_string(), id);
                id
            }
        }
    }

    pub fn declare_property(
        &mut self,
        table: &str,
        property: &str,
        ty: ScalarType,
    ) -> GraphResult<PropertyId> {
        let table_id = self.resolve_table(table)?;
        let property_id = self.catalog.register(property, ty)?;
        self.tables[table_id].declare_property(property_id, ty);
        Ok(property_id)
    }

    fn resolve_table(&self, name: &str) -> GraphResult<TableId> {
        self.table_names
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::UnknownTable(name.to_string()))
    }

    fn claim_id(&mut self, id: i64) -> GraphResult<()> {
        if !self.ids.insert(id) {
            return Err(GraphError::DuplicateId(id));
        }
        Ok(())
    }

    /// 先解析并校验全部属性，失败时构建器保持不变
    fn resolve_properties<'a, I>(
        &self,
        table: TableId,
        properties: I,
    ) -> GraphResult<Vec<(PropertyId, &'a str, Value)>>
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        properties
            .into_iter()
            .map(|(name, value)| {
                let (property_id, _) = self.catalog.lookup(name).ok_or_else(|| {
                    GraphError::UndeclaredProperty {
                        table: self.tables[table].name().to_string(),
                        property: name.to_string(),
                    }
                })?;
                self.tables[table].check_property(property_id, name, &value)?;
                Ok::<_, GraphError>((property_id, name, value))
            })
            .collect()
    }

    fn insert_with_properties(
        &mut self,
        table: TableId,
        id: i64,
        properties: Vec<(PropertyId, &str, Value)>,
    ) -> GraphResult<usize> {
        self.claim_id(id)?;
        let position = self.tables[table].insert_element(id)?;
        for (property_id, name, value) in properties {
            self.tables[table].set_property(id, property_id, name, value)?;
        }
        Ok(position)
    }

    pub fn add_vertex<'a, I>(&mut self, id: i64, table: &str, properties: I) -> GraphResult<()>
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        if id <= 0 {
            return Err(GraphError::NonPositiveVertexId(id));
        }
        let table_id = self.resolve_table(table)?;
        let properties = self.resolve_properties(table_id, properties)?;
        let position = self.insert_with_properties(table_id, id, properties)?;
        self.vertices.push(PendingVertex {
            id,
            table: table_id,
            position,
        });
        Ok(())
    }

    pub fn add_edge<'a, I>(
        &mut self,
        id: i64,
        table: &str,
        from: i64,
        to: i64,
        properties: I,
    ) -> GraphResult<()>
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        if id <= 0 {
            return Err(GraphError::NonPositiveEdgeId(id));
        }
        let table_id = self.resolve_table(table)?;
        let properties = self.resolve_properties(table_id, properties)?;
        let position = self.insert_with_properties(table_id, id, properties)?;
        self.edges.push(PendingEdge {
            id,
            table: table_id,
            position,
            from,
            to,
        });
        Ok(())
    }

    pub fn build(self) -> GraphResult<Graph> {
        let vertex_index: HashMap<i64, u32> = self
            .vertices
            .iter()
            .enumerate()
            .map(|(i, v)| (v.id, i as u32))
            .collect();

        let mut edges = Vec::with_capacity(self.edges.len());
        for pending in &self.edges {
            let source = *vertex_index
                .get(&pending.from)
                .ok_or(GraphError::MissingEndpoint {
                    edge: pending.id,
                    vertex: pending.from,
                })?;
            let target = *vertex_index
                .get(&pending.to)
                .ok_or(GraphError::MissingEndpoint {
                    edge: pending.id,
                    vertex: pending.to,
                })?;
            edges.push(Edge {
                id: pending.id,
                table: pending.table,
                position: pending.position,
                source,
                target,
            });
        }
        // 稳定排序，同一起点的出边保持插入顺序
        edges.sort_by_key(|e| e.source);

        let vertex_count = self.vertices.len();
        let mut out_counts = vec![0u32; vertex_count];
        let mut in_counts = vec![0u32; vertex_count];
        for edge in &edges {
            out_counts[edge.source as usize] += 1;
            in_counts[edge.target as usize] += 1;
        }

        let mut in_edge_index: Vec<u32> = (0..edges.len() as u32).collect();
        in_edge_index.sort_by_key(|&e| edges[e as usize].target);

        let mut vertices = Vec::with_capacity(vertex_count);
        let (mut out_offset, mut in_offset) = (0u32, 0u32);
        for (i, pending) in self.vertices.iter().enumerate() {
            vertices.push(Vertex {
                id: pending.id,
                table: pending.table,
                position: pending.position,
                out_start: out_offset,
                out_end: out_offset + out_counts[i],
                in_start: in_offset,
                in_end: in_offset + in_counts[i],
            });
            out_offset += out_counts[i];
            in_offset += in_counts[i];
        }

        log::debug!(
            "graph built: {} vertices, {} edges, {} tables",
            vertices.len(),
            edges.len(),
            self.tables.len()
        );

        Ok(Graph::new(
            vertices,
            edges,
            in_edge_index,
            self.tables,
            self.catalog,
        ))
    }
}

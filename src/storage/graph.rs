//! 不可变的紧凑图表示
//!
//! 边数组按起点排序，每个顶点的出边是边数组中的一段连续区间；
//! 入边则是按终点排序的入边下标数组中的一段连续区间。
//! 空区间表示"没有边"。图在加载期构建一次，查询期间只读，可被多个工作线程无锁并发读取。

use std::collections::HashMap;
use std::ops::Range;

use crate::core::Value;
use crate::storage::table::{PropertyCatalog, PropertyId, Table, TableId};

/// 图元素句柄：指向图内顶点数组或边数组的非拥有引用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementRef {
    Vertex(u32),
    Edge(u32),
}

impl ElementRef {
    pub fn is_vertex(&self) -> bool {
        matches!(self, ElementRef::Vertex(_))
    }
}

#[derive(Debug, Clone)]
pub struct Vertex {
    pub(crate) id: i64,
    pub(crate) table: TableId,
    pub(crate) position: usize,
    pub(crate) out_start: u32,
    pub(crate) out_end: u32,
    pub(crate) in_start: u32,
    pub(crate) in_end: u32,
}

impl Vertex {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn table(&self) -> TableId {
        self.table
    }

    pub fn position_in_table(&self) -> usize {
        self.position
    }

    /// 出边在边数组中的区间
    pub fn out_edge_range(&self) -> Range<usize> {
        self.out_start as usize..self.out_end as usize
    }

    /// 入边在入边下标数组中的区间
    pub fn in_edge_range(&self) -> Range<usize> {
        self.in_start as usize..self.in_end as usize
    }
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub(crate) id: i64,
    pub(crate) table: TableId,
    pub(crate) position: usize,
    pub(crate) source: u32,
    pub(crate) target: u32,
}

impl Edge {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn table(&self) -> TableId {
        self.table
    }

    pub fn position_in_table(&self) -> usize {
        self.position
    }

    pub fn source(&self) -> u32 {
        self.source
    }

    pub fn target(&self) -> u32 {
        self.target
    }
}

#[derive(Debug)]
pub struct Graph {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    in_edge_index: Vec<u32>,
    tables: Vec<Table>,
    table_names: HashMap<String, TableId>,
    catalog: PropertyCatalog,
}

impl Graph {
    /// 由已校验的构建结果组装图，外部请使用 `GraphBuilder`
    pub(crate) fn new(
        vertices: Vec<Vertex>,
        edges: Vec<Edge>,
        in_edge_index: Vec<u32>,
        tables: Vec<Table>,
        catalog: PropertyCatalog,
    ) -> Self {
        let table_names = tables
            .iter()
            .map(|t| (t.name().to_string(), t.id()))
            .collect();
        Self {
            vertices,
            edges,
            in_edge_index,
            tables,
            table_names,
            catalog,
        }
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    pub fn vertex(&self, index: u32) -> &Vertex {
        &self.vertices[index as usize]
    }

    #[inline]
    pub fn edge(&self, index: u32) -> &Edge {
        &self.edges[index as usize]
    }

    /// 顶点的入边（边数组下标）
    #[inline]
    pub fn in_edges(&self, vertex: u32) -> &[u32] {
        &self.in_edge_index[self.vertex(vertex).in_edge_range()]
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, id: TableId) -> &Table {
        &self.tables[id]
    }

    pub fn table_id(&self, name: &str) -> Option<TableId> {
        self.table_names.get(name).copied()
    }

    pub fn catalog(&self) -> &PropertyCatalog {
        &self.catalog
    }

    #[inline]
    pub fn element_id(&self, element: ElementRef) -> i64 {
        match element {
            ElementRef::Vertex(v) => self.vertex(v).id,
            ElementRef::Edge(e) => self.edge(e).id,
        }
    }

    #[inline]
    pub fn element_table(&self, element: ElementRef) -> TableId {
        match element {
            ElementRef::Vertex(v) => self.vertex(v).table,
            ElementRef::Edge(e) => self.edge(e).table,
        }
    }

    /// 读取元素属性；属性缺失返回 `None`
    #[inline]
    pub fn try_get_property_value(&self, element: ElementRef, property: PropertyId) -> Option<Value> {
        let (table, position) = match element {
            ElementRef::Vertex(v) => {
                let vertex = self.vertex(v);
                (vertex.table, vertex.position)
            }
            ElementRef::Edge(e) => {
                let edge = self.edge(e);
                (edge.table, edge.position)
            }
        };
        self.tables[table].value_at(position, property)
    }

    /// 按外部ID查找顶点下标
    pub fn vertex_index(&self, id: i64) -> Option<u32> {
        let table = self.tables.iter().find(|t| t.position_of(id).is_some())?;
        let position = table.position_of(id)?;
        self.vertices
            .iter()
            .position(|v| v.table == table.id() && v.position == position)
            .map(|i| i as u32)
    }
}

//! JSON 图加载器
//!
//! 文档结构：`schema` 声明各标签的属性类型，`vertices` / `edges` 给出元素。
//! 属性值按声明的类型解析，未声明的类型记号直接报错。

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::error::{DBError, DBResult, GraphError};
use crate::core::{ScalarType, Value};
use crate::storage::builder::GraphBuilder;
use crate::storage::graph::Graph;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub schema: SchemaDocument,
    #[serde(default)]
    pub vertices: Vec<VertexDocument>,
    #[serde(default)]
    pub edges: Vec<EdgeDocument>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default)]
    pub vertices: Vec<LabelDocument>,
    #[serde(default)]
    pub edges: Vec<LabelDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelDocument {
    pub label: String,
    #[serde(default)]
    pub properties: Vec<PropertyDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDocument {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VertexDocument {
    pub id: i64,
    pub label: String,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeDocument {
    pub id: i64,
    pub label: String,
    pub from: i64,
    pub to: i64,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

/// 从文件加载图
pub fn load_graph<P: AsRef<Path>>(path: P) -> DBResult<Graph> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    log::info!("loading graph from {}", path.display());
    from_json_str(&content)
}

pub fn from_json_str(content: &str) -> DBResult<Graph> {
    let document: GraphDocument = serde_json::from_str(content)?;
    build_graph(&document)
}

pub fn build_graph(document: &GraphDocument) -> DBResult<Graph> {
    let mut builder = GraphBuilder::new();
    let mut declared: BTreeMap<&str, ScalarType> = BTreeMap::new();

    for label in document.schema.vertices.iter().chain(&document.schema.edges) {
        builder.add_table(&label.label)?;
        for property in &label.properties {
            let ty: ScalarType = property.ty.parse()?;
            builder.declare_property(&label.label, &property.name, ty)?;
            declared.insert(&property.name, ty);
        }
    }

    for vertex in &document.vertices {
        let properties = convert_properties(&vertex.label, &vertex.properties, &declared)?;
        builder.add_vertex(
            vertex.id,
            &vertex.label,
            properties.iter().map(|(k, v)| (k.as_str(), v.clone())),
        )?;
    }

    for edge in &document.edges {
        let properties = convert_properties(&edge.label, &edge.properties, &declared)?;
        builder.add_edge(
            edge.id,
            &edge.label,
            edge.from,
            edge.to,
            properties.iter().map(|(k, v)| (k.as_str(), v.clone())),
        )?;
    }

    Ok(builder.build()?)
}

fn convert_properties(
    label: &str,
    properties: &BTreeMap<String, serde_json::Value>,
    declared: &BTreeMap<&str, ScalarType>,
) -> DBResult<Vec<(String, Value)>> {
    let mut converted = Vec::with_capacity(properties.len());
    for (name, raw) in properties {
        // JSON null 视为缺失
        if raw.is_null() {
            continue;
        }
        let ty = declared.get(name.as_str()).copied().ok_or_else(|| {
            GraphError::UndeclaredProperty {
                table: label.to_string(),
                property: name.clone(),
            }
        })?;
        let value = convert_value(name, raw, ty)?;
        converted.push((name.clone(), value));
    }
    Ok(converted)
}

fn convert_value(name: &str, raw: &serde_json::Value, ty: ScalarType) -> DBResult<Value> {
    let mismatch = || {
        DBError::from(GraphError::PropertyTypeMismatch {
            property: name.to_string(),
            expected: ty.to_string(),
        })
    };
    match ty {
        ScalarType::Int => raw.as_i64().map(Value::Int).ok_or_else(mismatch),
        ScalarType::Double => raw.as_f64().map(Value::Double).ok_or_else(mismatch),
        ScalarType::String => raw
            .as_str()
            .map(|s| Value::String(Arc::from(s)))
            .ok_or_else(mismatch),
    }
}

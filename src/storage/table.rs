//! 类型描述表
//!
//! 一张表对应一个标签（顶点或边的类型），按行位置存放稠密的属性列，
//! 并维护 `元素ID -> 行位置` 的映射。所有属性列与ID映射等长。

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::error::{GraphError, GraphResult};
use crate::core::{ScalarType, Value};

pub type TableId = usize;
pub type PropertyId = usize;

/// 稠密属性列，缺失值为 `None`
#[derive(Debug, Clone)]
pub enum PropertyColumn {
    Int(Vec<Option<i64>>),
    String(Vec<Option<Arc<str>>>),
    Double(Vec<Option<f64>>),
}

impl PropertyColumn {
    pub fn new(ty: ScalarType, len: usize) -> Self {
        match ty {
            ScalarType::Int => PropertyColumn::Int(vec![None; len]),
            ScalarType::String => PropertyColumn::String(vec![None; len]),
            ScalarType::Double => PropertyColumn::Double(vec![None; len]),
        }
    }

    pub fn scalar_type(&self) -> ScalarType {
        match self {
            PropertyColumn::Int(_) => ScalarType::Int,
            PropertyColumn::String(_) => ScalarType::String,
            PropertyColumn::Double(_) => ScalarType::Double,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PropertyColumn::Int(c) => c.len(),
            PropertyColumn::String(c) => c.len(),
            PropertyColumn::Double(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push_absent(&mut self) {
        match self {
            PropertyColumn::Int(c) => c.push(None),
            PropertyColumn::String(c) => c.push(None),
            PropertyColumn::Double(c) => c.push(None),
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (PropertyColumn::Int(_), Value::Int(_))
                | (PropertyColumn::String(_), Value::String(_))
                | (PropertyColumn::Double(_), Value::Double(_) | Value::Int(_))
        )
    }

    /// 写入一个值，类型不匹配时返回 `false`
    fn set(&mut self, position: usize, value: Value) -> bool {
        match (self, value) {
            (PropertyColumn::Int(c), Value::Int(v)) => c[position] = Some(v),
            (PropertyColumn::String(c), Value::String(v)) => c[position] = Some(v),
            (PropertyColumn::Double(c), Value::Double(v)) => c[position] = Some(v),
            // 整数字面量写入 double 列时按数值提升
            (PropertyColumn::Double(c), Value::Int(v)) => c[position] = Some(v as f64),
            _ => return false,
        }
        true
    }

    #[inline]
    pub fn get(&self, position: usize) -> Option<Value> {
        match self {
            PropertyColumn::Int(c) => c.get(position).copied().flatten().map(Value::Int),
            PropertyColumn::String(c) => c
                .get(position)
                .and_then(|v| v.as_ref())
                .map(|s| Value::String(Arc::clone(s))),
            PropertyColumn::Double(c) => c.get(position).copied().flatten().map(Value::Double),
        }
    }
}

/// 全图共享的属性目录：属性名 -> (PropertyId, 类型)
///
/// 同名属性在全图内只有一种类型
#[derive(Debug, Clone, Default)]
pub struct PropertyCatalog {
    names: Vec<String>,
    types: Vec<ScalarType>,
    index: HashMap<String, PropertyId>,
}

impl PropertyCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, ty: ScalarType) -> GraphResult<PropertyId> {
        if let Some(&id) = self.index.get(name) {
            if self.types[id] != ty {
                return Err(GraphError::ConflictingPropertyType {
                    property: name.to_string(),
                    existing: self.types[id].to_string(),
                    requested: ty.to_string(),
                });
            }
            return Ok(id);
        }
        let id = self.names.len();
        self.names.push(name.to_string());
        self.types.push(ty);
        self.index.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn lookup(&self, name: &str) -> Option<(PropertyId, ScalarType)> {
        self.index.get(name).map(|&id| (id, self.types[id]))
    }

    pub fn name(&self, id: PropertyId) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn scalar_type(&self, id: PropertyId) -> Option<ScalarType> {
        self.types.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// 类型描述表
#[derive(Debug, Clone)]
pub struct Table {
    id: TableId,
    name: String,
    ids: Vec<i64>,
    positions: HashMap<i64, usize>,
    properties: HashMap<PropertyId, PropertyColumn>,
}

impl Table {
    pub fn new(id: TableId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ids: Vec::new(),
            positions: HashMap::new(),
            properties: HashMap::new(),
        }
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn row_count(&self) -> usize {
        self.ids.len()
    }

    /// 声明一列属性，已有行补齐为缺失值
    pub fn declare_property(&mut self, property: PropertyId, ty: ScalarType) {
        let len = self.ids.len();
        self.properties
            .entry(property)
            .or_insert_with(|| PropertyColumn::new(ty, len));
    }

    pub fn has_property(&self, property: PropertyId) -> bool {
        self.properties.contains_key(&property)
    }

    /// 登记一个元素，返回其行位置
    pub fn insert_element(&mut self, id: i64) -> GraphResult<usize> {
        if self.positions.contains_key(&id) {
            return Err(GraphError::DuplicateId(id));
        }
        let position = self.ids.len();
        self.ids.push(id);
        self.positions.insert(id, position);
        for column in self.properties.values_mut() {
            column.push_absent();
        }
        Ok(position)
    }

    /// 只检查属性已声明且类型相符，不修改表
    pub fn check_property(&self, property: PropertyId, property_name: &str, value: &Value) -> GraphResult<()> {
        let column = self.properties.get(&property).ok_or_else(|| GraphError::UndeclaredProperty {
            table: self.name.clone(),
            property: property_name.to_string(),
        })?;
        if !column.accepts(value) {
            return Err(GraphError::PropertyTypeMismatch {
                property: property_name.to_string(),
                expected: column.scalar_type().to_string(),
            });
        }
        Ok(())
    }

    pub fn set_property(
        &mut self,
        id: i64,
        property: PropertyId,
        property_name: &str,
        value: Value,
    ) -> GraphResult<()> {
        let position = *self
            .positions
            .get(&id)
            .ok_or(GraphError::MissingElement(id))?;
        let column = self.properties.get_mut(&property).ok_or_else(|| {
            GraphError::UndeclaredProperty {
                table: self.name.clone(),
                property: property_name.to_string(),
            }
        })?;
        let expected = column.scalar_type();
        if !column.set(position, value) {
            return Err(GraphError::PropertyTypeMismatch {
                property: property_name.to_string(),
                expected: expected.to_string(),
            });
        }
        Ok(())
    }

    pub fn position_of(&self, id: i64) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// 按元素ID读取属性；属性不存在或该元素无值时返回 `None`，从不报错
    pub fn try_get_property_value(&self, id: i64, property: PropertyId) -> Option<Value> {
        let position = self.position_of(id)?;
        self.value_at(position, property)
    }

    /// 按行位置读取属性（元素已缓存行位置时的快速路径）
    #[inline]
    pub fn value_at(&self, position: usize, property: PropertyId) -> Option<Value> {
        self.properties.get(&property)?.get(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_read_properties() {
        let mut table = Table::new(0, "Person");
        table.declare_property(0, ScalarType::Int);
        table.insert_element(1).expect("insert should succeed");
        table.insert_element(2).expect("insert should succeed");
        table
            .set_property(1, 0, "age", Value::Int(30))
            .expect("set_property should succeed");

        assert_eq!(table.try_get_property_value(1, 0), Some(Value::Int(30)));
        assert_eq!(table.try_get_property_value(2, 0), None);
        assert_eq!(table.try_get_property_value(3, 0), None);
        assert_eq!(table.try_get_property_value(1, 7), None);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut table = Table::new(0, "Person");
        table.insert_element(5).expect("insert should succeed");
        assert_eq!(table.insert_element(5), Err(GraphError::DuplicateId(5)));
    }

    #[test]
    fn test_late_declared_column_is_dense() {
        let mut table = Table::new(0, "Person");
        table.insert_element(1).expect("insert should succeed");
        table.declare_property(3, ScalarType::String);
        table.insert_element(2).expect("insert should succeed");
        assert_eq!(table.properties[&3].len(), table.row_count());
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let mut table = Table::new(0, "Person");
        table.declare_property(0, ScalarType::Int);
        table.insert_element(1).expect("insert should succeed");
        let err = table.set_property(1, 0, "age", Value::from("old"));
        assert!(matches!(err, Err(GraphError::PropertyTypeMismatch { .. })));
        assert!(matches!(
            table.check_property(0, "age", &Value::from("old")),
            Err(GraphError::PropertyTypeMismatch { .. })
        ));
        assert_eq!(table.check_property(0, "age", &Value::Int(3)), Ok(()));
        assert!(matches!(
            table.check_property(9, "name", &Value::Int(3)),
            Err(GraphError::UndeclaredProperty { .. })
        ));
    }

    #[test]
    fn test_catalog_conflict() {
        let mut catalog = PropertyCatalog::new();
        let id = catalog.register("age", ScalarType::Int).expect("register should succeed");
        assert_eq!(catalog.register("age", ScalarType::Int), Ok(id));
        assert!(catalog.register("age", ScalarType::String).is_err());
        assert_eq!(catalog.lookup("age"), Some((id, ScalarType::Int)));
    }
}

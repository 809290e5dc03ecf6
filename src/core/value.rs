//! 标量值类型
//!
//! 查询引擎只支持封闭的三种标量类型：`int`、`string`、`double`。
//! 所有表达式、属性列和聚合累加器都基于这一封闭集合，通过枚举分发而不是运行时类型工厂。

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

use crate::core::error::GraphError;

/// 标量类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Int,
    String,
    Double,
}

impl ScalarType {
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::Int => "int",
            ScalarType::String => "string",
            ScalarType::Double => "double",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ScalarType::Int | ScalarType::Double)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScalarType {
    type Err = GraphError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token.to_ascii_lowercase().as_str() {
            "int" | "integer" => Ok(ScalarType::Int),
            "string" => Ok(ScalarType::String),
            "double" => Ok(ScalarType::Double),
            _ => Err(GraphError::UnknownPropertyType(token.to_string())),
        }
    }
}

/// 类型化标量值
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    String(Arc<str>),
    Double(f64),
}

impl Value {
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Value::Int(_) => ScalarType::Int,
            Value::String(_) => ScalarType::String,
            Value::Double(_) => ScalarType::Double,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// 数值视图，AVG 统一按 double 累加
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            Value::String(_) => None,
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Int(_) => 0,
            Value::Double(_) => 1,
            Value::String(_) => 2,
        }
    }

    /// 同类型值的全序比较；不同类型按类型序比较
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Double(a), Value::Double(b)) => {
                a.partial_cmp(b).unwrap_or_else(|| a.total_cmp(b))
            }
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }

    /// 32 位哈希码，供 djb2 行哈希组合使用
    pub fn hash_code(&self) -> i32 {
        match self {
            Value::Int(v) => (*v ^ (*v >> 32)) as i32,
            Value::Double(v) => {
                let bits = normalized_bits(*v);
                (bits ^ (bits >> 32)) as i32
            }
            Value::String(s) => s.bytes().fold(5381i32, |hash, b| {
                hash.wrapping_shl(5).wrapping_add(hash) ^ b as i32
            }),
        }
    }
}

fn normalized_bits(v: f64) -> u64 {
    if v == 0.0 {
        0.0f64.to_bits()
    } else if v.is_nan() {
        f64::NAN.to_bits()
    } else {
        v.to_bits()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Double(a), Value::Double(b)) => normalized_bits(*a) == normalized_bits(*b),
            _ => self.compare(other) == Ordering::Equal,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_rank().hash(state);
        match self {
            Value::Int(v) => v.hash(state),
            Value::String(s) => s.hash(state),
            Value::Double(v) => normalized_bits(*v).hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
            Value::Double(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(Arc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(Arc::from(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_type_from_str() {
        assert_eq!("int".parse::<ScalarType>(), Ok(ScalarType::Int));
        assert_eq!("Double".parse::<ScalarType>(), Ok(ScalarType::Double));
        assert!(matches!(
            "bool".parse::<ScalarType>(),
            Err(GraphError::UnknownPropertyType(_))
        ));
    }

    #[test]
    fn test_compare_same_type() {
        assert_eq!(Value::Int(1).compare(&Value::Int(2)), Ordering::Less);
        assert_eq!(Value::from("b").compare(&Value::from("a")), Ordering::Greater);
        assert_eq!(Value::Double(1.5).compare(&Value::Double(1.5)), Ordering::Equal);
    }

    #[test]
    fn test_zero_equality_and_hash() {
        assert_eq!(Value::Double(0.0), Value::Double(-0.0));
        assert_eq!(Value::Double(0.0).hash_code(), Value::Double(-0.0).hash_code());
    }

    #[test]
    fn test_string_hash_code_is_stable() {
        assert_eq!(Value::from("abc").hash_code(), Value::from("abc").hash_code());
        assert_ne!(Value::from("abc").hash_code(), Value::from("abd").hash_code());
    }
}

//! 聚合函数与聚合中间状态
//!
//! `AggregateBucketResult` 是单个分组上某个聚合的累加器，
//! `AggregateListResults` 是按分组位置索引的一列累加器。
//! 合并操作满足结合律和交换律，工作线程可以任意顺序合并部分结果。

use std::fmt;
use std::str::FromStr;

use crate::core::error::{QueryError, QueryResult};
use crate::core::{ScalarType, Value};
use crate::expression::node::ExprNode;
use crate::expression::source::RowSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    Count,
    Min,
    Max,
    Avg,
    Sum,
}

impl AggregateFunction {
    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Sum => "SUM",
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for AggregateFunction {
    type Err = QueryError;

    /// 函数名不区分大小写
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_uppercase().as_str() {
            "COUNT" => Ok(AggregateFunction::Count),
            "MIN" => Ok(AggregateFunction::Min),
            "MAX" => Ok(AggregateFunction::Max),
            "AVG" => Ok(AggregateFunction::Avg),
            "SUM" => Ok(AggregateFunction::Sum),
            _ => Err(QueryError::UnknownAggregate(name.to_string())),
        }
    }
}

/// 聚合：函数 + 可选参数表达式（`COUNT(*)` 没有参数）
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    function: AggregateFunction,
    argument: Option<ExprNode>,
}

impl Aggregate {
    pub fn new(function: AggregateFunction, argument: Option<ExprNode>) -> QueryResult<Self> {
        match (&function, &argument) {
            (AggregateFunction::Count, _) => {}
            (_, None) => {
                return Err(QueryError::invalid(format!(
                    "{}(*) is not supported, only COUNT(*) takes no argument",
                    function
                )))
            }
            (AggregateFunction::Sum | AggregateFunction::Avg, Some(arg))
                if !arg.scalar_type().is_numeric() =>
            {
                return Err(QueryError::invalid(format!(
                    "{} requires a numeric argument, found {}",
                    function,
                    arg.scalar_type()
                )))
            }
            _ => {}
        }
        if argument.as_ref().is_some_and(ExprNode::contains_aggregate) {
            return Err(QueryError::UnsupportedExpression(format!(
                "nested aggregate inside {}",
                function
            )));
        }
        Ok(Self { function, argument })
    }

    pub fn count_star() -> Self {
        Self {
            function: AggregateFunction::Count,
            argument: None,
        }
    }

    pub fn function(&self) -> AggregateFunction {
        self.function
    }

    pub fn argument(&self) -> Option<&ExprNode> {
        self.argument.as_ref()
    }

    pub fn is_count_star(&self) -> bool {
        self.function == AggregateFunction::Count && self.argument.is_none()
    }

    /// 聚合结果的静态类型
    pub fn result_type(&self) -> ScalarType {
        match (self.function, &self.argument) {
            (AggregateFunction::Count, _) => ScalarType::Int,
            (AggregateFunction::Avg, _) => ScalarType::Double,
            (_, Some(arg)) => arg.scalar_type(),
            (_, None) => ScalarType::Int,
        }
    }

    pub fn init(&self) -> AggregateBucketResult {
        match self.function {
            AggregateFunction::Count => AggregateBucketResult::Count { count: 0 },
            AggregateFunction::Min => AggregateBucketResult::Min { value: None },
            AggregateFunction::Max => AggregateBucketResult::Max { value: None },
            AggregateFunction::Sum => AggregateBucketResult::Sum { value: None },
            AggregateFunction::Avg => AggregateBucketResult::Avg { sum: 0.0, count: 0 },
        }
    }

    /// 在数据源的第 `index` 行上求参数并累加
    #[inline]
    pub fn accumulate<S: RowSource + ?Sized>(
        &self,
        acc: &mut AggregateBucketResult,
        source: &S,
        index: usize,
    ) {
        match &self.argument {
            None => acc.add_count(1),
            Some(arg) => acc.apply(arg.evaluate(source, index)),
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.argument {
            None => write!(f, "{}(*)", self.function),
            Some(_) => write!(f, "{}(..)", self.function),
        }
    }
}

/// 单个分组上的聚合累加器
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateBucketResult {
    Count { count: i64 },
    Min { value: Option<Value> },
    Max { value: Option<Value> },
    Sum { value: Option<Value> },
    /// 运行中的和与计数
    Avg { sum: f64, count: i64 },
}

impl AggregateBucketResult {
    #[inline]
    pub fn add_count(&mut self, n: i64) {
        if let AggregateBucketResult::Count { count } = self {
            *count += n;
        }
    }

    /// 累加一个值；无值的行不参与任何聚合
    #[inline]
    pub fn apply(&mut self, value: Option<Value>) {
        let Some(value) = value else {
            return;
        };
        match self {
            AggregateBucketResult::Count { count } => *count += 1,
            AggregateBucketResult::Min { value: current } => {
                if current.as_ref().map_or(true, |c| value.compare(c).is_lt()) {
                    *current = Some(value);
                }
            }
            AggregateBucketResult::Max { value: current } => {
                if current.as_ref().map_or(true, |c| value.compare(c).is_gt()) {
                    *current = Some(value);
                }
            }
            AggregateBucketResult::Sum { value: current } => {
                *current = Some(match current.take() {
                    None => value,
                    Some(c) => add_values(c, value),
                });
            }
            AggregateBucketResult::Avg { sum, count } => {
                if let Some(v) = value.to_f64() {
                    *sum += v;
                    *count += 1;
                }
            }
        }
    }

    /// 把另一个同类累加器合并进来
    pub fn merge(&mut self, from: &AggregateBucketResult) {
        match (self, from) {
            (AggregateBucketResult::Count { count }, AggregateBucketResult::Count { count: c }) => {
                *count += c
            }
            (AggregateBucketResult::Min { value: current }, AggregateBucketResult::Min { value }) => {
                if let Some(v) = value {
                    if current.as_ref().map_or(true, |c| v.compare(c).is_lt()) {
                        *current = Some(v.clone());
                    }
                }
            }
            (AggregateBucketResult::Max { value: current }, AggregateBucketResult::Max { value }) => {
                if let Some(v) = value {
                    if current.as_ref().map_or(true, |c| v.compare(c).is_gt()) {
                        *current = Some(v.clone());
                    }
                }
            }
            (AggregateBucketResult::Sum { value: current }, AggregateBucketResult::Sum { value }) => {
                if let Some(v) = value {
                    *current = Some(match current.take() {
                        None => v.clone(),
                        Some(c) => add_values(c, v.clone()),
                    });
                }
            }
            (
                AggregateBucketResult::Avg { sum, count },
                AggregateBucketResult::Avg { sum: s, count: c },
            ) => {
                *sum += s;
                *count += c;
            }
            (into, from) => panic!("cannot merge aggregate {:?} into {:?}", from, into),
        }
    }

    /// 最终值；没有任何输入时 MIN/MAX/SUM/AVG 无值，COUNT 为 0
    pub fn value(&self) -> Option<Value> {
        match self {
            AggregateBucketResult::Count { count } => Some(Value::Int(*count)),
            AggregateBucketResult::Min { value }
            | AggregateBucketResult::Max { value }
            | AggregateBucketResult::Sum { value } => value.clone(),
            AggregateBucketResult::Avg { sum, count } => {
                if *count == 0 {
                    None
                } else {
                    Some(Value::Double(sum / *count as f64))
                }
            }
        }
    }
}

fn add_values(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_add(b)),
        (Value::Double(a), Value::Double(b)) => Value::Double(a + b),
        (a, b) => panic!(
            "SUM over mixed value types {} and {}",
            a.scalar_type(),
            b.scalar_type()
        ),
    }
}

/// 按分组位置索引的一列累加器
#[derive(Debug, Clone)]
pub struct AggregateListResults {
    initial: AggregateBucketResult,
    values: Vec<AggregateBucketResult>,
}

impl AggregateListResults {
    pub fn new(aggregate: &Aggregate) -> Self {
        Self {
            initial: aggregate.init(),
            values: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 为新分组追加一个初始累加器，返回其位置
    pub fn push_group(&mut self) -> usize {
        self.values.push(self.initial.clone());
        self.values.len() - 1
    }

    #[inline]
    pub fn accumulate<S: RowSource + ?Sized>(
        &mut self,
        position: usize,
        aggregate: &Aggregate,
        source: &S,
        index: usize,
    ) {
        aggregate.accumulate(&mut self.values[position], source, index);
    }

    pub fn merge_at(&mut self, position: usize, from: &AggregateListResults, from_position: usize) {
        self.values[position].merge(&from.values[from_position]);
    }

    pub fn get(&self, position: usize) -> Option<&AggregateBucketResult> {
        self.values.get(position)
    }

    pub fn value(&self, position: usize) -> Option<Value> {
        self.values.get(position).and_then(AggregateBucketResult::value)
    }

    pub fn extend_from(&mut self, other: &AggregateListResults) {
        self.values.extend(other.values.iter().cloned());
    }

    /// 按给定位置顺序重排出一列新的结果
    pub fn select(&self, positions: &[usize]) -> Self {
        Self {
            initial: self.initial.clone(),
            values: positions.iter().map(|&p| self.values[p].clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum_of(values: &[i64]) -> AggregateBucketResult {
        let mut acc = AggregateBucketResult::Sum { value: None };
        for v in values {
            acc.apply(Some(Value::Int(*v)));
        }
        acc
    }

    #[test]
    fn test_function_names_case_insensitive() {
        assert_eq!("count".parse::<AggregateFunction>(), Ok(AggregateFunction::Count));
        assert_eq!("AvG".parse::<AggregateFunction>(), Ok(AggregateFunction::Avg));
        assert_eq!(
            "median".parse::<AggregateFunction>(),
            Err(QueryError::UnknownAggregate("median".to_string()))
        );
    }

    #[test]
    fn test_sum_over_string_rejected() {
        let arg = ExprNode::VariableProperty {
            slot: 0,
            property: 0,
            ty: ScalarType::String,
        };
        assert!(Aggregate::new(AggregateFunction::Sum, Some(arg.clone())).is_err());
        assert!(Aggregate::new(AggregateFunction::Min, Some(arg)).is_ok());
        assert!(Aggregate::new(AggregateFunction::Max, None).is_err());
    }

    #[test]
    fn test_absent_values_are_skipped() {
        let mut count = AggregateBucketResult::Count { count: 0 };
        count.apply(None);
        count.apply(Some(Value::Int(1)));
        assert_eq!(count.value(), Some(Value::Int(1)));

        let mut min = AggregateBucketResult::Min { value: None };
        min.apply(None);
        assert_eq!(min.value(), None);
    }

    #[test]
    fn test_avg_merge_matches_single_pass() {
        let data = [3.0, 5.0, 10.0, 2.5];
        let mut single = AggregateBucketResult::Avg { sum: 0.0, count: 0 };
        for v in data {
            single.apply(Some(Value::Double(v)));
        }

        // 分区大小 {0, 1, 多个}
        let mut empty = AggregateBucketResult::Avg { sum: 0.0, count: 0 };
        let mut one = AggregateBucketResult::Avg { sum: 0.0, count: 0 };
        one.apply(Some(Value::Double(data[0])));
        let mut many = AggregateBucketResult::Avg { sum: 0.0, count: 0 };
        for v in &data[1..] {
            many.apply(Some(Value::Double(*v)));
        }
        many.merge(&empty);
        many.merge(&one);
        empty.merge(&many);

        assert_eq!(empty.value(), single.value());
        assert_eq!(single.value(), Some(Value::Double(5.125)));
    }

    #[test]
    fn test_merge_is_commutative() {
        let mut a = sum_of(&[1, 2]);
        let b = sum_of(&[10]);
        let mut b2 = b.clone();
        a.merge(&b);
        b2.merge(&sum_of(&[1, 2]));
        assert_eq!(a.value(), b2.value());

        let mut min_a = AggregateBucketResult::Min { value: Some(Value::Int(4)) };
        min_a.merge(&AggregateBucketResult::Min { value: Some(Value::Int(-1)) });
        assert_eq!(min_a.value(), Some(Value::Int(-1)));

        let mut max_a = AggregateBucketResult::Max { value: None };
        max_a.merge(&AggregateBucketResult::Max { value: Some(Value::from("b")) });
        max_a.merge(&AggregateBucketResult::Max { value: Some(Value::from("a")) });
        assert_eq!(max_a.value(), Some(Value::from("b")));
    }

    #[test]
    fn test_list_results_select() {
        let mut column = AggregateListResults::new(&Aggregate::count_star());
        let g0 = column.push_group();
        let g1 = column.push_group();
        column.values[g1].add_count(3);
        let reordered = column.select(&[g1, g0]);
        assert_eq!(reordered.value(0), Some(Value::Int(3)));
        assert_eq!(reordered.value(1), Some(Value::Int(0)));
    }
}

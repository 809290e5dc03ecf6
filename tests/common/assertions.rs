//! 自定义断言辅助模块
//!
//! 提供测试中的常用断言函数

use pgql_engine::core::Value;
use pgql_engine::query::ResultSet;

/// 断言结果成功，返回内部值
pub fn assert_ok<T, E: std::fmt::Debug>(result: Result<T, E>) -> T {
    result.expect("操作应该成功")
}

/// 断言结果失败并匹配错误消息
pub fn assert_err_with<T: std::fmt::Debug, E: std::fmt::Display>(result: Result<T, E>, expected_msg: &str) {
    let err = result.expect_err("操作应该失败");
    let err_str = err.to_string();
    assert!(
        err_str.contains(expected_msg),
        "错误消息应包含 '{}', 实际是 '{}'",
        expected_msg,
        err_str
    );
}

/// 行的可排序表示，缺失值排在最前
pub fn row_key(row: &[Option<Value>]) -> Vec<String> {
    row.iter()
        .map(|value| match value {
            Some(value) => format!("{:?}", value),
            None => String::new(),
        })
        .collect()
}

/// 忽略行顺序比较两个结果集
pub fn assert_same_rows(actual: &ResultSet, expected: &ResultSet, context: &str) {
    assert_eq!(actual.header, expected.header, "表头不一致: {}", context);
    let mut a: Vec<_> = actual.rows.iter().map(|r| row_key(r)).collect();
    let mut e: Vec<_> = expected.rows.iter().map(|r| row_key(r)).collect();
    a.sort();
    e.sort();
    assert_eq!(a.len(), e.len(), "行数不一致: {}", context);
    assert_eq!(a, e, "行内容不一致: {}", context);
}

/// 断言某一列在升序或降序下有序，且缺失值全部在末尾
pub fn assert_sorted_nulls_last(results: &ResultSet, column: usize, descending: bool) {
    let values: Vec<Option<&Value>> = results.rows.iter().map(|r| r[column].as_ref()).collect();
    let first_null = values.iter().position(Option::is_none).unwrap_or(values.len());
    assert!(
        values[first_null..].iter().all(Option::is_none),
        "缺失值应全部排在末尾"
    );
    for pair in values[..first_null].windows(2) {
        let (Some(a), Some(b)) = (pair[0], pair[1]) else {
            unreachable!("前缀中不含缺失值");
        };
        let ordering = a.compare(b);
        if descending {
            assert!(ordering.is_ge(), "降序被破坏: {:?} 在 {:?} 之前", a, b);
        } else {
            assert!(ordering.is_le(), "升序被破坏: {:?} 在 {:?} 之前", a, b);
        }
    }
}

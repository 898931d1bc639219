//! 条件评估器
//!
//! 实现内置操作符的评估逻辑：比较、成员检查、字符串与正则匹配。
//! 所有类型收窄都通过模式匹配完成，类型不符时返回 [`RuleError::TypeMismatch`]。

use crate::error::{Result, RuleError};
use crate::operators::OperatorKind;
use regex::Regex;
use serde_json::{Number, Value};
use std::cmp::Ordering;

/// 比较两个同类型标量（数值或字符串）
///
/// 数值之间按数值大小比较（整数与浮点可互相比较），字符串按字典序比较。
/// 其余组合返回类型不匹配错误，而不是视为相等。
pub fn compare(a: &Value, b: &Value) -> Result<Ordering> {
    compare_as("compare", a, b)
}

/// 结构相等（数值按数值大小比较，`100 == 100.0`）
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => cmp_numbers(x, y) == Some(Ordering::Equal),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| values_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| values_equal(v, other)))
        }
        _ => a == b,
    }
}

/// 成员检查：`sequence` 为数组且存在与 `value` 结构相等的元素
///
/// `sequence` 不是数组时返回 false，不视为错误。
pub fn contains(value: &Value, sequence: &Value) -> bool {
    match sequence {
        Value::Array(items) => items.iter().any(|item| values_equal(value, item)),
        _ => false,
    }
}

/// 获取值的类型名称
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 编译正则表达式
pub fn compile_regex(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| RuleError::InvalidRegex {
        pattern: pattern.to_string(),
        source,
    })
}

/// 条件评估器
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// 评估内置操作符
    ///
    /// # Arguments
    /// * `field_value` - 从记录中解析出的字段值
    /// * `operator` - 内置操作符
    /// * `rule_value` - 规则中定义的期望值
    pub fn evaluate(field_value: &Value, operator: OperatorKind, rule_value: &Value) -> Result<bool> {
        match operator {
            OperatorKind::Equals => Ok(values_equal(field_value, rule_value)),
            OperatorKind::NotEquals => Ok(!values_equal(field_value, rule_value)),
            OperatorKind::GreaterThan => {
                Self::ordered(operator, field_value, rule_value, Ordering::is_gt)
            }
            OperatorKind::LessThan => {
                Self::ordered(operator, field_value, rule_value, Ordering::is_lt)
            }
            OperatorKind::GreaterThanInclusive => {
                Self::ordered(operator, field_value, rule_value, Ordering::is_ge)
            }
            OperatorKind::LessThanInclusive => {
                Self::ordered(operator, field_value, rule_value, Ordering::is_le)
            }
            OperatorKind::In => Ok(contains(field_value, rule_value)),
            OperatorKind::NotIn => Ok(!contains(field_value, rule_value)),
            OperatorKind::StartsWith => {
                Self::strings(operator, field_value, rule_value, |s, p| s.starts_with(p))
            }
            OperatorKind::EndsWith => {
                Self::strings(operator, field_value, rule_value, |s, p| s.ends_with(p))
            }
            OperatorKind::Contains => {
                Self::strings(operator, field_value, rule_value, |s, p| s.contains(p))
            }
            OperatorKind::NotContains => {
                Self::strings(operator, field_value, rule_value, |s, p| !s.contains(p))
            }
            OperatorKind::Regex => {
                let pattern = Self::expect_str(operator, rule_value)?;
                let regex = compile_regex(pattern)?;
                Self::regex_match(field_value, &regex)
            }
        }
    }

    /// 使用已编译的正则匹配字段值（非锚定，包含匹配即为真）
    pub fn regex_match(field_value: &Value, regex: &Regex) -> Result<bool> {
        let s = Self::expect_str(OperatorKind::Regex, field_value)?;
        Ok(regex.is_match(s))
    }

    /// 数值/字符串顺序比较
    fn ordered<F>(operator: OperatorKind, field: &Value, expected: &Value, accept: F) -> Result<bool>
    where
        F: Fn(Ordering) -> bool,
    {
        compare_as(operator.as_str(), field, expected).map(accept)
    }

    /// 字符串专用操作，两侧都必须是字符串
    fn strings<F>(operator: OperatorKind, field: &Value, expected: &Value, test: F) -> Result<bool>
    where
        F: Fn(&str, &str) -> bool,
    {
        let s = Self::expect_str(operator, field)?;
        let needle = Self::expect_str(operator, expected)?;
        Ok(test(s, needle))
    }

    pub(crate) fn expect_str(operator: OperatorKind, value: &Value) -> Result<&str> {
        value.as_str().ok_or_else(|| RuleError::TypeMismatch {
            operator: operator.to_string(),
            expected: "string",
            actual: type_name(value),
        })
    }
}

fn compare_as(operator: &str, a: &Value, b: &Value) -> Result<Ordering> {
    let mismatch = |expected: &'static str, actual: &Value| RuleError::TypeMismatch {
        operator: operator.to_string(),
        expected,
        actual: type_name(actual),
    };

    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            cmp_numbers(x, y).ok_or_else(|| mismatch("comparable number", b))
        }
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        (Value::Number(_), other) => Err(mismatch("number", other)),
        (Value::String(_), other) => Err(mismatch("string", other)),
        (other, _) => Err(mismatch("number or string", other)),
    }
}

/// 整数优先按整数比较，避免大整数转浮点丢失精度
fn cmp_numbers(x: &Number, y: &Number) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return Some(a.cmp(&b));
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return Some(a.cmp(&b));
    }
    x.as_f64()?.partial_cmp(&y.as_f64()?)
}

//! 规则操作符定义与注册表

use crate::error::{Result, RuleError};
use crate::evaluator::ConditionEvaluator;
use crate::regex_cache::{DEFAULT_REGEX_CACHE_CAPACITY, RegexCache};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// 内置操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperatorKind {
    // 结构相等
    Equals,
    NotEquals,

    // 顺序比较（数值或字符串）
    GreaterThan,
    LessThan,
    GreaterThanInclusive,
    LessThanInclusive,

    // 成员检查
    In,
    NotIn,

    // 字符串操作
    StartsWith,
    EndsWith,
    Contains,
    NotContains,
    Regex,
}

impl OperatorKind {
    pub const ALL: [OperatorKind; 13] = [
        Self::Equals,
        Self::NotEquals,
        Self::GreaterThan,
        Self::LessThan,
        Self::GreaterThanInclusive,
        Self::LessThanInclusive,
        Self::In,
        Self::NotIn,
        Self::StartsWith,
        Self::EndsWith,
        Self::Contains,
        Self::NotContains,
        Self::Regex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "notEquals",
            Self::GreaterThan => "greaterThan",
            Self::LessThan => "lessThan",
            Self::GreaterThanInclusive => "greaterThanInclusive",
            Self::LessThanInclusive => "lessThanInclusive",
            Self::In => "in",
            Self::NotIn => "notIn",
            Self::StartsWith => "startsWith",
            Self::EndsWith => "endsWith",
            Self::Contains => "contains",
            Self::NotContains => "notContains",
            Self::Regex => "regex",
        }
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OperatorKind {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| RuleError::UnknownOperator(s.to_string()))
    }
}

/// 操作符行为：对 (字段值, 规则值) 给出判定
pub trait Operator: Send + Sync {
    fn apply(&self, field_value: &Value, rule_value: &Value) -> Result<bool>;
}

impl Operator for OperatorKind {
    fn apply(&self, field_value: &Value, rule_value: &Value) -> Result<bool> {
        ConditionEvaluator::evaluate(field_value, *self, rule_value)
    }
}

impl<F> Operator for F
where
    F: Fn(&Value, &Value) -> Result<bool> + Send + Sync,
{
    fn apply(&self, field_value: &Value, rule_value: &Value) -> Result<bool> {
        self(field_value, rule_value)
    }
}

/// 带编译缓存的 regex 操作符
pub struct RegexOperator {
    cache: RegexCache,
}

impl RegexOperator {
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            cache: RegexCache::new(cache_capacity),
        }
    }
}

impl Operator for RegexOperator {
    fn apply(&self, field_value: &Value, rule_value: &Value) -> Result<bool> {
        let pattern = ConditionEvaluator::expect_str(OperatorKind::Regex, rule_value)?;
        let regex = self.cache.get_or_compile(pattern)?;
        ConditionEvaluator::regex_match(field_value, &regex)
    }
}

/// 操作符注册表：名称 -> 行为
///
/// 初始化时构建一次，之后只读共享；新增操作符通过 [`OperatorRegistry::register`]，
/// 无需修改分发逻辑。
#[derive(Clone, Default)]
pub struct OperatorRegistry {
    operators: HashMap<String, Arc<dyn Operator>>,
}

impl OperatorRegistry {
    /// 空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 包含全部内置操作符的注册表
    pub fn builtin() -> Self {
        Self::with_regex_cache_capacity(DEFAULT_REGEX_CACHE_CAPACITY)
    }

    pub fn with_regex_cache_capacity(capacity: usize) -> Self {
        let mut registry = Self::new();
        for kind in OperatorKind::ALL {
            if kind == OperatorKind::Regex {
                registry.register(kind.as_str(), RegexOperator::new(capacity));
            } else {
                registry.register(kind.as_str(), kind);
            }
        }
        registry
    }

    /// 注册操作符，返回被替换的旧实现
    pub fn register(
        &mut self,
        name: impl Into<String>,
        operator: impl Operator + 'static,
    ) -> Option<Arc<dyn Operator>> {
        self.operators.insert(name.into(), Arc::new(operator))
    }

    /// 按名称查找，未知名称返回 None
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Operator>> {
        self.operators.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operators.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.operators.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("OperatorRegistry")
            .field("operators", &names)
            .finish()
    }
}

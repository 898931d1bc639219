//! 规则引擎领域模型

use crate::error::{Result, RuleError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use std::sync::Arc;

/// 外部字段前缀：字段值由同名自定义操作产生
pub const EXTERNAL_FIELD_PREFIX: &str = "external.";

/// 自定义操作符前缀：判定交给同名自定义操作
pub const CUSTOM_OPERATOR_PREFIX: &str = "custom.";

/// 单条规则：字段 / 操作符 / 期望值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub field: String,
    pub operator: String,
    #[serde(default)]
    pub value: Value,
}

impl Rule {
    pub fn new(
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }

    /// `external.<name>` 字段对应的自定义操作名
    pub fn external_field(&self) -> Option<&str> {
        self.field.strip_prefix(EXTERNAL_FIELD_PREFIX)
    }

    /// `custom.<name>` 操作符对应的自定义操作名
    pub fn custom_operator(&self) -> Option<&str> {
        self.operator.strip_prefix(CUSTOM_OPERATOR_PREFIX)
    }
}

/// 条件集：all 组（与）和 any 组（或）
///
/// 两个组为空时都视为满足。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionSet {
    #[serde(default)]
    pub all: Vec<Rule>,
    #[serde(default)]
    pub any: Vec<Rule>,
}

impl ConditionSet {
    pub fn new(all: Vec<Rule>, any: Vec<Rule>) -> Self {
        Self { all, any }
    }

    pub fn with_all(mut self, rule: Rule) -> Self {
        self.all.push(rule);
        self
    }

    pub fn with_any(mut self, rule: Rule) -> Self {
        self.any.push(rule);
        self
    }
}

/// 规则集：按声明顺序求与的条件集序列
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub conditions: Vec<ConditionSet>,
}

impl RuleSet {
    pub fn new(conditions: Vec<ConditionSet>) -> Self {
        Self { conditions }
    }

    /// 从 JSON 规则文档解析
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl FromStr for RuleSet {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_json(s)
    }
}

/// 被评估的记录
///
/// 评估期间只读；内部共享 `Arc`，克隆成本低，
/// 可以安全地交给在阻塞线程上运行的自定义操作。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    data: Arc<Map<String, Value>>,
}

impl Record {
    pub fn new(data: Map<String, Value>) -> Self {
        Self {
            data: Arc::new(data),
        }
    }

    /// 从 JSON 对象文本创建
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::try_from(value)
    }

    /// 获取顶层字段值
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.data.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 获取底层数据
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }
}

impl From<Map<String, Value>> for Record {
    fn from(data: Map<String, Value>) -> Self {
        Self::new(data)
    }
}

impl TryFrom<Value> for Record {
    type Error = RuleError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self::new(map)),
            other => Err(RuleError::InvalidRecord(crate::evaluator::type_name(&other))),
        }
    }
}

/// 入口接受的记录形式：原始 JSON 文本或已构造的映射
#[derive(Debug, Clone)]
pub enum RecordInput {
    Raw(String),
    Value(Value),
    Parsed(Record),
}

impl RecordInput {
    /// 规范化为 [`Record`]
    pub fn into_record(self) -> Result<Record> {
        match self {
            Self::Raw(json) => Record::from_json(&json),
            Self::Value(value) => Record::try_from(value),
            Self::Parsed(record) => Ok(record),
        }
    }
}

impl From<&str> for RecordInput {
    fn from(json: &str) -> Self {
        Self::Raw(json.to_string())
    }
}

impl From<String> for RecordInput {
    fn from(json: String) -> Self {
        Self::Raw(json)
    }
}

impl From<Value> for RecordInput {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Map<String, Value>> for RecordInput {
    fn from(map: Map<String, Value>) -> Self {
        Self::Parsed(Record::new(map))
    }
}

impl From<Record> for RecordInput {
    fn from(record: Record) -> Self {
        Self::Parsed(record)
    }
}

impl From<&Record> for RecordInput {
    fn from(record: &Record) -> Self {
        Self::Parsed(record.clone())
    }
}

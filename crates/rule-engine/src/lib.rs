//! 声明式条件规则引擎
//!
//! 对一条记录（字段名 -> 动态类型值）评估一份规则文档，给出唯一的通过/不通过结论：
//! - JSON 规则文档解析（conditions / all / any）
//! - 类型感知的比较、成员检查和字符串操作符
//! - 短路求值的 all/any 分组，两组并发求值
//! - `external.<name>` 字段与 `custom.<name>` 操作符扩展点，带超时与 panic 隔离
//!
//! ```
//! let rules = r#"{"conditions": [{"all": [{"field": "limit", "operator": "greaterThan", "value": 4.0}]}]}"#;
//! assert!(!rule_engine::execute(r#"{"limit": 4.0}"#, rules, None));
//! ```

pub mod custom;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod models;
pub mod operators;
pub mod regex_cache;

pub use custom::{CustomOperation, CustomOperations};
pub use engine::{RuleEngine, execute};
pub use error::{Result, RuleError};
pub use evaluator::{ConditionEvaluator, compare, contains, values_equal};
pub use executor::RuleExecutor;
pub use models::{ConditionSet, Record, RecordInput, Rule, RuleSet};
pub use operators::{Operator, OperatorKind, OperatorRegistry};
pub use regex_cache::RegexCache;

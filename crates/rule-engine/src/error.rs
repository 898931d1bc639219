//! 规则引擎错误类型
//!
//! 所有错误都在最小的规则作用域内被吸收为 `false`，
//! 这里的类型只用于日志、指标以及需要诊断信息的调用方。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("规则解析失败: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("无效的输入记录: 期望 JSON 对象, 实际 {0}")]
    InvalidRecord(&'static str),

    #[error("无效的规则: {0}")]
    InvalidRule(String),

    #[error("字段不存在: {0}")]
    FieldNotFound(String),

    #[error("未知的操作符: {0}")]
    UnknownOperator(String),

    #[error("未注册的自定义操作: {0}")]
    UnknownCustomOperation(String),

    #[error("类型不匹配: {operator} 期望 {expected}, 实际 {actual}")]
    TypeMismatch {
        operator: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("无效的正则表达式 '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("自定义操作超时: {name} 超过 {timeout_ms}ms")]
    ExtensionTimeout { name: String, timeout_ms: u64 },

    #[error("自定义操作执行异常: {0}")]
    ExtensionPanicked(String),

    #[error("运行时不可用: {0}")]
    RuntimeUnavailable(String),
}

impl RuleError {
    /// 错误类别标签，用于指标维度
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse(_) => "parse",
            Self::InvalidRecord(_) => "invalid_record",
            Self::InvalidRule(_) => "invalid_rule",
            Self::FieldNotFound(_) => "field_not_found",
            Self::UnknownOperator(_) => "unknown_operator",
            Self::UnknownCustomOperation(_) => "unknown_custom_operation",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::InvalidRegex { .. } => "invalid_regex",
            Self::ExtensionTimeout { .. } => "extension_timeout",
            Self::ExtensionPanicked(_) => "extension_panicked",
            Self::RuntimeUnavailable(_) => "runtime_unavailable",
        }
    }

    /// 是否属于"正常未命中"：字段缺失或引用了未知名称
    ///
    /// 这类错误按 debug 级别记录，其余视为配置或数据问题按 warn 记录。
    pub fn is_expected_miss(&self) -> bool {
        matches!(
            self,
            Self::FieldNotFound(_) | Self::UnknownOperator(_) | Self::UnknownCustomOperation(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RuleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_labels() {
        assert_eq!(RuleError::FieldNotFound("a".into()).kind(), "field_not_found");
        assert_eq!(
            RuleError::TypeMismatch {
                operator: "startsWith".into(),
                expected: "string",
                actual: "number",
            }
            .kind(),
            "type_mismatch"
        );
    }

    #[test]
    fn test_expected_miss_classification() {
        assert!(RuleError::UnknownOperator("x".into()).is_expected_miss());
        assert!(!RuleError::ExtensionPanicked("x".into()).is_expected_miss());
    }

    #[test]
    fn test_type_mismatch_message() {
        let err = RuleError::TypeMismatch {
            operator: "greaterThan".into(),
            expected: "number or string",
            actual: "boolean",
        };
        assert!(err.to_string().contains("greaterThan"));
        assert!(err.to_string().contains("boolean"));
    }
}

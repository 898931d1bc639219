//! 指标描述
//!
//! 规则引擎只通过 `metrics` 门面记录计数，导出器由宿主程序安装。

/// 评估结论计数，标签 `verdict`: passed / failed / rejected
pub const EVALUATIONS_TOTAL: &str = "rule_engine_evaluations_total";

/// 被吸收为 false 的规则级错误计数，标签 `kind`
pub const RULE_ERRORS_TOTAL: &str = "rule_engine_rule_errors_total";

/// 注册指标描述
pub fn describe_metrics() {
    metrics::describe_counter!(EVALUATIONS_TOTAL, "Total number of rule set evaluations");
    metrics::describe_counter!(
        RULE_ERRORS_TOTAL,
        "Total number of rule-level errors absorbed as unsatisfied"
    );
}

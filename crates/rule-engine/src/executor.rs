//! 规则执行器
//!
//! 实现规则、条件集、规则集的短路求值。所有错误在单条规则处被吸收为 `false`，
//! 不会中断所在的条件集或规则集。

use crate::custom::{self, CustomOperations, DEFAULT_CUSTOM_OPERATION_TIMEOUT};
use crate::error::{Result, RuleError};
use crate::models::{ConditionSet, Record, Rule, RuleSet};
use crate::operators::OperatorRegistry;
use rules_shared::observability::metrics::RULE_ERRORS_TOTAL;
use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// 规则执行器
#[derive(Debug, Clone)]
pub struct RuleExecutor {
    operators: Arc<OperatorRegistry>,
    /// 单次自定义操作调用的超时
    custom_operation_timeout: Duration,
    /// all/any 两组是否并发求值
    concurrent_groups: bool,
}

impl RuleExecutor {
    pub fn new() -> Self {
        Self::with_operators(Arc::new(OperatorRegistry::builtin()))
    }

    pub fn with_operators(operators: Arc<OperatorRegistry>) -> Self {
        Self {
            operators,
            custom_operation_timeout: DEFAULT_CUSTOM_OPERATION_TIMEOUT,
            concurrent_groups: true,
        }
    }

    pub fn with_custom_operation_timeout(mut self, timeout: Duration) -> Self {
        self.custom_operation_timeout = timeout;
        self
    }

    /// 关闭 all/any 并发求值，改为先 all 后 any，结果不变
    pub fn with_concurrent_groups(mut self, enabled: bool) -> Self {
        self.concurrent_groups = enabled;
        self
    }

    pub fn operators(&self) -> &OperatorRegistry {
        &self.operators
    }

    /// 评估单条规则，返回带类型的错误
    pub async fn evaluate_rule(
        &self,
        record: &Record,
        rule: &Rule,
        custom: Option<&CustomOperations>,
    ) -> Result<bool> {
        if rule.field.is_empty() || rule.operator.is_empty() {
            return Err(RuleError::InvalidRule(
                "字段和操作符不能为空".to_string(),
            ));
        }

        // 字段解析总是先于操作符解析
        let field_value: Cow<'_, Value> = match rule.external_field() {
            Some(name) => {
                let operation = custom::lookup(custom, name)?;
                let value = custom::invoke(
                    name,
                    operation,
                    record,
                    &rule.field,
                    self.custom_operation_timeout,
                )
                .await?;
                Cow::Owned(value)
            }
            None => Cow::Borrowed(
                record
                    .get(&rule.field)
                    .ok_or_else(|| RuleError::FieldNotFound(rule.field.clone()))?,
            ),
        };

        // 自定义操作符拿到的是整条记录和字段名，而不是已解析的字段值
        if let Some(name) = rule.custom_operator() {
            let operation = custom::lookup(custom, name)?;
            let verdict = custom::invoke(
                name,
                operation,
                record,
                &rule.field,
                self.custom_operation_timeout,
            )
            .await?;
            return Ok(matches!(verdict, Value::Bool(true)));
        }

        let operator = self
            .operators
            .get(&rule.operator)
            .ok_or_else(|| RuleError::UnknownOperator(rule.operator.clone()))?;

        operator.apply(&field_value, &rule.value)
    }

    /// 评估单条规则，错误按不满足处理
    pub async fn check_rule(
        &self,
        record: &Record,
        rule: &Rule,
        custom: Option<&CustomOperations>,
    ) -> bool {
        match self.evaluate_rule(record, rule, custom).await {
            Ok(matched) => matched,
            Err(e) => {
                absorb(rule, &e);
                false
            }
        }
    }

    /// 评估条件集：all 组全部满足且 any 组至少一个满足
    ///
    /// 空组视为满足。并发模式下任一组先失败时另一组立即取消。
    pub async fn check_condition_set(
        &self,
        record: &Record,
        condition_set: &ConditionSet,
        custom: Option<&CustomOperations>,
    ) -> bool {
        let all_pass = async {
            for rule in &condition_set.all {
                if !self.check_rule(record, rule, custom).await {
                    return false;
                }
            }
            true
        };

        let any_pass = async {
            if condition_set.any.is_empty() {
                return true;
            }
            for rule in &condition_set.any {
                if self.check_rule(record, rule, custom).await {
                    return true;
                }
            }
            false
        };

        if self.concurrent_groups {
            let gate = |passed: bool| if passed { Ok(()) } else { Err(()) };
            tokio::try_join!(
                async { gate(all_pass.await) },
                async { gate(any_pass.await) }
            )
            .is_ok()
        } else {
            all_pass.await && any_pass.await
        }
    }

    /// 评估规则集：按声明顺序求与，遇到不满足的条件集立即返回
    #[instrument(skip_all, fields(condition_sets = rule_set.conditions.len()))]
    pub async fn check_rule_set(
        &self,
        record: &Record,
        rule_set: &RuleSet,
        custom: Option<&CustomOperations>,
    ) -> bool {
        for (i, condition_set) in rule_set.conditions.iter().enumerate() {
            if !self.check_condition_set(record, condition_set, custom).await {
                debug!("条件集 {} 不满足，短路返回", i);
                return false;
            }
        }
        true
    }
}

impl Default for RuleExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// 吸收规则级错误：记录日志和指标
fn absorb(rule: &Rule, error: &RuleError) {
    metrics::counter!(RULE_ERRORS_TOTAL, "kind" => error.kind()).increment(1);

    if error.is_expected_miss() {
        debug!(
            field = %rule.field,
            operator = %rule.operator,
            kind = error.kind(),
            "规则不满足: {}",
            error
        );
    } else {
        warn!(
            field = %rule.field,
            operator = %rule.operator,
            kind = error.kind(),
            "规则评估失败，按不满足处理: {}",
            error
        );
    }
}

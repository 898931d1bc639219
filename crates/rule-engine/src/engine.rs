//! 规则引擎入口
//!
//! 接受原始 JSON 记录或已构造的记录，以及原始 JSON 规则文档，规范化后驱动规则集评估。
//! 任何输入解析失败都返回 `false`（失败即关闭），错误不会越过入口边界。

use crate::custom::CustomOperations;
use crate::error::{Result, RuleError};
use crate::executor::RuleExecutor;
use crate::models::{Record, RecordInput, RuleSet};
use crate::operators::OperatorRegistry;
use rules_shared::config::EngineConfig;
use rules_shared::observability::metrics::EVALUATIONS_TOTAL;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

static DEFAULT_ENGINE: LazyLock<RuleEngine> = LazyLock::new(RuleEngine::new);

/// 使用默认配置同步评估
///
/// 等价于 `RuleEngine::default().execute_blocking(...)`。
pub fn execute(
    input: impl Into<RecordInput>,
    rules: &str,
    custom: Option<&CustomOperations>,
) -> bool {
    DEFAULT_ENGINE.execute_blocking(input, rules, custom)
}

/// 规则引擎
///
/// 不持有任何评估期可变状态，可在多个任务间共享并发使用。
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    executor: RuleExecutor,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按引擎配置构建
    pub fn from_config(config: &EngineConfig) -> Self {
        let operators = OperatorRegistry::with_regex_cache_capacity(config.regex_cache_capacity);
        let executor = RuleExecutor::with_operators(Arc::new(operators))
            .with_custom_operation_timeout(config.custom_operation_timeout())
            .with_concurrent_groups(config.concurrent_groups);

        Self { executor }
    }

    /// 使用自定义执行器（例如扩展了操作符注册表）
    pub fn with_executor(executor: RuleExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &RuleExecutor {
        &self.executor
    }

    /// 评估记录是否满足规则文档
    ///
    /// 自定义操作运行在宿主运行时的阻塞线程池上。超时只会让规则判定为不满足，
    /// 挂起的扩展线程仍会存活；宿主关闭运行时应使用 `shutdown_timeout` 或
    /// `shutdown_background`，否则运行时的 drop 会一直等待该线程结束。
    pub async fn execute(
        &self,
        input: impl Into<RecordInput>,
        rules: &str,
        custom: Option<&CustomOperations>,
    ) -> bool {
        let (record, rule_set) = match Self::prepare(input.into(), rules) {
            Ok(prepared) => prepared,
            Err(e) => {
                debug!(kind = e.kind(), "输入解析失败，拒绝评估: {}", e);
                record_verdict("rejected");
                return false;
            }
        };

        self.evaluate(&record, &rule_set, custom).await
    }

    /// 使用已解析的规则集评估，便于同一规则集复用于大量记录
    pub async fn execute_rule_set(
        &self,
        input: impl Into<RecordInput>,
        rule_set: &RuleSet,
        custom: Option<&CustomOperations>,
    ) -> bool {
        let record = match input.into().into_record() {
            Ok(record) => record,
            Err(e) => {
                debug!(kind = e.kind(), "记录解析失败，拒绝评估: {}", e);
                record_verdict("rejected");
                return false;
            }
        };

        self.evaluate(&record, rule_set, custom).await
    }

    /// 同步评估
    ///
    /// 在私有的单线程运行时上执行，超时后仍在运行的自定义操作不会拖住调用方。
    /// 若调用线程已处于异步运行时内，则在一个独立的作用域线程上驱动私有运行时，
    /// 调用期间当前工作线程被阻塞。
    pub fn execute_blocking(
        &self,
        input: impl Into<RecordInput>,
        rules: &str,
        custom: Option<&CustomOperations>,
    ) -> bool {
        let input = input.into();
        if tokio::runtime::Handle::try_current().is_err() {
            return self.block_on_private_runtime(input, rules, custom);
        }

        // 不能在运行时内部嵌套 block_on
        debug!("调用方处于异步运行时内，改在独立线程上评估");
        std::thread::scope(|scope| {
            scope
                .spawn(move || self.block_on_private_runtime(input, rules, custom))
                .join()
        })
        .unwrap_or_else(|_| {
            let e = RuleError::RuntimeUnavailable("评估线程异常退出".to_string());
            warn!(kind = e.kind(), "{}", e);
            record_verdict("rejected");
            false
        })
    }

    fn block_on_private_runtime(
        &self,
        input: RecordInput,
        rules: &str,
        custom: Option<&CustomOperations>,
    ) -> bool {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                let e = RuleError::RuntimeUnavailable(e.to_string());
                warn!(kind = e.kind(), "{}", e);
                record_verdict("rejected");
                return false;
            }
        };

        let matched = runtime.block_on(self.execute(input, rules, custom));
        // 不等待超时后仍在后台运行的自定义操作
        runtime.shutdown_background();
        matched
    }

    async fn evaluate(
        &self,
        record: &Record,
        rule_set: &RuleSet,
        custom: Option<&CustomOperations>,
    ) -> bool {
        let matched = self.executor.check_rule_set(record, rule_set, custom).await;
        record_verdict(if matched { "passed" } else { "failed" });
        matched
    }

    fn prepare(input: RecordInput, rules: &str) -> Result<(Record, RuleSet)> {
        let record = input.into_record()?;
        let rule_set = RuleSet::from_json(rules)?;
        Ok((record, rule_set))
    }
}

fn record_verdict(verdict: &'static str) {
    metrics::counter!(EVALUATIONS_TOTAL, "verdict" => verdict).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    const TURKEY_RULES: &str = r#"
    {
        "conditions": [
            {
                "all": [{"field": "country", "operator": "equals", "value": "Turkey"}],
                "any": [{"field": "country", "operator": "in", "value": ["Turkey", "England"]}]
            }
        ]
    }
    "#;

    #[tokio::test]
    async fn test_execute_accepts_raw_and_parsed_records() {
        let engine = RuleEngine::new();

        assert!(
            engine
                .execute(r#"{"country": "Turkey"}"#, TURKEY_RULES, None)
                .await
        );
        assert!(
            engine
                .execute(json!({"country": "Turkey"}), TURKEY_RULES, None)
                .await
        );

        let record = Record::from_json(r#"{"country": "Korea"}"#).unwrap();
        assert!(!engine.execute(&record, TURKEY_RULES, None).await);
    }

    #[tokio::test]
    async fn test_malformed_input_fails_closed() {
        let engine = RuleEngine::new();

        assert!(!engine.execute("{not json", TURKEY_RULES, None).await);
        assert!(!engine.execute(json!(["Turkey"]), TURKEY_RULES, None).await);
        assert!(
            !engine
                .execute(r#"{"country": "Turkey"}"#, "{\"conditions\": 42}", None)
                .await
        );
        assert!(!engine.execute(r#"{"country": "Turkey"}"#, "", None).await);
    }

    #[tokio::test]
    async fn test_execute_rule_set_reuses_parsed_rules() {
        let engine = RuleEngine::new();
        let rule_set = RuleSet::from_json(TURKEY_RULES).unwrap();

        assert!(
            engine
                .execute_rule_set(json!({"country": "Turkey"}), &rule_set, None)
                .await
        );
        assert!(
            !engine
                .execute_rule_set(json!({"country": "Korea"}), &rule_set, None)
                .await
        );
        assert!(!engine.execute_rule_set("[]", &rule_set, None).await);
    }

    #[tokio::test]
    async fn test_execute_blocking_inside_current_thread_runtime() {
        let engine = RuleEngine::new();
        assert!(engine.execute_blocking(r#"{"country": "Turkey"}"#, TURKEY_RULES, None));
        assert!(!engine.execute_blocking(r#"{"country": "Korea"}"#, TURKEY_RULES, None));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_free_function_inside_multi_thread_runtime() {
        assert!(execute(r#"{"country": "Turkey"}"#, TURKEY_RULES, None));
        assert!(!execute("not a record", TURKEY_RULES, None));
    }

    #[test]
    fn test_execute_blocking() {
        let engine = RuleEngine::new();
        assert!(engine.execute_blocking(r#"{"country": "Turkey"}"#, TURKEY_RULES, None));
        assert!(!engine.execute_blocking(r#"{"country": "Korea"}"#, TURKEY_RULES, None));
    }

    #[test]
    fn test_free_function_execute() {
        assert!(execute(r#"{"country": "Turkey"}"#, TURKEY_RULES, None));
        assert!(!execute("not a record", TURKEY_RULES, None));
    }

    #[test]
    fn test_from_config() {
        let config = EngineConfig {
            custom_operation_timeout_ms: 250,
            concurrent_groups: false,
            regex_cache_capacity: 8,
        };

        let engine = RuleEngine::from_config(&config);
        assert_eq!(engine.executor().operators().len(), 13);
        assert_eq!(config.custom_operation_timeout(), Duration::from_millis(250));
        assert!(engine.execute_blocking(r#"{"country": "Turkey"}"#, TURKEY_RULES, None));
    }
}

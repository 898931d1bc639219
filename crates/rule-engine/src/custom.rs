//! 自定义操作扩展点
//!
//! 调用方通过 [`CustomOperations`] 注入两类扩展：
//! - `external.<name>` 字段：由扩展计算字段值
//! - `custom.<name>` 操作符：由扩展给出判定，仅 `true` 视为通过
//!
//! 扩展是外部代码，可能执行 I/O 或长时间阻塞，因此每次调用都在阻塞线程池上运行，
//! 并受超时约束；扩展内部 panic 不会传播到引擎。

use crate::error::{Result, RuleError};
use crate::models::Record;
use rules_shared::config::DEFAULT_CUSTOM_OPERATION_TIMEOUT_MS;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// 默认的自定义操作超时
pub const DEFAULT_CUSTOM_OPERATION_TIMEOUT: Duration =
    Duration::from_millis(DEFAULT_CUSTOM_OPERATION_TIMEOUT_MS);

/// 自定义操作
///
/// `hint` 是规则的字段名，告诉扩展本次被请求计算的内容。
#[cfg_attr(test, mockall::automock)]
pub trait CustomOperation: Send + Sync {
    fn execute(&self, record: &Record, hint: &str) -> Value;
}

impl<F> CustomOperation for F
where
    F: Fn(&Record, &str) -> Value + Send + Sync,
{
    fn execute(&self, record: &Record, hint: &str) -> Value {
        self(record, hint)
    }
}

/// 自定义操作注册表：名称 -> 扩展
///
/// 由调用方持有，每次评估以只读引用传入。
#[derive(Clone, Default)]
pub struct CustomOperations {
    operations: HashMap<String, Arc<dyn CustomOperation>>,
}

impl CustomOperations {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册扩展，返回被替换的旧实现
    pub fn register(
        &mut self,
        name: impl Into<String>,
        operation: impl CustomOperation + 'static,
    ) -> Option<Arc<dyn CustomOperation>> {
        self.register_shared(name, Arc::new(operation))
    }

    /// 注册已共享的扩展实例
    pub fn register_shared(
        &mut self,
        name: impl Into<String>,
        operation: Arc<dyn CustomOperation>,
    ) -> Option<Arc<dyn CustomOperation>> {
        self.operations.insert(name.into(), operation)
    }

    /// 链式注册
    pub fn with(mut self, name: impl Into<String>, operation: impl CustomOperation + 'static) -> Self {
        self.register(name, operation);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CustomOperation>> {
        self.operations.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl fmt::Debug for CustomOperations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.operations.keys().collect();
        names.sort_unstable();
        f.debug_struct("CustomOperations")
            .field("operations", &names)
            .finish()
    }
}

impl FromIterator<(String, Arc<dyn CustomOperation>)> for CustomOperations {
    fn from_iter<I: IntoIterator<Item = (String, Arc<dyn CustomOperation>)>>(iter: I) -> Self {
        Self {
            operations: iter.into_iter().collect(),
        }
    }
}

/// 按名称查找扩展，注册表缺失或名称未注册都视为未知
pub(crate) fn lookup(
    custom: Option<&CustomOperations>,
    name: &str,
) -> Result<Arc<dyn CustomOperation>> {
    custom
        .and_then(|operations| operations.get(name))
        .ok_or_else(|| RuleError::UnknownCustomOperation(name.to_string()))
}

/// 在阻塞线程池上调用扩展，超时或 panic 转换为错误
///
/// 超时后调用方不再等待结果，但阻塞线程无法被强制中断，会在后台运行至结束。
pub(crate) async fn invoke(
    name: &str,
    operation: Arc<dyn CustomOperation>,
    record: &Record,
    hint: &str,
    timeout: Duration,
) -> Result<Value> {
    let record = record.clone();
    let hint_owned = hint.to_string();
    let task = tokio::task::spawn_blocking(move || operation.execute(&record, &hint_owned));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(join_error)) => {
            warn!(operation = name, hint, "自定义操作执行异常: {}", join_error);
            Err(RuleError::ExtensionPanicked(format!("{}: {}", name, join_error)))
        }
        Err(_) => Err(RuleError::ExtensionTimeout {
            name: name.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

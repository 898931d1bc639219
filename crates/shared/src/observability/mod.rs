//! 统一可观测性模块
//!
//! 提供 logging 与 metrics 的统一初始化。
//! 库本身只通过 `tracing` 和 `metrics` 门面输出，由宿主程序决定订阅者与导出器。

pub mod metrics;
pub mod tracing;

use ::tracing::info;
use anyhow::Result;
use serde::Deserialize;

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// 服务名称，用于标识日志来源
    pub service_name: String,

    /// 日志级别（如 "info", "debug"），`RUST_LOG` 优先
    pub log_level: String,

    /// 是否启用 JSON 格式日志
    pub json_logs: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "rule-engine".to_string(),
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

/// 统一初始化可观测性
///
/// 安装 tracing 订阅者并注册指标描述。已存在全局订阅者时返回错误而不是 panic。
///
/// # Example
///
/// ```ignore
/// use rules_shared::config::AppConfig;
/// use rules_shared::observability::init;
///
/// fn main() -> anyhow::Result<()> {
///     let config = AppConfig::load("eligibility-check")?;
///     init(&config.observability)?;
///     // 应用逻辑...
///     Ok(())
/// }
/// ```
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    tracing::init(config)?;
    metrics::describe_metrics();

    info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Observability initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
    }
}

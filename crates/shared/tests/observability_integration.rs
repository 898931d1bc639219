//! 可观测性模块集成测试
//!
//! 每个集成测试文件是独立进程，可以安全地安装全局订阅者。

use rules_shared::config::AppConfig;
use rules_shared::observability::{self, ObservabilityConfig};

#[test]
fn test_init_installs_subscriber_once() {
    let config = ObservabilityConfig {
        log_level: "debug".to_string(),
        ..ObservabilityConfig::default()
    };

    assert!(observability::init(&config).is_ok());

    // 全局订阅者已存在，再次初始化返回错误而不是 panic
    assert!(observability::init(&config).is_err());

    tracing::info!(target: "rules_shared::tests", "subscriber active");
}

#[test]
fn test_describe_metrics_without_recorder() {
    // 未安装导出器时描述与计数都是空操作
    observability::metrics::describe_metrics();
    metrics::counter!(observability::metrics::EVALUATIONS_TOTAL, "verdict" => "passed")
        .increment(1);
}

#[test]
fn test_app_config_carries_observability() {
    let dir = std::env::temp_dir().join(format!("rules-shared-obs-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let config = AppConfig::load_from(&dir, "test", "eligibility-check").unwrap();

    // 日志来源默认取服务名
    assert_eq!(config.observability.service_name, "eligibility-check");
    assert_eq!(config.observability.log_level, "info");
}

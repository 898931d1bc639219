//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::observability::ObservabilityConfig;

/// 自定义操作调用超时的默认值（毫秒）
pub const DEFAULT_CUSTOM_OPERATION_TIMEOUT_MS: u64 = 5_000;

/// 正则编译缓存容量的默认值
pub const DEFAULT_REGEX_CACHE_CAPACITY: usize = 256;

/// 规则引擎配置
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 单次自定义操作调用的超时（毫秒）
    pub custom_operation_timeout_ms: u64,
    /// all/any 两组是否并发求值
    pub concurrent_groups: bool,
    /// 正则编译缓存容量，0 表示不缓存
    pub regex_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            custom_operation_timeout_ms: DEFAULT_CUSTOM_OPERATION_TIMEOUT_MS,
            concurrent_groups: true,
            regex_cache_capacity: DEFAULT_REGEX_CACHE_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub fn custom_operation_timeout(&self) -> Duration {
        Duration::from_millis(self.custom_operation_timeout_ms)
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub engine: EngineConfig,
    pub observability: ObservabilityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: "rule-engine".to_string(),
            environment: "development".to_string(),
            engine: EngineConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. config/{service_name}.toml（服务特定配置）
    /// 4. 环境变量（RULES_ 前缀，`__` 分隔层级，如 RULES_ENGINE__CONCURRENT_GROUPS -> engine.concurrent_groups）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("RULES_ENV").unwrap_or_else(|_| "development".to_string());
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        Self::load_from(Path::new(&config_dir), &env, service_name)
    }

    /// 从指定目录加载配置
    pub fn load_from(
        config_dir: &Path,
        environment: &str,
        service_name: &str,
    ) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", environment)?
            .set_default("observability.service_name", service_name)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", environment))).required(false))
            .add_source(
                File::from(config_dir.join(format!("{}.toml", service_name))).required(false),
            )
            .add_source(
                Environment::with_prefix("RULES")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn temp_config_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rules-shared-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.engine.custom_operation_timeout_ms, 5_000);
        assert!(config.engine.concurrent_groups);
        assert_eq!(config.engine.regex_cache_capacity, 256);
    }

    #[test]
    fn test_custom_operation_timeout() {
        let engine = EngineConfig {
            custom_operation_timeout_ms: 1_500,
            ..EngineConfig::default()
        };
        assert_eq!(engine.custom_operation_timeout(), Duration::from_millis(1_500));
    }

    #[test]
    fn test_load_without_files_uses_defaults() {
        let dir = temp_config_dir("empty");
        let config = AppConfig::load_from(&dir, "test", "rule-engine").unwrap();

        assert_eq!(config.service_name, "rule-engine");
        assert_eq!(config.environment, "test");
        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(config.observability.service_name, "rule-engine");
    }

    #[test]
    fn test_load_layers_files() {
        let dir = temp_config_dir("layered");
        fs::write(
            dir.join("default.toml"),
            "[engine]\ncustom_operation_timeout_ms = 100\nregex_cache_capacity = 16\n",
        )
        .unwrap();
        fs::write(
            dir.join("staging.toml"),
            "[engine]\nconcurrent_groups = false\n",
        )
        .unwrap();
        fs::write(
            dir.join("rule-engine.toml"),
            "[engine]\nregex_cache_capacity = 32\n\n[observability]\njson_logs = true\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&dir, "staging", "rule-engine").unwrap();

        assert_eq!(config.engine.custom_operation_timeout_ms, 100);
        assert!(!config.engine.concurrent_groups);
        assert_eq!(config.engine.regex_cache_capacity, 32);
        assert!(config.observability.json_logs);
        assert_eq!(config.observability.log_level, "info");
    }
}

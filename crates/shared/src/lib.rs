//! 共享库
//!
//! 包含规则引擎及其宿主程序共用的配置加载与可观测性初始化。

pub mod config;
pub mod observability;

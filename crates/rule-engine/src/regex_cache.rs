//! 正则表达式编译缓存
//!
//! 规则集通常会被复用于大量记录，缓存避免每次评估都重新编译同一模式。
//! 容量达到上限时整体清空。

use crate::error::Result;
use crate::evaluator::compile_regex;
use dashmap::DashMap;
use regex::Regex;
use std::sync::Arc;

pub use rules_shared::config::DEFAULT_REGEX_CACHE_CAPACITY;

pub struct RegexCache {
    patterns: DashMap<String, Arc<Regex>>,
    capacity: usize,
}

impl RegexCache {
    /// `capacity` 为 0 时不缓存
    pub fn new(capacity: usize) -> Self {
        Self {
            patterns: DashMap::new(),
            capacity,
        }
    }

    /// 获取已编译的模式，未命中时编译并缓存
    pub fn get_or_compile(&self, pattern: &str) -> Result<Arc<Regex>> {
        if let Some(regex) = self.patterns.get(pattern) {
            return Ok(Arc::clone(regex.value()));
        }

        let regex = Arc::new(compile_regex(pattern)?);
        if self.capacity == 0 {
            return Ok(regex);
        }

        if self.patterns.len() >= self.capacity {
            self.patterns.clear();
        }
        self.patterns.insert(pattern.to_string(), Arc::clone(&regex));

        Ok(regex)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for RegexCache {
    fn default() -> Self {
        Self::new(DEFAULT_REGEX_CACHE_CAPACITY)
    }
}

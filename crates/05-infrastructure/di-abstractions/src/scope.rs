//! 绑定作用域

use serde::{Deserialize, Serialize};
use std::fmt;

/// 作用域决定绑定产生实例的缓存策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// 每次请求都创建新实例
    NoScope,
    /// 首次请求时创建，之后共享同一实例
    Singleton,
    /// 工厂构建时立即创建，之后共享同一实例
    EagerSingleton,
}

impl Scope {
    /// 是否缓存实例
    pub fn is_singleton(&self) -> bool {
        matches!(self, Self::Singleton | Self::EagerSingleton)
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::NoScope
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoScope => "NO_SCOPE",
            Self::Singleton => "SINGLETON",
            Self::EagerSingleton => "EAGER_SINGLETON",
        };
        f.write_str(name)
    }
}

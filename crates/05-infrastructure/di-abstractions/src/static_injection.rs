//! 静态注入
//!
//! 类型可以声明一组静态槽位（通常是 `OnceCell`），由工厂构建时填充。

use crate::injection::{Dependency, Resolved};
use di_common::DynError;
use std::sync::Arc;

type StaticAssignFn = Arc<dyn Fn(Resolved) -> Result<(), DynError> + Send + Sync>;

/// 静态注入成员
pub struct StaticMember {
    name: &'static str,
    dependency: Dependency,
    assign: StaticAssignFn,
}

impl StaticMember {
    /// 创建静态注入成员
    pub fn new<F>(name: &'static str, dependency: Dependency, assign: F) -> Self
    where
        F: Fn(Resolved) -> Result<(), DynError> + Send + Sync + 'static,
    {
        Self {
            name,
            dependency,
            assign: Arc::new(assign),
        }
    }

    /// 成员名称
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 成员依赖
    pub fn dependency(&self) -> &Dependency {
        &self.dependency
    }

    /// 写入解析结果
    pub fn assign(&self, resolved: Resolved) -> Result<(), DynError> {
        (self.assign)(resolved)
    }
}

/// 声明静态注入成员的类型
pub trait StaticInjectable: 'static {
    /// 静态注入成员
    fn static_members() -> Vec<StaticMember>;
}

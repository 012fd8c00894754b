//! 即时绑定器抽象接口
//!
//! 当依赖既没有显式绑定也无法自绑定时，工厂会询问即时绑定器。
//! 典型用途是注入按声明类型定制的对象（如日志器）或来自属性源的配置值。

use crate::injection::{Dependency, InjectionPoint};
use crate::instance::Instance;
use crate::resolver::Resolver;
use di_common::{DependencyError, TypeInfo};
use std::any::Any;
use std::sync::Arc;

/// 对已有对象执行注入的函数
pub type MemberInjector =
    Arc<dyn Fn(&dyn Resolver, &mut dyn Any) -> Result<(), DependencyError> + Send + Sync>;

/// 为注入点提供实例的函数
pub type InstanceSupplier = Arc<dyn Fn(&dyn Resolver) -> Result<Instance, DependencyError> + Send + Sync>;

/// 即时绑定器
///
/// 所有方法都不应产生副作用；同一输入的回答在工厂生命周期内应保持一致。
pub trait OnTheFlyBinder: Send + Sync {
    /// 类型是否按约定可注入（没有注入元数据时使用）
    fn is_injectable(&self, type_info: &TypeInfo) -> bool {
        let _ = type_info;
        false
    }

    /// 类型的成员注入函数
    fn injector(&self, type_info: &TypeInfo) -> Option<MemberInjector> {
        let _ = type_info;
        None
    }

    /// 能否为注入点提供实例
    fn is_instantiable(&self, point: &InjectionPoint, dependency: &Dependency) -> bool;

    /// 为注入点提供实例的函数，不能提供时返回 `None`
    fn instance(&self, point: &InjectionPoint, dependency: &Dependency) -> Option<InstanceSupplier>;

    /// 绑定器名称
    fn name(&self) -> &str {
        "on-the-fly"
    }
}

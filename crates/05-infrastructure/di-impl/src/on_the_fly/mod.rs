//! 即时绑定器的参考实现
//!
//! - [`OnTheFlyBinderChain`] - 依次询问多个绑定器，第一个接受的生效
//! - [`PropertyBinder`] - 从属性源注入命名的配置值
//! - [`LoggerBinder`] - 注入带声明类型标签的日志器

mod logger;
mod properties;

pub use logger::*;
pub use properties::*;

use di_abstractions::{
    Dependency, InjectionPoint, InstanceSupplier, MemberInjector, OnTheFlyBinder, TypeInfo,
};
use std::sync::Arc;

/// 即时绑定器链
#[derive(Default)]
pub struct OnTheFlyBinderChain {
    binders: Vec<Arc<dyn OnTheFlyBinder>>,
}

impl OnTheFlyBinderChain {
    /// 创建空链
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加绑定器
    pub fn with_binder(mut self, binder: Arc<dyn OnTheFlyBinder>) -> Self {
        self.push(binder);
        self
    }

    /// 追加绑定器
    pub fn push(&mut self, binder: Arc<dyn OnTheFlyBinder>) {
        self.binders.push(binder);
    }

    /// 绑定器数量
    pub fn len(&self) -> usize {
        self.binders.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.binders.is_empty()
    }
}

impl OnTheFlyBinder for OnTheFlyBinderChain {
    fn is_injectable(&self, type_info: &TypeInfo) -> bool {
        self.binders.iter().any(|binder| binder.is_injectable(type_info))
    }

    fn injector(&self, type_info: &TypeInfo) -> Option<MemberInjector> {
        self.binders
            .iter()
            .filter(|binder| binder.is_injectable(type_info))
            .find_map(|binder| binder.injector(type_info))
    }

    fn is_instantiable(&self, point: &InjectionPoint, dependency: &Dependency) -> bool {
        self.binders
            .iter()
            .any(|binder| binder.is_instantiable(point, dependency))
    }

    fn instance(&self, point: &InjectionPoint, dependency: &Dependency) -> Option<InstanceSupplier> {
        self.binders
            .iter()
            .filter(|binder| binder.is_instantiable(point, dependency))
            .find_map(|binder| binder.instance(point, dependency))
    }

    fn name(&self) -> &str {
        "chain"
    }
}

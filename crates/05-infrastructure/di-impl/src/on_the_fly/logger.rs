//! 日志器绑定器
//!
//! 任何对 [`ComponentLogger`] 的依赖（无论是否带限定符）都由 [`LoggerBinder`]
//! 即时提供，日志器以注入点的声明类型作为组件标签。

use di_abstractions::{
    Dependency, DependencyKind, InjectionPoint, Instance, InstanceSupplier, OnTheFlyBinder, Resolver,
};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// 带组件标签的日志器
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentLogger {
    component: String,
}

impl ComponentLogger {
    /// 创建日志器
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    /// 组件标签
    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn trace(&self, message: &str) {
        trace!(component = %self.component, "{}", message);
    }

    pub fn debug(&self, message: &str) {
        debug!(component = %self.component, "{}", message);
    }

    pub fn info(&self, message: &str) {
        info!(component = %self.component, "{}", message);
    }

    pub fn warn(&self, message: &str) {
        warn!(component = %self.component, "{}", message);
    }

    pub fn error(&self, message: &str) {
        error!(component = %self.component, "{}", message);
    }
}

/// 日志器绑定器
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggerBinder;

impl LoggerBinder {
    /// 创建日志器绑定器
    pub fn new() -> Self {
        Self
    }
}

impl OnTheFlyBinder for LoggerBinder {
    fn is_instantiable(&self, _point: &InjectionPoint, dependency: &Dependency) -> bool {
        dependency.kind() != DependencyKind::Provider && dependency.key().is_type::<ComponentLogger>()
    }

    fn instance(&self, point: &InjectionPoint, dependency: &Dependency) -> Option<InstanceSupplier> {
        if !self.is_instantiable(point, dependency) {
            return None;
        }
        let component = point.declaring_type.short_name();
        let supplier: InstanceSupplier = Arc::new(move |_resolver: &dyn Resolver| {
            Ok(Instance::new(Arc::new(ComponentLogger::new(component.clone()))))
        });
        Some(supplier)
    }

    fn name(&self) -> &str {
        "logger"
    }
}

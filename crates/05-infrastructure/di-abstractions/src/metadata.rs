//! 类型擦除的注入元数据与元数据提供策略

use crate::injection::{Dependency, InjectionPoint, TypeDescriptor};
use crate::instance::{Bindable, Instance};
use crate::resolver::Resolver;
use di_common::{ConfigurationError, DependencyError, TypeInfo};
use std::any::Any;
use std::sync::Arc;

/// 类型擦除的注入元数据
///
/// 由 [`TypeDescriptor`] 实现，供工厂在不知道具体类型时创建实例与注入成员。
pub trait TypeMetadata: Send + Sync {
    /// 类型信息
    fn type_info(&self) -> TypeInfo;

    /// 选择构造器，见 [`TypeDescriptor::select_constructor`]
    fn select_constructor(&self, name: Option<&str>) -> Result<usize, ConfigurationError>;

    /// 所有注入点及其依赖
    fn dependencies(&self, constructor: Option<usize>) -> Vec<(InjectionPoint, Dependency)>;

    /// 构造并完成成员注入，返回装箱的具体值
    fn create(
        &self,
        constructor: usize,
        resolver: &dyn Resolver,
    ) -> Result<Box<dyn Any + Send + Sync>, DependencyError>;

    /// 将 [`create`](Self::create) 的结果转换为共享实例，并附带生命周期适配器
    fn share(&self, created: Box<dyn Any + Send + Sync>) -> Result<Instance, DependencyError>;

    /// 对已有对象执行成员注入
    fn inject_members(&self, target: &mut dyn Any, resolver: &dyn Resolver) -> Result<(), DependencyError>;

    /// 是否具备生命周期能力
    fn has_lifecycle(&self) -> bool;

    /// 创建共享实例
    fn instantiate(&self, constructor: usize, resolver: &dyn Resolver) -> Result<Instance, DependencyError> {
        let created = self.create(constructor, resolver)?;
        self.share(created)
    }
}

impl<T: Bindable> TypeMetadata for TypeDescriptor<T> {
    fn type_info(&self) -> TypeInfo {
        TypeDescriptor::type_info(self)
    }

    fn select_constructor(&self, name: Option<&str>) -> Result<usize, ConfigurationError> {
        TypeDescriptor::select_constructor(self, name)
    }

    fn dependencies(&self, constructor: Option<usize>) -> Vec<(InjectionPoint, Dependency)> {
        TypeDescriptor::dependencies(self, constructor)
    }

    fn create(
        &self,
        constructor: usize,
        resolver: &dyn Resolver,
    ) -> Result<Box<dyn Any + Send + Sync>, DependencyError> {
        let instance = TypeDescriptor::instantiate(self, constructor, resolver)?;
        Ok(Box::new(instance))
    }

    fn share(&self, created: Box<dyn Any + Send + Sync>) -> Result<Instance, DependencyError> {
        let value: Box<T> = created.downcast::<T>().map_err(|_| DependencyError::TypeMismatch {
            expected: TypeDescriptor::type_info(self).name().to_string(),
            actual: "Box<dyn Any>".to_string(),
        })?;
        let shared: Arc<T> = Arc::from(value);
        let instance = Instance::new(shared.clone());
        Ok(match self.lifecycle_listener(shared) {
            Some(listener) => instance.with_listener(listener),
            None => instance,
        })
    }

    fn inject_members(&self, target: &mut dyn Any, resolver: &dyn Resolver) -> Result<(), DependencyError> {
        let actual = TypeDescriptor::type_info(self);
        let target = target
            .downcast_mut::<T>()
            .ok_or_else(|| DependencyError::TypeMismatch {
                expected: actual.name().to_string(),
                actual: "dyn Any".to_string(),
            })?;
        TypeDescriptor::inject_members(self, target, resolver)
    }

    fn has_lifecycle(&self) -> bool {
        TypeDescriptor::has_lifecycle(self)
    }
}

/// 注入元数据提供策略
///
/// 工厂通过它判断某个类型是否可注入、如何构造。一个工厂只使用一个策略对象。
pub trait MetadataProvider: Send + Sync {
    /// 查找类型的注入元数据
    fn metadata(&self, type_info: &TypeInfo) -> Option<Arc<dyn TypeMetadata>>;

    /// 是否知道该类型
    fn knows(&self, type_info: &TypeInfo) -> bool {
        self.metadata(type_info).is_some()
    }
}

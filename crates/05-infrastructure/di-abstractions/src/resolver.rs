//! 依赖解析抽象接口
//!
//! 注入元数据通过 [`Resolver`] 向工厂请求依赖，
//! [`Provider`] 通过 [`InstanceSource`] 延迟获取实例。

use crate::injection::{Dependency, InjectionPoint, Resolved};
use crate::instance::{Bindable, Instance};
use crate::key::Key;
use di_common::DependencyError;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

/// 依赖解析器
///
/// 由工厂在一次解析过程中提供，携带循环依赖检测所需的解析链。
pub trait Resolver {
    /// 为注入点解析一个依赖
    ///
    /// 失败时返回的错误指明注入点的声明类型、成员与参数位置。
    fn resolve(
        &self,
        point: &InjectionPoint,
        dependency: &Dependency,
    ) -> Result<Resolved, DependencyError>;
}

/// 实例来源
///
/// 按键获取实例，未绑定时返回 [`DependencyError::ComponentNotRegistered`]。
pub trait InstanceSource: Send + Sync {
    /// 获取实例
    fn provide(&self, key: &Key) -> Result<Instance, DependencyError>;
}

/// 未指定类型的提供者句柄
#[derive(Clone)]
pub struct ProviderHandle {
    key: Key,
    source: Weak<dyn InstanceSource>,
}

impl ProviderHandle {
    /// 创建提供者句柄
    pub fn new(key: Key, source: Weak<dyn InstanceSource>) -> Self {
        Self { key, source }
    }

    /// 提供的键
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// 获取实例
    pub fn get(&self) -> Result<Instance, DependencyError> {
        let source = self
            .source
            .upgrade()
            .ok_or_else(|| DependencyError::FactoryReleased {
                key: self.key.to_string(),
            })?;
        source.provide(&self.key)
    }
}

impl fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderHandle").field("key", &self.key).finish()
    }
}

/// 延迟获取依赖的提供者
///
/// 每次调用 [`get`](Self::get) 都按绑定的作用域解析一次。
pub struct Provider<T: ?Sized> {
    handle: ProviderHandle,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + Bindable> Provider<T> {
    /// 从句柄创建
    pub fn from_handle(handle: ProviderHandle) -> Self {
        Self {
            handle,
            _marker: PhantomData,
        }
    }

    /// 提供的键
    pub fn key(&self) -> &Key {
        self.handle.key()
    }

    /// 获取实例
    pub fn get(&self) -> Result<Arc<T>, DependencyError> {
        self.handle.get()?.downcast::<T>()
    }
}

impl<T: ?Sized> Clone for Provider<T> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized> fmt::Debug for Provider<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider").field("key", &self.handle.key).finish()
    }
}

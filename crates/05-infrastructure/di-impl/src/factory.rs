//! 组件工厂
//!
//! 工厂持有构建完成的只读绑定表，按键解析实例并执行成员注入。
//! 单例绑定的实例槽位是构建后唯一的共享可变状态：同一绑定的构造与注入
//! 只执行一次，失败不缓存，下次请求会重新构造。
//!
//! 解析顺序：
//!
//! 1. 显式绑定（含构建时合成的自绑定）；
//! 2. 无限定符且元数据已知的类型，运行期即时创建无作用域自绑定；
//! 3. 注入点上的依赖交给即时绑定器；
//! 4. 可选依赖注入 `None`，其余依赖报告注入失败。

use crate::binder::StaticRequest;
use crate::binding::{format_chain, Binding, Strategy};
use crate::lifecycle::LifecycleController;
use crate::registry::TypeRegistry;
use dashmap::DashMap;
use di_abstractions::{
    Bindable, ContainerConfig, ContainerStats, Dependency, DependencyKind, Injectable, InjectionPoint,
    Instance, InstanceSource, Key, MetadataProvider, OnTheFlyBinder, ProviderHandle, Resolved,
    Resolver, Scope, TypeMetadata,
};
use di_common::{ConfigurationError, DependencyError, TypeInfo};
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// 组件工厂
///
/// 克隆得到的工厂共享同一绑定表与单例。构建完成后可在任意线程并发使用。
#[derive(Clone)]
pub struct ComponentFactory {
    inner: Arc<FactoryInner>,
}

pub(crate) struct FactoryInner {
    bindings: HashMap<Key, Arc<Binding>>,
    order: Vec<Key>,
    just_in_time: DashMap<Key, Arc<Binding>>,
    registry: Arc<TypeRegistry>,
    on_the_fly: Option<Arc<dyn OnTheFlyBinder>>,
    lifecycle: Arc<LifecycleController>,
    config: ContainerConfig,
    resolution_errors: AtomicU64,
    this: Weak<FactoryInner>,
}

/// 工厂的组成部分，由构建器组装
pub(crate) struct FactoryParts {
    pub(crate) bindings: HashMap<Key, Arc<Binding>>,
    pub(crate) order: Vec<Key>,
    pub(crate) registry: Arc<TypeRegistry>,
    pub(crate) on_the_fly: Option<Arc<dyn OnTheFlyBinder>>,
    pub(crate) lifecycle: Arc<LifecycleController>,
    pub(crate) config: ContainerConfig,
}

impl ComponentFactory {
    pub(crate) fn assemble(parts: FactoryParts) -> Self {
        let inner = Arc::new_cyclic(|this| FactoryInner {
            bindings: parts.bindings,
            order: parts.order,
            just_in_time: DashMap::new(),
            registry: parts.registry,
            on_the_fly: parts.on_the_fly,
            lifecycle: parts.lifecycle,
            config: parts.config,
            resolution_errors: AtomicU64::new(0),
            this: this.clone(),
        });
        Self { inner }
    }

    /// 按键解析实例，未绑定时返回 `None`
    pub fn get_instance<T: ?Sized + Bindable>(&self, key: &Key) -> Result<Option<Arc<T>>, DependencyError> {
        ensure_key_type::<T>(key)?;
        match self.resolve_key(key)? {
            Some(instance) => instance.downcast::<T>().map(Some),
            None => Ok(None),
        }
    }

    /// 按键解析实例，未绑定时报错
    pub fn require_instance<T: ?Sized + Bindable>(&self, key: &Key) -> Result<Arc<T>, DependencyError> {
        self.get_instance::<T>(key)?.ok_or_else(|| {
            self.inner.count_error();
            DependencyError::ComponentNotRegistered { key: key.to_string() }
        })
    }

    /// 解析无限定符的类型
    pub fn get<T: ?Sized + Bindable>(&self) -> Result<Option<Arc<T>>, DependencyError> {
        self.get_instance::<T>(&Key::of::<T>())
    }

    /// 解析命名的类型
    pub fn get_named<T: ?Sized + Bindable>(&self, name: &str) -> Result<Option<Arc<T>>, DependencyError> {
        self.get_instance::<T>(&Key::named::<T>(name))
    }

    /// 解析无限定符的类型，未绑定时报错
    pub fn require<T: ?Sized + Bindable>(&self) -> Result<Arc<T>, DependencyError> {
        self.require_instance::<T>(&Key::of::<T>())
    }

    /// 解析命名的类型，未绑定时报错
    pub fn require_named<T: ?Sized + Bindable>(&self, name: &str) -> Result<Arc<T>, DependencyError> {
        self.require_instance::<T>(&Key::named::<T>(name))
    }

    /// 按键解析类型擦除的实例
    pub fn resolve_key(&self, key: &Key) -> Result<Option<Instance>, DependencyError> {
        let scope = ResolutionScope::new(&self.inner);
        self.inner.track(scope.instance(key))
    }

    /// 键是否可解析，不会创建实例
    pub fn has_key(&self, key: &Key) -> bool {
        self.inner.has_key(key)
    }

    /// 对已有对象执行字段与方法注入
    ///
    /// 类型没有注入元数据时交给即时绑定器；都没有时不做任何事。
    pub fn init<T: Bindable>(&self, target: &mut T) -> Result<(), DependencyError> {
        let type_info = TypeInfo::of::<T>();
        let scope = ResolutionScope::new(&self.inner);
        let target: &mut dyn Any = target;

        if let Some(metadata) = self.inner.registry.metadata(&type_info) {
            return self.inner.track(metadata.inject_members(target, &scope));
        }
        let injector = self
            .inner
            .on_the_fly
            .as_ref()
            .filter(|binder| binder.is_injectable(&type_info))
            .and_then(|binder| binder.injector(&type_info));
        match injector {
            Some(injector) => self.inner.track(injector(&scope as &dyn Resolver, target)),
            None => {
                debug!("类型没有注入元数据，跳过成员注入: {}", type_info);
                Ok(())
            }
        }
    }

    /// 按构造器选择规则创建新对象并完成成员注入
    ///
    /// 返回的对象不受作用域管理，也不会登记到生命周期控制器。
    pub fn new_instance<T: Injectable>(&self) -> Result<T, DependencyError> {
        self.create::<T>(None)
    }

    /// 使用指定名称的构造器创建新对象并完成成员注入
    pub fn new_instance_with<T: Injectable>(&self, constructor: &str) -> Result<T, DependencyError> {
        self.create::<T>(Some(constructor))
    }

    fn create<T: Injectable>(&self, constructor: Option<&str>) -> Result<T, DependencyError> {
        let metadata = self.inner.registry.register::<T>();
        let result = metadata
            .select_constructor(constructor)
            .map_err(DependencyError::from)
            .and_then(|index| metadata.create(index, &ResolutionScope::new(&self.inner)))
            .and_then(|created| {
                created.downcast::<T>().map(|value| *value).map_err(|_| DependencyError::TypeMismatch {
                    expected: std::any::type_name::<T>().to_string(),
                    actual: metadata.type_info().name().to_string(),
                })
            });
        self.inner.track(result)
    }

    /// 生命周期控制器
    pub fn lifecycle(&self) -> &Arc<LifecycleController> {
        &self.inner.lifecycle
    }

    /// 容器配置
    pub fn config(&self) -> &ContainerConfig {
        &self.inner.config
    }

    /// 显式绑定
    pub fn binding(&self, key: &Key) -> Option<&Arc<Binding>> {
        self.inner.bindings.get(key)
    }

    /// 键的作用域
    pub fn scope_of(&self, key: &Key) -> Option<Scope> {
        self.inner
            .bindings
            .get(key)
            .map(|binding| binding.scope())
            .or_else(|| self.inner.just_in_time.get(key).map(|binding| binding.scope()))
    }

    /// 所有显式绑定的键，按注册顺序
    pub fn keys(&self) -> &[Key] {
        &self.inner.order
    }

    /// 统计信息
    pub fn stats(&self) -> ContainerStats {
        let inner = &self.inner;
        let explicit = inner.bindings.values().filter(|binding| binding.is_instantiated()).count();
        let jit = inner
            .just_in_time
            .iter()
            .filter(|entry| entry.value().is_instantiated())
            .count();
        ContainerStats {
            registered_bindings: inner.bindings.len(),
            just_in_time_bindings: inner.just_in_time.len(),
            active_singletons: explicit + jit,
            resolution_errors: inner.resolution_errors.load(Ordering::Relaxed),
        }
    }

    /// 执行静态注入
    pub(crate) fn inject_static(&self, request: &StaticRequest) -> Result<(), ConfigurationError> {
        let scope = ResolutionScope::new(&self.inner);
        let type_name = request.type_info.name().to_string();
        for member in &request.members {
            let point = InjectionPoint::field(request.type_info, member.name());
            let resolved = scope
                .resolve(&point, member.dependency())
                .and_then(|resolved| {
                    member.assign(resolved).map_err(|source| {
                        point.failure(DependencyError::ComponentCreationFailed {
                            type_name: type_name.clone(),
                            source,
                        })
                    })
                });
            resolved.map_err(|source| ConfigurationError::StaticInjectionFailed {
                type_name: type_name.clone(),
                source,
            })?;
            debug!("静态注入完成: {}", point);
        }
        Ok(())
    }

    /// 创建急切单例
    pub(crate) fn initialize_eager(&self, key: &Key) -> Result<(), ConfigurationError> {
        self.resolve_key(key)
            .map_err(|source| ConfigurationError::EagerSingletonFailed {
                key: key.to_string(),
                source,
            })?;
        debug!("急切单例已创建: {}", key);
        Ok(())
    }
}

impl fmt::Debug for ComponentFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentFactory")
            .field("bindings", &self.inner.order)
            .field("stats", &self.stats())
            .finish()
    }
}

fn ensure_key_type<T: ?Sized + 'static>(key: &Key) -> Result<(), DependencyError> {
    if key.is_type::<T>() {
        Ok(())
    } else {
        Err(DependencyError::TypeMismatch {
            expected: std::any::type_name::<T>().to_string(),
            actual: key.to_string(),
        })
    }
}

impl FactoryInner {
    fn track<R>(&self, result: Result<R, DependencyError>) -> Result<R, DependencyError> {
        if result.is_err() {
            self.count_error();
        }
        result
    }

    fn count_error(&self) {
        self.resolution_errors.fetch_add(1, Ordering::Relaxed);
    }

    fn has_key(&self, key: &Key) -> bool {
        self.bindings.contains_key(key)
            || self.just_in_time.contains_key(key)
            || (key.qualifier().is_none() && self.registry.knows(key.type_info()))
    }

    /// 查找绑定，必要时创建即时自绑定
    fn binding(&self, key: &Key) -> Result<Option<Arc<Binding>>, DependencyError> {
        if let Some(binding) = self.bindings.get(key) {
            return Ok(Some(binding.clone()));
        }
        if !key.qualifier().is_none() {
            return Ok(None);
        }
        if let Some(binding) = self.just_in_time.get(key) {
            return Ok(Some(binding.value().clone()));
        }
        let Some(metadata) = self.registry.metadata(key.type_info()) else {
            return Ok(None);
        };
        let constructor = metadata.select_constructor(None)?;
        let binding = self
            .just_in_time
            .entry(key.clone())
            .or_insert_with(|| {
                debug!("创建即时自绑定: {}", key);
                Arc::new(Binding::new(
                    key.clone(),
                    Scope::NoScope,
                    Strategy::Construct {
                        metadata,
                        constructor,
                        upcaster: None,
                    },
                    "<just-in-time>".to_string(),
                ))
            })
            .value()
            .clone();
        Ok(Some(binding))
    }

    fn source(&self) -> Weak<dyn InstanceSource> {
        self.this.clone()
    }

    fn register_lifecycle(&self, instance: &Instance) {
        if !self.config.register_lifecycle_components {
            return;
        }
        let Some(listener) = instance.listener() else {
            return;
        };
        if let Err(e) = self.lifecycle.add_listener(listener.clone()) {
            warn!("单例登记到生命周期控制器失败: {}, 错误: {}", instance.type_info(), e);
        }
    }
}

impl InstanceSource for FactoryInner {
    fn provide(&self, key: &Key) -> Result<Instance, DependencyError> {
        let scope = ResolutionScope::new(self);
        let result = scope
            .instance(key)
            .and_then(|instance| {
                instance.ok_or_else(|| DependencyError::ComponentNotRegistered { key: key.to_string() })
            });
        self.track(result)
    }
}

/// 一次解析过程
///
/// 记录当前线程正在解析的键链，用于循环依赖与深度检测。
struct ResolutionScope<'f> {
    factory: &'f FactoryInner,
    chain: RefCell<Vec<Key>>,
}

impl<'f> ResolutionScope<'f> {
    fn new(factory: &'f FactoryInner) -> Self {
        Self {
            factory,
            chain: RefCell::new(Vec::new()),
        }
    }

    /// 解析键，未绑定时返回 `None`
    fn instance(&self, key: &Key) -> Result<Option<Instance>, DependencyError> {
        match self.factory.binding(key)? {
            Some(binding) => self.produce(&binding).map(Some),
            None => Ok(None),
        }
    }

    fn produce(&self, binding: &Binding) -> Result<Instance, DependencyError> {
        if binding.scope().is_singleton() {
            if let Some(instance) = binding.slot.get() {
                return Ok(instance.clone());
            }
        }

        self.enter(binding)?;
        if !binding.scope().is_singleton() {
            let result = self.construct(binding);
            self.chain.borrow_mut().pop();
            return result;
        }

        let mut created = false;
        let result = binding
            .slot
            .get_or_try_init(|| {
                let instance = self.construct(binding)?;
                created = true;
                debug!("单例已创建: {}", binding.key());
                Ok(instance)
            })
            .cloned();
        self.chain.borrow_mut().pop();

        // 监听器可能在 on_start 中解析同一个键，必须在单例槽初始化完成后登记
        if let (true, Ok(instance)) = (created, &result) {
            self.factory.register_lifecycle(instance);
        }
        result
    }

    fn enter(&self, binding: &Binding) -> Result<(), DependencyError> {
        let mut chain = self.chain.borrow_mut();
        let key = binding.key();
        let detect = self.factory.config.enable_circular_dependency_detection || binding.scope().is_singleton();
        if detect && chain.contains(key) {
            chain.push(key.clone());
            let dependency_chain = format_chain(&chain);
            chain.pop();
            return Err(DependencyError::CircularDependency { dependency_chain });
        }
        let max_depth = self.factory.config.max_resolution_depth;
        if chain.len() >= max_depth {
            return Err(DependencyError::ResolutionDepthExceeded {
                key: key.to_string(),
                max_depth,
            });
        }
        chain.push(key.clone());
        Ok(())
    }

    fn construct(&self, binding: &Binding) -> Result<Instance, DependencyError> {
        match &binding.strategy {
            Strategy::Construct {
                metadata,
                constructor,
                upcaster,
            } => {
                let instance = metadata.instantiate(*constructor, self)?;
                apply(upcaster.as_ref(), instance)
            }
            Strategy::Linked { target, upcaster } => {
                let instance = self.instance(target)?.ok_or_else(|| DependencyError::ComponentNotRegistered {
                    key: target.to_string(),
                })?;
                apply(upcaster.as_ref(), instance)
            }
            Strategy::Instance(instance) => Ok(instance.clone()),
            Strategy::Supplier(supplier) => {
                supplier().map_err(|source| DependencyError::ComponentCreationFailed {
                    type_name: binding.key().type_info().name().to_string(),
                    source,
                })
            }
        }
    }

    fn on_the_fly(&self, point: &InjectionPoint, dependency: &Dependency) -> Option<Result<Instance, DependencyError>> {
        let binder = self.factory.on_the_fly.as_ref()?;
        if !binder.is_instantiable(point, dependency) {
            return None;
        }
        let supplier = binder.instance(point, dependency)?;
        debug!("即时绑定器 {} 提供依赖: {} <- {}", binder.name(), point, dependency.key());
        Some(supplier(self as &dyn Resolver))
    }
}

fn apply(upcaster: Option<&crate::binder::Upcaster>, instance: Instance) -> Result<Instance, DependencyError> {
    match upcaster {
        Some(upcaster) => upcaster(instance),
        None => Ok(instance),
    }
}

impl Resolver for ResolutionScope<'_> {
    fn resolve(&self, point: &InjectionPoint, dependency: &Dependency) -> Result<Resolved, DependencyError> {
        let key = dependency.key();
        if dependency.kind() == DependencyKind::Provider {
            if !self.factory.has_key(key) {
                return Err(point.failure(DependencyError::ComponentNotRegistered { key: key.to_string() }));
            }
            return Ok(Resolved::Provider(ProviderHandle::new(key.clone(), self.factory.source())));
        }

        match self.instance(key) {
            Ok(Some(instance)) => return Ok(Resolved::Instance(instance)),
            Ok(None) => {}
            Err(e) => return Err(point.failure(e)),
        }
        match self.on_the_fly(point, dependency) {
            Some(Ok(instance)) => Ok(Resolved::Instance(instance)),
            Some(Err(e)) => Err(point.failure(e)),
            None if dependency.is_optional() => Ok(Resolved::Absent),
            None => Err(point.failure(DependencyError::ComponentNotRegistered { key: key.to_string() })),
        }
    }
}

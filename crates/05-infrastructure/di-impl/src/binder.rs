//! 模块与绑定 DSL
//!
//! 模块在 [`Module::configure`] 中通过 [`Binder`] 声明绑定。构建器在被消费时
//! 完成目标与作用域的设置，因此"至多一个目标"与"实例绑定不可再设作用域"
//! 由类型系统保证。下一次 `bind`、`install` 或模块结束时关闭上一个构建器，
//! 未指定目标且类型不可实例化的绑定在关闭时立即报错。

use crate::factory::ComponentFactory;
use crate::registry::TypeRegistry;
use di_abstractions::{
    Bindable, Injectable, Instance, Key, MetadataProvider, Qualifier, QualifierAnnotation, Scope,
    StaticInjectable, StaticMember, TypeMetadata, Upcast,
};
use di_common::{ConfigurationError, DependencyError, DynError, TypeInfo};
use std::any::TypeId;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, error};

/// 实现到键类型的转换函数
pub(crate) type Upcaster = Arc<dyn Fn(Instance) -> Result<Instance, DependencyError> + Send + Sync>;

/// 无参提供函数
pub(crate) type Supplier = Arc<dyn Fn() -> Result<Instance, DynError> + Send + Sync>;

/// 工厂构建完成后执行的终结器
pub(crate) type Finalizer = Box<dyn FnOnce(&ComponentFactory) -> Result<(), DynError> + Send>;

/// 模块
pub trait Module: Send + Sync {
    /// 声明绑定
    fn configure(&self, binder: &mut Binder<'_>);

    /// 模块名称，用于日志与错误归属
    fn name(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

impl<F> Module for F
where
    F: Fn(&mut Binder<'_>) + Send + Sync,
{
    fn configure(&self, binder: &mut Binder<'_>) {
        self(binder);
    }
}

/// 绑定目标
pub(crate) enum Target {
    /// 未指定目标，使用键类型自身的构造器
    Untargeted,
    /// 指向另一个键
    Linked { target: Key, upcaster: Option<Upcaster> },
    /// 使用实现类型的指定构造器
    Constructor {
        metadata: Arc<dyn TypeMetadata>,
        constructor: &'static str,
        upcaster: Option<Upcaster>,
    },
    /// 固定实例
    Instance(Instance),
    /// 提供函数
    Supplier(Supplier),
}

/// 模块声明的一条绑定
pub(crate) struct BindingRecord {
    pub(crate) key: Key,
    pub(crate) target: Target,
    pub(crate) scope: Option<Scope>,
    pub(crate) module: String,
}

/// 静态注入请求
pub(crate) struct StaticRequest {
    pub(crate) type_info: TypeInfo,
    pub(crate) members: Vec<StaticMember>,
}

/// 所有模块共享的绑定收集状态
pub(crate) struct BinderState {
    pub(crate) records: Vec<BindingRecord>,
    pub(crate) errors: Vec<ConfigurationError>,
    pub(crate) static_requests: Vec<StaticRequest>,
    pub(crate) finalizers: Vec<Finalizer>,
    registry: Arc<TypeRegistry>,
    open: Option<usize>,
}

impl BinderState {
    pub(crate) fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            records: Vec::new(),
            errors: Vec::new(),
            static_requests: Vec::new(),
            finalizers: Vec::new(),
            registry,
            open: None,
        }
    }

    fn record(&mut self, index: usize) -> &mut BindingRecord {
        &mut self.records[index]
    }

    fn report(&mut self, error: ConfigurationError) {
        error!("绑定配置错误: {}", error);
        self.errors.push(error);
    }

    /// 关闭当前打开的构建器并校验
    fn close_open(&mut self) {
        let Some(index) = self.open.take() else {
            return;
        };
        let record = &self.records[index];
        if matches!(record.target, Target::Untargeted) && !self.registry.knows(record.key.type_info()) {
            let error = ConfigurationError::IncompleteBinding {
                key: record.key.to_string(),
                module: record.module.clone(),
            };
            self.report(error);
        } else {
            debug!("绑定已关闭: {} (模块 {})", record.key, record.module);
        }
    }
}

/// 绑定声明器
pub struct Binder<'a> {
    state: &'a mut BinderState,
    module: String,
}

impl<'a> Binder<'a> {
    pub(crate) fn new(state: &'a mut BinderState, module: String) -> Self {
        Self { state, module }
    }

    /// 当前模块名称
    pub fn module_name(&self) -> &str {
        &self.module
    }

    /// 绑定类型 `T`
    pub fn bind<T: ?Sized + Bindable>(&mut self) -> LinkedBindingBuilder<'_, T> {
        self.open_record(Key::of::<T>())
    }

    /// 绑定命名的类型 `T`
    pub fn bind_named<T: ?Sized + Bindable>(&mut self, name: impl Into<String>) -> LinkedBindingBuilder<'_, T> {
        self.open_record(Key::named::<T>(name))
    }

    /// 绑定指定的键，键的类型必须是 `T`
    pub fn bind_key<T: ?Sized + Bindable>(&mut self, key: Key) -> LinkedBindingBuilder<'_, T> {
        if !key.is_type::<T>() {
            self.state.report(ConfigurationError::AliasTypeMismatch {
                key: key.to_string(),
                target: std::any::type_name::<T>().to_string(),
            });
        }
        self.open_record(key)
    }

    /// 安装另一个模块
    pub fn install(&mut self, module: &dyn Module) {
        self.state.close_open();
        let name = module.name();
        debug!("安装模块: {} (来自 {})", name, self.module);
        let mut nested = Binder::new(&mut *self.state, name);
        module.configure(&mut nested);
        nested.finish();
    }

    /// 登记可注入类型，使其可以被自绑定
    pub fn register_type<T: Injectable>(&mut self) {
        self.state.registry.register::<T>();
    }

    /// 请求在工厂构建时对类型执行静态注入
    pub fn request_static_injection<T: StaticInjectable>(&mut self) {
        self.state.close_open();
        self.state.static_requests.push(StaticRequest {
            type_info: TypeInfo::of::<T>(),
            members: T::static_members(),
        });
    }

    /// 添加工厂构建完成后执行的终结器
    pub fn add_finalizer<F>(&mut self, finalizer: F)
    where
        F: FnOnce(&ComponentFactory) -> Result<(), DynError> + Send + 'static,
    {
        self.state.close_open();
        self.state.finalizers.push(Box::new(finalizer));
    }

    /// 结束模块配置
    pub(crate) fn finish(self) {
        self.state.close_open();
    }

    fn open_record<T: ?Sized + Bindable>(&mut self, key: Key) -> LinkedBindingBuilder<'_, T> {
        self.state.close_open();
        self.state.records.push(BindingRecord {
            key,
            target: Target::Untargeted,
            scope: None,
            module: self.module.clone(),
        });
        let index = self.state.records.len() - 1;
        self.state.open = Some(index);
        LinkedBindingBuilder {
            state: &mut *self.state,
            index,
            _marker: PhantomData,
        }
    }
}

fn upcaster<I, T>() -> Option<Upcaster>
where
    I: Bindable + Upcast<T>,
    T: ?Sized + Bindable,
{
    if TypeId::of::<I>() == TypeId::of::<T>() {
        return None;
    }
    Some(Arc::new(|instance: Instance| instance.upcast::<I, T>()))
}

/// 指定绑定目标的构建器
pub struct LinkedBindingBuilder<'b, T: ?Sized> {
    state: &'b mut BinderState,
    index: usize,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<'b, T: ?Sized + Bindable> LinkedBindingBuilder<'b, T> {
    /// 使用命名限定符
    pub fn named(self, name: impl Into<String>) -> Self {
        self.qualified(Qualifier::Named(name.into()))
    }

    /// 使用标记类型限定符
    pub fn annotated_with<Q: ?Sized + 'static>(self) -> Self {
        self.qualified(Qualifier::Marker(TypeInfo::of::<Q>()))
    }

    /// 使用注解实例限定
    pub fn annotated(self, annotation: &dyn QualifierAnnotation) -> Self {
        self.qualified(annotation.qualifier())
    }

    fn qualified(self, qualifier: Qualifier) -> Self {
        let record = self.state.record(self.index);
        record.key = record.key.clone().with_qualifier(qualifier);
        self
    }

    /// 绑定到实现类型
    ///
    /// 实现类型未显式绑定时，工厂构建时为其合成无作用域的自绑定。
    /// 绑定到自身等同于自绑定，作用域由本绑定决定。
    pub fn to<I>(self) -> ScopedBindingBuilder<'b>
    where
        I: Injectable + Upcast<T>,
    {
        self.state.registry.register::<I>();
        if self.state.record(self.index).key == Key::of::<I>() {
            return self.target(Target::Untargeted);
        }
        self.target(Target::Linked {
            target: Key::of::<I>(),
            upcaster: upcaster::<I, T>(),
        })
    }

    /// 绑定到同类型的另一个键
    pub fn to_key(self, target: Key) -> ScopedBindingBuilder<'b> {
        if !target.is_type::<T>() {
            let key = self.state.record(self.index).key.to_string();
            self.state.report(ConfigurationError::AliasTypeMismatch {
                key,
                target: target.to_string(),
            });
        }
        self.target(Target::Linked {
            target,
            upcaster: None,
        })
    }

    /// 绑定到固定实例，隐含单例作用域
    pub fn to_instance(self, instance: Arc<T>) {
        let record = self.state.record(self.index);
        record.target = Target::Instance(Instance::new(instance));
        record.scope = Some(Scope::Singleton);
    }

    /// 绑定到提供函数
    pub fn to_supplier<F>(self, supplier: F) -> ScopedBindingBuilder<'b>
    where
        F: Fn() -> Result<Arc<T>, DynError> + Send + Sync + 'static,
    {
        self.target(Target::Supplier(Arc::new(move || supplier().map(Instance::new))))
    }

    /// 绑定到实现类型的指定构造器
    pub fn to_constructor<I>(self, constructor: &'static str) -> ScopedBindingBuilder<'b>
    where
        I: Injectable + Upcast<T>,
    {
        let metadata = self.state.registry.register::<I>();
        self.target(Target::Constructor {
            metadata,
            constructor,
            upcaster: upcaster::<I, T>(),
        })
    }

    /// 自绑定并设置作用域
    pub fn in_scope(self, scope: Scope) {
        self.state.record(self.index).scope = Some(scope);
    }

    /// 自绑定为急切单例
    pub fn as_eager_singleton(self) {
        self.in_scope(Scope::EagerSingleton);
    }

    fn target(self, target: Target) -> ScopedBindingBuilder<'b> {
        self.state.record(self.index).target = target;
        ScopedBindingBuilder {
            state: self.state,
            index: self.index,
        }
    }
}

/// 设置作用域的构建器
pub struct ScopedBindingBuilder<'b> {
    state: &'b mut BinderState,
    index: usize,
}

impl ScopedBindingBuilder<'_> {
    /// 设置作用域
    pub fn in_scope(self, scope: Scope) {
        self.state.record(self.index).scope = Some(scope);
    }

    /// 设置为急切单例
    pub fn as_eager_singleton(self) {
        self.in_scope(Scope::EagerSingleton);
    }
}

//! 注入元数据
//!
//! 类型通过 [`Injectable::descriptor`] 声明自己的构造器、字段与方法注入点，
//! 以及可选的生命周期钩子。描述符每个具体类型只构建一次，由工厂缓存。
//!
//! 构造器选择规则：
//!
//! 1. 多于一个标记为可注入的构造器是配置错误；
//! 2. 恰好一个标记构造器时使用它；
//! 3. 否则使用无参的普通构造器；
//! 4. 都没有时类型不可实例化。

use crate::instance::{Bindable, Instance};
use crate::key::Key;
use crate::resolver::{Provider, Resolver};
use crate::resolver::ProviderHandle;
use di_common::{ConfigurationError, DependencyError, DynError, LifecycleListener, TypeInfo};
use std::fmt;
use std::sync::Arc;

/// 可注入类型
pub trait Injectable: Bindable + Sized {
    /// 注入描述符
    fn descriptor() -> TypeDescriptor<Self>;
}

/// 注入点位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionPoint {
    /// 声明该注入点的类型
    pub declaring_type: TypeInfo,
    /// 构造器、字段或方法名称
    pub member: &'static str,
    /// 参数位置，字段注入为 `None`
    pub parameter: Option<usize>,
}

impl InjectionPoint {
    /// 字段注入点
    pub fn field(declaring_type: TypeInfo, member: &'static str) -> Self {
        Self {
            declaring_type,
            member,
            parameter: None,
        }
    }

    /// 构造器或方法参数注入点
    pub fn parameter(declaring_type: TypeInfo, member: &'static str, index: usize) -> Self {
        Self {
            declaring_type,
            member,
            parameter: Some(index),
        }
    }

    /// 以此注入点包装解析失败
    pub fn failure(&self, source: DependencyError) -> DependencyError {
        DependencyError::InjectionFailed {
            declaring_type: self.declaring_type.name().to_string(),
            member: self.member.to_string(),
            parameter: self.parameter,
            source: Box::new(source),
        }
    }
}

impl fmt::Display for InjectionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring_type, self.member)?;
        if let Some(index) = self.parameter {
            write!(f, "#{index}")?;
        }
        Ok(())
    }
}

/// 依赖的注入形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// 直接注入实例，必须可解析
    Instance,
    /// 注入 [`Provider`]，每次 `get` 时解析
    Provider,
    /// 可选实例，未绑定时注入 `None`
    Optional,
}

/// 注入点的依赖需求
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    key: Key,
    kind: DependencyKind,
}

impl Dependency {
    /// 实例依赖
    pub fn instance(key: Key) -> Self {
        Self {
            key,
            kind: DependencyKind::Instance,
        }
    }

    /// 提供者依赖
    pub fn provider(key: Key) -> Self {
        Self {
            key,
            kind: DependencyKind::Provider,
        }
    }

    /// 可选依赖
    pub fn optional(key: Key) -> Self {
        Self {
            key,
            kind: DependencyKind::Optional,
        }
    }

    /// 无限定符的实例依赖
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::instance(Key::of::<T>())
    }

    /// 命名实例依赖
    pub fn named<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self::instance(Key::named::<T>(name))
    }

    /// 依赖的键
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// 注入形式
    pub fn kind(&self) -> DependencyKind {
        self.kind
    }

    /// 是否可选
    pub fn is_optional(&self) -> bool {
        self.kind == DependencyKind::Optional
    }
}

/// 解析结果
#[derive(Debug, Clone)]
pub enum Resolved {
    /// 实例
    Instance(Instance),
    /// 提供者
    Provider(ProviderHandle),
    /// 可选依赖未绑定
    Absent,
}

impl Resolved {
    /// 取出实例
    pub fn into_instance<T: ?Sized + Bindable>(self) -> Result<Arc<T>, DependencyError> {
        match self {
            Self::Instance(instance) => instance.downcast::<T>(),
            Self::Provider(handle) => Err(mismatch::<Arc<T>>(&format!("Provider({})", handle.key()))),
            Self::Absent => Err(mismatch::<Arc<T>>("Absent")),
        }
    }

    /// 取出提供者
    pub fn into_provider<T: ?Sized + Bindable>(self) -> Result<Provider<T>, DependencyError> {
        match self {
            Self::Provider(handle) if handle.key().is_type::<T>() => Ok(Provider::from_handle(handle)),
            Self::Provider(handle) => Err(mismatch::<Provider<T>>(&format!("Provider({})", handle.key()))),
            Self::Instance(instance) => Err(mismatch::<Provider<T>>(instance.type_info().name())),
            Self::Absent => Err(mismatch::<Provider<T>>("Absent")),
        }
    }

    /// 取出可选实例
    pub fn into_optional<T: ?Sized + Bindable>(self) -> Result<Option<Arc<T>>, DependencyError> {
        match self {
            Self::Absent => Ok(None),
            other => other.into_instance::<T>().map(Some),
        }
    }
}

fn mismatch<E: ?Sized>(actual: &str) -> DependencyError {
    DependencyError::TypeMismatch {
        expected: std::any::type_name::<E>().to_string(),
        actual: actual.to_string(),
    }
}

/// 构造器或方法的已解析参数
#[derive(Debug, Default)]
pub struct Arguments {
    values: Vec<Option<Resolved>>,
}

impl Arguments {
    /// 从解析结果创建
    pub fn new(values: Vec<Resolved>) -> Self {
        Self {
            values: values.into_iter().map(Some).collect(),
        }
    }

    /// 参数个数
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 是否没有参数
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 取出指定位置的原始解析结果，每个位置只能取一次
    pub fn take(&mut self, index: usize) -> Result<Resolved, DependencyError> {
        self.values
            .get_mut(index)
            .and_then(Option::take)
            .ok_or(DependencyError::ArgumentMissing { index })
    }

    /// 取出实例参数
    pub fn instance<T: ?Sized + Bindable>(&mut self, index: usize) -> Result<Arc<T>, DependencyError> {
        self.take(index)?.into_instance::<T>()
    }

    /// 取出提供者参数
    pub fn provider<T: ?Sized + Bindable>(&mut self, index: usize) -> Result<Provider<T>, DependencyError> {
        self.take(index)?.into_provider::<T>()
    }

    /// 取出可选参数
    pub fn optional<T: ?Sized + Bindable>(
        &mut self,
        index: usize,
    ) -> Result<Option<Arc<T>>, DependencyError> {
        self.take(index)?.into_optional::<T>()
    }
}

type ConstructFn<T> = Arc<dyn Fn(&mut Arguments) -> Result<T, DynError> + Send + Sync>;
type AssignFn<T> = Arc<dyn Fn(&mut T, Resolved) -> Result<(), DynError> + Send + Sync>;
type InvokeFn<T> = Arc<dyn Fn(&mut T, &mut Arguments) -> Result<(), DynError> + Send + Sync>;
type HookFn<T> = Arc<dyn Fn(&T) -> Result<(), DynError> + Send + Sync>;
type ListenerFn<T> = Arc<dyn Fn(Arc<T>) -> Arc<dyn LifecycleListener> + Send + Sync>;

/// 构造器注入点
pub struct ConstructorPoint<T> {
    name: &'static str,
    inject: bool,
    parameters: Vec<Dependency>,
    construct: ConstructFn<T>,
}

impl<T> ConstructorPoint<T> {
    /// 标记为可注入的构造器
    pub fn injectable<F>(name: &'static str, parameters: Vec<Dependency>, construct: F) -> Self
    where
        F: Fn(&mut Arguments) -> Result<T, DynError> + Send + Sync + 'static,
    {
        Self {
            name,
            inject: true,
            parameters,
            construct: Arc::new(construct),
        }
    }

    /// 未标记的普通构造器
    ///
    /// 只有无参的普通构造器会被自动选用，带参数的只能通过名称显式指定。
    pub fn plain<F>(name: &'static str, parameters: Vec<Dependency>, construct: F) -> Self
    where
        F: Fn(&mut Arguments) -> Result<T, DynError> + Send + Sync + 'static,
    {
        Self {
            name,
            inject: false,
            parameters,
            construct: Arc::new(construct),
        }
    }

    /// 无参的普通构造器
    pub fn no_arg<F>(name: &'static str, construct: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::plain(name, Vec::new(), move |_| Ok(construct()))
    }

    /// 构造器名称
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 是否标记为可注入
    pub fn is_injectable(&self) -> bool {
        self.inject
    }

    /// 参数依赖
    pub fn parameters(&self) -> &[Dependency] {
        &self.parameters
    }
}

/// 字段注入点
pub struct FieldPoint<T> {
    name: &'static str,
    dependency: Dependency,
    assign: AssignFn<T>,
}

impl<T> FieldPoint<T> {
    /// 以原始解析结果赋值的字段
    pub fn new<F>(name: &'static str, dependency: Dependency, assign: F) -> Self
    where
        F: Fn(&mut T, Resolved) -> Result<(), DynError> + Send + Sync + 'static,
    {
        Self {
            name,
            dependency,
            assign: Arc::new(assign),
        }
    }

    /// 注入实例的字段
    pub fn instance<D, F>(name: &'static str, key: Key, assign: F) -> Self
    where
        D: ?Sized + Bindable,
        F: Fn(&mut T, Arc<D>) + Send + Sync + 'static,
    {
        Self::new(name, Dependency::instance(key), move |target, resolved| {
            assign(target, resolved.into_instance::<D>()?);
            Ok(())
        })
    }

    /// 注入可选实例的字段
    pub fn optional<D, F>(name: &'static str, key: Key, assign: F) -> Self
    where
        D: ?Sized + Bindable,
        F: Fn(&mut T, Option<Arc<D>>) + Send + Sync + 'static,
    {
        Self::new(name, Dependency::optional(key), move |target, resolved| {
            assign(target, resolved.into_optional::<D>()?);
            Ok(())
        })
    }

    /// 注入提供者的字段
    pub fn provider<D, F>(name: &'static str, key: Key, assign: F) -> Self
    where
        D: ?Sized + Bindable,
        F: Fn(&mut T, Provider<D>) + Send + Sync + 'static,
    {
        Self::new(name, Dependency::provider(key), move |target, resolved| {
            assign(target, resolved.into_provider::<D>()?);
            Ok(())
        })
    }

    /// 字段名称
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 字段依赖
    pub fn dependency(&self) -> &Dependency {
        &self.dependency
    }
}

/// 方法注入点
///
/// 方法的所有参数解析成功后才调用一次。
pub struct MethodPoint<T> {
    name: &'static str,
    parameters: Vec<Dependency>,
    invoke: InvokeFn<T>,
}

impl<T> MethodPoint<T> {
    /// 创建方法注入点
    pub fn new<F>(name: &'static str, parameters: Vec<Dependency>, invoke: F) -> Self
    where
        F: Fn(&mut T, &mut Arguments) -> Result<(), DynError> + Send + Sync + 'static,
    {
        Self {
            name,
            parameters,
            invoke: Arc::new(invoke),
        }
    }

    /// 方法名称
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 参数依赖
    pub fn parameters(&self) -> &[Dependency] {
        &self.parameters
    }
}

/// 类型的注入描述符
pub struct TypeDescriptor<T> {
    type_info: TypeInfo,
    constructors: Vec<ConstructorPoint<T>>,
    fields: Vec<FieldPoint<T>>,
    methods: Vec<MethodPoint<T>>,
    post_construct: Option<HookFn<T>>,
    pre_destroy: Option<HookFn<T>>,
    listener: Option<ListenerFn<T>>,
}

impl<T: Bindable> TypeDescriptor<T> {
    /// 创建空描述符
    pub fn new() -> Self {
        Self {
            type_info: TypeInfo::of::<T>(),
            constructors: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            post_construct: None,
            pre_destroy: None,
            listener: None,
        }
    }

    /// 添加构造器
    pub fn with_constructor(mut self, constructor: ConstructorPoint<T>) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// 添加字段注入点，按添加顺序注入
    pub fn with_field(mut self, field: FieldPoint<T>) -> Self {
        self.fields.push(field);
        self
    }

    /// 添加方法注入点，在所有字段之后按添加顺序调用
    pub fn with_method(mut self, method: MethodPoint<T>) -> Self {
        self.methods.push(method);
        self
    }

    /// 设置启动钩子（post-construct）
    pub fn with_post_construct<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T) -> Result<(), DynError> + Send + Sync + 'static,
    {
        self.post_construct = Some(Arc::new(hook));
        self
    }

    /// 设置销毁钩子（pre-destroy）
    pub fn with_pre_destroy<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T) -> Result<(), DynError> + Send + Sync + 'static,
    {
        self.pre_destroy = Some(Arc::new(hook));
        self
    }

    /// 声明类型自身实现了 [`LifecycleListener`]
    pub fn as_listener(mut self) -> Self
    where
        T: LifecycleListener,
    {
        self.listener = Some(Arc::new(|instance: Arc<T>| instance as Arc<dyn LifecycleListener>));
        self
    }

    /// 类型信息
    pub fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    /// 所有构造器
    pub fn constructors(&self) -> &[ConstructorPoint<T>] {
        &self.constructors
    }

    /// 字段注入点
    pub fn fields(&self) -> &[FieldPoint<T>] {
        &self.fields
    }

    /// 方法注入点
    pub fn methods(&self) -> &[MethodPoint<T>] {
        &self.methods
    }

    /// 选择构造器
    ///
    /// 指定名称时按名称查找任意构造器，否则按可注入标记与无参规则选择。
    pub fn select_constructor(&self, name: Option<&str>) -> Result<usize, ConfigurationError> {
        let type_name = self.type_info.name().to_string();

        if let Some(name) = name {
            return self
                .constructors
                .iter()
                .position(|c| c.name == name)
                .ok_or(ConfigurationError::ConstructorNotFound {
                    type_name,
                    constructor: name.to_string(),
                });
        }

        let mut marked = self
            .constructors
            .iter()
            .enumerate()
            .filter(|(_, c)| c.inject)
            .map(|(index, _)| index);
        match (marked.next(), marked.next()) {
            (Some(_), Some(_)) => Err(ConfigurationError::MultipleInjectConstructors { type_name }),
            (Some(index), None) => Ok(index),
            _ => self
                .constructors
                .iter()
                .position(|c| c.parameters.is_empty())
                .ok_or(ConfigurationError::NoUsableConstructor { type_name }),
        }
    }

    /// 所有注入点及其依赖
    ///
    /// `constructor` 为 `None` 时只包含字段与方法。
    pub fn dependencies(&self, constructor: Option<usize>) -> Vec<(InjectionPoint, Dependency)> {
        let mut dependencies = Vec::new();
        if let Some(constructor) = constructor.and_then(|index| self.constructors.get(index)) {
            for (index, dependency) in constructor.parameters.iter().enumerate() {
                dependencies.push((
                    InjectionPoint::parameter(self.type_info, constructor.name, index),
                    dependency.clone(),
                ));
            }
        }
        for field in &self.fields {
            dependencies.push((
                InjectionPoint::field(self.type_info, field.name),
                field.dependency.clone(),
            ));
        }
        for method in &self.methods {
            for (index, dependency) in method.parameters.iter().enumerate() {
                dependencies.push((
                    InjectionPoint::parameter(self.type_info, method.name, index),
                    dependency.clone(),
                ));
            }
        }
        dependencies
    }

    /// 使用指定构造器创建实例（不含成员注入）
    pub fn construct(&self, constructor: usize, resolver: &dyn Resolver) -> Result<T, DependencyError> {
        let point = self.constructors.get(constructor).ok_or_else(|| {
            DependencyError::from(ConfigurationError::ConstructorNotFound {
                type_name: self.type_info.name().to_string(),
                constructor: format!("#{constructor}"),
            })
        })?;

        let mut arguments = self.resolve_parameters(point.name, &point.parameters, resolver)?;
        (point.construct)(&mut arguments).map_err(|source| DependencyError::ComponentCreationFailed {
            type_name: self.type_info.name().to_string(),
            source,
        })
    }

    /// 对已有实例执行字段与方法注入
    pub fn inject_members(&self, target: &mut T, resolver: &dyn Resolver) -> Result<(), DependencyError> {
        for field in &self.fields {
            let point = InjectionPoint::field(self.type_info, field.name);
            let resolved = resolver.resolve(&point, &field.dependency)?;
            (field.assign)(target, resolved).map_err(|source| self.member_failure(&point, source))?;
        }

        for method in &self.methods {
            let mut arguments = self.resolve_parameters(method.name, &method.parameters, resolver)?;
            (method.invoke)(target, &mut arguments).map_err(|source| {
                self.member_failure(&InjectionPoint::field(self.type_info, method.name), source)
            })?;
        }
        Ok(())
    }

    /// 创建并完成成员注入
    pub fn instantiate(&self, constructor: usize, resolver: &dyn Resolver) -> Result<T, DependencyError> {
        let mut instance = self.construct(constructor, resolver)?;
        self.inject_members(&mut instance, resolver)?;
        Ok(instance)
    }

    /// 是否具备生命周期能力
    pub fn has_lifecycle(&self) -> bool {
        self.listener.is_some() || self.post_construct.is_some() || self.pre_destroy.is_some()
    }

    /// 将实例适配为生命周期监听器
    ///
    /// 类型自身是监听器时直接使用，否则用启动/销毁钩子适配。
    pub fn lifecycle_listener(&self, instance: Arc<T>) -> Option<Arc<dyn LifecycleListener>> {
        if let Some(listener) = &self.listener {
            return Some(listener(instance));
        }
        if self.post_construct.is_none() && self.pre_destroy.is_none() {
            return None;
        }
        Some(Arc::new(LifecycleMethodsAdapter {
            instance,
            name: self.type_info.name(),
            post_construct: self.post_construct.clone(),
            pre_destroy: self.pre_destroy.clone(),
        }))
    }

    fn resolve_parameters(
        &self,
        member: &'static str,
        parameters: &[Dependency],
        resolver: &dyn Resolver,
    ) -> Result<Arguments, DependencyError> {
        let values = parameters
            .iter()
            .enumerate()
            .map(|(index, dependency)| {
                resolver.resolve(&InjectionPoint::parameter(self.type_info, member, index), dependency)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Arguments::new(values))
    }

    fn member_failure(&self, point: &InjectionPoint, source: DynError) -> DependencyError {
        point.failure(DependencyError::ComponentCreationFailed {
            type_name: self.type_info.name().to_string(),
            source,
        })
    }
}

impl<T: Bindable> Default for TypeDescriptor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for TypeDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type", &self.type_info)
            .field(
                "constructors",
                &self.constructors.iter().map(|c| c.name).collect::<Vec<_>>(),
            )
            .field("fields", &self.fields.iter().map(|c| c.name).collect::<Vec<_>>())
            .field("methods", &self.methods.iter().map(|c| c.name).collect::<Vec<_>>())
            .finish()
    }
}

/// 以启动/销毁钩子实现的生命周期监听器
pub struct LifecycleMethodsAdapter<T> {
    instance: Arc<T>,
    name: &'static str,
    post_construct: Option<HookFn<T>>,
    pre_destroy: Option<HookFn<T>>,
}

impl<T: Bindable> LifecycleListener for LifecycleMethodsAdapter<T> {
    fn on_start(&self) -> Result<(), DynError> {
        match &self.post_construct {
            Some(hook) => hook(&self.instance),
            None => Ok(()),
        }
    }

    fn on_stop(&self) -> Result<(), DynError> {
        match &self.pre_destroy {
            Some(hook) => hook(&self.instance),
            None => Ok(()),
        }
    }

    fn name(&self) -> String {
        self.name.to_string()
    }
}

//! 属性绑定器
//!
//! 为带 `Named` 限定符的依赖从 [`PropertySource`] 取值，名称作为点分路径。
//! 每种可注入的值类型对应一个转换函数，默认支持字符串、布尔、整数、浮点、
//! 字符串列表与原始 JSON 值，其他类型通过 [`PropertyBinder::with_type`] 登记。

use di_abstractions::{
    Bindable, Dependency, DependencyKind, InjectionPoint, Instance, InstanceSupplier, OnTheFlyBinder,
    Resolver,
};
use di_common::{DependencyError, DynError, PropertySource, TypeInfo};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

type Converter = Arc<dyn Fn(&Value) -> Result<Instance, DynError> + Send + Sync>;

/// 属性绑定器
pub struct PropertyBinder {
    source: Arc<PropertySource>,
    prefix: Option<String>,
    converters: HashMap<TypeId, Converter>,
}

impl PropertyBinder {
    /// 使用默认转换函数创建
    pub fn new(source: PropertySource) -> Self {
        Self::shared(Arc::new(source))
    }

    /// 共享已有的属性源
    pub fn shared(source: Arc<PropertySource>) -> Self {
        let mut binder = Self {
            source,
            prefix: None,
            converters: HashMap::new(),
        };
        binder.converters.insert(TypeId::of::<String>(), Arc::new(convert_string));
        binder
            .register::<bool>()
            .register::<i32>()
            .register::<i64>()
            .register::<u16>()
            .register::<u32>()
            .register::<u64>()
            .register::<usize>()
            .register::<f64>()
            .register::<Vec<String>>()
            .register::<Value>()
    }

    /// 所有路径加上前缀
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// 登记可反序列化的值类型
    pub fn with_type<T: DeserializeOwned + Bindable>(self) -> Self {
        self.register::<T>()
    }

    /// 属性源
    pub fn source(&self) -> &PropertySource {
        &self.source
    }

    fn register<T: DeserializeOwned + Bindable>(mut self) -> Self {
        self.converters.insert(TypeId::of::<T>(), Arc::new(convert::<T>));
        self
    }

    fn path(&self, dependency: &Dependency) -> Option<String> {
        let name = dependency.key().qualifier().name()?;
        Some(match &self.prefix {
            Some(prefix) => format!("{prefix}.{name}"),
            None => name.to_string(),
        })
    }

    fn converter(&self, dependency: &Dependency) -> Option<&Converter> {
        if dependency.kind() == DependencyKind::Provider {
            return None;
        }
        self.converters.get(&dependency.key().type_info().id())
    }
}

fn convert<T: DeserializeOwned + Bindable>(value: &Value) -> Result<Instance, DynError> {
    let parsed = match serde_json::from_value::<T>(value.clone()) {
        Ok(parsed) => parsed,
        Err(e) => match value {
            Value::String(text) => serde_json::from_str::<T>(text).map_err(|_| e)?,
            _ => return Err(e.into()),
        },
    };
    Ok(Instance::new(Arc::new(parsed)))
}

fn convert_string(value: &Value) -> Result<Instance, DynError> {
    let text = match value {
        Value::String(text) => text.clone(),
        Value::Null => return Err("属性值为 null".into()),
        Value::Array(_) | Value::Object(_) => {
            return Err(format!("属性值不是标量: {value}").into());
        }
        other => other.to_string(),
    };
    Ok(Instance::new(Arc::new(text)))
}

impl OnTheFlyBinder for PropertyBinder {
    fn is_instantiable(&self, _point: &InjectionPoint, dependency: &Dependency) -> bool {
        self.converter(dependency).is_some()
            && self.path(dependency).is_some_and(|path| self.source.contains(&path))
    }

    fn instance(&self, point: &InjectionPoint, dependency: &Dependency) -> Option<InstanceSupplier> {
        let converter = self.converter(dependency)?.clone();
        let path = self.path(dependency)?;
        let source = self.source.clone();
        let type_info: TypeInfo = *dependency.key().type_info();
        debug!("属性注入: {} <- {}", point, path);

        let supplier: InstanceSupplier = Arc::new(move |_resolver: &dyn Resolver| {
            let value = source
                .get(&path)
                .ok_or_else(|| DependencyError::ComponentNotRegistered { key: path.clone() })?;
            converter(value).map_err(|source| DependencyError::ComponentCreationFailed {
                type_name: format!("{type_info} (属性 {path})"),
                source,
            })
        });
        Some(supplier)
    }

    fn name(&self) -> &str {
        "properties"
    }
}

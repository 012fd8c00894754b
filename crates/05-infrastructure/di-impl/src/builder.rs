//! 组件工厂构建器
//!
//! 构建顺序：模块配置 → 绑定表 → 自绑定合成 → 链接与依赖校验 →
//! 静态注入 → 急切单例（按注册顺序）→ 终结器。任何一步失败都会中止构建，
//! 调用方拿不到半成品工厂。

use crate::binder::{Binder, BinderState, Module};
use crate::binding::BindingTable;
use crate::factory::{ComponentFactory, FactoryParts};
use crate::lifecycle::LifecycleController;
use crate::on_the_fly::OnTheFlyBinderChain;
use crate::registry::TypeRegistry;
use di_abstractions::{ContainerConfig, Injectable, MetadataProvider, OnTheFlyBinder, TypeMetadata};
use di_common::{ConfigurationError, ConfigurationResult};
use std::sync::Arc;
use tracing::{debug, info};

/// 组件工厂构建器
pub struct ComponentFactoryBuilder {
    modules: Vec<Box<dyn Module>>,
    metadata_provider: Option<Arc<dyn MetadataProvider>>,
    types: Vec<Arc<dyn TypeMetadata>>,
    on_the_fly: Vec<Arc<dyn OnTheFlyBinder>>,
    lifecycle: Option<Arc<LifecycleController>>,
    config: ContainerConfig,
}

impl ComponentFactoryBuilder {
    /// 创建构建器
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
            metadata_provider: None,
            types: Vec::new(),
            on_the_fly: Vec::new(),
            lifecycle: None,
            config: ContainerConfig::default(),
        }
    }

    /// 添加模块，按添加顺序配置
    pub fn with_module<M: Module + 'static>(mut self, module: M) -> Self {
        self.modules.push(Box::new(module));
        self
    }

    /// 添加已装箱的模块
    pub fn with_boxed_module(mut self, module: Box<dyn Module>) -> Self {
        self.modules.push(module);
        self
    }

    /// 替换默认的元数据提供策略（编译期类型目录）
    pub fn with_metadata_provider(mut self, provider: Arc<dyn MetadataProvider>) -> Self {
        self.metadata_provider = Some(provider);
        self
    }

    /// 登记可注入类型
    pub fn register_type<T: Injectable>(mut self) -> Self {
        self.types.push(Arc::new(T::descriptor()));
        self
    }

    /// 添加即时绑定器，多个绑定器按添加顺序组成链
    pub fn with_on_the_fly_binder(mut self, binder: Arc<dyn OnTheFlyBinder>) -> Self {
        self.on_the_fly.push(binder);
        self
    }

    /// 使用外部的生命周期控制器
    pub fn with_lifecycle_controller(mut self, controller: Arc<LifecycleController>) -> Self {
        self.lifecycle = Some(controller);
        self
    }

    /// 设置容器配置
    pub fn with_config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    /// 构建组件工厂
    pub fn build(self) -> ConfigurationResult<ComponentFactory> {
        info!("开始构建组件工厂，模块数: {}", self.modules.len());

        let registry = Arc::new(match self.metadata_provider {
            Some(provider) => TypeRegistry::with_fallback(provider),
            None => TypeRegistry::new(),
        });
        for metadata in self.types {
            registry.register_metadata(metadata);
        }

        let mut state = BinderState::new(registry.clone());
        for module in &self.modules {
            let name = module.name();
            debug!("配置模块: {}", name);
            let mut binder = Binder::new(&mut state, name);
            module.configure(&mut binder);
            binder.finish();
        }
        let BinderState {
            records,
            errors,
            static_requests,
            finalizers,
            ..
        } = state;
        if let Some(error) = errors.into_iter().next() {
            return Err(error);
        }

        let mut table = BindingTable::new();
        for record in records {
            table.add(record, &registry)?;
        }
        let synthesized = table.synthesize_self_bindings(&registry)?;
        table.validate_links()?;

        let on_the_fly: Option<Arc<dyn OnTheFlyBinder>> = match self.on_the_fly.len() {
            0 => None,
            1 => self.on_the_fly.into_iter().next(),
            _ => Some(Arc::new(
                self.on_the_fly
                    .into_iter()
                    .fold(OnTheFlyBinderChain::new(), OnTheFlyBinderChain::with_binder),
            )),
        };
        if self.config.validate_dependencies_on_build {
            table.validate_dependencies(&registry, on_the_fly.as_deref())?;
        }

        let eager = table.eager_keys();
        let binding_count = table.len();
        let (bindings, order) = table.into_parts();
        let factory = ComponentFactory::assemble(FactoryParts {
            bindings,
            order,
            registry,
            on_the_fly,
            lifecycle: self.lifecycle.unwrap_or_default(),
            config: self.config,
        });

        for request in &static_requests {
            factory.inject_static(request)?;
        }
        for key in &eager {
            factory.initialize_eager(key)?;
        }
        for finalizer in finalizers {
            finalizer(&factory).map_err(|source| ConfigurationError::FinalizerFailed { source })?;
        }

        info!(
            "组件工厂构建完成: {} 个绑定（其中 {} 个自绑定）, {} 个急切单例",
            binding_count,
            synthesized,
            eager.len()
        );
        Ok(factory)
    }
}

impl Default for ComponentFactoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::on_the_fly::{LoggerBinder, PropertyBinder};
    use di_abstractions::Key;
    use di_common::{LifecycleState, PropertySource};
    use serde_json::json;

    #[test]
    fn test_shared_lifecycle_controller_and_binder_chain() {
        let controller = Arc::new(LifecycleController::new());
        let properties = PropertySource::from_value(json!({"name": "orders"})).unwrap();

        let factory = ComponentFactoryBuilder::new()
            .with_lifecycle_controller(controller.clone())
            .with_on_the_fly_binder(Arc::new(LoggerBinder::new()))
            .with_on_the_fly_binder(Arc::new(PropertyBinder::new(properties)))
            .with_module(|binder: &mut Binder<'_>| {
                binder.add_finalizer(|factory: &ComponentFactory| {
                    factory.lifecycle().start()?;
                    Ok(())
                });
            })
            .build()
            .unwrap();

        assert!(Arc::ptr_eq(factory.lifecycle(), &controller));
        assert_eq!(controller.state(), LifecycleState::Started);
        assert!(factory.keys().is_empty());
        assert!(factory.get::<String>().unwrap().is_none());
        assert!(!factory.has_key(&Key::named::<String>("name")));
    }

    #[test]
    fn test_module_errors_abort_build() {
        let result = ComponentFactoryBuilder::new()
            .with_module(|binder: &mut Binder<'_>| {
                binder.bind::<String>().to_key(Key::of::<u32>());
            })
            .build();

        assert!(matches!(result, Err(ConfigurationError::AliasTypeMismatch { .. })));
    }
}

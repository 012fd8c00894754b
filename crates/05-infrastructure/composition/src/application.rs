//! 应用组装
//!
//! [`ApplicationBuilder`] 按以下顺序组装应用：
//!
//! 1. 安装日志订阅者（配置了日志时）；
//! 2. 加载并合并属性来源；
//! 3. 构建组件工厂，属性源与应用设置以实例绑定提供，
//!    日志器与属性值由即时绑定器提供；
//! 4. 设置了自动启动时，由工厂终结器启动生命周期控制器。

use crate::logging::{initialize_logging, LoggingConfig};
use crate::properties::{load_all, PropertySourceSpec};
use crate::settings::{file_spec, ApplicationSettings};
use di_abstractions::{Bindable, Injectable, OnTheFlyBinder};
use di_common::{DependencyResult, InfrastructureError, InfrastructureResult, LifecycleState, PropertySource};
use di_impl::{
    Binder, ComponentFactory, ComponentFactoryBuilder, LifecycleController, LoggerBinder, Module,
    PropertyBinder,
};
use parking_lot::RwLock;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// 应用构建器
pub struct ApplicationBuilder {
    settings: ApplicationSettings,
    factory: ComponentFactoryBuilder,
    properties: Vec<PropertySourceSpec>,
    on_the_fly: Vec<Arc<dyn OnTheFlyBinder>>,
    logging: Option<LoggingConfig>,
}

impl ApplicationBuilder {
    /// 使用默认设置创建
    pub fn new() -> Self {
        Self {
            settings: ApplicationSettings::default(),
            factory: ComponentFactoryBuilder::new(),
            properties: Vec::new(),
            on_the_fly: Vec::new(),
            logging: None,
        }
    }

    /// 设置应用名称
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.settings.name = name.into();
        self
    }

    /// 替换应用设置
    pub fn with_settings(mut self, settings: ApplicationSettings) -> Self {
        self.settings = settings;
        self
    }

    /// 从 TOML 文件加载应用设置
    pub fn with_settings_file<P: AsRef<Path>>(self, path: P) -> InfrastructureResult<Self> {
        let path = path.as_ref();
        info!("加载应用设置: {}", path.display());
        let settings = ApplicationSettings::from_toml_file(path)?;
        Ok(self.with_settings(settings))
    }

    /// 添加模块
    pub fn with_module<M: Module + 'static>(mut self, module: M) -> Self {
        self.factory = self.factory.with_module(module);
        self
    }

    /// 登记可注入类型
    pub fn register_type<T: Injectable>(mut self) -> Self {
        self.factory = self.factory.register_type::<T>();
        self
    }

    /// 添加属性文件，按扩展名区分 JSON 与 TOML
    pub fn with_property_file<P: AsRef<Path>>(mut self, path: P) -> InfrastructureResult<Self> {
        self.properties.push(file_spec(path.as_ref())?);
        Ok(self)
    }

    /// 添加带前缀的环境变量属性
    pub fn with_env_properties(mut self, prefix: impl Into<String>) -> Self {
        self.properties.push(PropertySourceSpec::environment(prefix));
        self
    }

    /// 添加已加载的属性
    pub fn with_properties(mut self, source: PropertySource) -> Self {
        self.properties.push(PropertySourceSpec::Inline(source));
        self
    }

    /// 添加即时绑定器，排在日志器与属性绑定器之后
    pub fn with_on_the_fly_binder(mut self, binder: Arc<dyn OnTheFlyBinder>) -> Self {
        self.on_the_fly.push(binder);
        self
    }

    /// 使用外部的生命周期控制器
    pub fn with_lifecycle_controller(mut self, controller: Arc<LifecycleController>) -> Self {
        self.factory = self.factory.with_lifecycle_controller(controller);
        self
    }

    /// 配置日志，覆盖设置中的日志配置
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging = Some(config);
        self
    }

    /// 设置是否自动启动
    pub fn with_auto_start(mut self, enabled: bool) -> Self {
        self.settings.auto_start = enabled;
        self
    }

    /// 构建应用
    pub fn build(self) -> InfrastructureResult<Application> {
        if let Some(logging) = self.logging.as_ref().or(self.settings.logging.as_ref()) {
            initialize_logging(logging)?;
        }
        info!("开始构建应用: {}", self.settings.name);

        let mut specs = self.settings.property_sources()?;
        specs.extend(self.properties);
        let properties = Arc::new(load_all(&specs)?);
        let settings = Arc::new(self.settings);

        let mut factory = self
            .factory
            .with_config(settings.container.clone())
            .with_module(ApplicationModule {
                settings: settings.clone(),
                properties: properties.clone(),
            })
            .with_on_the_fly_binder(Arc::new(LoggerBinder::new()))
            .with_on_the_fly_binder(Arc::new(PropertyBinder::shared(properties.clone())));
        for binder in self.on_the_fly {
            factory = factory.with_on_the_fly_binder(binder);
        }

        let factory = factory.build().map_err(|e| {
            error!("组件工厂构建失败: {}", e);
            InfrastructureError::from(e)
        })?;

        let status = match factory.lifecycle().state() {
            LifecycleState::Started => ApplicationStatus::Running,
            _ => ApplicationStatus::Initialized,
        };
        info!("应用构建完成: {} [{}]", settings.name, status);
        Ok(Application {
            settings,
            properties,
            factory,
            status: RwLock::new(status),
        })
    }
}

impl Default for ApplicationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 提供应用设置与属性源，并在需要时自动启动
struct ApplicationModule {
    settings: Arc<ApplicationSettings>,
    properties: Arc<PropertySource>,
}

impl Module for ApplicationModule {
    fn configure(&self, binder: &mut Binder<'_>) {
        binder.bind::<ApplicationSettings>().to_instance(self.settings.clone());
        binder.bind::<PropertySource>().to_instance(self.properties.clone());
        if self.settings.auto_start {
            binder.add_finalizer(|factory: &ComponentFactory| {
                factory.lifecycle().start()?;
                Ok(())
            });
        }
    }

    fn name(&self) -> String {
        "application".to_string()
    }
}

/// 应用状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationStatus {
    /// 已构建，尚未启动
    Initialized,
    /// 运行中
    Running,
    /// 已关闭
    Stopped,
    /// 启动或关闭失败
    Failed,
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initialized => "initialized",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// 已组装的应用
pub struct Application {
    settings: Arc<ApplicationSettings>,
    properties: Arc<PropertySource>,
    factory: ComponentFactory,
    status: RwLock<ApplicationStatus>,
}

impl Application {
    /// 创建应用构建器
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    /// 应用名称
    pub fn name(&self) -> &str {
        &self.settings.name
    }

    /// 应用设置
    pub fn settings(&self) -> &ApplicationSettings {
        &self.settings
    }

    /// 合并后的属性
    pub fn properties(&self) -> &PropertySource {
        &self.properties
    }

    /// 组件工厂
    pub fn factory(&self) -> &ComponentFactory {
        &self.factory
    }

    /// 生命周期控制器
    pub fn lifecycle(&self) -> &Arc<LifecycleController> {
        self.factory.lifecycle()
    }

    /// 当前状态
    pub fn status(&self) -> ApplicationStatus {
        *self.status.read()
    }

    /// 解析无限定符的类型，未绑定时报错
    pub fn require<T: ?Sized + Bindable>(&self) -> DependencyResult<Arc<T>> {
        self.factory.require::<T>()
    }

    /// 解析无限定符的类型
    pub fn get<T: ?Sized + Bindable>(&self) -> DependencyResult<Option<Arc<T>>> {
        self.factory.get::<T>()
    }

    /// 对容器外创建的对象执行成员注入
    pub fn init<T: Bindable>(&self, target: &mut T) -> DependencyResult<()> {
        self.factory.init(target)
    }

    /// 启动生命周期控制器
    pub fn start(&self) -> InfrastructureResult<()> {
        let mut status = self.status.write();
        match self.factory.lifecycle().start() {
            Ok(()) => {
                *status = ApplicationStatus::Running;
                info!("应用已启动: {}", self.settings.name);
                Ok(())
            }
            Err(e) => {
                *status = ApplicationStatus::Failed;
                error!("应用启动失败: {}, 错误: {}", self.settings.name, e);
                Err(e.into())
            }
        }
    }

    /// 关闭应用，按启动的相反顺序停止所有组件
    pub fn shutdown(&self) -> InfrastructureResult<()> {
        let mut status = self.status.write();
        let result = self.factory.lifecycle().shutdown();
        *status = match &result {
            Ok(()) => ApplicationStatus::Stopped,
            Err(_) => ApplicationStatus::Failed,
        };
        info!("应用已关闭: {} [{}]", self.settings.name, *status);
        result.map_err(InfrastructureError::from)
    }

    /// 运行直到收到 Ctrl-C，然后关闭
    pub async fn run_until_shutdown_signal(&self) -> InfrastructureResult<()> {
        if self.factory.lifecycle().state() == LifecycleState::Waiting {
            self.start()?;
        }
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| InfrastructureError::BootstrapFailed {
                message: format!("等待关闭信号失败: {}", e),
            })?;
        info!("收到关闭信号: {}", self.settings.name);
        self.shutdown()
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("name", &self.settings.name)
            .field("status", &self.status())
            .field("factory", &self.factory)
            .finish()
    }
}

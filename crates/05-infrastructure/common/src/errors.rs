//! 错误类型定义
//!
//! 容器的错误分为四类：
//!
//! - [`DependencyError`] - 运行期解析与注入失败
//! - [`ConfigurationError`] - 工厂构建期（模块加载、绑定校验、急切单例）的失败
//! - [`LifecycleError`] - 生命周期控制器的状态违规与监听器失败
//! - [`ConfigError`] - 配置文件与属性源加载失败
//!
//! 所有包装型错误都通过 `#[source]` 保留原始原因链。

use thiserror::Error;

/// 可跨线程传递的动态错误
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置文件读取失败: {source}")]
    FileReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("配置解析失败: {location}, 原因: {source}")]
    ParseError {
        location: String,
        #[source]
        source: DynError,
    },

    #[error("配置序列化失败: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },

    #[error("配置键不存在: {key}")]
    KeyNotFound { key: String },

    #[error("配置类型转换失败: {message}")]
    TypeConversionError { message: String },
}

/// 依赖注入错误类型
#[derive(Error, Debug)]
pub enum DependencyError {
    /// 没有为该键注册绑定，且无法自绑定
    #[error("组件未注册: {key}")]
    ComponentNotRegistered { key: String },

    /// 构造策略（构造器、提供函数）失败
    #[error("组件创建失败: {type_name}, 原因: {source}")]
    ComponentCreationFailed {
        type_name: String,
        #[source]
        source: DynError,
    },

    /// 某个注入点无法满足，指明声明类型、成员与参数位置
    #[error("注入失败: {declaring_type}::{member}{}", parameter_suffix(.parameter))]
    InjectionFailed {
        declaring_type: String,
        member: String,
        parameter: Option<usize>,
        #[source]
        source: Box<DependencyError>,
    },

    #[error("循环依赖检测到: {dependency_chain}")]
    CircularDependency { dependency_chain: String },

    #[error("解析深度超过上限 {max_depth}: {key}")]
    ResolutionDepthExceeded { key: String, max_depth: usize },

    #[error("类型不匹配: 期望 {expected}, 实际 {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("注入参数缺失: 位置 {index}")]
    ArgumentMissing { index: usize },

    #[error("组件工厂已释放，无法解析: {key}")]
    FactoryReleased { key: String },

    #[error("组件配置无效: {source}")]
    InvalidConfiguration {
        #[from]
        source: Box<ConfigurationError>,
    },
}

impl DependencyError {
    /// 是否为"未注册"错误（剥离注入失败包装后判断）
    pub fn is_not_registered(&self) -> bool {
        match self {
            Self::ComponentNotRegistered { .. } => true,
            Self::InjectionFailed { source, .. } => source.is_not_registered(),
            _ => false,
        }
    }

    /// 最内层的依赖错误
    pub fn root_cause(&self) -> &DependencyError {
        match self {
            Self::InjectionFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<ConfigurationError> for DependencyError {
    fn from(error: ConfigurationError) -> Self {
        Self::InvalidConfiguration {
            source: Box::new(error),
        }
    }
}

fn parameter_suffix(parameter: &Option<usize>) -> String {
    parameter.map(|index| format!(" (参数 #{index})")).unwrap_or_default()
}

/// 构建期配置错误
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("绑定不完整: {key} 未指定目标且无法自绑定 (模块 {module})")]
    IncompleteBinding { key: String, module: String },

    #[error("重复绑定: {key} (模块 {module})")]
    DuplicateBinding { key: String, module: String },

    #[error("别名类型不匹配: {key} -> {target}")]
    AliasTypeMismatch { key: String, target: String },

    #[error("别名目标不存在: {key} -> {target}")]
    UnresolvedLink { key: String, target: String },

    #[error("别名形成环: {chain}")]
    CircularLink { chain: String },

    #[error("存在多个标记为可注入的构造器: {type_name}")]
    MultipleInjectConstructors { type_name: String },

    #[error("没有可用的构造器: {type_name}")]
    NoUsableConstructor { type_name: String },

    #[error("构造器不存在: {type_name}::{constructor}")]
    ConstructorNotFound {
        type_name: String,
        constructor: String,
    },

    #[error("依赖无法满足: {declaring_type}::{member} 需要 {key}")]
    UnsatisfiedDependency {
        declaring_type: String,
        member: String,
        key: String,
    },

    #[error("静态注入失败: {type_name}, 原因: {source}")]
    StaticInjectionFailed {
        type_name: String,
        #[source]
        source: DependencyError,
    },

    #[error("急切单例创建失败: {key}, 原因: {source}")]
    EagerSingletonFailed {
        key: String,
        #[source]
        source: DependencyError,
    },

    #[error("工厂终结器执行失败: {source}")]
    FinalizerFailed {
        #[source]
        source: DynError,
    },
}

/// 生命周期管理错误类型
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// 在当前状态下不允许该操作
    #[error("生命周期状态违规: 状态 {state} 下不允许 {operation}")]
    IllegalState { operation: String, state: String },

    #[error("组件不具备生命周期能力: {type_name}")]
    NotLifecycleCapable { type_name: String },

    #[error("监听器启动失败: {listener}, 原因: {source}")]
    ListenerStartFailed {
        listener: String,
        #[source]
        source: DynError,
    },

    #[error("监听器停止失败: {listener}, 原因: {source}")]
    ListenerStopFailed {
        listener: String,
        #[source]
        source: DynError,
    },
}

/// 基础设施错误类型
#[derive(Error, Debug)]
pub enum InfrastructureError {
    #[error("配置错误: {source}")]
    ConfigError {
        #[from]
        source: ConfigError,
    },

    #[error("依赖注入错误: {source}")]
    DependencyError {
        #[from]
        source: DependencyError,
    },

    #[error("容器配置错误: {source}")]
    ConfigurationError {
        #[from]
        source: ConfigurationError,
    },

    #[error("生命周期错误: {source}")]
    LifecycleError {
        #[from]
        source: LifecycleError,
    },

    #[error("基础设施启动失败: {message}")]
    BootstrapFailed { message: String },
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type DependencyResult<T> = Result<T, DependencyError>;
pub type ConfigurationResult<T> = Result<T, ConfigurationError>;
pub type LifecycleResult<T> = Result<T, LifecycleError>;
pub type InfrastructureResult<T> = Result<T, InfrastructureError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_injection_failed_names_member_and_parameter() {
        let error = DependencyError::InjectionFailed {
            declaring_type: "OrderService".to_string(),
            member: "new".to_string(),
            parameter: Some(1),
            source: Box::new(DependencyError::ComponentNotRegistered {
                key: "Repository".to_string(),
            }),
        };

        let message = error.to_string();
        assert!(message.contains("OrderService::new"));
        assert!(message.contains("参数 #1"));
        assert!(error.is_not_registered());
        assert!(error.source().is_some());
    }

    #[test]
    fn test_creation_failure_preserves_cause() {
        let cause = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let error = DependencyError::ComponentCreationFailed {
            type_name: "Cache".to_string(),
            source: Box::new(cause),
        };

        let source = error.source().expect("应当保留原因");
        assert_eq!(source.to_string(), "disk full");
    }

    #[test]
    fn test_root_cause_unwraps_nested_injection_failures() {
        let inner = DependencyError::CircularDependency {
            dependency_chain: "A -> B -> A".to_string(),
        };
        let wrapped = DependencyError::InjectionFailed {
            declaring_type: "A".to_string(),
            member: "b".to_string(),
            parameter: None,
            source: Box::new(DependencyError::InjectionFailed {
                declaring_type: "B".to_string(),
                member: "a".to_string(),
                parameter: None,
                source: Box::new(inner),
            }),
        };

        assert!(matches!(
            wrapped.root_cause(),
            DependencyError::CircularDependency { .. }
        ));
        assert!(!wrapped.to_string().contains("参数"));
    }
}

//! # DI Common
//!
//! 依赖注入容器各层共享的基础类型。
//!
//! ## 核心组件
//!
//! - [`TypeInfo`] - 运行时类型标识
//! - [`DependencyError`] / [`ConfigurationError`] / [`LifecycleError`] - 错误分类
//! - [`LifecycleListener`] - 生命周期能力
//! - [`PropertySource`] - 层级属性源

pub mod configuration;
pub mod errors;
pub mod lifecycle;
pub mod metadata;

pub use configuration::*;
pub use errors::*;
pub use lifecycle::*;
pub use metadata::*;

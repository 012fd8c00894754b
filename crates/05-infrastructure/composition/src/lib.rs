//! # DI Composition
//!
//! 应用组装层，把组件工厂、日志、设置与属性源组合成一个可运行的应用。
//!
//! ## 主要功能
//!
//! - **应用构建器**: 模块、属性来源、即时绑定器与日志配置的组装
//! - **应用设置**: 从 TOML 读取容器配置、日志配置与属性来源
//! - **属性源**: JSON、TOML 与带前缀的环境变量，按登记顺序合并
//! - **生命周期**: 构建完成后自动启动，关闭时按相反顺序停止
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use di_composition::{Application, LoggingConfig};
//! use di_impl::Binder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let application = Application::builder()
//!         .with_name("orders")
//!         .with_logging(LoggingConfig::development())
//!         .with_env_properties("ORDERS")
//!         .with_module(|binder: &mut Binder<'_>| {
//!             binder.bind_named::<String>("region").to_instance(std::sync::Arc::new("eu".to_string()));
//!         })
//!         .build()?;
//!
//!     application.run_until_shutdown_signal().await?;
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod logging;
pub mod properties;
pub mod settings;

pub use application::*;
pub use logging::*;
pub use properties::PropertySourceSpec;
pub use settings::*;

pub use di_common::InfrastructureError;

#[cfg(test)]
mod tests;

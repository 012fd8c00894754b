//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层，定义绑定键、注入元数据与扩展点。
//!
//! ## 核心接口
//!
//! - [`Key`] / [`Qualifier`] - 绑定键
//! - [`Injectable`] / [`TypeDescriptor`] - 编译期注入元数据
//! - [`TypeMetadata`] / [`MetadataProvider`] - 类型擦除的元数据与提供策略
//! - [`Resolver`] / [`Provider`] - 依赖解析与延迟获取
//! - [`OnTheFlyBinder`] - 即时绑定扩展点
//! - [`StaticInjectable`] - 静态注入

pub mod catalog;
pub mod container;
pub mod injection;
pub mod instance;
pub mod key;
pub mod metadata;
pub mod on_the_fly;
pub mod resolver;
pub mod scope;
pub mod static_injection;

pub use catalog::CatalogMetadataProvider;
pub use container::*;
pub use injection::*;
pub use instance::*;
pub use key::*;
pub use metadata::*;
pub use on_the_fly::*;
pub use resolver::*;
pub use scope::*;
pub use static_injection::*;

pub use di_common::{DependencyError, DynError, LifecycleListener, TypeInfo};

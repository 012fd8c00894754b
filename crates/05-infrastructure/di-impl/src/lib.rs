//! # 依赖注入具体实现
//!
//! 提供绑定 DSL、组件工厂、生命周期控制器与即时绑定器的参考实现。
//!
//! ## 使用方式
//!
//! 1. 实现 [`Module`]（或直接使用闭包）声明绑定；
//! 2. 通过 [`ComponentFactoryBuilder`] 添加模块并构建 [`ComponentFactory`]；
//! 3. 使用 `get` / `require` 系列方法解析组件；
//! 4. 通过 [`LifecycleController`] 启动与关闭具备生命周期能力的单例。

pub mod binder;
pub mod binding;
pub mod builder;
pub mod factory;
pub mod lifecycle;
pub mod on_the_fly;
pub mod registry;

pub use binder::{Binder, LinkedBindingBuilder, Module, ScopedBindingBuilder};
pub use binding::Binding;
pub use builder::ComponentFactoryBuilder;
pub use factory::ComponentFactory;
pub use lifecycle::LifecycleController;
pub use on_the_fly::*;
pub use registry::TypeRegistry;

pub use di_abstractions::{ContainerConfig, ContainerStats, Key, Scope};

//! # DI Macros
//!
//! 为结构体生成编译期注入元数据的派生宏。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use di_abstractions::Provider;
//! use di_macros::Injectable;
//! use std::sync::Arc;
//!
//! #[derive(Injectable)]
//! #[injectable(provides = "dyn OrderService", post_construct = "open", pre_destroy = "close")]
//! pub struct OrderServiceImpl {
//!     #[inject]
//!     repository: Arc<dyn OrderRepository>,
//!     #[inject(named = "orders.region")]
//!     region: Arc<String>,
//!     #[inject]
//!     audit: Option<Arc<dyn AuditLog>>,
//!     #[inject]
//!     requests: Provider<RequestContext>,
//!     processed: AtomicU64,
//! }
//! ```
//!
//! 生成的代码使用 `ctor` 在程序启动时把类型登记到全局类型目录，
//! 使用该宏的 crate 需要依赖 `ctor` 与 `di-abstractions`。

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod attributes;
mod injectable;

/// 可注入类型派生宏
///
/// # 字段属性
///
/// - `#[inject]` - 注入无限定符的依赖
/// - `#[inject(named = "name")]` - 注入命名依赖
/// - `#[inject(marker = "Type")]` - 注入以标记类型限定的依赖
///
/// 注入字段的类型决定注入形式：`Arc<T>` 为必需实例，`Option<Arc<T>>` 为可选实例，
/// `Provider<T>` 为延迟获取。未标记的字段使用 `Default::default()`。
///
/// # 结构体属性
///
/// - `post_construct = "method"` / `pre_destroy = "method"` - 生命周期钩子，签名为 `fn(&self) -> Result<(), E>`
/// - `listener` - 类型自身实现了 `LifecycleListener`
/// - `provides = "dyn Trait"` - 生成到 trait 对象的转换，可出现多次
/// - `no_register` - 不登记到全局类型目录
#[proc_macro_derive(Injectable, attributes(inject, injectable))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    injectable::expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

//! 类型注册表
//!
//! 工厂使用的元数据提供策略：先查显式登记与已缓存的元数据，
//! 再查后备策略（默认是编译期类型目录），查到的结果按类型缓存。

use dashmap::DashMap;
use di_abstractions::{CatalogMetadataProvider, Injectable, MetadataProvider, TypeMetadata};
use di_common::TypeInfo;
use std::any::TypeId;
use std::sync::Arc;
use tracing::debug;

/// 类型注册表
pub struct TypeRegistry {
    entries: DashMap<TypeId, Arc<dyn TypeMetadata>>,
    fallback: Option<Arc<dyn MetadataProvider>>,
}

impl TypeRegistry {
    /// 以编译期类型目录为后备的注册表
    pub fn new() -> Self {
        Self::with_fallback(Arc::new(CatalogMetadataProvider))
    }

    /// 使用指定的后备策略
    pub fn with_fallback(fallback: Arc<dyn MetadataProvider>) -> Self {
        Self {
            entries: DashMap::new(),
            fallback: Some(fallback),
        }
    }

    /// 只使用显式登记的注册表
    pub fn isolated() -> Self {
        Self {
            entries: DashMap::new(),
            fallback: None,
        }
    }

    /// 登记可注入类型，返回其元数据
    ///
    /// 重复登记返回已缓存的元数据。
    pub fn register<T: Injectable>(&self) -> Arc<dyn TypeMetadata> {
        self.entries
            .entry(TypeId::of::<T>())
            .or_insert_with(|| {
                debug!("登记可注入类型: {}", std::any::type_name::<T>());
                Arc::new(T::descriptor())
            })
            .value()
            .clone()
    }

    /// 登记类型擦除的元数据
    pub fn register_metadata(&self, metadata: Arc<dyn TypeMetadata>) {
        self.entries.insert(metadata.type_info().id(), metadata);
    }

    /// 已缓存的类型数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否没有缓存任何类型
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataProvider for TypeRegistry {
    fn metadata(&self, type_info: &TypeInfo) -> Option<Arc<dyn TypeMetadata>> {
        if let Some(entry) = self.entries.get(&type_info.id()) {
            return Some(entry.value().clone());
        }
        let loaded = self.fallback.as_ref()?.metadata(type_info)?;
        Some(self.entries.entry(type_info.id()).or_insert(loaded).value().clone())
    }

    fn knows(&self, type_info: &TypeInfo) -> bool {
        self.entries.contains_key(&type_info.id())
            || self
                .fallback
                .as_ref()
                .is_some_and(|fallback| fallback.knows(type_info))
    }
}

//! 编译期类型目录
//!
//! `#[derive(Injectable)]` 生成的代码在程序启动时把类型登记到全局目录，
//! [`CatalogMetadataProvider`] 从目录中查找注入元数据。

use crate::injection::Injectable;
use crate::metadata::{MetadataProvider, TypeMetadata};
use di_common::TypeInfo;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

type MetadataLoader = fn() -> Arc<dyn TypeMetadata>;

/// 全局类型目录
static GLOBAL_TYPE_CATALOG: Lazy<RwLock<HashMap<TypeId, (TypeInfo, MetadataLoader)>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

fn load<T: Injectable>() -> Arc<dyn TypeMetadata> {
    Arc::new(T::descriptor())
}

/// 登记可注入类型
pub fn register<T: Injectable>() {
    let type_info = TypeInfo::of::<T>();
    GLOBAL_TYPE_CATALOG
        .write()
        .insert(type_info.id(), (type_info, load::<T> as MetadataLoader));
}

/// 从目录加载类型的注入元数据
pub fn lookup(type_info: &TypeInfo) -> Option<Arc<dyn TypeMetadata>> {
    let loader = GLOBAL_TYPE_CATALOG.read().get(&type_info.id()).map(|(_, loader)| *loader)?;
    Some(loader())
}

/// 是否已登记
pub fn contains(type_info: &TypeInfo) -> bool {
    GLOBAL_TYPE_CATALOG.read().contains_key(&type_info.id())
}

/// 所有已登记的类型
pub fn registered_types() -> Vec<TypeInfo> {
    GLOBAL_TYPE_CATALOG.read().values().map(|(info, _)| *info).collect()
}

/// 基于全局目录的元数据提供策略
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogMetadataProvider;

impl MetadataProvider for CatalogMetadataProvider {
    fn metadata(&self, type_info: &TypeInfo) -> Option<Arc<dyn TypeMetadata>> {
        lookup(type_info)
    }

    fn knows(&self, type_info: &TypeInfo) -> bool {
        contains(type_info)
    }
}

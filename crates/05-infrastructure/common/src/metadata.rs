//! 元数据定义
//!
//! 提供类型的运行时标识信息

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// 类型信息
///
/// 相等性与哈希只取决于 [`TypeId`]，名称仅用于诊断输出。
/// 支持非 `Sized` 类型（如 `dyn Trait`），泛型的不同实例化是不同的类型。
#[derive(Clone, Copy)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
}

impl TypeInfo {
    /// 从类型获取类型信息
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// 类型ID
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// 完整类型名称（含模块路径）
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 去掉模块路径后的简短名称
    ///
    /// 泛型参数中的路径也会被去掉，例如 `alloc::vec::Vec<alloc::string::String>`
    /// 变为 `Vec<String>`。
    pub fn short_name(&self) -> String {
        let mut short = String::with_capacity(self.name.len());
        let mut segment = String::new();
        for ch in self.name.chars() {
            match ch {
                '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&' | ';' => {
                    short.push_str(last_path_segment(&segment));
                    segment.clear();
                    short.push(ch);
                }
                _ => segment.push(ch),
            }
        }
        short.push_str(last_path_segment(&segment));
        short
    }

    /// 是否为指定类型
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

fn last_path_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name())
    }
}

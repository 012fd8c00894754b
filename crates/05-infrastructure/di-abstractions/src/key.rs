//! 绑定键
//!
//! 键由类型与可选限定符组成，是绑定表的索引。

use di_common::TypeInfo;
use std::fmt;

/// 限定符
///
/// 区分同一类型的多个绑定。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Qualifier {
    /// 无限定符
    None,
    /// 命名限定符
    Named(String),
    /// 标记类型限定符
    Marker(TypeInfo),
}

impl Qualifier {
    /// 是否为空限定符
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// 命名限定符的名称
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            _ => None,
        }
    }
}

impl Default for Qualifier {
    fn default() -> Self {
        Self::None
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Named(name) => write!(f, "@Named(\"{name}\")"),
            Self::Marker(marker) => write!(f, "@{marker}"),
        }
    }
}

/// 限定注解
///
/// 任何可以产生限定符的值。由注解实例构造的键与由名称或标记类型构造的键相等。
pub trait QualifierAnnotation {
    /// 对应的限定符
    fn qualifier(&self) -> Qualifier;
}

/// 命名注解值
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Named(pub String);

impl Named {
    /// 创建命名注解
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl QualifierAnnotation for Named {
    fn qualifier(&self) -> Qualifier {
        Qualifier::Named(self.0.clone())
    }
}

impl QualifierAnnotation for Qualifier {
    fn qualifier(&self) -> Qualifier {
        self.clone()
    }
}

/// 绑定键
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    type_info: TypeInfo,
    qualifier: Qualifier,
}

impl Key {
    /// 无限定符的键
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_info: TypeInfo::of::<T>(),
            qualifier: Qualifier::None,
        }
    }

    /// 命名键
    pub fn named<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self::of::<T>().with_qualifier(Qualifier::Named(name.into()))
    }

    /// 以标记类型限定的键
    pub fn marked<T: ?Sized + 'static, M: ?Sized + 'static>() -> Self {
        Self::of::<T>().with_qualifier(Qualifier::Marker(TypeInfo::of::<M>()))
    }

    /// 以注解实例限定的键
    pub fn annotated<T: ?Sized + 'static>(annotation: &dyn QualifierAnnotation) -> Self {
        Self::of::<T>().with_qualifier(annotation.qualifier())
    }

    /// 从类型信息与限定符创建
    pub fn from_parts(type_info: TypeInfo, qualifier: Qualifier) -> Self {
        Self {
            type_info,
            qualifier,
        }
    }

    /// 替换限定符
    pub fn with_qualifier(mut self, qualifier: Qualifier) -> Self {
        self.qualifier = qualifier;
        self
    }

    /// 键的类型
    pub fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    /// 键的限定符
    pub fn qualifier(&self) -> &Qualifier {
        &self.qualifier
    }

    /// 是否以指定类型为类型
    pub fn is_type<T: ?Sized + 'static>(&self) -> bool {
        self.type_info.is::<T>()
    }

    /// 去掉限定符后的键
    pub fn unqualified(&self) -> Self {
        Self::from_parts(self.type_info, Qualifier::None)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.type_info, self.qualifier)
    }
}

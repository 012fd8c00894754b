//! 类型擦除的组件实例

use di_common::{DependencyError, LifecycleListener, TypeInfo};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 可作为绑定键类型的约束
///
/// 包括具体类型与 `dyn Trait`（trait 需以 `Send + Sync` 为超 trait）。
pub trait Bindable: Send + Sync + 'static {}

impl<T: ?Sized + Send + Sync + 'static> Bindable for T {}

/// 将具体实现转换为键类型
///
/// 每个类型都可以转换为自身；实现到 trait 对象的转换使用 [`upcast!`](crate::upcast)
/// 或 `#[injectable(provides = "dyn Trait")]` 生成。
pub trait Upcast<T: ?Sized>: Send + Sync + 'static {
    /// 执行转换
    fn upcast(self: Arc<Self>) -> Arc<T>;
}

impl<T: Send + Sync + 'static> Upcast<T> for T {
    fn upcast(self: Arc<Self>) -> Arc<T> {
        self
    }
}

/// 为具体类型实现到 trait 对象的 [`Upcast`]
///
/// ```ignore
/// di_abstractions::upcast!(MemoryCache => dyn Cache, dyn Flushable);
/// ```
#[macro_export]
macro_rules! upcast {
    ($concrete:ty => $($target:ty),+ $(,)?) => {
        $(
            impl $crate::Upcast<$target> for $concrete {
                fn upcast(self: ::std::sync::Arc<Self>) -> ::std::sync::Arc<$target> {
                    self
                }
            }
        )+
    };
}

/// 组件实例
///
/// 内部保存键类型 `T` 的 `Arc<T>`。构造时准备好的生命周期适配器随实例一起传递，
/// 转换为其他键类型时保留。
#[derive(Clone)]
pub struct Instance {
    type_info: TypeInfo,
    value: Arc<dyn Any + Send + Sync>,
    listener: Option<Arc<dyn LifecycleListener>>,
}

impl Instance {
    /// 包装共享值
    pub fn new<T: ?Sized + Bindable>(value: Arc<T>) -> Self {
        Self {
            type_info: TypeInfo::of::<T>(),
            value: Arc::new(value),
            listener: None,
        }
    }

    /// 附带生命周期适配器
    pub fn with_listener(mut self, listener: Arc<dyn LifecycleListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// 实例的键类型
    pub fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    /// 生命周期适配器
    pub fn listener(&self) -> Option<&Arc<dyn LifecycleListener>> {
        self.listener.as_ref()
    }

    /// 取出指定类型的共享值
    pub fn downcast<T: ?Sized + Bindable>(&self) -> Result<Arc<T>, DependencyError> {
        self.value
            .downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or_else(|| DependencyError::TypeMismatch {
                expected: std::any::type_name::<T>().to_string(),
                actual: self.type_info.name().to_string(),
            })
    }

    /// 从实现类型 `I` 转换为键类型 `T`
    pub fn upcast<I, T>(self) -> Result<Self, DependencyError>
    where
        I: Bindable + Upcast<T>,
        T: ?Sized + Bindable,
    {
        let concrete = self.downcast::<I>()?;
        Ok(Self {
            type_info: TypeInfo::of::<T>(),
            value: Arc::new(concrete.upcast()),
            listener: self.listener,
        })
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.type_info)
            .field("lifecycle", &self.listener.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Shape: Send + Sync {
        fn area(&self) -> u32;
    }

    struct Square(u32);

    impl Shape for Square {
        fn area(&self) -> u32 {
            self.0 * self.0
        }
    }

    crate::upcast!(Square => dyn Shape);

    #[test]
    fn test_downcast_returns_same_allocation() {
        let value = Arc::new(String::from("hello"));
        let instance = Instance::new(value.clone());

        let restored = instance.downcast::<String>().unwrap();
        assert!(Arc::ptr_eq(&value, &restored));
        assert!(instance.downcast::<u32>().is_err());
    }

    #[test]
    fn test_upcast_to_trait_object() {
        let square = Arc::new(Square(3));
        let instance = Instance::new(square).upcast::<Square, dyn Shape>().unwrap();

        assert!(instance.type_info().is::<dyn Shape>());
        assert_eq!(instance.downcast::<dyn Shape>().unwrap().area(), 9);
        assert!(instance.downcast::<Square>().is_err());
    }
}

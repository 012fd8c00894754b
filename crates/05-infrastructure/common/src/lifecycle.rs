//! 组件生命周期定义

use crate::errors::DynError;
use std::fmt;

/// 生命周期控制器状态
///
/// 状态只能单向迁移：`Waiting -> Started -> Terminated`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// 等待启动，注册的监听器排队
    Waiting,
    /// 已启动，新注册的监听器立即启动
    Started,
    /// 已终止，不再接受注册
    Terminated,
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::Waiting
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Waiting => "WAITING",
            Self::Started => "STARTED",
            Self::Terminated => "TERMINATED",
        };
        f.write_str(name)
    }
}

/// 生命周期监听器
///
/// 由生命周期控制器在启动时按注册顺序调用 [`on_start`](Self::on_start)，
/// 在关闭时按相反顺序调用 [`on_stop`](Self::on_stop)。
pub trait LifecycleListener: Send + Sync {
    /// 启动回调
    fn on_start(&self) -> Result<(), DynError>;

    /// 停止回调
    fn on_stop(&self) -> Result<(), DynError>;

    /// 监听器名称，用于日志与错误信息
    fn name(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

//! 容器配置与统计

use serde::{Deserialize, Serialize};

/// 容器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// 是否启用循环依赖检测
    pub enable_circular_dependency_detection: bool,
    /// 最大解析深度
    pub max_resolution_depth: usize,
    /// 构建时是否校验所有依赖都可满足
    pub validate_dependencies_on_build: bool,
    /// 单例是否自动登记到生命周期控制器
    pub register_lifecycle_components: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            enable_circular_dependency_detection: true,
            max_resolution_depth: 100,
            validate_dependencies_on_build: true,
            register_lifecycle_components: true,
        }
    }
}

impl ContainerConfig {
    /// 宽松配置：不在构建时校验依赖，缺失的依赖在首次注入时报错
    pub fn lenient() -> Self {
        Self {
            validate_dependencies_on_build: false,
            ..Self::default()
        }
    }

    /// 设置最大解析深度
    pub fn with_max_resolution_depth(mut self, depth: usize) -> Self {
        self.max_resolution_depth = depth;
        self
    }
}

/// 容器统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerStats {
    /// 显式注册的绑定数量（含构建时合成的自绑定）
    pub registered_bindings: usize,
    /// 运行期即时创建的自绑定数量
    pub just_in_time_bindings: usize,
    /// 已创建的单例数量
    pub active_singletons: usize,
    /// 解析错误数量
    pub resolution_errors: u64,
}

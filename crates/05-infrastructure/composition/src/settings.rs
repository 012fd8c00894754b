//! 应用设置
//!
//! 从 TOML 读取的应用级设置：容器配置、日志配置与属性来源。
//!
//! ```toml
//! name = "orders"
//! auto_start = true
//!
//! [container]
//! max_resolution_depth = 64
//!
//! [logging]
//! level = "info,di_impl=debug"
//!
//! [properties]
//! files = ["config/app.toml", "config/local.json"]
//! env_prefix = "ORDERS"
//! ```

use crate::logging::LoggingConfig;
use crate::properties::PropertySourceSpec;
use di_abstractions::ContainerConfig;
use di_common::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 应用设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    /// 应用名称
    pub name: String,
    /// 工厂构建完成后是否启动生命周期控制器
    pub auto_start: bool,
    /// 容器配置
    pub container: ContainerConfig,
    /// 日志配置，缺省时不安装日志订阅者
    pub logging: Option<LoggingConfig>,
    /// 属性来源
    pub properties: PropertySettings,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            name: "application".to_string(),
            auto_start: true,
            container: ContainerConfig::default(),
            logging: None,
            properties: PropertySettings::default(),
        }
    }
}

/// 属性来源设置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertySettings {
    /// 属性文件，按扩展名区分 JSON 与 TOML；相对路径相对于设置文件所在目录
    pub files: Vec<PathBuf>,
    /// 环境变量前缀
    pub env_prefix: Option<String>,
}

impl ApplicationSettings {
    /// 从 TOML 文本解析
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError {
            location: "<inline>".to_string(),
            source: Box::new(e),
        })
    }

    /// 从 TOML 文件加载
    pub fn from_toml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let mut settings: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            location: path.display().to_string(),
            source: Box::new(e),
        })?;
        if let Some(base) = path.parent() {
            settings.properties.files = settings
                .properties
                .files
                .into_iter()
                .map(|file| if file.is_relative() { base.join(file) } else { file })
                .collect();
        }
        Ok(settings)
    }

    /// 属性来源，文件在前，环境变量在后
    pub fn property_sources(&self) -> ConfigResult<Vec<PropertySourceSpec>> {
        let mut specs = self
            .properties
            .files
            .iter()
            .map(|file| file_spec(file))
            .collect::<ConfigResult<Vec<_>>>()?;
        if let Some(prefix) = &self.properties.env_prefix {
            specs.push(PropertySourceSpec::environment(prefix.clone()));
        }
        Ok(specs)
    }
}

/// 按扩展名确定文件来源
pub fn file_spec(path: &Path) -> ConfigResult<PropertySourceSpec> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(PropertySourceSpec::Json(path.to_path_buf())),
        Some("toml") => Ok(PropertySourceSpec::Toml(path.to_path_buf())),
        _ => Err(ConfigError::TypeConversionError {
            message: format!("不支持的属性文件格式: {}", path.display()),
        }),
    }
}

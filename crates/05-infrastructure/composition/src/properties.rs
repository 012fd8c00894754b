//! 属性源加载
//!
//! 支持 JSON 文件、TOML 文件与带前缀的环境变量，按登记顺序合并，
//! 后登记的来源覆盖先登记的。

use di_common::{ConfigError, ConfigResult, PropertySource};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 属性来源
#[derive(Debug, Clone, PartialEq)]
pub enum PropertySourceSpec {
    /// JSON 文件
    Json(PathBuf),
    /// TOML 文件
    Toml(PathBuf),
    /// 环境变量，`PREFIX` 加分隔符后的部分转为小写点分路径
    Environment { prefix: String, separator: String },
    /// 已加载的属性
    Inline(PropertySource),
}

impl PropertySourceSpec {
    /// 使用默认分隔符 `__` 的环境变量来源
    pub fn environment(prefix: impl Into<String>) -> Self {
        Self::Environment {
            prefix: prefix.into(),
            separator: "__".to_string(),
        }
    }

    /// 加载属性
    pub fn load(&self) -> ConfigResult<PropertySource> {
        match self {
            Self::Json(path) => load_json_file(path),
            Self::Toml(path) => load_toml_file(path),
            Self::Environment { prefix, separator } => {
                Ok(from_variables(std::env::vars(), prefix, separator))
            }
            Self::Inline(source) => Ok(source.clone()),
        }
    }
}

/// 从 JSON 文件加载属性
pub fn load_json_file(path: &Path) -> ConfigResult<PropertySource> {
    let content = read(path)?;
    let value: Value = serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
        location: path.display().to_string(),
        source: Box::new(e),
    })?;
    PropertySource::from_value(value)
}

/// 从 TOML 文件加载属性
pub fn load_toml_file(path: &Path) -> ConfigResult<PropertySource> {
    let content = read(path)?;
    parse_toml(&content, &path.display().to_string())
}

/// 解析 TOML 文本为属性源
pub fn parse_toml(content: &str, location: &str) -> ConfigResult<PropertySource> {
    let table: toml::Table = toml::from_str(content).map_err(|e| ConfigError::ParseError {
        location: location.to_string(),
        source: Box::new(e),
    })?;
    PropertySource::from_value(toml_to_json(toml::Value::Table(table)))
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => {
            Value::Object(table.into_iter().map(|(k, v)| (k, toml_to_json(v))).collect())
        }
    }
}

/// 从环境变量构建属性源
///
/// `APP__DATABASE__HOST=db` 在前缀 `APP`、分隔符 `__` 下成为 `database.host = "db"`。
/// 值保持字符串，注入时按目标类型解析。
pub fn from_variables<I>(variables: I, prefix: &str, separator: &str) -> PropertySource
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut source = PropertySource::new();
    let head = format!("{prefix}{separator}");
    for (key, value) in variables {
        let Some(rest) = key.strip_prefix(&head) else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }
        let path = rest.split(separator).collect::<Vec<_>>().join(".").to_lowercase();
        source.insert(&path, Value::String(value));
    }
    debug!("环境变量属性: 前缀 {}, {} 项", prefix, source.keys().len());
    source
}

fn read(path: &Path) -> ConfigResult<String> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    Ok(std::fs::read_to_string(path)?)
}

/// 按顺序加载并合并所有来源
pub fn load_all(specs: &[PropertySourceSpec]) -> ConfigResult<PropertySource> {
    let mut merged = PropertySource::new();
    for spec in specs {
        merged.merge(spec.load()?);
    }
    if !specs.is_empty() {
        info!("属性源加载完成: {} 个来源, {} 个属性", specs.len(), merged.keys().len());
    }
    Ok(merged)
}

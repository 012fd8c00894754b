//! 属性源
//!
//! 以 JSON 树保存的层级属性，按点分路径（`database.pool.size`）访问。

use crate::errors::ConfigError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 属性源
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertySource {
    root: Map<String, Value>,
}

impl PropertySource {
    /// 创建空属性源
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 JSON 值创建，顶层必须是对象
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(ConfigError::TypeConversionError {
                message: format!("属性源顶层必须是对象，实际为: {other}"),
            }),
        }
    }

    /// 从 JSON 文本创建
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(content)?;
        Self::from_value(value)
    }

    /// 按点分路径获取属性
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        let mut current = self.root.get(first)?;
        for part in parts {
            current = match current {
                Value::Object(map) => map.get(part)?,
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// 是否包含指定路径
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// 按点分路径获取并反序列化属性
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<T, ConfigError> {
        let value = self.get(path).ok_or_else(|| ConfigError::KeyNotFound {
            key: path.to_string(),
        })?;
        serde_json::from_value(value.clone()).map_err(|e| ConfigError::TypeConversionError {
            message: format!("{path}: {e}"),
        })
    }

    /// 按点分路径设置属性，中间节点按需创建
    pub fn insert(&mut self, path: &str, value: Value) {
        let mut parts: Vec<&str> = path.split('.').collect();
        let Some(last) = parts.pop() else {
            return;
        };

        let mut current = &mut self.root;
        for part in parts {
            let entry = current
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            current = match entry {
                Value::Object(map) => map,
                _ => return,
            };
        }
        current.insert(last.to_string(), value);
    }

    /// 合并另一个属性源，`other` 中的值覆盖当前值，对象逐层合并
    pub fn merge(&mut self, other: PropertySource) {
        merge_maps(&mut self.root, other.root);
    }

    /// 所有叶子属性的点分路径
    pub fn keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        collect_keys(&self.root, "", &mut keys);
        keys
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

fn merge_maps(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, value) in source {
        let Value::Object(incoming) = value else {
            target.insert(key, value);
            continue;
        };
        if let Some(Value::Object(existing)) = target.get_mut(&key) {
            merge_maps(existing, incoming);
            continue;
        }
        target.insert(key, Value::Object(incoming));
    }
}

fn collect_keys(map: &Map<String, Value>, prefix: &str, keys: &mut Vec<String>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(nested) => collect_keys(nested, &path, keys),
            _ => keys.push(path),
        }
    }
}

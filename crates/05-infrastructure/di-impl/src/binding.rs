//! 绑定与绑定表
//!
//! 模块声明的绑定记录在构建时转换为 [`Binding`]。绑定表在构建完成后只读，
//! 唯一可变的状态是单例绑定内部的实例槽位。

use crate::binder::{BindingRecord, Supplier, Target, Upcaster};
use crate::registry::TypeRegistry;
use di_abstractions::{
    DependencyKind, Instance, Key, MetadataProvider, OnTheFlyBinder, Scope, TypeMetadata,
};
use di_common::ConfigurationError;
use once_cell::sync::OnceCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// 合成自绑定的来源名称
pub(crate) const SELF_BINDING_SOURCE: &str = "<self-binding>";

/// 绑定的构造策略
pub(crate) enum Strategy {
    /// 使用类型元数据的某个构造器
    Construct {
        metadata: Arc<dyn TypeMetadata>,
        constructor: usize,
        upcaster: Option<Upcaster>,
    },
    /// 解析另一个键
    Linked { target: Key, upcaster: Option<Upcaster> },
    /// 固定实例
    Instance(Instance),
    /// 提供函数
    Supplier(Supplier),
}

impl Strategy {
    fn describe(&self) -> String {
        match self {
            Self::Construct { metadata, .. } => format!("构造 {}", metadata.type_info()),
            Self::Linked { target, .. } => format!("链接到 {target}"),
            Self::Instance(instance) => format!("实例 {}", instance.type_info()),
            Self::Supplier(_) => "提供函数".to_string(),
        }
    }
}

/// 键与构造策略、作用域的组合
pub struct Binding {
    key: Key,
    scope: Scope,
    pub(crate) strategy: Strategy,
    pub(crate) slot: OnceCell<Instance>,
    source: String,
}

impl Binding {
    pub(crate) fn new(key: Key, scope: Scope, strategy: Strategy, source: String) -> Self {
        let slot = OnceCell::new();
        if let Strategy::Instance(instance) = &strategy {
            let _ = slot.set(instance.clone());
        }
        Self {
            key,
            scope,
            strategy,
            slot,
            source,
        }
    }

    /// 绑定的键
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// 作用域
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// 声明该绑定的模块名称
    pub fn source(&self) -> &str {
        &self.source
    }

    /// 是否为构建时合成的自绑定
    pub fn is_self_binding(&self) -> bool {
        self.source == SELF_BINDING_SOURCE
    }

    /// 单例是否已创建
    pub fn is_instantiated(&self) -> bool {
        self.scope.is_singleton() && self.slot.get().is_some()
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("key", &self.key)
            .field("scope", &self.scope)
            .field("strategy", &self.strategy.describe())
            .field("source", &self.source)
            .finish()
    }
}

/// 构建中的绑定表
#[derive(Default)]
pub(crate) struct BindingTable {
    bindings: HashMap<Key, Arc<Binding>>,
    order: Vec<Key>,
}

impl BindingTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 将模块声明的绑定加入绑定表
    pub(crate) fn add(
        &mut self,
        record: BindingRecord,
        registry: &TypeRegistry,
    ) -> Result<(), ConfigurationError> {
        let BindingRecord {
            key,
            target,
            scope,
            module,
        } = record;

        if let Some(existing) = self.bindings.get(&key) {
            return Err(ConfigurationError::DuplicateBinding {
                key: key.to_string(),
                module: format!("{} / {}", existing.source(), module),
            });
        }

        let strategy = match target {
            Target::Untargeted => {
                let metadata = registry.metadata(key.type_info()).ok_or_else(|| {
                    ConfigurationError::IncompleteBinding {
                        key: key.to_string(),
                        module: module.clone(),
                    }
                })?;
                let constructor = metadata.select_constructor(None)?;
                Strategy::Construct {
                    metadata,
                    constructor,
                    upcaster: None,
                }
            }
            Target::Linked { target, upcaster } => Strategy::Linked { target, upcaster },
            Target::Constructor {
                metadata,
                constructor,
                upcaster,
            } => {
                let constructor = metadata.select_constructor(Some(constructor))?;
                Strategy::Construct {
                    metadata,
                    constructor,
                    upcaster,
                }
            }
            Target::Instance(instance) => Strategy::Instance(instance),
            Target::Supplier(supplier) => Strategy::Supplier(supplier),
        };

        let scope = match (&strategy, scope) {
            (Strategy::Instance(_), _) => Scope::Singleton,
            (_, Some(scope)) => scope,
            (_, None) => Scope::NoScope,
        };

        debug!("注册绑定: {} -> {} [{}] (模块 {})", key, strategy.describe(), scope, module);
        self.insert(Binding::new(key, scope, strategy, module));
        Ok(())
    }

    fn insert(&mut self, binding: Binding) {
        self.order.push(binding.key().clone());
        self.bindings.insert(binding.key().clone(), Arc::new(binding));
    }

    /// 为链接目标与构造依赖合成自绑定
    ///
    /// 只为无限定符、元数据已知且尚未绑定的键合成，合成的绑定无作用域。
    /// 返回合成的数量。
    pub(crate) fn synthesize_self_bindings(
        &mut self,
        registry: &TypeRegistry,
    ) -> Result<usize, ConfigurationError> {
        let mut worklist: VecDeque<Key> = self
            .order
            .iter()
            .filter_map(|key| self.bindings.get(key))
            .flat_map(|binding| required_keys(binding))
            .collect();

        let mut synthesized = 0;
        while let Some(key) = worklist.pop_front() {
            if self.bindings.contains_key(&key) || !key.qualifier().is_none() {
                continue;
            }
            let Some(metadata) = registry.metadata(key.type_info()) else {
                continue;
            };
            let constructor = metadata.select_constructor(None)?;
            let binding = Binding::new(
                key.clone(),
                Scope::NoScope,
                Strategy::Construct {
                    metadata,
                    constructor,
                    upcaster: None,
                },
                SELF_BINDING_SOURCE.to_string(),
            );
            worklist.extend(required_keys(&binding));
            debug!("合成自绑定: {}", key);
            self.insert(binding);
            synthesized += 1;
        }
        Ok(synthesized)
    }

    /// 校验所有链接都指向存在的绑定且不成环
    pub(crate) fn validate_links(&self) -> Result<(), ConfigurationError> {
        for key in &self.order {
            let mut chain = vec![key.clone()];
            let mut seen: HashSet<&Key> = HashSet::from([key]);
            let mut current = key;

            while let Some(Strategy::Linked { target, .. }) =
                self.bindings.get(current).map(|binding| &binding.strategy)
            {
                if !self.bindings.contains_key(target) {
                    return Err(ConfigurationError::UnresolvedLink {
                        key: current.to_string(),
                        target: target.to_string(),
                    });
                }
                chain.push(target.clone());
                if !seen.insert(target) {
                    return Err(ConfigurationError::CircularLink {
                        chain: format_chain(&chain),
                    });
                }
                current = target;
            }
        }
        Ok(())
    }

    /// 校验所有构造绑定的必需依赖都可满足
    pub(crate) fn validate_dependencies(
        &self,
        registry: &TypeRegistry,
        on_the_fly: Option<&dyn OnTheFlyBinder>,
    ) -> Result<(), ConfigurationError> {
        for key in &self.order {
            let Some(binding) = self.bindings.get(key) else {
                continue;
            };
            let Strategy::Construct {
                metadata,
                constructor,
                ..
            } = &binding.strategy
            else {
                continue;
            };

            for (point, dependency) in metadata.dependencies(Some(*constructor)) {
                if dependency.kind() == DependencyKind::Optional {
                    continue;
                }
                let required = dependency.key();
                let satisfied = self.bindings.contains_key(required)
                    || (required.qualifier().is_none() && registry.knows(required.type_info()))
                    || on_the_fly.is_some_and(|binder| binder.is_instantiable(&point, &dependency));
                if !satisfied {
                    return Err(ConfigurationError::UnsatisfiedDependency {
                        declaring_type: point.declaring_type.name().to_string(),
                        member: match point.parameter {
                            Some(index) => format!("{}#{}", point.member, index),
                            None => point.member.to_string(),
                        },
                        key: required.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// 急切单例的键，按注册顺序
    pub(crate) fn eager_keys(&self) -> Vec<Key> {
        self.order
            .iter()
            .filter(|key| {
                self.bindings
                    .get(*key)
                    .is_some_and(|binding| binding.scope() == Scope::EagerSingleton)
            })
            .cloned()
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.bindings.len()
    }

    /// 完成构建，返回只读绑定表与注册顺序
    pub(crate) fn into_parts(self) -> (HashMap<Key, Arc<Binding>>, Vec<Key>) {
        (self.bindings, self.order)
    }
}

fn required_keys(binding: &Binding) -> Vec<Key> {
    match &binding.strategy {
        Strategy::Linked { target, .. } => vec![target.clone()],
        Strategy::Construct {
            metadata,
            constructor,
            ..
        } => metadata
            .dependencies(Some(*constructor))
            .into_iter()
            .map(|(_, dependency)| dependency.key().clone())
            .collect(),
        Strategy::Instance(_) | Strategy::Supplier(_) => Vec::new(),
    }
}

pub(crate) fn format_chain(chain: &[Key]) -> String {
    chain
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

//! 组件工厂与生命周期控制器的端到端测试，组件元数据由派生宏生成

use di_abstractions::{Key, LifecycleListener, Named, Scope};
use di_common::{ConfigurationError, DynError, LifecycleError, LifecycleState};
use di_impl::{Binder, ComponentFactory, ComponentFactoryBuilder, LifecycleController};
use di_macros::Injectable;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub trait Map: Send + Sync {
    fn kind(&self) -> &'static str;
}

#[derive(Injectable)]
#[injectable(provides = "dyn Map")]
pub struct HashMap;

impl Map for HashMap {
    fn kind(&self) -> &'static str {
        "hash"
    }
}

#[derive(Injectable)]
#[injectable(provides = "dyn Map")]
pub struct LinkedHashMap;

impl Map for LinkedHashMap {
    fn kind(&self) -> &'static str {
        "linked"
    }
}

#[derive(Injectable)]
pub struct Catalog {
    #[inject]
    map_a: Arc<dyn Map>,
    #[inject(named = "linked")]
    map_b: Arc<dyn Map>,
}

fn map_module(binder: &mut Binder<'_>) {
    binder.bind::<dyn Map>().to::<HashMap>().in_scope(Scope::Singleton);
    binder
        .bind::<dyn Map>()
        .annotated(&Named::new("linked"))
        .to::<LinkedHashMap>()
        .in_scope(Scope::NoScope);
}

#[test]
fn test_end_to_end_map_scenario() -> anyhow::Result<()> {
    let factory = ComponentFactoryBuilder::new().with_module(map_module).build()?;

    let first = factory.require::<Catalog>()?;
    let second = factory.require::<Catalog>()?;

    assert!(!Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first.map_a, &second.map_a));
    assert!(!Arc::ptr_eq(&first.map_b, &second.map_b));
    assert_eq!(first.map_a.kind(), "hash");
    assert_eq!(second.map_b.kind(), "linked");

    let linked_a = factory.require_named::<dyn Map>("linked")?;
    let linked_b = factory.require_instance::<dyn Map>(&Key::named::<dyn Map>("linked"))?;
    assert!(!Arc::ptr_eq(&linked_a, &linked_b));

    assert_eq!(factory.scope_of(&Key::of::<Catalog>()), Some(Scope::NoScope));
    assert_eq!(factory.stats().active_singletons, 1);
    Ok(())
}

/// 由提供函数创建，计数构造次数
pub struct Seed;

#[derive(Injectable)]
pub struct Expensive {
    #[inject]
    seed: Arc<Seed>,
}

fn counted_seed(calls: Arc<AtomicUsize>) -> impl Fn(&mut Binder<'_>) + Send + Sync {
    move |binder: &mut Binder<'_>| {
        let calls = calls.clone();
        binder.bind::<Seed>().to_supplier(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Seed))
        });
    }
}

fn concurrent_requires<T: ?Sized + Send + Sync + 'static>(
    factory: &Arc<ComponentFactory>,
    count: usize,
) -> Vec<tokio::task::JoinHandle<Arc<T>>> {
    (0..count)
        .map(|_| {
            let factory = factory.clone();
            tokio::task::spawn_blocking(move || match factory.require::<T>() {
                Ok(instance) => instance,
                Err(e) => panic!("解析失败: {e}"),
            })
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_no_scope_instances_are_independent() -> anyhow::Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let factory = Arc::new(
        ComponentFactoryBuilder::new()
            .with_module(counted_seed(calls.clone()))
            .with_module(|binder: &mut Binder<'_>| {
                binder.bind::<Expensive>();
            })
            .build()?,
    );

    let mut instances = Vec::new();
    for handle in concurrent_requires::<Expensive>(&factory, 16) {
        instances.push(handle.await?);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 16);
    for (i, a) in instances.iter().enumerate() {
        for b in &instances[i + 1..] {
            assert!(!Arc::ptr_eq(a, b));
        }
    }
    Ok(())
}

#[test]
fn test_eager_singleton_ready_when_build_returns() -> anyhow::Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let factory = ComponentFactoryBuilder::new()
        .with_module(counted_seed(calls.clone()))
        .with_module(|binder: &mut Binder<'_>| {
            binder.bind::<Expensive>().as_eager_singleton();
        })
        .build()?;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(factory.stats().active_singletons, 1);

    factory.require::<Expensive>()?;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}

pub trait Store: Send + Sync {}

#[derive(Injectable)]
pub struct FileStore;

#[test]
fn test_self_binding_fallback() -> anyhow::Result<()> {
    let abstract_binding = ComponentFactoryBuilder::new()
        .with_module(|binder: &mut Binder<'_>| {
            binder.bind::<dyn Store>();
        })
        .build();
    match abstract_binding {
        Err(ConfigurationError::IncompleteBinding { key, .. }) => assert_eq!(key, "dyn Store"),
        other => panic!("期望 IncompleteBinding, 实际 {:?}", other.map(|_| ())),
    }

    let factory = ComponentFactoryBuilder::new()
        .with_module(|binder: &mut Binder<'_>| {
            binder.bind::<FileStore>();
        })
        .build()?;
    assert_eq!(factory.scope_of(&Key::of::<FileStore>()), Some(Scope::NoScope));
    assert!(!Arc::ptr_eq(
        &factory.require::<FileStore>()?,
        &factory.require::<FileStore>()?
    ));
    Ok(())
}

#[test]
fn test_link_to_itself_keeps_scope() -> anyhow::Result<()> {
    let factory = ComponentFactoryBuilder::new()
        .with_module(|binder: &mut Binder<'_>| {
            binder.bind::<FileStore>().to::<FileStore>().in_scope(Scope::Singleton);
        })
        .build()?;

    assert_eq!(factory.scope_of(&Key::of::<FileStore>()), Some(Scope::Singleton));
    assert!(Arc::ptr_eq(
        &factory.require::<FileStore>()?,
        &factory.require::<FileStore>()?
    ));
    Ok(())
}

struct Recorder {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
    fail_stop: bool,
}

impl Recorder {
    fn new(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            name,
            log: log.clone(),
            fail_stop: false,
        })
    }

    fn failing(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            name,
            log: log.clone(),
            fail_stop: true,
        })
    }

    fn record(&self, event: &str) {
        if let Ok(mut log) = self.log.lock() {
            log.push(format!("{event} {}", self.name));
        }
    }
}

impl LifecycleListener for Recorder {
    fn on_start(&self) -> Result<(), DynError> {
        self.record("start");
        Ok(())
    }

    fn on_stop(&self) -> Result<(), DynError> {
        self.record("stop");
        if self.fail_stop {
            return Err(format!("{} 停止失败", self.name).into());
        }
        Ok(())
    }

    fn name(&self) -> String {
        self.name.to_string()
    }
}

fn entries(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    log.lock().map(|log| log.clone()).unwrap_or_default()
}

#[test]
fn test_lifecycle_ordering() -> anyhow::Result<()> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let controller = LifecycleController::new();
    for name in ["L1", "L2", "L3"] {
        controller.add_listener(Recorder::new(name, &log))?;
    }

    controller.start()?;
    controller.shutdown()?;

    assert_eq!(
        entries(&log),
        ["start L1", "start L2", "start L3", "stop L3", "stop L2", "stop L1"]
    );
    Ok(())
}

#[test]
fn test_lifecycle_illegal_transitions() -> anyhow::Result<()> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let controller = LifecycleController::new();

    assert!(matches!(controller.shutdown(), Err(LifecycleError::IllegalState { .. })));
    assert_eq!(controller.state(), LifecycleState::Waiting);

    controller.start()?;
    assert!(matches!(controller.start(), Err(LifecycleError::IllegalState { .. })));

    controller.shutdown()?;
    assert!(matches!(
        controller.add_listener(Recorder::new("late", &log)),
        Err(LifecycleError::IllegalState { .. })
    ));
    assert!(entries(&log).is_empty());
    Ok(())
}

#[test]
fn test_partial_shutdown_failure() -> anyhow::Result<()> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let controller = LifecycleController::new();
    controller.add_listener(Recorder::new("L1", &log))?;
    controller.add_listener(Recorder::failing("L2", &log))?;
    controller.add_listener(Recorder::new("L3", &log))?;
    controller.start()?;

    match controller.shutdown() {
        Err(LifecycleError::ListenerStopFailed { listener, source }) => {
            assert_eq!(listener, "L2");
            assert_eq!(source.to_string(), "L2 停止失败");
        }
        other => panic!("期望 ListenerStopFailed, 实际 {other:?}"),
    }
    assert_eq!(controller.state(), LifecycleState::Terminated);
    assert_eq!(entries(&log)[3..], ["stop L3", "stop L2", "stop L1"]);
    Ok(())
}

#[test]
fn test_factory_shares_external_controller() -> anyhow::Result<()> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let controller = Arc::new(LifecycleController::new());
    controller.add_listener(Recorder::new("external", &log))?;

    let factory = ComponentFactoryBuilder::new()
        .with_module(map_module)
        .with_lifecycle_controller(controller.clone())
        .build()?;

    assert!(Arc::ptr_eq(factory.lifecycle(), &controller));
    factory.lifecycle().start()?;
    assert_eq!(entries(&log), ["start external"]);
    Ok(())
}

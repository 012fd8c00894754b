//! `#[derive(Injectable)]` 集成测试

use di_abstractions::{catalog, Injectable, Key, LifecycleListener, Provider, Scope};
use di_common::{ConfigurationError, DynError, LifecycleState, PropertySource, TypeInfo};
use di_impl::{Binder, ComponentFactoryBuilder, ComponentLogger, LoggerBinder, PropertyBinder};
use di_macros::Injectable;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub trait Map: Send + Sync {
    fn kind(&self) -> &'static str;
}

pub trait Missing: Send + Sync {}

#[derive(Injectable)]
#[injectable(provides = "dyn Map")]
pub struct HashMapImpl;

impl Map for HashMapImpl {
    fn kind(&self) -> &'static str {
        "hash"
    }
}

#[derive(Injectable)]
#[injectable(provides = "dyn Map")]
pub struct LinkedHashMapImpl;

impl Map for LinkedHashMapImpl {
    fn kind(&self) -> &'static str {
        "linked"
    }
}

#[derive(Injectable)]
pub struct MapConsumer {
    #[inject]
    map: Arc<dyn Map>,
    #[inject(named = "linked")]
    linked: Arc<dyn Map>,
    #[inject]
    missing: Option<Arc<dyn Missing>>,
    lookups: AtomicUsize,
}

#[test]
fn test_derived_types_are_catalogued() {
    assert!(catalog::contains(&TypeInfo::of::<HashMapImpl>()));
    assert!(catalog::contains(&TypeInfo::of::<MapConsumer>()));
    assert!(!catalog::contains(&TypeInfo::of::<Unlisted>()));
}

#[test]
fn test_map_scenario_with_derived_metadata() -> anyhow::Result<()> {
    let factory = ComponentFactoryBuilder::new()
        .with_module(|binder: &mut Binder<'_>| {
            binder.bind::<dyn Map>().to::<HashMapImpl>().in_scope(Scope::Singleton);
            binder.bind::<dyn Map>().named("linked").to::<LinkedHashMapImpl>();
            binder.bind::<MapConsumer>();
        })
        .build()?;

    let first = factory.require::<MapConsumer>()?;
    let second = factory.require::<MapConsumer>()?;

    assert!(!Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first.map, &second.map));
    assert!(!Arc::ptr_eq(&first.linked, &second.linked));
    assert_eq!(first.map.kind(), "hash");
    assert_eq!(first.linked.kind(), "linked");
    assert!(first.missing.is_none());
    assert_eq!(first.lookups.load(Ordering::SeqCst), 0);
    Ok(())
}

#[derive(Injectable)]
#[injectable(post_construct = "open", pre_destroy = "close")]
pub struct Pool {
    #[inject]
    logger: Arc<ComponentLogger>,
    opened: AtomicBool,
    closed: AtomicBool,
}

impl Pool {
    fn open(&self) -> Result<(), DynError> {
        self.logger.info("连接池已打开");
        self.opened.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> Result<(), std::io::Error> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_lifecycle_hooks_follow_controller() -> anyhow::Result<()> {
    let factory = ComponentFactoryBuilder::new()
        .with_module(|binder: &mut Binder<'_>| {
            binder.bind::<Pool>().as_eager_singleton();
        })
        .with_on_the_fly_binder(Arc::new(LoggerBinder::new()))
        .build()?;

    let pool = factory.require::<Pool>()?;
    assert_eq!(pool.logger.component(), "Pool");
    assert!(!pool.opened.load(Ordering::SeqCst));

    factory.lifecycle().start()?;
    assert!(pool.opened.load(Ordering::SeqCst));

    factory.lifecycle().shutdown()?;
    assert!(pool.closed.load(Ordering::SeqCst));
    assert_eq!(factory.lifecycle().state(), LifecycleState::Terminated);
    Ok(())
}

#[derive(Injectable)]
#[injectable(listener)]
pub struct Heartbeat {
    beats: AtomicUsize,
}

impl LifecycleListener for Heartbeat {
    fn on_start(&self) -> Result<(), DynError> {
        self.beats.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_stop(&self) -> Result<(), DynError> {
        self.beats.fetch_add(10, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_listener_type_receives_callbacks() -> anyhow::Result<()> {
    let factory = ComponentFactoryBuilder::new()
        .with_module(|binder: &mut Binder<'_>| {
            binder.bind::<Heartbeat>().in_scope(Scope::Singleton);
        })
        .build()?;

    let heartbeat = factory.require::<Heartbeat>()?;
    factory.lifecycle().start()?;
    factory.lifecycle().shutdown()?;

    assert_eq!(heartbeat.beats.load(Ordering::SeqCst), 11);
    Ok(())
}

pub struct Primary;

#[derive(Injectable)]
pub struct Clock;

#[derive(Injectable)]
pub struct Scheduler {
    #[inject(marker = "Primary")]
    clock: Provider<Clock>,
}

#[test]
fn test_marker_qualified_provider() -> anyhow::Result<()> {
    let factory = ComponentFactoryBuilder::new()
        .with_module(|binder: &mut Binder<'_>| {
            binder
                .bind::<Clock>()
                .annotated_with::<Primary>()
                .to::<Clock>()
                .in_scope(Scope::Singleton);
        })
        .build()?;

    let scheduler = factory.require::<Scheduler>()?;
    assert_eq!(scheduler.clock.key(), &Key::marked::<Clock, Primary>());

    let first = scheduler.clock.get()?;
    let second = scheduler.clock.get()?;
    assert!(Arc::ptr_eq(&first, &second));
    Ok(())
}

#[derive(Injectable)]
pub struct Endpoint {
    #[inject(named = "server.host")]
    host: Arc<String>,
    #[inject(named = "server.port")]
    port: Arc<u16>,
}

#[test]
fn test_named_fields_read_properties() -> anyhow::Result<()> {
    let properties = PropertySource::from_value(json!({
        "server": {"host": "localhost", "port": 8080}
    }))?;
    let factory = ComponentFactoryBuilder::new()
        .with_on_the_fly_binder(Arc::new(PropertyBinder::new(properties)))
        .build()?;

    let endpoint = factory.require::<Endpoint>()?;
    assert_eq!(endpoint.host.as_str(), "localhost");
    assert_eq!(*endpoint.port, 8080);
    Ok(())
}

#[derive(Injectable)]
pub struct Broken {
    #[inject]
    _target: Arc<dyn Missing>,
}

#[test]
fn test_unsatisfied_field_fails_build() {
    let result = ComponentFactoryBuilder::new()
        .with_module(|binder: &mut Binder<'_>| {
            binder.bind::<Broken>();
        })
        .build();

    match result {
        Err(ConfigurationError::UnsatisfiedDependency { member, key, .. }) => {
            assert_eq!(member, "new#0");
            assert_eq!(key, "dyn Missing");
        }
        other => panic!("期望 UnsatisfiedDependency, 实际 {:?}", other.map(|_| ())),
    }
}

#[derive(Injectable)]
#[injectable(no_register)]
pub struct Unlisted;

#[test]
fn test_unregistered_type_needs_explicit_registration() -> anyhow::Result<()> {
    let missing = ComponentFactoryBuilder::new()
        .with_module(|binder: &mut Binder<'_>| {
            binder.bind::<Unlisted>();
        })
        .build();
    assert!(matches!(missing, Err(ConfigurationError::IncompleteBinding { .. })));

    let factory = ComponentFactoryBuilder::new()
        .register_type::<Unlisted>()
        .with_module(|binder: &mut Binder<'_>| {
            binder.bind::<Unlisted>();
        })
        .build()?;
    assert!(factory.has_key(&Key::of::<Unlisted>()));

    let descriptor = Unlisted::descriptor();
    assert_eq!(descriptor.constructors()[0].name(), "default");
    Ok(())
}

//! 应用组装集成测试

use super::super::*;
use di_abstractions::{Arguments, ConstructorPoint, Dependency, Injectable, TypeDescriptor};
use di_common::{InfrastructureError, LifecycleState, PropertySource};
use di_impl::{Binder, ComponentLogger, Scope};
use serde_json::json;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

static GREETER_STARTS: AtomicUsize = AtomicUsize::new(0);
static GREETER_STOPS: AtomicUsize = AtomicUsize::new(0);

struct Greeter {
    greeting: String,
    log: Arc<ComponentLogger>,
}

impl Injectable for Greeter {
    fn descriptor() -> TypeDescriptor<Self> {
        TypeDescriptor::new()
            .with_constructor(ConstructorPoint::injectable(
                "new",
                vec![
                    Dependency::named::<String>("greeting.text"),
                    Dependency::named::<u32>("greeting.repeat"),
                    Dependency::of::<ComponentLogger>(),
                ],
                |args: &mut Arguments| {
                    let text = args.instance::<String>(0)?;
                    let repeat = args.instance::<u32>(1)?;
                    Ok(Greeter {
                        greeting: text.repeat(*repeat as usize),
                        log: args.instance(2)?,
                    })
                },
            ))
            .with_post_construct(|greeter: &Greeter| {
                greeter.log.info("启动");
                GREETER_STARTS.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .with_pre_destroy(|_: &Greeter| {
                GREETER_STOPS.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
    }
}

fn greeter_module(binder: &mut Binder<'_>) {
    binder.register_type::<Greeter>();
    binder.bind::<Greeter>().as_eager_singleton();
}

#[test]
fn test_properties_flow_into_components_and_lifecycle() -> anyhow::Result<()> {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile()?;
    writeln!(file, "{}", json!({"greeting": {"text": "hi", "repeat": 1}}))?;
    let overrides = PropertySource::from_value(json!({"greeting": {"repeat": "3"}}))?;

    let application = Application::builder()
        .with_name("greeter")
        .with_property_file(file.path())?
        .with_properties(overrides)
        .with_module(greeter_module)
        .build()?;

    assert_eq!(application.status(), ApplicationStatus::Running);
    assert_eq!(application.lifecycle().state(), LifecycleState::Started);
    assert_eq!(GREETER_STARTS.load(Ordering::SeqCst), 1);

    let greeter = application.require::<Greeter>()?;
    assert_eq!(greeter.greeting, "hihihi");
    assert_eq!(greeter.log.component(), "Greeter");

    let properties = application.require::<PropertySource>()?;
    assert_eq!(properties.get("greeting.text"), Some(&json!("hi")));
    assert_eq!(application.require::<ApplicationSettings>()?.name, "greeter");

    application.shutdown()?;
    assert_eq!(application.status(), ApplicationStatus::Stopped);
    assert_eq!(GREETER_STOPS.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn test_settings_file_without_auto_start() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("values.toml"), "[limits]\nmax = 5\n")?;
    let settings = dir.path().join("app.toml");
    std::fs::write(
        &settings,
        "name = \"manual\"\nauto_start = false\n[properties]\nfiles = [\"values.toml\"]\n",
    )?;

    let application = Application::builder().with_settings_file(&settings)?.build()?;

    assert_eq!(application.name(), "manual");
    assert_eq!(application.status(), ApplicationStatus::Initialized);
    assert_eq!(application.properties().get("limits.max"), Some(&json!(5)));

    application.start()?;
    assert_eq!(application.status(), ApplicationStatus::Running);
    application.shutdown()?;
    assert_eq!(application.status(), ApplicationStatus::Stopped);

    assert!(application.shutdown().is_err());
    assert_eq!(application.status(), ApplicationStatus::Failed);
    Ok(())
}

#[test]
fn test_factory_errors_surface_as_infrastructure_errors() {
    let result = Application::builder()
        .with_module(|binder: &mut Binder<'_>| {
            binder.bind_named::<String>("region").to_instance(Arc::new("eu".to_string()));
            binder.bind_named::<String>("region").to_instance(Arc::new("us".to_string()));
        })
        .build();

    assert!(matches!(result, Err(InfrastructureError::ConfigurationError { .. })));
}

#[test]
fn test_missing_settings_file() {
    let result = Application::builder().with_settings_file("/nonexistent/app.toml");

    assert!(matches!(result, Err(InfrastructureError::ConfigError { .. })));
}

#[test]
fn test_shared_controller_and_scoped_bindings() -> anyhow::Result<()> {
    let controller = Arc::new(di_impl::LifecycleController::new());
    let application = Application::builder()
        .with_auto_start(false)
        .with_lifecycle_controller(controller.clone())
        .with_module(|binder: &mut Binder<'_>| {
            binder
                .bind_named::<String>("region")
                .to_supplier(|| Ok(Arc::new("eu".to_string())))
                .in_scope(Scope::Singleton);
        })
        .build()?;

    let first = application.factory().require_named::<String>("region")?;
    let second = application.factory().require_named::<String>("region")?;
    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(application.lifecycle(), &controller));
    assert_eq!(controller.state(), LifecycleState::Waiting);
    Ok(())
}

//! 生命周期控制器
//!
//! 控制器按注册顺序启动监听器，按启动的相反顺序停止监听器。
//! 所有操作互斥执行；同一线程内可以重入，监听器可以在 `on_start`
//! 中继续注册其他监听器。

use di_abstractions::{Injectable, Instance};
use di_common::{LifecycleError, LifecycleListener, LifecycleResult, LifecycleState};
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Default)]
struct ControllerState {
    phase: LifecycleState,
    pending: VecDeque<Arc<dyn LifecycleListener>>,
    started: Vec<Arc<dyn LifecycleListener>>,
}

impl ControllerState {
    fn contains(&self, listener: &Arc<dyn LifecycleListener>) -> bool {
        self.pending.iter().chain(self.started.iter()).any(|l| same(l, listener))
    }

    fn illegal(&self, operation: &str) -> LifecycleError {
        LifecycleError::IllegalState {
            operation: operation.to_string(),
            state: self.phase.to_string(),
        }
    }
}

fn same(a: &Arc<dyn LifecycleListener>, b: &Arc<dyn LifecycleListener>) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}

/// 生命周期控制器
///
/// 状态迁移 `Waiting -> Started -> Terminated`，终止后不可恢复。
///
/// 启动时某个监听器失败：停止继续启动，返回 [`LifecycleError::ListenerStartFailed`]，
/// 状态保持 `Started`，已启动的监听器可以通过 [`shutdown`](Self::shutdown) 停止，
/// 其余监听器保持等待。
pub struct LifecycleController {
    state: ReentrantMutex<RefCell<ControllerState>>,
}

impl LifecycleController {
    /// 创建处于等待状态的控制器
    pub fn new() -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(ControllerState::default())),
        }
    }

    /// 当前状态
    pub fn state(&self) -> LifecycleState {
        self.state.lock().borrow().phase
    }

    /// 等待中与已启动的监听器总数
    pub fn listener_count(&self) -> usize {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.pending.len() + state.started.len()
    }

    /// 注册监听器
    ///
    /// 等待状态下排队；已启动时立即启动；已终止时报错。
    /// 同一监听器重复注册时忽略。
    pub fn add_listener(&self, listener: Arc<dyn LifecycleListener>) -> LifecycleResult<()> {
        let guard = self.state.lock();
        let phase = {
            let mut state = guard.borrow_mut();
            if state.contains(&listener) {
                debug!("监听器已注册，忽略: {}", listener.name());
                return Ok(());
            }
            match state.phase {
                LifecycleState::Waiting => {
                    debug!("监听器加入等待队列: {}", listener.name());
                    state.pending.push_back(listener);
                    return Ok(());
                }
                LifecycleState::Terminated => return Err(state.illegal("add_listener")),
                phase => phase,
            }
        };
        debug!("控制器处于 {} 状态，立即启动监听器: {}", phase, listener.name());
        start_one(&guard, listener)
    }

    /// 注册具备生命周期能力的组件
    ///
    /// 组件自身是监听器时直接注册，否则用启动/销毁钩子适配。
    pub fn add_component<T: Injectable>(&self, component: Arc<T>) -> LifecycleResult<()> {
        let listener = T::descriptor()
            .lifecycle_listener(component)
            .ok_or_else(|| LifecycleError::NotLifecycleCapable {
                type_name: std::any::type_name::<T>().to_string(),
            })?;
        self.add_listener(listener)
    }

    /// 注册工厂解析出的实例
    pub fn add_instance(&self, instance: &Instance) -> LifecycleResult<()> {
        let listener = instance
            .listener()
            .cloned()
            .ok_or_else(|| LifecycleError::NotLifecycleCapable {
                type_name: instance.type_info().name().to_string(),
            })?;
        self.add_listener(listener)
    }

    /// 移除监听器，已启动的监听器会先被停止
    ///
    /// 返回监听器是否存在。
    pub fn remove_listener(&self, listener: &Arc<dyn LifecycleListener>) -> LifecycleResult<bool> {
        let guard = self.state.lock();
        let removed = {
            let mut state = guard.borrow_mut();
            if let Some(index) = state.pending.iter().position(|l| same(l, listener)) {
                state.pending.remove(index);
                debug!("从等待队列移除监听器: {}", listener.name());
                return Ok(true);
            }
            match state.started.iter().position(|l| same(l, listener)) {
                Some(index) => state.started.remove(index),
                None => return Ok(false),
            }
        };

        debug!("停止并移除监听器: {}", removed.name());
        removed.on_stop().map_err(|source| LifecycleError::ListenerStopFailed {
            listener: removed.name(),
            source,
        })?;
        Ok(true)
    }

    /// 启动所有等待中的监听器
    pub fn start(&self) -> LifecycleResult<()> {
        let guard = self.state.lock();
        {
            let mut state = guard.borrow_mut();
            if state.phase != LifecycleState::Waiting {
                return Err(state.illegal("start"));
            }
            state.phase = LifecycleState::Started;
            info!("启动生命周期控制器，等待中的监听器: {}", state.pending.len());
        }

        loop {
            let next = guard.borrow_mut().pending.pop_front();
            let Some(listener) = next else {
                break;
            };
            start_one(&guard, listener)?;
        }
        info!("生命周期控制器已启动");
        Ok(())
    }

    /// 按启动的相反顺序停止所有监听器
    ///
    /// 每个监听器都会被尝试停止，返回遇到的第一个错误，其余错误记录到日志。
    pub fn shutdown(&self) -> LifecycleResult<()> {
        let guard = self.state.lock();
        let started = {
            let mut state = guard.borrow_mut();
            if state.phase != LifecycleState::Started {
                return Err(state.illegal("shutdown"));
            }
            state.phase = LifecycleState::Terminated;
            state.pending.clear();
            std::mem::take(&mut state.started)
        };
        info!("关闭生命周期控制器，已启动的监听器: {}", started.len());

        let mut first_error = None;
        for listener in started.iter().rev() {
            debug!("停止监听器: {}", listener.name());
            if let Err(source) = listener.on_stop() {
                let error = LifecycleError::ListenerStopFailed {
                    listener: listener.name(),
                    source,
                };
                if first_error.is_none() {
                    first_error = Some(error);
                } else {
                    warn!("监听器停止失败: {}", error);
                }
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => {
                info!("生命周期控制器已终止");
                Ok(())
            }
        }
    }
}

fn start_one(
    guard: &parking_lot::ReentrantMutexGuard<'_, RefCell<ControllerState>>,
    listener: Arc<dyn LifecycleListener>,
) -> LifecycleResult<()> {
    debug!("启动监听器: {}", listener.name());
    listener.on_start().map_err(|source| LifecycleError::ListenerStartFailed {
        listener: listener.name(),
        source,
    })?;
    guard.borrow_mut().started.push(listener);
    Ok(())
}

impl Default for LifecycleController {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.state.lock();
        let state = guard.borrow();
        f.debug_struct("LifecycleController")
            .field("state", &state.phase)
            .field("pending", &state.pending.len())
            .field("started", &state.started.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use di_abstractions::{ConstructorPoint, TypeDescriptor};
    use di_common::DynError;
    use std::sync::Mutex;

    type Events = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        events: Events,
        fail_start: bool,
        fail_stop: bool,
    }

    impl Recorder {
        fn new(name: &'static str, events: &Events) -> Arc<Self> {
            Arc::new(Self {
                name,
                events: events.clone(),
                fail_start: false,
                fail_stop: false,
            })
        }

        fn failing_stop(name: &'static str, events: &Events) -> Arc<Self> {
            Arc::new(Self {
                name,
                events: events.clone(),
                fail_start: false,
                fail_stop: true,
            })
        }
    }

    impl LifecycleListener for Recorder {
        fn on_start(&self) -> Result<(), DynError> {
            self.events.lock().unwrap().push(format!("start {}", self.name));
            if self.fail_start {
                return Err(format!("{} 无法启动", self.name).into());
            }
            Ok(())
        }

        fn on_stop(&self) -> Result<(), DynError> {
            self.events.lock().unwrap().push(format!("stop {}", self.name));
            if self.fail_stop {
                return Err(format!("{} 无法停止", self.name).into());
            }
            Ok(())
        }

        fn name(&self) -> String {
            self.name.to_string()
        }
    }

    fn events() -> Events {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn recorded(events: &Events) -> Vec<String> {
        events.lock().unwrap().clone()
    }

    #[test]
    fn test_start_fifo_and_shutdown_reverse() {
        let events = events();
        let controller = LifecycleController::new();
        for name in ["L1", "L2", "L3"] {
            controller.add_listener(Recorder::new(name, &events)).unwrap();
        }
        assert!(recorded(&events).is_empty());

        controller.start().unwrap();
        controller.shutdown().unwrap();

        assert_eq!(
            recorded(&events),
            vec!["start L1", "start L2", "start L3", "stop L3", "stop L2", "stop L1"]
        );
        assert_eq!(controller.state(), LifecycleState::Terminated);
    }

    #[test]
    fn test_illegal_transitions() {
        let events = events();
        let controller = LifecycleController::new();
        assert!(matches!(controller.shutdown(), Err(LifecycleError::IllegalState { .. })));

        controller.start().unwrap();
        assert!(matches!(controller.start(), Err(LifecycleError::IllegalState { .. })));

        controller.shutdown().unwrap();
        assert!(matches!(controller.shutdown(), Err(LifecycleError::IllegalState { .. })));
        assert!(matches!(
            controller.add_listener(Recorder::new("late", &events)),
            Err(LifecycleError::IllegalState { state, .. }) if state == "TERMINATED"
        ));
    }

    #[test]
    fn test_partial_shutdown_failure_reports_first_error() {
        let events = events();
        let controller = LifecycleController::new();
        controller.add_listener(Recorder::new("L1", &events)).unwrap();
        controller.add_listener(Recorder::failing_stop("L2", &events)).unwrap();
        controller.add_listener(Recorder::new("L3", &events)).unwrap();
        controller.start().unwrap();

        let error = controller.shutdown().unwrap_err();

        assert!(matches!(error, LifecycleError::ListenerStopFailed { ref listener, .. } if listener == "L2"));
        assert_eq!(&recorded(&events)[3..], ["stop L3", "stop L2", "stop L1"]);
        assert_eq!(controller.state(), LifecycleState::Terminated);
    }

    #[test]
    fn test_listener_added_after_start_starts_immediately() {
        let events = events();
        let controller = LifecycleController::new();
        controller.start().unwrap();

        let listener = Recorder::new("late", &events);
        controller.add_listener(listener.clone()).unwrap();
        controller.add_listener(listener).unwrap();

        assert_eq!(recorded(&events), vec!["start late"]);
        assert_eq!(controller.listener_count(), 1);
    }

    #[test]
    fn test_remove_listener_stops_started_one() {
        let events = events();
        let controller = LifecycleController::new();
        let waiting: Arc<dyn LifecycleListener> = Recorder::new("waiting", &events);
        let running: Arc<dyn LifecycleListener> = Recorder::new("running", &events);
        controller.add_listener(running.clone()).unwrap();
        controller.start().unwrap();
        controller.add_listener(waiting.clone()).unwrap();

        assert!(controller.remove_listener(&running).unwrap());
        assert!(!controller.remove_listener(&running).unwrap());
        assert_eq!(recorded(&events), vec!["start running", "start waiting", "stop running"]);
        assert_eq!(controller.listener_count(), 1);
    }

    #[test]
    fn test_start_failure_keeps_remaining_pending() {
        let events = events();
        let controller = LifecycleController::new();
        controller.add_listener(Recorder::new("L1", &events)).unwrap();
        controller
            .add_listener(Arc::new(Recorder {
                name: "broken",
                events: events.clone(),
                fail_start: true,
                fail_stop: false,
            }))
            .unwrap();
        controller.add_listener(Recorder::new("L3", &events)).unwrap();

        let error = controller.start().unwrap_err();

        assert!(matches!(error, LifecycleError::ListenerStartFailed { ref listener, .. } if listener == "broken"));
        assert_eq!(controller.state(), LifecycleState::Started);
        assert_eq!(controller.listener_count(), 2);

        controller.shutdown().unwrap();
        assert_eq!(recorded(&events), vec!["start L1", "start broken", "stop L1"]);
    }

    #[test]
    fn test_listener_may_register_listener_while_starting() {
        struct Spawner {
            controller: Arc<LifecycleController>,
            child: Arc<Recorder>,
        }

        impl LifecycleListener for Spawner {
            fn on_start(&self) -> Result<(), DynError> {
                self.controller.add_listener(self.child.clone())?;
                Ok(())
            }

            fn on_stop(&self) -> Result<(), DynError> {
                Ok(())
            }
        }

        let events = events();
        let controller = Arc::new(LifecycleController::new());
        controller
            .add_listener(Arc::new(Spawner {
                controller: controller.clone(),
                child: Recorder::new("child", &events),
            }))
            .unwrap();

        controller.start().unwrap();

        assert_eq!(recorded(&events), vec!["start child"]);
        assert_eq!(controller.listener_count(), 2);
    }

    #[test]
    fn test_add_component_requires_lifecycle_capability() {
        struct Plain;

        impl Injectable for Plain {
            fn descriptor() -> TypeDescriptor<Self> {
                TypeDescriptor::new().with_constructor(ConstructorPoint::no_arg("new", || Plain))
            }
        }

        struct Pool {
            events: Events,
        }

        impl Injectable for Pool {
            fn descriptor() -> TypeDescriptor<Self> {
                TypeDescriptor::new()
                    .with_post_construct(|pool: &Pool| {
                        pool.events.lock().unwrap().push("open".to_string());
                        Ok(())
                    })
                    .with_pre_destroy(|pool: &Pool| {
                        pool.events.lock().unwrap().push("close".to_string());
                        Ok(())
                    })
            }
        }

        let events = events();
        let controller = LifecycleController::new();
        assert!(matches!(
            controller.add_component(Arc::new(Plain)),
            Err(LifecycleError::NotLifecycleCapable { .. })
        ));

        controller.add_component(Arc::new(Pool { events: events.clone() })).unwrap();
        controller.start().unwrap();
        controller.shutdown().unwrap();

        assert_eq!(recorded(&events), vec!["open", "close"]);
    }
}

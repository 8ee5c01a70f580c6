use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

/// Cooperative abort flag for one in-flight call. `cancel` is idempotent;
/// the generation loop observes the flag between decode iterations, never
/// mid-step.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

type CancelHook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct SignalInner {
    activated: AtomicBool,
    next_id: AtomicU64,
    hooks: Mutex<Vec<(u64, CancelHook)>>,
}

impl SignalInner {
    fn activate(&self) {
        if self.activated.swap(true, Ordering::SeqCst) {
            return;
        }
        let hooks = std::mem::take(&mut *self.hooks.lock().unwrap());
        for (_, hook) in hooks {
            hook();
        }
    }
}

/// One-shot external cancellation source. The holder of the controller
/// activates it; every registered hook fires exactly once, on the first
/// activation or immediately when registered after it.
#[derive(Clone, Default)]
pub struct CancelController {
    inner: Arc<SignalInner>,
}

impl CancelController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            inner: self.inner.clone(),
        }
    }

    pub fn activate(&self) {
        self.inner.activate();
    }
}

#[derive(Clone)]
pub struct CancelSignal {
    inner: Arc<SignalInner>,
}

impl CancelSignal {
    pub fn is_activated(&self) -> bool {
        self.inner.activated.load(Ordering::SeqCst)
    }

    pub fn register(
        &self,
        hook: CancelHook,
    ) -> CancelRegistration {
        if self.is_activated() {
            hook();
            return CancelRegistration {
                id: None,
                inner: self.inner.clone(),
            };
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let mut hooks = self.inner.hooks.lock().unwrap();
        // activation may have raced in before the lock
        if self.is_activated() {
            drop(hooks);
            hook();
            return CancelRegistration {
                id: None,
                inner: self.inner.clone(),
            };
        }
        hooks.push((id, hook));
        CancelRegistration {
            id: Some(id),
            inner: self.inner.clone(),
        }
    }
}

/// Keeps a hook registered while the call it belongs to is running.
/// Dropping it deregisters the hook, so a source activated after the call
/// reached a terminal state has no observable effect.
pub struct CancelRegistration {
    id: Option<u64>,
    inner: Arc<SignalInner>,
}

impl Drop for CancelRegistration {
    fn drop(&mut self) {
        if let Some(id) = self.id {
            let mut hooks = self.inner.hooks.lock().unwrap();
            hooks.retain(|(hook_id, _)| *hook_id != id);
        }
    }
}

//! System-wide audio hardware watcher.
//!
//! Listens for device-list and default-device changes on the system audio
//! object and calls one user callback per changed property, always on the
//! watcher's execution context.

use crate::context::{ContextThread, ExecutionContext, call_on};
use crate::diagnostics::{Diagnostic, Diagnostics, TracingDiagnostics, error_chain, panic_message};
use crate::error::WatcherError;
use crate::hw::options::WatcherOptions;
use crate::hw::property::{PropertyAddress, PropertySelector, WATCHED_SELECTORS};
use crate::hw::traits::{HwListenerBackend, ListenerId, ListenerProc};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Receives one short code (`"dOut"`, `"dev#"`, ...) per changed property.
pub type Callback = Box<dyn FnMut(&str) -> Result<(), CallbackError> + Send>;

enum CallbackSlot {
    Empty,
    Ready(Callback),
    /// Taken out by a dispatch that is calling it right now.
    Lent,
}

struct WatcherState {
    callback: CallbackSlot,
    running: bool,
    listeners: Vec<(PropertyAddress, ListenerId)>,
}

struct Shared<B: HwListenerBackend> {
    backend: Arc<B>,
    context: Arc<dyn ExecutionContext>,
    diagnostics: Arc<dyn Diagnostics>,
    trace_events: bool,
    state: Mutex<WatcherState>,
}

impl<B: HwListenerBackend + 'static> Shared<B> {
    fn state(&self) -> MutexGuard<'_, WatcherState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn set_callback(&self, callback: Option<Callback>) -> Result<(), WatcherError> {
        match callback {
            Some(callback) => {
                let previous =
                    std::mem::replace(&mut self.state().callback, CallbackSlot::Ready(callback));
                drop(previous);
                Ok(())
            }
            None => {
                // Listeners go first so no dispatch can find the slot empty.
                let stopped = self.stop();
                let previous = std::mem::replace(&mut self.state().callback, CallbackSlot::Empty);
                drop(previous);
                stopped
            }
        }
    }

    fn start(self: &Arc<Self>) -> Result<(), WatcherError> {
        let still_registered: Vec<PropertySelector> = {
            let state = self.state();
            if matches!(state.callback, CallbackSlot::Empty) {
                drop(state);
                self.diagnostics.report(Diagnostic::MissingCallback);
                return Err(WatcherError::NoCallback);
            }
            if state.running {
                return Ok(());
            }
            state.listeners.iter().map(|(a, _)| a.selector).collect()
        };

        let listener = self.listener_proc();
        let mut registered = Vec::with_capacity(WATCHED_SELECTORS.len());
        for selector in WATCHED_SELECTORS {
            // Left over from a removal that failed; the OS still has it.
            if still_registered.contains(&selector) {
                continue;
            }
            let address = PropertyAddress::global(selector);
            match self.backend.add_listener(&address, listener.clone()) {
                Ok(id) => registered.push((address, id)),
                Err(e) => {
                    for (address, id) in registered.into_iter().rev() {
                        if let Err(undo) = self.backend.remove_listener(&address, id) {
                            warn!("{} rollback of {} failed: {}", B::LABEL, address.selector, undo);
                        }
                    }
                    self.diagnostics.report(Diagnostic::OsFailure {
                        message: e.to_string(),
                    });
                    return Err(e);
                }
            }
        }

        let mut state = self.state();
        state.listeners.extend(registered);
        state.running = true;
        info!("{} hardware watcher started", B::LABEL);
        Ok(())
    }

    /// Unregister everything. Listeners the OS refused to remove stay on
    /// the books and are retried by the next call, even when not running.
    fn stop(&self) -> Result<(), WatcherError> {
        let (listeners, was_running) = {
            let mut state = self.state();
            if !state.running && state.listeners.is_empty() {
                return Ok(());
            }
            let was_running = std::mem::replace(&mut state.running, false);
            (std::mem::take(&mut state.listeners), was_running)
        };

        let mut first_error = None;
        let mut kept = Vec::new();
        for (address, id) in listeners {
            if let Err(e) = self.backend.remove_listener(&address, id) {
                self.diagnostics.report(Diagnostic::OsFailure {
                    message: e.to_string(),
                });
                first_error.get_or_insert(e);
                kept.push((address, id));
            }
        }
        if !kept.is_empty() {
            warn!(
                "{} hardware watcher: {} listener(s) still registered",
                B::LABEL,
                kept.len()
            );
            self.state().listeners.extend(kept);
        }
        if was_running {
            info!("{} hardware watcher stopped", B::LABEL);
        }
        first_error.map_or(Ok(()), Err)
    }

    fn teardown(&self) {
        // stop() reports its own failures.
        let _ = self.stop();
        let previous = std::mem::replace(&mut self.state().callback, CallbackSlot::Empty);
        drop(previous);
    }

    /// The proc registered for every watched property. It holds the watcher
    /// weakly: registrations, and backends keeping retired client data, must
    /// not keep a dropped watcher or its context thread alive.
    fn listener_proc(self: &Arc<Self>) -> ListenerProc {
        let weak = Arc::downgrade(self);
        Arc::new(move |batch: &[PropertyAddress]| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let context = shared.context.clone();
            let batch = batch.to_vec();
            if let Err(e) = context.run_sync(Box::new(move || shared.deliver(&batch))) {
                warn!("{} notification dropped: {}", B::LABEL, e);
            }
        })
    }

    /// Runs on the execution context with one notification batch.
    fn deliver(&self, batch: &[PropertyAddress]) {
        if self.trace_events {
            let codes: Vec<String> = batch.iter().map(|a| a.selector.code()).collect();
            debug!("{} notification: {:?}", B::LABEL, codes);
        }

        for (index, address) in batch.iter().enumerate() {
            let code = address.selector.code();
            let mut callback = {
                let mut state = self.state();
                match std::mem::replace(&mut state.callback, CallbackSlot::Lent) {
                    CallbackSlot::Ready(callback) => callback,
                    other => {
                        state.callback = other;
                        drop(state);
                        let codes = batch[index..].iter().map(|a| a.selector.code()).collect();
                        self.diagnostics
                            .report(Diagnostic::OrphanedNotification { codes });
                        return;
                    }
                }
            };

            let outcome = catch_unwind(AssertUnwindSafe(|| callback(&code)));

            // The callback may have replaced or cleared itself; only an
            // untouched slot gets it back.
            let stale = {
                let mut state = self.state();
                if matches!(state.callback, CallbackSlot::Lent) {
                    state.callback = CallbackSlot::Ready(callback);
                    None
                } else {
                    Some(callback)
                }
            };
            drop(stale);

            let message = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => error_chain(&*e),
                Err(payload) => panic_message(&*payload),
            };
            self.diagnostics
                .report(Diagnostic::CallbackFailed { code, message });
        }
    }
}

/// Watches system audio hardware changes and reports them to one callback.
///
/// Owned by the host; dropping it unregisters every listener and releases
/// the callback.
pub struct HardwareWatcher<B: HwListenerBackend + 'static> {
    shared: Arc<Shared<B>>,
}

impl<B: HwListenerBackend + 'static> HardwareWatcher<B> {
    pub fn new(
        backend: Arc<B>,
        context: Arc<dyn ExecutionContext>,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        Self::build(backend, context, diagnostics, false)
    }

    /// Spawn a dedicated context thread and report through `tracing`.
    pub fn with_options(backend: Arc<B>, options: &WatcherOptions) -> Result<Self, WatcherError> {
        let context = Arc::new(ContextThread::spawn(&options.context_thread)?);
        Ok(Self::build(
            backend,
            context,
            Arc::new(TracingDiagnostics),
            options.trace_events,
        ))
    }

    fn build(
        backend: Arc<B>,
        context: Arc<dyn ExecutionContext>,
        diagnostics: Arc<dyn Diagnostics>,
        trace_events: bool,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                backend,
                context,
                diagnostics,
                trace_events,
                state: Mutex::new(WatcherState {
                    callback: CallbackSlot::Empty,
                    running: false,
                    listeners: Vec::new(),
                }),
            }),
        }
    }

    /// Replace the callback. `None` stops the watcher, then clears it.
    pub fn set_callback(&self, callback: Option<Callback>) -> Result<(), WatcherError> {
        let shared = self.shared.clone();
        call_on(self.shared.context.as_ref(), move || {
            shared.set_callback(callback)
        })?
    }

    /// Register the property listeners. Needs a callback; a no-op when
    /// already running.
    pub fn start(&self) -> Result<(), WatcherError> {
        let shared = self.shared.clone();
        call_on(self.shared.context.as_ref(), move || shared.start())?
    }

    /// Unregister the property listeners. A no-op when not running, unless
    /// an earlier removal failed and is still owed.
    ///
    /// Notifications the OS accepted before this returns may still reach
    /// the callback.
    pub fn stop(&self) -> Result<(), WatcherError> {
        let shared = self.shared.clone();
        call_on(self.shared.context.as_ref(), move || shared.stop())?
    }

    pub fn is_running(&self) -> bool {
        self.shared.state().running
    }
}

impl<B: HwListenerBackend + 'static> Drop for HardwareWatcher<B> {
    fn drop(&mut self) {
        let shared = self.shared.clone();
        if call_on(self.shared.context.as_ref(), move || shared.teardown()).is_err() {
            // Context already gone: nothing else can touch the state now.
            self.shared.teardown();
        }
    }
}

//! The fixed execution context.
//!
//! Every state change of the watcher and every callback invocation runs on
//! one thread. Callers on other threads (including OS notification threads)
//! hand their work over and block until it has run.

use crate::diagnostics::panic_message;
use crate::error::WatcherError;
use crate::message::{Job, Message};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc::{Receiver, Sender, channel, sync_channel};
use std::sync::{Mutex, MutexGuard};
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, error};

pub trait ExecutionContext: Send + Sync {
    /// Run `job` on the context and wait for it to finish.
    ///
    /// Called from the context itself, the job runs inline.
    fn run_sync(&self, job: Job) -> Result<(), WatcherError>;

    fn is_current(&self) -> bool;
}

/// Run `f` on `context` and hand its result back to the caller.
pub fn call_on<R, F>(context: &dyn ExecutionContext, f: F) -> Result<R, WatcherError>
where
    R: Send + 'static,
    F: FnOnce() -> R + Send + 'static,
{
    let (tx, rx) = sync_channel(1);
    context.run_sync(Box::new(move || {
        let _ = tx.send(f());
    }))?;
    rx.recv().map_err(|_| WatcherError::ContextClosed)
}

/// A dedicated thread acting as the execution context.
#[derive(Debug)]
pub struct ContextThread {
    name: String,
    thread_id: ThreadId,
    tx: Mutex<Option<Sender<Message>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ContextThread {
    pub fn spawn(name: &str) -> Result<Self, WatcherError> {
        let (tx, rx) = channel::<Message>();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || Self::work(rx))
            .map_err(|e| WatcherError::ContextSpawn(format!("{name}: {e}")))?;
        debug!("execution context '{}' started", name);
        Ok(Self {
            name: name.to_string(),
            thread_id: handle.thread().id(),
            tx: Mutex::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
        })
    }

    fn work(rx: Receiver<Message>) {
        for message in &rx {
            match message {
                Message::Quit => {
                    return;
                }
                Message::Run(job, done) => {
                    if let Err(payload) = catch_unwind(AssertUnwindSafe(job)) {
                        error!("execution context job {}", panic_message(&*payload));
                    }
                    let _ = done.send(());
                }
            }
        }
    }

    fn sender(&self) -> MutexGuard<'_, Option<Sender<Message>>> {
        match self.tx.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Stop the thread after the jobs already queued. Later `run_sync`
    /// calls fail with [`WatcherError::ContextClosed`].
    pub fn shutdown(&self) {
        if let Some(tx) = self.sender().take() {
            let _ = tx.send(Message::Quit);
        }
        if self.is_current() {
            return;
        }
        let handle = match self.handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("execution context '{}' panicked", self.name);
            }
            debug!("execution context '{}' stopped", self.name);
        }
    }
}

impl ExecutionContext for ContextThread {
    fn run_sync(&self, job: Job) -> Result<(), WatcherError> {
        if self.is_current() {
            job();
            return Ok(());
        }
        let tx = self.sender().clone().ok_or(WatcherError::ContextClosed)?;
        let (done_tx, done_rx) = sync_channel(1);
        tx.send(Message::Run(job, done_tx))
            .map_err(|_| WatcherError::ContextClosed)?;
        done_rx.recv().map_err(|_| WatcherError::ContextClosed)
    }

    fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }
}

impl Drop for ContextThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn jobs_run_on_the_context_thread() {
        let context = ContextThread::spawn("ctx-test").unwrap();
        let name = call_on(&context, || {
            thread::current().name().map(|n| n.to_string())
        })
        .unwrap();
        assert_eq!(name.as_deref(), Some("ctx-test"));
        assert!(!context.is_current());
    }

    #[test]
    fn nested_run_sync_runs_inline() {
        let context = Arc::new(ContextThread::spawn("ctx-nested").unwrap());
        let inner = context.clone();
        let result = call_on(context.as_ref(), move || {
            call_on(inner.as_ref(), || 7).unwrap() + inner.is_current() as i32
        })
        .unwrap();
        assert_eq!(result, 8);
    }

    #[test]
    fn panicking_job_does_not_kill_the_thread() {
        let context = ContextThread::spawn("ctx-panic").unwrap();
        assert!(context.run_sync(Box::new(|| panic!("boom"))).is_ok());
        assert_eq!(call_on(&context, || 1).unwrap(), 1);
    }

    #[test]
    fn run_after_shutdown_fails() {
        let context = ContextThread::spawn("ctx-closed").unwrap();
        context.shutdown();
        assert_eq!(
            context.run_sync(Box::new(|| {})),
            Err(WatcherError::ContextClosed)
        );
    }
}

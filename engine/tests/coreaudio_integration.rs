#![cfg(target_os = "macos")]

//! End-to-end test of the hardware watcher against the real CoreAudio system
//! object.
//!
//! Registers the listeners, checks they can be removed again, and waits a
//! moment for any spontaneous notification. Marked `#[ignore]` because it
//! needs an audio-capable macOS session and cannot run in headless CI.

#[cfg(test)]
mod tests {
    use audiowatch_engine::{
        HardwareWatcher, SystemObjectListeners, WatcherError, WatcherOptions,
    };
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[test]
    #[ignore = "requires CoreAudio hardware"]
    fn test_coreaudio_watcher_lifecycle() {
        // 1. Build the watcher on its own context thread.
        let backend = Arc::new(SystemObjectListeners::new());
        let watcher = HardwareWatcher::with_options(backend, &WatcherOptions::default())
            .expect("failed to create watcher");

        // 2. start() without a callback is refused.
        assert_eq!(watcher.start(), Err(WatcherError::NoCallback));

        // 3. Register listeners on the system object.
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = seen.clone();
        watcher
            .set_callback(Some(Box::new(move |code: &str| {
                sink.lock().expect("poisoned").push(code.to_string());
                Ok(())
            })))
            .expect("set_callback failed");
        watcher.start().expect("CoreAudio listener registration failed");
        assert!(watcher.is_running());

        // 4. Give CoreAudio a chance to deliver; any code seen must be well formed.
        std::thread::sleep(Duration::from_millis(250));
        for code in seen.lock().expect("poisoned").iter() {
            assert!(!code.is_empty() && code.len() <= 10, "bad code {code:?}");
        }

        // 5. Remove the listeners again.
        watcher.stop().expect("CoreAudio listener removal failed");
        assert!(!watcher.is_running());
        watcher.set_callback(None).expect("clearing callback failed");
    }
}

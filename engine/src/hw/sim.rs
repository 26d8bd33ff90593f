//! In-process stand-in for the system audio object.
//!
//! Holds listener registrations in memory and lets the caller play the
//! role of the OS by delivering notification batches with [`SimulatedHardware::notify`].
//! Used by the test suite and by hosts without CoreAudio.

use crate::error::WatcherError;
use crate::hw::property::PropertyAddress;
use crate::hw::traits::{HwListenerBackend, ListenerId, ListenerProc};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

struct Registration {
    id: ListenerId,
    address: PropertyAddress,
    listener: ListenerProc,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    registrations: Vec<Registration>,
    // (calls to let through first, status)
    fail_add: Option<(usize, i32)>,
    fail_next_remove: Option<i32>,
}

#[derive(Default)]
pub struct SimulatedHardware {
    registry: Mutex<Registry>,
}

impl SimulatedHardware {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        match self.registry.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Number of live registrations.
    pub fn listener_count(&self) -> usize {
        self.registry().registrations.len()
    }

    /// Addresses with a live registration, in registration order.
    pub fn registered_addresses(&self) -> Vec<PropertyAddress> {
        self.registry()
            .registrations
            .iter()
            .map(|r| r.address)
            .collect()
    }

    /// Make the next `add_listener` call fail with `status`.
    pub fn fail_next_add(&self, status: i32) {
        self.fail_nth_add(0, status);
    }

    /// Let `skip` `add_listener` calls succeed, then fail the one after
    /// with `status`.
    pub fn fail_nth_add(&self, skip: usize, status: i32) {
        self.registry().fail_add = Some((skip, status));
    }

    /// Make the next `remove_listener` call fail with `status`.
    pub fn fail_next_remove(&self, status: i32) {
        self.registry().fail_next_remove = Some(status);
    }

    /// Deliver one notification batch, the way the OS would.
    ///
    /// Registrations sharing a listener proc get a single call carrying the
    /// addresses they cover, in batch order. Returns the number of listener
    /// calls made.
    pub fn notify(&self, changed: &[PropertyAddress]) -> usize {
        let mut calls: Vec<(ListenerProc, Vec<PropertyAddress>)> = Vec::new();
        {
            let registry = self.registry();
            for address in changed {
                for reg in registry
                    .registrations
                    .iter()
                    .filter(|r| r.address.matches(address))
                {
                    match calls
                        .iter_mut()
                        .find(|(listener, _)| Arc::ptr_eq(listener, &reg.listener))
                    {
                        Some((_, batch)) => {
                            if !batch.contains(address) {
                                batch.push(*address);
                            }
                        }
                        None => calls.push((reg.listener.clone(), vec![*address])),
                    }
                }
            }
        }
        // The registry lock is released: listeners may add or remove
        // registrations while they run.
        let count = calls.len();
        for (listener, batch) in calls {
            debug!("simulated notification: {} address(es)", batch.len());
            listener(&batch);
        }
        count
    }
}

impl HwListenerBackend for SimulatedHardware {
    const LABEL: &'static str = "simulated";

    fn add_listener(
        &self,
        address: &PropertyAddress,
        listener: ListenerProc,
    ) -> Result<ListenerId, WatcherError> {
        let mut registry = self.registry();
        match registry.fail_add {
            Some((0, status)) => {
                registry.fail_add = None;
                return Err(WatcherError::os(
                    "AudioObjectAddPropertyListener",
                    address.selector,
                    status,
                ));
            }
            Some((skip, status)) => registry.fail_add = Some((skip - 1, status)),
            None => {}
        }
        registry.next_id += 1;
        let id = ListenerId(registry.next_id);
        registry.registrations.push(Registration {
            id,
            address: *address,
            listener,
        });
        Ok(id)
    }

    fn remove_listener(
        &self,
        address: &PropertyAddress,
        id: ListenerId,
    ) -> Result<(), WatcherError> {
        let mut registry = self.registry();
        if let Some(status) = registry.fail_next_remove.take() {
            return Err(WatcherError::os(
                "AudioObjectRemovePropertyListener",
                address.selector,
                status,
            ));
        }
        match registry
            .registrations
            .iter()
            .position(|r| r.id == id && r.address == *address)
        {
            Some(index) => {
                registry.registrations.remove(index);
                Ok(())
            }
            // kAudioHardwareUnknownPropertyError, what CoreAudio answers for
            // a listener it does not know.
            None => Err(WatcherError::os(
                "AudioObjectRemovePropertyListener",
                address.selector,
                0x7768_6F3F,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::property::PropertySelector;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_listener(hits: Arc<AtomicUsize>) -> ListenerProc {
        Arc::new(move |batch: &[PropertyAddress]| {
            hits.fetch_add(batch.len(), Ordering::SeqCst);
        })
    }

    #[test]
    fn shared_listener_gets_one_call_per_batch() {
        let hw = SimulatedHardware::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let listener = counting_listener(hits.clone());
        let out = PropertyAddress::global(PropertySelector::DEFAULT_OUTPUT_DEVICE);
        let devs = PropertyAddress::global(PropertySelector::DEVICES);
        hw.add_listener(&out, listener.clone()).unwrap();
        hw.add_listener(&devs, listener).unwrap();

        assert_eq!(hw.notify(&[out, devs]), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unmatched_address_is_not_delivered() {
        let hw = SimulatedHardware::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let out = PropertyAddress::global(PropertySelector::DEFAULT_OUTPUT_DEVICE);
        hw.add_listener(&out, counting_listener(hits.clone()))
            .unwrap();

        let input = PropertyAddress::global(PropertySelector::DEFAULT_INPUT_DEVICE);
        assert_eq!(hw.notify(&[input]), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn remove_unknown_listener_fails() {
        let hw = SimulatedHardware::new();
        let out = PropertyAddress::global(PropertySelector::DEFAULT_OUTPUT_DEVICE);
        let err = hw.remove_listener(&out, ListenerId(7)).unwrap_err();
        assert_eq!(err.os_status(), Some(0x7768_6F3F));
    }

    #[test]
    fn injected_add_failure_is_one_shot() {
        let hw = SimulatedHardware::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let out = PropertyAddress::global(PropertySelector::DEFAULT_OUTPUT_DEVICE);
        hw.fail_next_add(-1504);
        assert!(hw.add_listener(&out, counting_listener(hits.clone())).is_err());
        assert!(hw.add_listener(&out, counting_listener(hits)).is_ok());
        assert_eq!(hw.listener_count(), 1);
    }
}

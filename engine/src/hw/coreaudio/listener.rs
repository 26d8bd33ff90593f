#![cfg(target_os = "macos")]

use crate::error::WatcherError;
use crate::hw::error_fmt::ca_error;
use crate::hw::property::{PropertyAddress, PropertySelector};
use crate::hw::traits::{HwListenerBackend, ListenerId, ListenerProc};
use coreaudio_sys::{
    AudioObjectAddPropertyListener, AudioObjectID, AudioObjectPropertyAddress,
    AudioObjectRemovePropertyListener, OSStatus, UInt32, kAudioHardwareNoError,
    kAudioObjectSystemObject,
};
use std::collections::HashMap;
use std::os::raw::c_void;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error, warn};

// Trampoline calls currently running, across every backend instance.
static IN_FLIGHT: AtomicUsize = AtomicUsize::new(0);

struct InFlight;

impl InFlight {
    fn enter() -> Self {
        IN_FLIGHT.fetch_add(1, Ordering::SeqCst);
        Self
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        IN_FLIGHT.fetch_sub(1, Ordering::SeqCst);
    }
}

unsafe extern "C" fn system_object_listener(
    _id: AudioObjectID,
    count: UInt32,
    addresses: *const AudioObjectPropertyAddress,
    client_data: *mut c_void,
) -> OSStatus {
    let _in_flight = InFlight::enter();
    let listener = unsafe { &*(client_data as *const ListenerProc) };
    let raw = if addresses.is_null() || count == 0 {
        &[][..]
    } else {
        unsafe { std::slice::from_raw_parts(addresses, count as usize) }
    };
    let batch: Vec<PropertyAddress> = raw.iter().map(from_raw).collect();
    // Unwinding into CoreAudio is undefined behaviour.
    if catch_unwind(AssertUnwindSafe(|| listener(&batch))).is_err() {
        error!("CoreAudio property listener panicked");
    }
    kAudioHardwareNoError as OSStatus
}

fn to_raw(address: &PropertyAddress) -> AudioObjectPropertyAddress {
    AudioObjectPropertyAddress {
        mSelector: address.selector.0,
        mScope: address.scope,
        mElement: address.element,
    }
}

fn from_raw(address: &AudioObjectPropertyAddress) -> PropertyAddress {
    PropertyAddress {
        selector: PropertySelector(address.mSelector),
        scope: address.mScope,
        element: address.mElement,
    }
}

struct Slot {
    address: PropertyAddress,
    client: Box<ListenerProc>,
}

impl Slot {
    fn client_ptr(&self) -> *mut c_void {
        &*self.client as *const ListenerProc as *mut c_void
    }
}

#[derive(Default)]
struct Slots {
    next_id: u64,
    live: HashMap<ListenerId, Slot>,
    // Client data of removed listeners. A notification already in flight
    // may still read it; freed by a later call that finds no trampoline
    // running.
    retired: Vec<Box<ListenerProc>>,
}

impl Slots {
    fn reap(&mut self) {
        if self.retired.is_empty() || IN_FLIGHT.load(Ordering::SeqCst) != 0 {
            return;
        }
        debug!("freeing {} retired listener(s)", self.retired.len());
        self.retired.clear();
    }
}

/// Property listeners on `kAudioObjectSystemObject`.
#[derive(Default)]
pub struct SystemObjectListeners {
    slots: Mutex<Slots>,
}

impl SystemObjectListeners {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl HwListenerBackend for SystemObjectListeners {
    const LABEL: &'static str = "CoreAudio";

    fn add_listener(
        &self,
        address: &PropertyAddress,
        listener: ListenerProc,
    ) -> Result<ListenerId, WatcherError> {
        self.slots().reap();
        let slot = Slot {
            address: *address,
            client: Box::new(listener),
        };
        let raw = to_raw(address);
        let status: OSStatus = unsafe {
            AudioObjectAddPropertyListener(
                kAudioObjectSystemObject,
                &raw,
                Some(system_object_listener),
                slot.client_ptr(),
            )
        };
        if status != kAudioHardwareNoError as OSStatus {
            return Err(WatcherError::os(
                "AudioObjectAddPropertyListener",
                address.selector,
                status,
            ));
        }
        let mut slots = self.slots();
        slots.next_id += 1;
        let id = ListenerId(slots.next_id);
        slots.live.insert(id, slot);
        Ok(id)
    }

    fn remove_listener(
        &self,
        address: &PropertyAddress,
        id: ListenerId,
    ) -> Result<(), WatcherError> {
        let mut slots = self.slots();
        slots.reap();
        let Some(slot) = slots.live.get(&id) else {
            return Err(WatcherError::os(
                "AudioObjectRemovePropertyListener",
                address.selector,
                0x7768_6F3F,
            ));
        };
        let raw = to_raw(&slot.address);
        let status: OSStatus = unsafe {
            AudioObjectRemovePropertyListener(
                kAudioObjectSystemObject,
                &raw,
                Some(system_object_listener),
                slot.client_ptr(),
            )
        };
        if status != kAudioHardwareNoError as OSStatus {
            return Err(WatcherError::os(
                "AudioObjectRemovePropertyListener",
                address.selector,
                status,
            ));
        }
        if let Some(slot) = slots.live.remove(&id) {
            slots.retired.push(slot.client);
        }
        Ok(())
    }
}

impl Drop for SystemObjectListeners {
    fn drop(&mut self) {
        let slots = self.slots();
        for slot in slots.live.values() {
            let raw = to_raw(&slot.address);
            let status: OSStatus = unsafe {
                AudioObjectRemovePropertyListener(
                    kAudioObjectSystemObject,
                    &raw,
                    Some(system_object_listener),
                    slot.client_ptr(),
                )
            };
            if status != kAudioHardwareNoError as OSStatus {
                warn!(
                    "{}",
                    ca_error(
                        &format!("RemovePropertyListener {}", slot.address.selector),
                        status
                    )
                );
            }
        }
    }
}

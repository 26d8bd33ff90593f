use crate::error::WatcherError;
use crate::hw::property::PropertyAddress;
use std::sync::Arc;

/// Called by the audio subsystem with the addresses that changed in one
/// notification, in the order the subsystem reports them.
pub type ListenerProc = Arc<dyn Fn(&[PropertyAddress]) + Send + Sync>;

/// Token for one listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// Property-listener registration on the system audio object.
///
/// Implementations may invoke listeners from any thread.
pub trait HwListenerBackend: Send + Sync {
    const LABEL: &'static str;

    fn add_listener(
        &self,
        address: &PropertyAddress,
        listener: ListenerProc,
    ) -> Result<ListenerId, WatcherError>;

    fn remove_listener(&self, address: &PropertyAddress, id: ListenerId)
    -> Result<(), WatcherError>;
}

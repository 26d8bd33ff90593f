pub mod listener;

pub use self::listener::SystemObjectListeners;

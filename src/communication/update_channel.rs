// update_channel.rs
//
// Single-subscriber dispatch between the simulation clock and its consumer.
// The first registered listener is kept for the channel's lifetime; later
// registrations are ignored. Publishing without a listener drops the message.

use crate::communication::messages::UpdateMessage;
use std::sync::OnceLock;

/// Callback invoked synchronously for every published update.
pub type UpdateListener = Box<dyn Fn(UpdateMessage) + Send + Sync>;

#[derive(Default)]
pub struct UpdateChannel {
    listener: OnceLock<UpdateListener>,
}

impl UpdateChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the listener. Returns `false` if one was already registered,
    /// in which case `listener` is dropped.
    pub fn subscribe<F>(&self, listener: F) -> bool
    where
        F: Fn(UpdateMessage) + Send + Sync + 'static,
    {
        let registered = self.listener.set(Box::new(listener)).is_ok();
        if !registered {
            log::debug!("Update listener already registered; ignoring new subscription");
        }
        registered
    }

    pub fn has_listener(&self) -> bool {
        self.listener.get().is_some()
    }

    /// Delivers `message` to the listener on the calling thread.
    /// Returns whether it was delivered.
    pub fn publish(&self, message: UpdateMessage) -> bool {
        match self.listener.get() {
            Some(listener) => {
                listener(message);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for UpdateChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateChannel")
            .field("has_listener", &self.has_listener())
            .finish()
    }
}

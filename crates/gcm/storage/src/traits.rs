//! Storage traits.

use gcm_core::{Device, Message, MessageStatus};

use crate::DeviceFilter;

/// Device registry operations.
pub trait DeviceStore: Send + Sync {
    /// Get a device by id.
    fn find_device(&self, device_id: &str) -> color_eyre::eyre::Result<Option<Device>>;

    /// Get all devices matching a filter, most recently modified first.
    fn filter_devices(&self, filter: &DeviceFilter) -> color_eyre::eyre::Result<Vec<Device>>;

    /// Insert or update a device by id.
    ///
    /// Fails with [`crate::StoreError::TokenConflict`] when another device
    /// holds the same registration token.
    fn save_device(&self, device: &Device) -> color_eyre::eyre::Result<()>;

    /// Deactivate a device without deleting it. Returns `false` if unknown.
    fn delete_soft_device(&self, device_id: &str) -> color_eyre::eyre::Result<bool>;
}

/// Message record operations.
pub trait MessageStore: Send + Sync {
    /// Insert or update a message, replacing its device links.
    fn save_message(&self, message: &Message) -> color_eyre::eyre::Result<()>;

    /// Get a message by id.
    fn find_message(&self, id: &uuid::Uuid) -> color_eyre::eyre::Result<Option<Message>>;

    /// Get all messages with a status, newest first.
    fn messages_with_status(
        &self,
        status: MessageStatus,
    ) -> color_eyre::eyre::Result<Vec<Message>>;
}

/// Combined storage trait.
pub trait AllStorage: DeviceStore + MessageStore {}

impl<T> AllStorage for T where T: DeviceStore + MessageStore {}

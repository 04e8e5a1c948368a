//! In-process storage implementation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use gcm_core::{Device, Message, MessageStatus};

use crate::traits::*;
use crate::{DeviceFilter, StoreError};

#[derive(Default)]
struct Inner {
    devices: HashMap<String, Device>,
    messages: HashMap<uuid::Uuid, Message>,
}

/// Mutex-guarded in-memory storage with the same semantics as [`crate::SqliteStorage`].
///
/// Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> color_eyre::eyre::Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| color_eyre::eyre::eyre!("memory storage lock poisoned"))
    }
}

impl DeviceStore for MemoryStorage {
    fn find_device(&self, device_id: &str) -> color_eyre::eyre::Result<Option<Device>> {
        Ok(self.lock()?.devices.get(device_id).cloned())
    }

    fn filter_devices(&self, filter: &DeviceFilter) -> color_eyre::eyre::Result<Vec<Device>> {
        let inner = self.lock()?;

        let mut devices: Vec<Device> = inner
            .devices
            .values()
            .filter(|device| filter.matches(device))
            .cloned()
            .collect();
        devices.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));

        Ok(devices)
    }

    fn save_device(&self, device: &Device) -> color_eyre::eyre::Result<()> {
        let mut inner = self.lock()?;

        let conflict = inner.devices.values().any(|other| {
            other.device_id != device.device_id
                && other.registration_token == device.registration_token
        });
        if conflict {
            return Err(StoreError::TokenConflict {
                token: device.registration_token.clone(),
            }
            .into());
        }

        // created_at is fixed at first insert.
        let mut stored = device.clone();
        if let Some(existing) = inner.devices.get(&device.device_id) {
            stored.created_at = existing.created_at;
        }
        inner.devices.insert(stored.device_id.clone(), stored);

        Ok(())
    }

    fn delete_soft_device(&self, device_id: &str) -> color_eyre::eyre::Result<bool> {
        let mut inner = self.lock()?;

        match inner.devices.get_mut(device_id) {
            Some(device) => {
                device.deactivate();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl MessageStore for MemoryStorage {
    fn save_message(&self, message: &Message) -> color_eyre::eyre::Result<()> {
        let mut inner = self.lock()?;

        let mut stored = message.clone();
        if let Some(existing) = inner.messages.get(&message.id) {
            stored.created_at = existing.created_at;
        }
        stored.devices.sort();
        inner.messages.insert(stored.id, stored);

        Ok(())
    }

    fn find_message(&self, id: &uuid::Uuid) -> color_eyre::eyre::Result<Option<Message>> {
        Ok(self.lock()?.messages.get(id).cloned())
    }

    fn messages_with_status(
        &self,
        status: MessageStatus,
    ) -> color_eyre::eyre::Result<Vec<Message>> {
        let inner = self.lock()?;

        let mut messages: Vec<Message> = inner
            .messages
            .values()
            .filter(|message| message.status == status)
            .cloned()
            .collect();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(messages)
    }
}

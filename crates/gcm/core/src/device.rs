//! Registered device types.

use chrono::{DateTime, Utc};

/// A device registered to receive push notifications.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Device {
    /// Unique device identifier, immutable after creation.
    pub device_id: String,
    /// Gateway-assigned push token. Unique across all devices.
    pub registration_token: String,
    /// Optional human-readable name.
    pub display_name: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub modified_at: DateTime<Utc>,
    /// Whether the device currently receives pushes.
    pub is_active: bool,
}

impl Device {
    /// Create a new, inactive device.
    pub fn new(device_id: impl Into<String>, registration_token: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            device_id: device_id.into(),
            registration_token: registration_token.into(),
            display_name: None,
            created_at: now,
            modified_at: now,
            is_active: false,
        }
    }

    /// Set the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Set the active flag.
    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    /// Mark the device inactive and bump `modified_at`.
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.touch();
    }

    /// Bump `modified_at` to now.
    pub fn touch(&mut self) {
        self.modified_at = Utc::now();
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.device_id)
    }
}

//! Device query filters.

use gcm_core::Device;

/// Device query. Every set constraint must match; an empty filter matches all devices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceFilter {
    /// Restrict to these device ids.
    pub device_ids: Option<Vec<String>>,
    /// Restrict to these registration tokens.
    pub registration_tokens: Option<Vec<String>>,
    /// Restrict by active flag.
    pub active: Option<bool>,
}

impl DeviceFilter {
    /// Match every device.
    pub fn all() -> Self {
        Self::default()
    }

    /// Match devices by id.
    pub fn by_ids<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            device_ids: Some(ids.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Match devices by registration token.
    pub fn by_tokens<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            registration_tokens: Some(tokens.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Additionally restrict by active flag.
    pub fn active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    /// Whether `device` satisfies the filter.
    pub fn matches(&self, device: &Device) -> bool {
        if let Some(ids) = &self.device_ids {
            if !ids.contains(&device.device_id) {
                return false;
            }
        }

        if let Some(tokens) = &self.registration_tokens {
            if !tokens.contains(&device.registration_token) {
                return false;
            }
        }

        self.active.is_none_or(|active| device.is_active == active)
    }
}

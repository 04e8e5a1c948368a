//! Database models.

use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use gcm_core::{Device, Message};

use crate::StoreError;
use crate::schema::{devices, message_devices, messages};

/// Device record.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = devices, primary_key(device_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DeviceRow {
    pub device_id: String,
    pub registration_token: String,
    pub display_name: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub modified_at: NaiveDateTime,
}

impl From<DeviceRow> for Device {
    fn from(row: DeviceRow) -> Self {
        Self {
            device_id: row.device_id,
            registration_token: row.registration_token,
            display_name: row.display_name,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            modified_at: DateTime::from_naive_utc_and_offset(row.modified_at, Utc),
            is_active: row.is_active,
        }
    }
}

/// New device for insertion.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = devices)]
pub struct NewDevice<'a> {
    pub device_id: &'a str,
    pub registration_token: &'a str,
    pub display_name: Option<&'a str>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub modified_at: NaiveDateTime,
}

impl<'a> From<&'a Device> for NewDevice<'a> {
    fn from(device: &'a Device) -> Self {
        Self {
            device_id: &device.device_id,
            registration_token: &device.registration_token,
            display_name: device.display_name.as_deref(),
            is_active: device.is_active,
            created_at: device.created_at.naive_utc(),
            modified_at: device.modified_at.naive_utc(),
        }
    }
}

/// Message record.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = messages)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MessageRow {
    pub id: String,
    pub topic: String,
    pub created_at: NaiveDateTime,
    pub payload: String,
    pub response: String,
    pub status: String,
}

impl MessageRow {
    /// Convert to a domain message with its linked device ids.
    pub fn into_message(self, devices: Vec<String>) -> color_eyre::eyre::Result<Message> {
        let status = self
            .status
            .parse::<gcm_core::MessageStatus>()
            .map_err(|_| StoreError::InvalidStatus {
                id: self.id.clone(),
                status: self.status.clone(),
            })?;

        let id = uuid::Uuid::parse_str(&self.id)
            .map_err(|e| color_eyre::eyre::eyre!("invalid message id {}: {}", self.id, e))?;

        Ok(Message {
            id,
            topic: self.topic,
            created_at: DateTime::from_naive_utc_and_offset(self.created_at, Utc),
            payload: self.payload,
            raw_response: self.response,
            status,
            devices,
        })
    }
}

/// New message for insertion.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = messages)]
pub struct NewMessage<'a> {
    pub id: String,
    pub topic: &'a str,
    pub created_at: NaiveDateTime,
    pub payload: &'a str,
    pub response: &'a str,
    pub status: &'a str,
}

impl<'a> From<&'a Message> for NewMessage<'a> {
    fn from(message: &'a Message) -> Self {
        Self {
            id: message.id.to_string(),
            topic: &message.topic,
            created_at: message.created_at.naive_utc(),
            payload: &message.payload,
            response: &message.raw_response,
            status: message.status.as_str(),
        }
    }
}

/// Message-to-device link for insertion.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = message_devices)]
pub struct NewMessageDevice<'a> {
    pub message_id: &'a str,
    pub device_id: &'a str,
}

//! Message record types.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::DispatchError;

/// Delivery status of a message.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageStatus {
    /// Gateway accepted every chunk.
    Sent,
    /// Persisted, network call in flight (or aborted mid-flight).
    Pending,
    /// At least one chunk reported a top-level failure.
    Failed,
    /// Never sent.
    #[default]
    None,
}

impl MessageStatus {
    /// Literal stored and exposed for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "SENT",
            Self::Pending => "PENDING",
            Self::Failed => "FAILED",
            Self::None => "NONE",
        }
    }

    /// `SENT` or `FAILED`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Sent | Self::Failed)
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown status literal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown message status: {0}")]
pub struct ParseStatusError(pub String);

impl std::str::FromStr for MessageStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SENT" => Ok(Self::Sent),
            "PENDING" => Ok(Self::Pending),
            "FAILED" => Ok(Self::Failed),
            "NONE" => Ok(Self::None),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// How per-chunk outcomes fold into the final message status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusPolicy {
    /// Each chunk overwrites the status; the last chunk processed decides.
    #[default]
    LastChunkWins,
    /// Once a chunk fails, later successful chunks leave it `FAILED`.
    AnyFailureWins,
}

/// What makes a gateway reply a failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureRule {
    /// An `error` or `failure` key is present, whatever its value.
    #[default]
    KeyPresent,
    /// A non-null `error`, or a positive `failure` count.
    NonZero,
}

/// One dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    /// Durable identity.
    pub id: Uuid,
    /// Topic name, empty when targeting explicit devices.
    pub topic: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Serialized notification body.
    pub payload: String,
    /// Serialized gateway response, kept for audit.
    pub raw_response: String,
    /// Delivery status.
    pub status: MessageStatus,
    /// Device ids targeted at send time.
    pub devices: Vec<String>,
}

impl Message {
    /// Create a fresh, unsent message.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: String::new(),
            created_at: Utc::now(),
            payload: String::new(),
            raw_response: String::new(),
            status: MessageStatus::None,
            devices: Vec::new(),
        }
    }

    /// Move `NONE -> PENDING`, store the payload and clear the topic.
    pub fn begin_send(&mut self, payload: &serde_json::Value) -> Result<(), DispatchError> {
        if self.status != MessageStatus::None {
            return Err(DispatchError::AlreadyDispatched {
                id: self.id,
                status: self.status,
            });
        }

        self.status = MessageStatus::Pending;
        self.payload = payload.to_string();
        self.topic.clear();
        Ok(())
    }

    /// Fold one chunk outcome into the status.
    pub fn record_outcome(&mut self, outcome: MessageStatus, policy: StatusPolicy) {
        match policy {
            StatusPolicy::LastChunkWins => self.status = outcome,
            StatusPolicy::AnyFailureWins => {
                if !(self.status == MessageStatus::Failed && outcome == MessageStatus::Sent) {
                    self.status = outcome;
                }
            }
        }
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.payload)
    }
}

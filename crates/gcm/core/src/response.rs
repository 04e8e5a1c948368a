//! Gateway response types.

use serde::Deserialize as _;

use crate::{DispatchError, FailureRule};

/// Per-recipient error codes meaning the registration token is permanently unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum InvalidIdError {
    /// Token is malformed or unknown to the gateway.
    InvalidRegistration,
    /// App was uninstalled or the token expired.
    NotRegistered,
    /// Token belongs to a different sender.
    MismatchSenderId,
}

impl InvalidIdError {
    /// All codes that trigger device deactivation.
    pub const ALL: [Self; 3] = [
        Self::InvalidRegistration,
        Self::NotRegistered,
        Self::MismatchSenderId,
    ];

    /// Gateway literal for this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRegistration => "InvalidRegistration",
            Self::NotRegistered => "NotRegistered",
            Self::MismatchSenderId => "MismatchSenderId",
        }
    }

    /// Recognize a gateway error code. Anything else (transient errors
    /// included) is `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == code)
    }
}

impl std::fmt::Display for InvalidIdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery result for one recipient.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RecipientResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    /// Canonical token the gateway wants used instead of the one sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RecipientResult {
    /// Successful delivery with the given message id.
    pub fn delivered(message_id: impl Into<String>) -> Self {
        Self {
            message_id: Some(message_id.into()),
            ..Default::default()
        }
    }

    /// Failed delivery with the given error code.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// The error code, if it marks the token as invalid.
    pub fn invalid_id_error(&self) -> Option<InvalidIdError> {
        self.error.as_deref().and_then(InvalidIdError::from_code)
    }
}

/// Gateway reply body for one request.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChunkResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multicast_id: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<u64>,

    /// Failure count. An explicit `null` is kept as `Some(Value::Null)`.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub failure: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_ids: Option<u64>,

    /// Topic sends answer with a bare message id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<serde_json::Value>,

    /// Request-level error. An explicit `null` is kept as `Some(Value::Null)`.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<serde_json::Value>,

    /// Per-recipient results, in the order the recipients were sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<RecipientResult>>,

    #[serde(default, flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Maps a key that is present, even as `null`, to `Some`.
fn present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

impl ChunkResult {
    /// Whether this reply marks the message failed under `rule`.
    pub fn is_failure(&self, rule: FailureRule) -> bool {
        match rule {
            FailureRule::KeyPresent => self.error.is_some() || self.failure.is_some(),
            FailureRule::NonZero => {
                self.error.as_ref().is_some_and(|e| !e.is_null())
                    || self
                        .failure
                        .as_ref()
                        .and_then(serde_json::Value::as_u64)
                        .is_some_and(|n| n > 0)
            }
        }
    }
}

/// Recipients of one gateway request and the reply they got.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResponseChunk {
    /// Registration tokens sent in this request.
    pub recipients: Vec<String>,
    /// Gateway reply.
    pub result: ChunkResult,
}

impl ResponseChunk {
    /// Create a chunk.
    pub fn new(recipients: Vec<String>, result: ChunkResult) -> Self {
        Self { recipients, result }
    }

    /// Pair each recipient with its result.
    ///
    /// A chunk without `results` pairs to nothing. A `results` list whose
    /// length differs from `recipients` is rejected rather than truncated.
    pub fn paired(&self) -> Result<Vec<(&str, &RecipientResult)>, DispatchError> {
        let Some(results) = &self.result.results else {
            return Ok(Vec::new());
        };

        if results.len() != self.recipients.len() {
            return Err(DispatchError::MalformedResponse {
                recipients: self.recipients.len(),
                results: results.len(),
            });
        }

        Ok(self
            .recipients
            .iter()
            .map(String::as_str)
            .zip(results)
            .collect())
    }
}

/// Everything the gateway returned for one `deliver` call.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum GatewayResponse {
    /// One request was made.
    Single(ResponseChunk),
    /// The recipients were split across several requests.
    Chunked(Vec<ResponseChunk>),
}

impl GatewayResponse {
    /// All chunks, in the order the gateway returned them.
    pub fn chunks(&self) -> &[ResponseChunk] {
        match self {
            Self::Single(chunk) => std::slice::from_ref(chunk),
            Self::Chunked(chunks) => chunks,
        }
    }
}

impl From<ResponseChunk> for GatewayResponse {
    fn from(chunk: ResponseChunk) -> Self {
        Self::Single(chunk)
    }
}

//! Outgoing request options.

/// Delivery priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Normal,
    High,
}

/// Options merged into the gateway request body alongside the payload.
///
/// Unset fields are left out of the request so the gateway applies its own
/// defaults. `extra` is flattened into the body for options without a
/// dedicated field.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SendOptions {
    /// Destination directive, e.g. `/topics/news`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapse_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_available: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_while_idle: Option<bool>,

    /// Seconds the gateway keeps the message for offline devices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_live: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restricted_package_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,

    #[serde(default, flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SendOptions {
    /// Topic destination directive for `topic`.
    pub fn topic_destination(topic: &str) -> String {
        format!("/topics/{topic}")
    }

    /// Target a topic, replacing any previous destination.
    pub fn with_topic(mut self, topic: &str) -> Self {
        self.to = Some(Self::topic_destination(topic));
        self
    }
}

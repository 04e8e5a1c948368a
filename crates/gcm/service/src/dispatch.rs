//! Message dispatch.

use color_eyre::eyre::WrapErr as _;
use gcm_core::{
    Device, FailureRule, GatewayResponse, Message, MessageStatus, SendOptions, StatusPolicy,
};
use gcm_push::Gateway;
use gcm_storage::{AllStorage, DeviceFilter};

use crate::{Deactivation, post_send};

/// Outcome of one dispatch.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SendReport {
    /// Id of the persisted message record.
    pub message_id: uuid::Uuid,
    /// Final status.
    pub status: MessageStatus,
    /// Raw gateway response.
    pub response: GatewayResponse,
    /// Devices deactivated while reconciling the response.
    pub deactivated: Vec<Deactivation>,
}

/// Sends message records through a gateway and reconciles the replies.
pub struct Dispatcher<S, G> {
    store: S,
    gateway: G,
    policy: StatusPolicy,
    rule: FailureRule,
}

impl<S, G> Dispatcher<S, G> {
    /// Create a dispatcher using the default status policy and failure rule.
    pub fn new(store: S, gateway: G) -> Self {
        Self {
            store,
            gateway,
            policy: StatusPolicy::default(),
            rule: FailureRule::default(),
        }
    }

    /// Use a different status policy.
    pub fn with_status_policy(mut self, policy: StatusPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use a different failure rule.
    pub fn with_failure_rule(mut self, rule: FailureRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }
}

impl<S, G> Dispatcher<S, G>
where
    S: AllStorage,
    G: Gateway,
{
    /// Send `payload` for `message`.
    ///
    /// The record is persisted as `PENDING` before the gateway is called and
    /// again with its final status after every chunk has been reconciled.
    /// A `topic` replaces the registration ids with a `/topics/<topic>`
    /// destination. Gateway and store failures propagate, leaving the record
    /// `PENDING`.
    pub async fn send(
        &self,
        message: &mut Message,
        payload: &serde_json::Value,
        registration_ids: &[String],
        topic: Option<&str>,
        mut options: SendOptions,
    ) -> color_eyre::eyre::Result<SendReport> {
        message.begin_send(payload)?;

        let mut registration_ids = registration_ids;
        if let Some(topic) = topic.filter(|t| !t.is_empty()) {
            message.topic = topic.to_string();
            options.to = Some(SendOptions::topic_destination(topic));
            registration_ids = &[];
        }

        self.store
            .save_message(message)
            .wrap_err("failed to persist pending message")?;

        tracing::info!(
            message_id = %message.id,
            recipients = registration_ids.len(),
            topic = %message.topic,
            "dispatching message"
        );

        let response = self
            .gateway
            .deliver(payload, registration_ids, &options)
            .await?;

        message.raw_response =
            serde_json::to_string(&response).wrap_err("failed to serialize gateway response")?;

        let mut deactivated = Vec::new();
        for chunk in response.chunks() {
            deactivated.extend(post_send(&self.store, message, chunk, self.policy, self.rule)?);
        }

        self.store
            .save_message(message)
            .wrap_err("failed to persist message status")?;

        tracing::info!(
            message_id = %message.id,
            status = %message.status,
            chunks = response.chunks().len(),
            deactivated = deactivated.len(),
            "message dispatched"
        );

        Ok(SendReport {
            message_id: message.id,
            status: message.status,
            response,
            deactivated,
        })
    }

    /// Send a new message to `devices`.
    ///
    /// Returns `None` without creating a message when `devices` is empty.
    pub async fn send_to_devices(
        &self,
        devices: &[Device],
        payload: &serde_json::Value,
        options: SendOptions,
    ) -> color_eyre::eyre::Result<Option<SendReport>> {
        if devices.is_empty() {
            tracing::debug!("no devices to send to");
            return Ok(None);
        }

        let mut message = Message::new();
        message.devices = devices.iter().map(|d| d.device_id.clone()).collect();

        let registration_ids: Vec<String> = devices
            .iter()
            .map(|d| d.registration_token.clone())
            .collect();

        self.send(&mut message, payload, &registration_ids, None, options)
            .await
            .map(Some)
    }

    /// Send a new message to every device matching `filter`.
    pub async fn send_to_filtered(
        &self,
        filter: &DeviceFilter,
        payload: &serde_json::Value,
        options: SendOptions,
    ) -> color_eyre::eyre::Result<Option<SendReport>> {
        let devices = self
            .store
            .filter_devices(filter)
            .wrap_err("failed to query devices")?;

        self.send_to_devices(&devices, payload, options).await
    }

    /// Send a new message to a single device.
    pub async fn send_to_device(
        &self,
        device: &Device,
        payload: &serde_json::Value,
        options: SendOptions,
    ) -> color_eyre::eyre::Result<SendReport> {
        let mut message = Message::new();
        message.devices = vec![device.device_id.clone()];

        self.send(
            &mut message,
            payload,
            std::slice::from_ref(&device.registration_token),
            None,
            options,
        )
        .await
    }

    /// Send a new message to a topic.
    pub async fn send_to_topic(
        &self,
        topic: &str,
        payload: &serde_json::Value,
        options: SendOptions,
    ) -> color_eyre::eyre::Result<SendReport> {
        let mut message = Message::new();
        self.send(&mut message, payload, &[], Some(topic), options)
            .await
    }
}

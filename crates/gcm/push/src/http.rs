//! HTTP gateway client for the legacy GCM/FCM send endpoint.

use color_eyre::eyre::WrapErr as _;
use gcm_core::{ChunkResult, GatewayResponse, ResponseChunk, SendOptions};
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Gateway;

/// Default send endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://fcm.googleapis.com/fcm/send";

/// Most registration ids the endpoint accepts in one request.
pub const MAX_RECIPIENTS_PER_REQUEST: usize = 1000;

/// Errors that can occur when talking to the gateway.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Transport-level failure.
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("gateway returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Reply body is not a gateway result object.
    #[error("failed to decode gateway reply: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Gateway connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Server API key.
    pub api_key: String,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_max_recipients")]
    pub max_recipients_per_request: usize,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_max_recipients() -> usize {
    MAX_RECIPIENTS_PER_REQUEST
}

impl GatewayConfig {
    /// Settings for the default endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: default_endpoint(),
            max_recipients_per_request: default_max_recipients(),
        }
    }
}

/// Gateway client posting JSON requests with key authorization.
pub struct HttpGateway {
    client: Client,
    config: GatewayConfig,
}

impl HttpGateway {
    /// Create a client with the given settings.
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn request_body(
        payload: &serde_json::Value,
        registration_ids: Option<&[String]>,
        options: &SendOptions,
    ) -> Result<serde_json::Value, GatewayError> {
        let mut body = match serde_json::to_value(options)? {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };

        body.insert("data".to_string(), payload.clone());
        if let Some(ids) = registration_ids {
            body.insert("registration_ids".to_string(), serde_json::json!(ids));
        }

        Ok(serde_json::Value::Object(body))
    }

    async fn post(&self, body: &serde_json::Value) -> Result<ChunkResult, GatewayError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .header(header::AUTHORIZATION, format!("key={}", self.config.api_key))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl Gateway for HttpGateway {
    async fn deliver(
        &self,
        payload: &serde_json::Value,
        registration_ids: &[String],
        options: &SendOptions,
    ) -> color_eyre::eyre::Result<GatewayResponse> {
        if let Some(to) = &options.to {
            tracing::debug!(to = %to, "posting destination request");

            let body = Self::request_body(payload, None, options)?;
            let result = self
                .post(&body)
                .await
                .wrap_err_with(|| format!("request to {} failed", to))?;

            return Ok(GatewayResponse::Single(ResponseChunk::new(
                Vec::new(),
                result,
            )));
        }

        let batches: Vec<&[String]> = if registration_ids.is_empty() {
            vec![registration_ids]
        } else {
            registration_ids
                .chunks(self.config.max_recipients_per_request.max(1))
                .collect()
        };

        let mut chunks = Vec::with_capacity(batches.len());
        for batch in batches {
            tracing::debug!(recipients = batch.len(), "posting multicast request");

            let body = Self::request_body(payload, Some(batch), options)?;
            let result = self
                .post(&body)
                .await
                .wrap_err_with(|| format!("request for {} recipients failed", batch.len()))?;

            chunks.push(ResponseChunk::new(batch.to_vec(), result));
        }

        if chunks.len() == 1 {
            Ok(GatewayResponse::Single(chunks.remove(0)))
        } else {
            Ok(GatewayResponse::Chunked(chunks))
        }
    }
}

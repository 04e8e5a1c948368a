//! Test doubles.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use gcm_core::{GatewayResponse, MessageStatus, ResponseChunk, SendOptions};
use gcm_push::Gateway;
use gcm_storage::MessageStore;

/// Build a chunk from recipients and a raw reply body.
pub fn chunk(recipients: &[&str], result: serde_json::Value) -> ResponseChunk {
    ResponseChunk::new(
        recipients.iter().map(|r| r.to_string()).collect(),
        serde_json::from_value(result).unwrap(),
    )
}

/// One recorded `deliver` call.
#[derive(Debug, Clone)]
pub struct Call {
    pub payload: serde_json::Value,
    pub registration_ids: Vec<String>,
    pub options: SendOptions,
    /// Messages persisted as `PENDING` when the call was made.
    pub pending: Vec<uuid::Uuid>,
}

enum Reply {
    Response(GatewayResponse),
    Failure(String),
}

/// Gateway returning scripted replies in order and recording every call.
#[derive(Clone)]
pub struct ScriptedGateway {
    store: Arc<dyn MessageStore>,
    replies: Arc<Mutex<VecDeque<Reply>>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl ScriptedGateway {
    pub fn new<S>(store: &S) -> Self
    where
        S: MessageStore + Clone + 'static,
    {
        Self {
            store: Arc::new(store.clone()),
            replies: Arc::default(),
            calls: Arc::default(),
        }
    }

    pub fn reply(self, response: impl Into<GatewayResponse>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Reply::Response(response.into()));
        self
    }

    pub fn reply_chunks(self, chunks: Vec<ResponseChunk>) -> Self {
        self.reply(GatewayResponse::Chunked(chunks))
    }

    pub fn fail(self, error: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Reply::Failure(error.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl Gateway for ScriptedGateway {
    async fn deliver(
        &self,
        payload: &serde_json::Value,
        registration_ids: &[String],
        options: &SendOptions,
    ) -> color_eyre::eyre::Result<GatewayResponse> {
        let pending = self
            .store
            .messages_with_status(MessageStatus::Pending)?
            .into_iter()
            .map(|message| message.id)
            .collect();

        self.calls.lock().unwrap().push(Call {
            payload: payload.clone(),
            registration_ids: registration_ids.to_vec(),
            options: options.clone(),
            pending,
        });

        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::Failure(error)) => Err(color_eyre::eyre::eyre!(error)),
            None => Err(color_eyre::eyre::eyre!("no scripted reply left")),
        }
    }
}

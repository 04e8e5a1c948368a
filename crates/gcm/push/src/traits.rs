//! Gateway traits.

use gcm_core::{GatewayResponse, SendOptions};

/// Messaging gateway client.
#[trait_variant::make(Send)]
pub trait Gateway: Send + Sync {
    /// Deliver `payload` to the given registration tokens, or to the
    /// destination in `options.to` when set.
    ///
    /// Returns one chunk per request made, each listing the tokens it carried.
    async fn deliver(
        &self,
        payload: &serde_json::Value,
        registration_ids: &[String],
        options: &SendOptions,
    ) -> color_eyre::eyre::Result<GatewayResponse>;
}

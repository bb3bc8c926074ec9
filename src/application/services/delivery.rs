use async_trait::async_trait;
use serde::Deserialize;

/// Provider acknowledgement for one accepted request. A multipart send
/// surfaces only the receipt of its final part.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryReceipt {
    pub message: String,
    #[serde(rename = "messageId")]
    pub message_id: String,
}

/// Outbound delivery capability. Implementations own provider framing,
/// including splitting oversized content into provider-compliant parts.
#[async_trait]
pub trait DeliveryDriver: Send + Sync {
    async fn send(&self, recipient: &str, content: &str) -> anyhow::Result<DeliveryReceipt>;
}

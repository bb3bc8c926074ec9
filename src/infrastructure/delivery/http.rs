use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header::CONTENT_TYPE};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::application::services::delivery::{DeliveryDriver, DeliveryReceipt};

/// Hard provider limit for a single request.
pub const MAX_SINGLE_MESSAGE_CHARS: usize = 160;
/// Chunk size for multipart content, leaving room for the `[i/n]` marker.
pub const SEGMENT_CHARS: usize = 153;

#[derive(Debug, Error)]
pub enum SmsGatewayError {
    #[error("failed to encode provider request")]
    Encode(#[source] serde_json::Error),
    #[error("failed to send request to provider")]
    Transport(#[source] reqwest::Error),
    #[error("provider returned unexpected status {0}")]
    UnexpectedStatus(u16),
    #[error("failed to read provider response body")]
    ReadBody(#[source] reqwest::Error),
    #[error("failed to decode provider response")]
    Decode(#[source] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct ProviderRequest<'a> {
    to: &'a str,
    content: &'a str,
}

/// Synchronous-per-part HTTP driver for the SMS provider. Oversized content
/// is segmented and the parts are submitted strictly in order, each only
/// after the previous one was accepted. A part failure aborts the remainder;
/// parts already accepted by the provider are not rolled back.
pub struct HttpSmsGateway {
    http: Client,
    provider_url: String,
}

impl HttpSmsGateway {
    pub fn new(provider_url: String) -> anyhow::Result<Arc<dyn DeliveryDriver>> {
        let http = Client::builder()
            .user_agent("dispatch-service/sms-gateway")
            .build()?;
        Ok(Arc::new(Self { http, provider_url }) as Arc<dyn DeliveryDriver>)
    }

    async fn send_part(
        &self,
        recipient: &str,
        part: &str,
    ) -> Result<DeliveryReceipt, SmsGatewayError> {
        let body = serde_json::to_vec(&ProviderRequest {
            to: recipient,
            content: part,
        })
        .map_err(SmsGatewayError::Encode)?;

        let response = self
            .http
            .post(&self.provider_url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(SmsGatewayError::Transport)?;

        let status = response.status();
        if status != StatusCode::ACCEPTED {
            return Err(SmsGatewayError::UnexpectedStatus(status.as_u16()));
        }

        let raw = response.text().await.map_err(SmsGatewayError::ReadBody)?;
        let receipt = serde_json::from_str(&raw).map_err(SmsGatewayError::Decode)?;
        Ok(receipt)
    }
}

#[async_trait]
impl DeliveryDriver for HttpSmsGateway {
    async fn send(&self, recipient: &str, content: &str) -> anyhow::Result<DeliveryReceipt> {
        let parts = segment_content(content);
        if parts.len() > 1 {
            debug!(
                recipient,
                parts = parts.len(),
                "content exceeds single message limit, sending multipart"
            );
        }

        let mut receipt = self.send_part(recipient, &parts[0]).await?;
        for part in &parts[1..] {
            receipt = self.send_part(recipient, part).await?;
        }

        info!(
            recipient,
            provider_message_id = %receipt.message_id,
            "message accepted by provider"
        );
        Ok(receipt)
    }
}

/// Splits content into provider-compliant parts. Content within the single
/// message limit is returned as-is; longer content becomes ordered chunks of
/// at most SEGMENT_CHARS characters, each tagged with an appended `[i/n]`
/// marker. Concatenating the chunks without their markers reconstructs the
/// original content exactly.
fn segment_content(content: &str) -> Vec<String> {
    let chars: Vec<char> = content.chars().collect();
    if chars.len() <= MAX_SINGLE_MESSAGE_CHARS {
        return vec![content.to_owned()];
    }

    let total = chars.len().div_ceil(SEGMENT_CHARS);
    chars
        .chunks(SEGMENT_CHARS)
        .enumerate()
        .map(|(index, chunk)| {
            let mut part: String = chunk.iter().collect();
            part.push_str(&format!("[{}/{}]", index + 1, total));
            part
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    use super::*;

    fn strip_marker(part: &str, index: usize, total: usize) -> String {
        let marker = format!("[{}/{}]", index + 1, total);
        part.strip_suffix(&marker)
            .unwrap_or_else(|| panic!("part {index} missing marker {marker}"))
            .to_owned()
    }

    #[test]
    fn short_content_is_a_single_unmodified_part() {
        let content = "a".repeat(160);
        assert_eq!(segment_content(&content), vec![content.clone()]);
    }

    #[test]
    fn oversized_content_is_segmented_with_markers() {
        let content = "x".repeat(400);
        let parts = segment_content(&content);

        assert_eq!(parts.len(), 400usize.div_ceil(SEGMENT_CHARS));
        for (index, part) in parts.iter().enumerate() {
            let body = strip_marker(part, index, parts.len());
            if index < parts.len() - 1 {
                assert_eq!(body.chars().count(), SEGMENT_CHARS);
            }
        }
    }

    #[test]
    fn concatenated_parts_reconstruct_the_original() {
        let content: String = ('a'..='z').cycle().take(1000).collect();
        let parts = segment_content(&content);

        let reconstructed: String = parts
            .iter()
            .enumerate()
            .map(|(index, part)| strip_marker(part, index, parts.len()))
            .collect();
        assert_eq!(reconstructed, content);
    }

    #[test]
    fn segmentation_counts_characters_not_bytes() {
        let content = "ü".repeat(161);
        let parts = segment_content(&content);

        assert_eq!(parts.len(), 2);
        let body = strip_marker(&parts[0], 0, 2);
        assert_eq!(body.chars().count(), SEGMENT_CHARS);
    }

    fn gateway(provider_url: String) -> HttpSmsGateway {
        HttpSmsGateway {
            http: Client::new(),
            provider_url,
        }
    }

    fn accepted_response() -> ResponseTemplate {
        ResponseTemplate::new(202).set_body_json(json!({
            "message": "Accepted",
            "messageId": "msg-42"
        }))
    }

    #[tokio::test]
    async fn single_part_send_posts_content_unmodified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"to": "+123", "content": "hi"})))
            .respond_with(accepted_response())
            .expect(1)
            .mount(&server)
            .await;

        let driver = gateway(server.uri());
        let receipt = driver.send("+123", "hi").await.unwrap();

        assert_eq!(receipt.message, "Accepted");
        assert_eq!(receipt.message_id, "msg-42");
    }

    #[tokio::test]
    async fn non_accepted_status_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "ok",
                "messageId": "msg-1"
            })))
            .mount(&server)
            .await;

        let driver = gateway(server.uri());
        let err = driver.send("+123", "hi").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SmsGatewayError>(),
            Some(SmsGatewayError::UnexpectedStatus(200))
        ));
    }

    #[tokio::test]
    async fn undecodable_body_is_a_failure_even_after_accepted_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202).set_body_string("not-json"))
            .mount(&server)
            .await;

        let driver = gateway(server.uri());
        let err = driver.send("+123", "hi").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SmsGatewayError>(),
            Some(SmsGatewayError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn multipart_send_issues_one_request_per_part_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(accepted_response())
            .expect(2)
            .mount(&server)
            .await;

        let content = "a".repeat(170);
        let driver = gateway(server.uri());
        let receipt = driver.send("+123", &content).await.unwrap();
        assert_eq!(receipt.message_id, "msg-42");

        let requests = server.received_requests().await.unwrap();
        let bodies: Vec<String> = requests
            .iter()
            .map(|request: &Request| {
                let value: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
                value["content"].as_str().unwrap().to_owned()
            })
            .collect();

        assert_eq!(bodies.len(), 2);
        assert!(bodies[0].ends_with("[1/2]"));
        assert!(bodies[1].ends_with("[2/2]"));
        assert_eq!(bodies[0].chars().count(), SEGMENT_CHARS + "[1/2]".len());
    }

    #[tokio::test]
    async fn multipart_fails_fast_after_a_rejected_part() {
        let server = MockServer::start().await;
        // First part is accepted, every later request is rejected.
        Mock::given(method("POST"))
            .respond_with(accepted_response())
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let content = "b".repeat(400);
        let driver = gateway(server.uri());
        let err = driver.send("+123", &content).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SmsGatewayError>(),
            Some(SmsGatewayError::UnexpectedStatus(500))
        ));

        // Part 1 was already handed to the provider; nothing compensates it.
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
    }
}

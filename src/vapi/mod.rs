//! VAPI REST client and webhook payload types.

pub mod tools;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VapiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("VAPI private key not configured")]
    NotConfigured,
}

#[derive(Clone)]
pub struct VapiClient {
    client: Client,
    private_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
pub struct OutboundCall {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl VapiClient {
    pub fn new(private_key: String) -> Self {
        Self {
            client: Client::new(),
            private_key,
            base_url: "https://api.vapi.ai".to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(private_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            private_key,
            base_url,
        }
    }

    /// Trigger an outbound assistant call, overriding the assistant's
    /// server URL so events land on our webhook.
    pub async fn start_phone_call(
        &self,
        assistant_id: &str,
        phone_number_id: &str,
        customer_number: &str,
        customer_name: &str,
        server_url: &str,
    ) -> Result<OutboundCall, VapiError> {
        if self.private_key.is_empty() {
            return Err(VapiError::NotConfigured);
        }

        let body = StartCallRequest {
            assistant_id,
            phone_number_id,
            customer: CustomerRef {
                number: customer_number,
                name: customer_name,
            },
            assistant_overrides: AssistantOverrides { server_url },
        };

        let response = self
            .client
            .post(format!("{}/call/phone", self.base_url))
            .bearer_auth(&self.private_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let payload: Value = response.json().await.unwrap_or(Value::Null);
            let message = payload
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Failed to initiate call")
                .to_string();
            return Err(VapiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StartCallRequest<'a> {
    assistant_id: &'a str,
    phone_number_id: &'a str,
    customer: CustomerRef<'a>,
    assistant_overrides: AssistantOverrides<'a>,
}

#[derive(Serialize)]
struct CustomerRef<'a> {
    number: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AssistantOverrides<'a> {
    server_url: &'a str,
}

// ---------------------------------------------------------------------------
// Webhook payloads

/// Envelope VAPI posts to the server URL for every call event.
#[derive(Debug, Default, Deserialize)]
pub struct VapiWebhook {
    #[serde(default)]
    pub message: VapiMessage,
}

#[derive(Debug, Default, Deserialize)]
pub struct VapiMessage {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub call: Option<VapiCall>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "endedReason", default)]
    pub ended_reason: Option<String>,
    /// Live transcript snapshot on conversation-update events.
    #[serde(default)]
    pub conversation: Vec<ConversationTurn>,
    /// Final message list on end-of-call-report events.
    #[serde(default)]
    pub messages: Vec<ConversationTurn>,
    #[serde(default)]
    pub artifact: Option<VapiArtifact>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VapiArtifact {
    #[serde(default)]
    pub messages: Vec<ConversationTurn>,
}

#[derive(Debug, Deserialize)]
pub struct VapiCall {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub customer: Option<VapiCustomer>,
    #[serde(rename = "startedAt")]
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl VapiCall {
    pub fn is_inbound(&self) -> bool {
        self.kind.as_deref() == Some("inboundPhoneCall")
    }

    pub fn customer_number(&self) -> Option<&str> {
        self.customer.as_ref().and_then(|c| c.number.as_deref())
    }
}

#[derive(Debug, Deserialize)]
pub struct VapiCustomer {
    pub number: Option<String>,
}

/// One conversation turn. Depending on the event type the text arrives
/// under `content` or `message`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationTurn {
    pub role: Option<String>,
    pub content: Option<String>,
    pub message: Option<String>,
}

impl ConversationTurn {
    pub fn text(&self) -> Option<&str> {
        self.content
            .as_deref()
            .or(self.message.as_deref())
            .filter(|t| !t.is_empty())
    }

    /// System turns and empty turns are never persisted.
    pub fn is_spoken(&self) -> bool {
        match self.role.as_deref() {
            None | Some("system") => false,
            Some(_) => self.text().is_some(),
        }
    }
}

impl VapiMessage {
    /// The final transcript can arrive either at the top level or
    /// nested under the artifact.
    pub fn report_messages(&self) -> &[ConversationTurn] {
        if !self.messages.is_empty() {
            &self.messages
        } else if let Some(artifact) = &self.artifact {
            &artifact.messages
        } else {
            &[]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_end_of_call_report() {
        let payload = serde_json::json!({
            "message": {
                "type": "end-of-call-report",
                "endedReason": "customer-ended-call",
                "call": {
                    "id": "vapi-abc",
                    "type": "inboundPhoneCall",
                    "customer": { "number": "+15551230000" },
                    "duration": 73.4
                },
                "artifact": {
                    "messages": [
                        { "role": "system", "message": "prompt" },
                        { "role": "bot", "message": "Hi, thanks for calling." },
                        { "role": "user", "message": "I need help." }
                    ]
                }
            }
        });

        let webhook: VapiWebhook = serde_json::from_value(payload).unwrap();
        let message = webhook.message;
        assert_eq!(message.kind.as_deref(), Some("end-of-call-report"));
        let call = message.call.as_ref().unwrap();
        assert!(call.is_inbound());
        assert_eq!(call.customer_number(), Some("+15551230000"));
        assert_eq!(message.report_messages().len(), 3);
        let spoken: Vec<_> = message
            .report_messages()
            .iter()
            .filter(|t| t.is_spoken())
            .collect();
        assert_eq!(spoken.len(), 2);
    }

    #[test]
    fn parses_conversation_update() {
        let payload = serde_json::json!({
            "message": {
                "type": "conversation-update",
                "call": { "id": "vapi-abc", "type": "outboundPhoneCall" },
                "conversation": [
                    { "role": "assistant", "content": "Hello!" },
                    { "role": "user", "content": "" }
                ]
            }
        });

        let webhook: VapiWebhook = serde_json::from_value(payload).unwrap();
        let message = webhook.message;
        assert_eq!(message.conversation.len(), 2);
        assert!(message.conversation[0].is_spoken());
        // empty text never counts as spoken
        assert!(!message.conversation[1].is_spoken());
        assert!(!message.call.unwrap().is_inbound());
    }

    #[test]
    fn tolerates_unknown_message_types() {
        let webhook: VapiWebhook =
            serde_json::from_value(serde_json::json!({ "message": { "type": "speech-update" } }))
                .unwrap();
        assert_eq!(webhook.message.kind.as_deref(), Some("speech-update"));
        assert!(webhook.message.call.is_none());
    }

    #[test]
    fn empty_payload_is_a_noop() {
        let webhook: VapiWebhook = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(webhook.message.kind.is_none());
    }
}

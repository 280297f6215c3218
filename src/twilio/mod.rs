//! Twilio REST client and webhook payload types.

pub mod twiml;

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TwilioError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {message}")]
    Api { message: String },
    #[error("Twilio credentials not configured")]
    NotConfigured,
}

#[derive(Clone)]
pub struct TwilioClient {
    client: Client,
    account_sid: String,
    auth_token: String,
    base_url: String,
}

impl TwilioClient {
    pub fn new(account_sid: String, auth_token: String) -> Self {
        Self {
            client: Client::new(),
            account_sid,
            auth_token,
            base_url: "https://api.twilio.com/2010-04-01".to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(account_sid: String, auth_token: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            account_sid,
            auth_token,
            base_url,
        }
    }

    /// Terminate a live call leg by updating its status to completed.
    pub async fn complete_call(&self, call_sid: &str) -> Result<(), TwilioError> {
        if self.account_sid.is_empty() || self.auth_token.is_empty() {
            return Err(TwilioError::NotConfigured);
        }

        let url = format!(
            "{}/Accounts/{}/Calls/{}.json",
            self.base_url, self.account_sid, call_sid
        );
        let response = self
            .client
            .post(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("Status", "completed")])
            .send()
            .await?;

        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TwilioError::Api { message });
        }
        Ok(())
    }
}

/// Form-urlencoded fields Twilio posts on voice and status webhooks.
/// Everything is optional; handlers decide what they need.
#[derive(Debug, Default, Deserialize)]
pub struct TwilioWebhookForm {
    #[serde(rename = "CallSid")]
    pub call_sid: Option<String>,
    #[serde(rename = "CallStatus")]
    pub call_status: Option<String>,
    #[serde(rename = "From")]
    pub from: Option<String>,
    #[serde(rename = "To")]
    pub to: Option<String>,
    #[serde(rename = "Direction")]
    pub direction: Option<String>,
    #[serde(rename = "CallDuration")]
    pub call_duration: Option<String>,
    #[serde(rename = "RecordingUrl")]
    pub recording_url: Option<String>,
    #[serde(rename = "RecordingDuration")]
    pub recording_duration: Option<String>,
    #[serde(rename = "CallerCountry")]
    pub caller_country: Option<String>,
    #[serde(rename = "CallerState")]
    pub caller_state: Option<String>,
    #[serde(rename = "CallerCity")]
    pub caller_city: Option<String>,
    #[serde(rename = "ConferenceSid")]
    pub conference_sid: Option<String>,
    #[serde(rename = "ForwardedFrom")]
    pub forwarded_from: Option<String>,
    #[serde(rename = "CallerName")]
    pub caller_name: Option<String>,
    #[serde(rename = "Digits")]
    pub digits: Option<String>,
    #[serde(rename = "agentId")]
    pub agent_id: Option<String>,
}

impl TwilioWebhookForm {
    pub fn duration_seconds(&self) -> Option<i32> {
        self.call_duration.as_deref().and_then(|d| d.parse().ok())
    }

    pub fn recording_seconds(&self) -> Option<i32> {
        self.recording_duration
            .as_deref()
            .and_then(|d| d.parse().ok())
    }
}

/// Map Twilio's textual call status onto our stored status. Unknown
/// values fall back to `queued` rather than failing the webhook.
pub fn parse_call_status(raw: &str) -> crate::models::CallStatus {
    use crate::models::CallStatus;
    match raw {
        "ringing" => CallStatus::Ringing,
        "in-progress" | "answered" => CallStatus::InProgress,
        "completed" => CallStatus::Completed,
        "busy" => CallStatus::Busy,
        "no-answer" => CallStatus::NoAnswer,
        "failed" => CallStatus::Failed,
        "canceled" => CallStatus::Canceled,
        _ => CallStatus::Queued,
    }
}

pub fn parse_direction(raw: &str) -> Option<crate::models::CallDirection> {
    use crate::models::CallDirection;
    match raw {
        "inbound" => Some(CallDirection::Inbound),
        // Twilio reports outbound legs as outbound-api / outbound-dial
        s if s.starts_with("outbound") => Some(CallDirection::Outbound),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CallDirection, CallStatus};

    #[test]
    fn parses_webhook_form() {
        let body = "CallSid=CA123&CallStatus=ringing&From=%2B15551234567&Direction=inbound&CallDuration=42";
        let form: TwilioWebhookForm = serde_urlencoded::from_str(body).unwrap();
        assert_eq!(form.call_sid.as_deref(), Some("CA123"));
        assert_eq!(form.from.as_deref(), Some("+15551234567"));
        assert_eq!(form.duration_seconds(), Some(42));
    }

    #[test]
    fn status_mapping() {
        assert_eq!(parse_call_status("ringing"), CallStatus::Ringing);
        assert_eq!(parse_call_status("in-progress"), CallStatus::InProgress);
        assert_eq!(parse_call_status("no-answer"), CallStatus::NoAnswer);
        assert_eq!(parse_call_status("something-new"), CallStatus::Queued);
    }

    #[test]
    fn direction_mapping() {
        assert_eq!(parse_direction("inbound"), Some(CallDirection::Inbound));
        assert_eq!(parse_direction("outbound-api"), Some(CallDirection::Outbound));
        assert_eq!(parse_direction("outbound-dial"), Some(CallDirection::Outbound));
        assert_eq!(parse_direction("unknown"), None);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Call {
    pub id: Uuid,
    #[serde(rename = "twilioCallSid")]
    pub twilio_call_sid: Option<String>,
    #[serde(rename = "twilioConferenceSid")]
    pub twilio_conference_sid: Option<String>,
    #[serde(rename = "vapiCallId")]
    pub vapi_call_id: Option<String>,
    #[serde(rename = "customerNumber")]
    pub customer_number: Option<String>,
    #[serde(rename = "agentId")]
    pub agent_id: Option<Uuid>,
    #[serde(rename = "callStatus")]
    pub call_status: CallStatus,
    #[serde(rename = "callDirection")]
    pub call_direction: Option<CallDirection>,
    #[serde(rename = "callType")]
    pub call_type: Option<String>,
    #[serde(rename = "callerCountry")]
    pub caller_country: Option<String>,
    #[serde(rename = "callerState")]
    pub caller_state: Option<String>,
    #[serde(rename = "callerCity")]
    pub caller_city: Option<String>,
    #[serde(rename = "callDuration")]
    pub call_duration: Option<i32>,
    #[serde(rename = "recordingUrl")]
    pub recording_url: Option<String>,
    #[serde(rename = "recordingDuration")]
    pub recording_duration: Option<i32>,
    #[serde(rename = "resolutionStatus")]
    pub resolution_status: Option<String>,
    pub notes: Option<String>,
    pub metadata: Option<serde_json::Value>,
    #[serde(rename = "startedAt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "endedAt")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Call states, stored as TEXT. Covers both what we write ourselves and
/// the statuses Twilio reports back on its status callback.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum CallStatus {
    Queued,
    Ringing,
    InProgress,
    Completed,
    Busy,
    NoAnswer,
    Failed,
    Canceled,
}

impl CallStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CallStatus::Completed
                | CallStatus::Busy
                | CallStatus::NoAnswer
                | CallStatus::Failed
                | CallStatus::Canceled
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum CallDirection {
    Inbound,
    Outbound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&CallStatus::InProgress).unwrap(),
            "\"in-progress\""
        );
        assert_eq!(
            serde_json::from_str::<CallStatus>("\"no-answer\"").unwrap(),
            CallStatus::NoAnswer
        );
    }

    #[test]
    fn terminal_statuses() {
        assert!(CallStatus::Completed.is_terminal());
        assert!(CallStatus::Canceled.is_terminal());
        assert!(!CallStatus::Ringing.is_terminal());
        assert!(!CallStatus::InProgress.is_terminal());
    }
}

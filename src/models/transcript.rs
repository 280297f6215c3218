use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Transcript {
    pub id: Uuid,
    #[serde(rename = "callId")]
    pub call_id: Uuid,
    pub speaker: Speaker,
    pub text: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Speaker {
    Agent,
    Customer,
}

impl Speaker {
    /// Map an upstream conversation role onto a transcript speaker.
    /// Assistant-side roles become `agent`, everything else is the customer.
    pub fn from_role(role: &str) -> Self {
        match role {
            "bot" | "assistant" => Speaker::Agent,
            _ => Speaker::Customer,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::Agent => "agent",
            Speaker::Customer => "customer",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_mapping() {
        assert_eq!(Speaker::from_role("bot"), Speaker::Agent);
        assert_eq!(Speaker::from_role("assistant"), Speaker::Agent);
        assert_eq!(Speaker::from_role("user"), Speaker::Customer);
        assert_eq!(Speaker::from_role("human"), Speaker::Customer);
    }
}

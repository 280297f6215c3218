use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CustomerProfile {
    pub id: Uuid,
    #[serde(rename = "phoneNumber")]
    pub phone_number: String,
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "callHistoryCount")]
    pub call_history_count: i32,
    #[serde(rename = "lastInteractionAt")]
    pub last_interaction_at: Option<DateTime<Utc>>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

//! Rows backing the Pink Mobile demo account tools.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PinkCustomer {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    #[serde(skip_serializing)]
    pub pin: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PinkLine {
    pub id: Uuid,
    #[serde(rename = "customerId")]
    pub customer_id: Uuid,
    #[serde(rename = "lineType")]
    pub line_type: String,
    pub device: Option<String>,
    #[serde(rename = "phoneNumber")]
    pub phone_number: Option<String>,
    /// Nullable for lines imported before pricing was tracked.
    #[serde(rename = "monthlyPrice")]
    pub monthly_price: Option<f64>,
    pub status: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl PinkLine {
    /// Price used on the bill; legacy lines with no stored price are
    /// charged the standard phone rate.
    pub fn billed_price(&self) -> f64 {
        self.monthly_price
            .unwrap_or(crate::pink::DEFAULT_LINE_PRICE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_line_price_bills_at_the_default_rate() {
        let mut line = PinkLine {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            line_type: "tablet".to_string(),
            device: Some("iPad".to_string()),
            phone_number: Some("+1-555-2001".to_string()),
            monthly_price: Some(10.0),
            status: "active".to_string(),
            created_at: Utc::now(),
        };
        assert_eq!(line.billed_price(), 10.0);

        line.monthly_price = None;
        assert_eq!(line.billed_price(), crate::pink::DEFAULT_LINE_PRICE);
    }
}

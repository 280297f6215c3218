//! Environment-driven service configuration.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,

    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_phone_number: String,

    pub vapi_private_key: String,
    pub vapi_assistant_id: String,
    pub vapi_phone_number_id: String,

    /// Twilio number human agents answer on; AI transfers land here.
    pub contact_centre_number: String,
    /// WebSocket endpoint the media streams are forked to for transcription.
    pub media_stream_url: String,
    /// Public base URL of this service, used for provider callbacks.
    pub public_base_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL is required"))?;

        Ok(Self {
            database_url,
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| "dev-secret".to_string()),
            twilio_account_sid: env::var("TWILIO_ACCOUNT_SID").unwrap_or_default(),
            twilio_auth_token: env::var("TWILIO_AUTH_TOKEN").unwrap_or_default(),
            twilio_phone_number: env::var("TWILIO_PHONE_NUMBER").unwrap_or_default(),
            vapi_private_key: env::var("VAPI_PRIVATE_KEY").unwrap_or_default(),
            vapi_assistant_id: env::var("VAPI_ASSISTANT_ID").unwrap_or_default(),
            vapi_phone_number_id: env::var("VAPI_PHONE_NUMBER_ID").unwrap_or_default(),
            contact_centre_number: env::var("CONTACT_CENTRE_NUMBER").unwrap_or_default(),
            media_stream_url: env::var("MEDIA_STREAM_URL").unwrap_or_default(),
            public_base_url: env::var("PUBLIC_BASE_URL").unwrap_or_default(),
        })
    }

    pub fn status_callback_url(&self) -> String {
        format!("{}/webhooks/twilio/status", self.public_base_url)
    }

    pub fn vapi_webhook_url(&self) -> String {
        format!("{}/webhooks/vapi", self.public_base_url)
    }
}

//! HTTP surface: router, shared state, and the handler modules.

pub mod agents;
pub mod pink;
pub mod twilio;
pub mod vapi;

use std::sync::Arc;

use axum::{http::Method, routing::post, Router};
use sqlx::PgPool;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::twilio::TwilioClient;
use crate::vapi::VapiClient;

/// Application state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub twilio: TwilioClient,
    pub vapi: VapiClient,
    pub config: Config,
}

/// Create the Axum router with all webhook and API routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/api/health", axum::routing::get(health_check))
        // Auth and agent provisioning
        .route("/api/auth/login", post(agents::login))
        .route("/api/agents/create", post(agents::create_agent))
        // Twilio call lifecycle
        .route("/webhooks/twilio/voice", post(twilio::voice_webhook))
        .route("/webhooks/twilio/status", post(twilio::status_webhook))
        .route("/webhooks/twilio/outbound", post(twilio::outbound_call))
        .route("/api/calls/end", post(twilio::end_call))
        // VAPI assistant events and outbound dialing
        .route("/webhooks/vapi", post(vapi::webhook))
        .route("/api/calls/vapi-outbound", post(vapi::outbound_call))
        // Pink Mobile voice-assistant tools
        .route("/tools/pink/customer-lookup", post(pink::customer_lookup))
        .route("/tools/pink/verify-pin", post(pink::verify_pin))
        .route("/tools/pink/account-info", post(pink::account_info))
        .route("/tools/pink/add-line", post(pink::add_line))
        .route("/tools/pink/apply-promo", post(pink::apply_promo))
        .route("/tools/pink/roaming-pass", post(pink::roaming_pass))
        .route("/tools/pink/create-ticket", post(pink::create_ticket))
        .route("/tools/pink/transfer", post(pink::transfer))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

async fn health_check() -> &'static str {
    "OK"
}

/// Initialize and start the server.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let pool = crate::db::init_pool(&config.database_url).await?;

    if let Err(e) = crate::db::run_migrations(&pool).await {
        tracing::warn!("Migration warning (may be already applied): {}", e);
    }

    let twilio = TwilioClient::new(
        config.twilio_account_sid.clone(),
        config.twilio_auth_token.clone(),
    );
    let vapi = VapiClient::new(config.vapi_private_key.clone());

    let port = config.port;
    let state = AppState {
        db: pool,
        twilio,
        vapi,
        config,
    };

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!("Server running on http://0.0.0.0:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}

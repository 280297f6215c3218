//! Agent provisioning.
//!
//! Creating an agent writes two rows: the login user and the agent
//! record pointing at it. If the second insert fails, the first is
//! compensated with a delete so no orphan login survives.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{self, Claims};
use crate::db;
use crate::error::AppError;
use crate::models::CreateAgentRequest;
use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Exchange email/password for a bearer token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let (Some(email), Some(password)) = (request.email.as_deref(), request.password.as_deref())
    else {
        return Err(AppError::BadRequest(
            "Missing required fields: email, password".to_string(),
        ));
    };

    let user = db::users::get_by_email(&state.db, email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    let verified = auth::verify_password(password, &user.password_hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {e}")))?;
    if !verified {
        return Err(AppError::Unauthorized("Invalid email or password".to_string()));
    }

    let token = auth::create_token(user.id, &user.email, &user.role, &state.config.jwt_secret)
        .map_err(|e| AppError::Internal(format!("Failed to issue token: {e}")))?;

    Ok(Json(json!({ "token": token, "user": user })))
}

pub async fn create_agent(
    State(state): State<Arc<AppState>>,
    claims: Claims,
    Json(request): Json<CreateAgentRequest>,
) -> Result<Json<Value>, AppError> {
    let (Some(email), Some(password), Some(name), Some(company_id)) = (
        request.email.as_deref(),
        request.password.as_deref(),
        request.name.as_deref(),
        request.company_id,
    ) else {
        return Err(AppError::BadRequest(
            "Missing required fields: email, password, name, companyId".to_string(),
        ));
    };

    // The caller may only provision agents into a company they own.
    let company = db::companies::get_owned(&state.db, company_id, claims.sub)
        .await?
        .ok_or_else(|| AppError::Forbidden("Company not found or unauthorized".to_string()))?;

    let password_hash = auth::hash_password(password)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))?;

    let user = db::users::create(
        &state.db,
        email,
        &password_hash,
        name,
        "agent",
        request.phone.as_deref(),
    )
    .await
    .map_err(|e| {
        tracing::error!("Failed to create agent user: {e}");
        AppError::BadRequest("Failed to create user account".to_string())
    })?;

    let agent = match db::agents::create(&state.db, user.id, company.id, name).await {
        Ok(agent) => agent,
        Err(e) => {
            tracing::error!("Failed to create agent record: {e}");
            if let Err(cleanup) = db::users::delete(&state.db, user.id).await {
                tracing::error!("Failed to clean up user {} after agent insert failure: {cleanup}", user.id);
            }
            return Err(AppError::Internal("Failed to create agent record".to_string()));
        }
    };

    tracing::info!("Created agent {} for company {}", agent.id, company.id);

    Ok(Json(json!({
        "success": true,
        "agent": agent,
        "message": "Agent created successfully"
    })))
}

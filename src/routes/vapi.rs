//! VAPI assistant webhook and outbound dialing.
//!
//! The assistant platform only identifies calls reliably by its own
//! call id, and that id is missing from early events. Reconciliation
//! therefore walks a lookup chain: provider id, then in-progress call
//! for the caller's number, then any recent call for that number, and
//! finally creates a fresh inbound row.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, response::Response, Json};
use chrono::Duration;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::db;
use crate::error::AppError;
use crate::models::Call;
use crate::pink::to_e164;
use crate::routes::AppState;
use crate::vapi::{VapiError, VapiMessage, VapiWebhook};

/// Lookback window for matching a report to a call that already ended.
const RECENT_CALL_WINDOW_MINUTES: i64 = 5;

/// Company whose configured agent answers assistant calls.
const AI_COMPANY_PATTERN: &str = "%pink%";
/// Last-resort agent match when no company agent exists.
const FALLBACK_AGENT_PATTERN: &str = "%smith%";

pub async fn webhook(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<VapiWebhook>,
) -> Result<Json<Value>, AppError> {
    let message = payload.message;
    let kind = message.kind.as_deref().unwrap_or("");
    tracing::info!("VAPI webhook: type={kind}");

    match kind {
        "status-update" => handle_status_update(&state, &message).await?,
        "conversation-update" => handle_conversation_update(&state, &message).await?,
        "end-of-call-report" => handle_end_of_call_report(&state, &message).await?,
        // Other event types (speech-update, hang, etc.) are acknowledged
        // without action.
        _ => {}
    }

    Ok(Json(json!({ "success": true })))
}

/// Agents that answer AI-handled calls: the demo company's agent first,
/// then a name-pattern fallback. `None` means we cannot attribute the
/// call and skip creating a row.
async fn resolve_ai_agent(state: &AppState) -> Result<Option<Uuid>, sqlx::Error> {
    if let Some(company) = db::companies::first_by_name_like(&state.db, AI_COMPANY_PATTERN).await? {
        if let Some(agent) = db::agents::first_for_company(&state.db, company.id).await? {
            return Ok(Some(agent.id));
        }
    }
    Ok(db::agents::first_by_name_like(&state.db, FALLBACK_AGENT_PATTERN)
        .await?
        .map(|a| a.id))
}

/// A new inbound assistant call shows up as a status-update before any
/// transcript exists. Create the call row once per caller number.
async fn handle_status_update(state: &AppState, message: &VapiMessage) -> Result<(), AppError> {
    let Some(call) = message.call.as_ref() else {
        return Ok(());
    };
    if !call.is_inbound() || message.status.as_deref() != Some("in-progress") {
        return Ok(());
    }
    let Some(number) = call.customer_number() else {
        return Ok(());
    };

    if db::calls::find_in_progress_by_number(&state.db, number)
        .await?
        .is_some()
    {
        return Ok(());
    }

    let Some(agent_id) = resolve_ai_agent(state).await? else {
        tracing::warn!("No agent available to attribute inbound AI call from {number}");
        return Ok(());
    };

    let created = db::calls::create_inbound_ai(
        &state.db,
        number,
        agent_id,
        call.id.as_deref(),
        call.started_at,
    )
    .await?;
    tracing::info!("Created inbound AI call {} for {number}", created.id);
    Ok(())
}

/// Live transcript snapshot. Each delivery repeats the conversation so
/// far; only the suffix beyond what is stored gets inserted.
async fn handle_conversation_update(state: &AppState, message: &VapiMessage) -> Result<(), AppError> {
    if message.conversation.is_empty() {
        return Ok(());
    }
    let vapi_call_id = message.call.as_ref().and_then(|c| c.id.as_deref());
    let Some(vapi_call_id) = vapi_call_id else {
        return Ok(());
    };

    let call = match db::calls::find_by_vapi_id_in_progress(&state.db, vapi_call_id).await? {
        Some(call) => Some(call),
        None => {
            // Early events may predate the row carrying the provider id;
            // match by number and late-bind the id.
            let number = message.call.as_ref().and_then(|c| c.customer_number());
            match number {
                Some(number) => {
                    let found = db::calls::find_in_progress_by_number(&state.db, number).await?;
                    if let Some(call) = &found {
                        if call.vapi_call_id.is_none() {
                            db::calls::set_vapi_call_id(&state.db, call.id, vapi_call_id).await?;
                        }
                    }
                    found
                }
                None => None,
            }
        }
    };

    let Some(call) = call else {
        tracing::warn!("No call record for conversation update {vapi_call_id}");
        return Ok(());
    };

    let inserted =
        db::transcripts::append_new_turns(&state.db, call.id, &message.conversation).await?;
    if inserted > 0 {
        tracing::info!("Stored {inserted} new transcript turns for call {}", call.id);
    }
    Ok(())
}

/// Final report: find (or create) the call, mark it completed, and
/// persist the final transcript if live updates never landed.
async fn handle_end_of_call_report(state: &AppState, message: &VapiMessage) -> Result<(), AppError> {
    let vapi_call_id = message.call.as_ref().and_then(|c| c.id.as_deref());
    let customer_number = message.call.as_ref().and_then(|c| c.customer_number());

    let mut call: Option<Call> = None;

    if let Some(id) = vapi_call_id {
        call = db::calls::find_by_vapi_id(&state.db, id).await?;
    }
    if call.is_none() {
        if let Some(number) = customer_number {
            call = db::calls::find_in_progress_by_number(&state.db, number).await?;
            if call.is_none() {
                call = db::calls::find_recent_by_number(
                    &state.db,
                    number,
                    Duration::minutes(RECENT_CALL_WINDOW_MINUTES),
                )
                .await?;
            }
        } else {
            // Nothing to match on; acknowledge so the platform stops
            // retrying.
            tracing::warn!("End-of-call report with no call id or customer number");
            return Ok(());
        }
    }

    if call.is_none() {
        let is_inbound = message.call.as_ref().is_some_and(|c| c.is_inbound());
        if is_inbound {
            if let (Some(number), Some(agent_id)) = (customer_number, resolve_ai_agent(state).await?)
            {
                let created = db::calls::create_inbound_ai(
                    &state.db,
                    number,
                    agent_id,
                    vapi_call_id,
                    message.call.as_ref().and_then(|c| c.started_at),
                )
                .await?;
                tracing::info!("Created call {} from end-of-call report", created.id);
                call = Some(created);
            }
        }
    }

    let Some(call) = call else {
        tracing::warn!("No matching call found for end-of-call report");
        return Ok(());
    };

    if call.vapi_call_id.is_none() {
        if let Some(id) = vapi_call_id {
            db::calls::set_vapi_call_id(&state.db, call.id, id).await?;
        }
    }

    db::calls::complete(&state.db, call.id).await?;

    let report_messages = message.report_messages();
    if !report_messages.is_empty() {
        // Live conversation updates usually already stored the turns;
        // the report is only the fallback source.
        let existing = db::transcripts::count_for_call(&state.db, call.id).await?;
        if existing == 0 {
            let spoken: Vec<_> = report_messages
                .iter()
                .filter(|t| t.is_spoken())
                .cloned()
                .collect();
            let inserted = db::transcripts::insert_turns(&state.db, call.id, &spoken).await?;
            tracing::info!("Stored {inserted} transcript turns from final report for call {}", call.id);
        }
    }

    tracing::info!(
        "Completed call {} (reason: {})",
        call.id,
        message.ended_reason.as_deref().unwrap_or("unknown")
    );
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct VapiOutboundRequest {
    #[serde(rename = "phoneNumber")]
    pub phone_number: Option<String>,
    #[serde(rename = "customerName")]
    pub customer_name: Option<String>,
    #[serde(rename = "agentId")]
    pub agent_id: Option<Uuid>,
}

/// Start an outbound assistant call through the VAPI REST API.
pub async fn outbound_call(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VapiOutboundRequest>,
) -> Result<Response, AppError> {
    let Some(raw_number) = request.phone_number.as_deref().filter(|n| !n.is_empty()) else {
        return Err(AppError::BadRequest("Phone number is required".to_string()));
    };

    let phone_number = to_e164(raw_number);
    let customer_name = request.customer_name.as_deref().unwrap_or("Customer");

    let outbound = state
        .vapi
        .start_phone_call(
            &state.config.vapi_assistant_id,
            &state.config.vapi_phone_number_id,
            &phone_number,
            customer_name,
            &state.config.vapi_webhook_url(),
        )
        .await;

    let outbound = match outbound {
        Ok(outbound) => outbound,
        // Surface the upstream status code and message verbatim so the
        // dashboard can show what the provider rejected.
        Err(VapiError::Api { status, message }) => {
            let status =
                StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return Ok((status, Json(json!({ "error": message }))).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    // The call row is only created when an agent was named; provider
    // failures here are logged but the call is already in flight.
    let db_call_id = match request.agent_id {
        Some(agent_id) => {
            match db::calls::create_outbound_ai(&state.db, &phone_number, agent_id, &outbound.id)
                .await
            {
                Ok(call) => Some(call.id),
                Err(e) => {
                    tracing::error!("Failed to record outbound AI call {}: {e}", outbound.id);
                    None
                }
            }
        }
        None => None,
    };

    Ok(Json(json!({
        "success": true,
        "callId": outbound.id,
        "dbCallId": db_call_id,
        "status": outbound.status,
        "message": format!("Calling {phone_number}...")
    }))
    .into_response())
}

//! Twilio call lifecycle: inbound voice webhook, status callbacks,
//! outbound dialing, and the internal end-call API.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::db;
use crate::error::AppError;
use crate::models::{CallDirection, CallStatus};
use crate::routes::AppState;
use crate::twilio::{parse_call_status, parse_direction, twiml, TwilioWebhookForm};

fn xml(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/xml")],
        body,
    )
        .into_response()
}

/// Track the caller's profile. Best-effort: webhooks must answer with
/// TwiML even when the bookkeeping write fails.
async fn touch_profile(state: &AppState, phone_number: &str, fallback_name: Option<&str>) {
    let known_user = match db::users::get_by_phone(&state.db, phone_number).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!("User lookup failed for {phone_number}: {e}");
            None
        }
    };
    let name = known_user
        .as_ref()
        .and_then(|u| u.full_name.as_deref())
        .or(fallback_name);
    let email = known_user.as_ref().map(|u| u.email.as_str());

    if let Err(e) = db::customers::touch(&state.db, phone_number, name, email).await {
        tracing::warn!("Failed to update customer profile for {phone_number}: {e}");
    }
}

/// Incoming call webhook. Always answers 200 with TwiML: either a
/// connect flow to an online agent or an apology and hangup.
pub async fn voice_webhook(
    State(state): State<Arc<AppState>>,
    Form(form): Form<TwilioWebhookForm>,
) -> Response {
    tracing::info!(
        "Voice webhook: sid={:?} status={:?} from={:?}",
        form.call_sid,
        form.call_status,
        form.from
    );

    if let Some(from) = form.from.as_deref() {
        touch_profile(&state, from, form.caller_name.as_deref()).await;
    }

    let status = parse_call_status(form.call_status.as_deref().unwrap_or("ringing"));
    let direction = form.direction.as_deref().and_then(parse_direction);

    if let Some(sid) = form.call_sid.as_deref() {
        if let Err(e) =
            db::calls::upsert_by_twilio_sid(&state.db, sid, form.from.as_deref(), status, direction)
                .await
        {
            tracing::error!("Failed to record call {sid}: {e}");
        }
    }

    if status != CallStatus::Ringing || direction != Some(CallDirection::Inbound) {
        return xml(twiml::empty());
    }

    let agent = match db::agents::first_online(&state.db).await {
        Ok(agent) => agent,
        Err(e) => {
            tracing::error!("Agent lookup failed: {e}");
            None
        }
    };

    match agent {
        Some(agent) => {
            if let Some(sid) = form.call_sid.as_deref() {
                if let Err(e) = db::calls::assign_agent(&state.db, sid, agent.id).await {
                    tracing::warn!("Failed to assign agent to call {sid}: {e}");
                }
            }

            let mut response = twiml::TwimlResponse::new()
                .say("Please hold while we connect you to the next available agent.");
            if !state.config.media_stream_url.is_empty() {
                response = response.stream_both_tracks(&state.config.media_stream_url);
            }
            xml(
                response
                    .dial_client("agent", &state.config.status_callback_url())
                    .build(),
            )
        }
        None => xml(
            twiml::TwimlResponse::new()
                .say("We're sorry, all of our agents are currently unavailable. Please call back later.")
                .hangup()
                .build(),
        ),
    }
}

/// Status callback: keeps the call row current through the call's life
/// and captures recordings. Replies with empty TwiML regardless.
pub async fn status_webhook(
    State(state): State<Arc<AppState>>,
    Form(form): Form<TwilioWebhookForm>,
) -> Response {
    tracing::info!(
        "Status callback: sid={:?} status={:?}",
        form.call_sid,
        form.call_status
    );

    if let Some(from) = form.from.as_deref() {
        touch_profile(&state, from, form.caller_name.as_deref()).await;
    }

    let Some(sid) = form.call_sid.as_deref() else {
        return xml(twiml::empty());
    };

    let status = parse_call_status(form.call_status.as_deref().unwrap_or(""));
    let direction = form.direction.as_deref().and_then(parse_direction);

    let call = match db::calls::find_by_twilio_sid(&state.db, sid).await {
        Ok(Some(call)) => {
            match db::calls::apply_status_update(
                &state.db,
                call.id,
                status,
                form.duration_seconds(),
                form.recording_url.as_deref(),
                form.recording_seconds(),
            )
            .await
            {
                Ok(call) => Some(call),
                Err(e) => {
                    tracing::error!("Failed to update call {sid}: {e}");
                    None
                }
            }
        }
        Ok(None) => {
            // The voice webhook can be missed entirely (e.g. direct API
            // calls); create the row from what the callback carries.
            match db::calls::create_from_status(
                &state.db,
                sid,
                form.conference_sid.as_deref(),
                form.from.as_deref(),
                status,
                direction,
                form.caller_country.as_deref(),
                form.caller_state.as_deref(),
                form.caller_city.as_deref(),
                form.duration_seconds(),
                form.recording_url.as_deref(),
                form.recording_seconds(),
            )
            .await
            {
                Ok(call) => Some(call),
                Err(e) => {
                    tracing::error!("Failed to create call {sid} from status callback: {e}");
                    None
                }
            }
        }
        Err(e) => {
            tracing::error!("Call lookup failed for {sid}: {e}");
            None
        }
    };

    if let (Some(call), Some(url)) = (call.as_ref(), form.recording_url.as_deref()) {
        let recording_sid = format!("{sid}_recording");
        if let Err(e) = db::recordings::upsert(
            &state.db,
            call.id,
            &recording_sid,
            url,
            form.recording_seconds(),
        )
        .await
        {
            tracing::warn!("Failed to store recording for call {sid}: {e}");
        }
    }

    xml(twiml::empty())
}

#[derive(Debug, Deserialize)]
pub struct EndCallRequest {
    #[serde(rename = "callId")]
    pub call_id: Option<Uuid>,
}

/// Internal API: the agent dashboard hangs up a live call. Terminates
/// the Twilio leg, measures the duration, and folds the transcript into
/// the call notes.
pub async fn end_call(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EndCallRequest>,
) -> Result<Json<Value>, AppError> {
    let call_id = request
        .call_id
        .ok_or_else(|| AppError::BadRequest("callId is required".to_string()))?;

    let call = db::calls::get_by_id(&state.db, call_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Call record not found".to_string()))?;

    // Hang up the provider leg if it is still live. A failure here is
    // not fatal; the row is closed out either way.
    if let Some(sid) = call.twilio_call_sid.as_deref() {
        if call.call_status != CallStatus::Completed {
            if let Err(e) = state.twilio.complete_call(sid).await {
                tracing::warn!("Failed to terminate Twilio call {sid}: {e}");
            }
        }
    }

    let duration = call
        .started_at
        .map(|started| (Utc::now() - started).num_seconds().max(0) as i32)
        .unwrap_or(0);

    let notes = match db::transcripts::get_ordered(&state.db, call.id).await {
        Ok(rows) if !rows.is_empty() => Some(
            rows.iter()
                .map(|t| format!("{}: {}", t.speaker.as_str(), t.text))
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!("Failed to load transcript for call {call_id}: {e}");
            None
        }
    };

    db::calls::finish_with_notes(&state.db, call.id, duration, notes.as_deref()).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Call ended successfully"
    })))
}

#[derive(Debug, Deserialize)]
struct OutboundCallRequest {
    to: Option<String>,
    #[serde(rename = "agentId")]
    agent_id: Option<String>,
}

/// Outbound dialing endpoint. Twilio posts form data here when a call
/// leg needs TwiML; the dashboard posts JSON when it wants a browser
/// call acknowledged.
pub async fn outbound_call(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !content_type.starts_with("application/x-www-form-urlencoded") {
        let request: OutboundCallRequest = serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid request body: {e}")))?;
        let to = request
            .to
            .ok_or_else(|| AppError::BadRequest("Missing required field: to".to_string()))?;
        // Browser-initiated calls go out through the Twilio Device SDK;
        // this leg only acknowledges the request.
        return Ok(Json(json!({
            "success": true,
            "to": to,
            "agentId": request.agent_id,
            "message": "Use the Twilio Device to initiate the call from the browser."
        }))
        .into_response());
    }

    let form: TwilioWebhookForm = serde_urlencoded::from_bytes(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid form body: {e}")))?;

    let Some(to) = form.to.as_deref().filter(|t| !t.is_empty()) else {
        return Ok(xml(
            twiml::TwimlResponse::new()
                .say("No destination number was provided.")
                .hangup()
                .build(),
        ));
    };

    if let Some(sid) = form.call_sid.as_deref() {
        let agent_id = match form.agent_id.as_deref().and_then(|id| id.parse().ok()) {
            Some(id) => Some(id),
            None => match db::agents::first_online(&state.db).await {
                Ok(agent) => agent.map(|a| a.id),
                Err(e) => {
                    tracing::warn!("Agent lookup failed for outbound call: {e}");
                    None
                }
            },
        };

        if let Err(e) = db::calls::create_outbound_twilio(&state.db, sid, to, agent_id).await {
            tracing::error!("Failed to record outbound call {sid}: {e}");
        }
        touch_profile(&state, to, None).await;
    }

    let mut response = twiml::TwimlResponse::new();
    if !state.config.media_stream_url.is_empty() {
        response = response.stream_both_tracks(&state.config.media_stream_url);
    }
    Ok(xml(
        response
            .dial_number(
                to,
                &state.config.twilio_phone_number,
                &state.config.status_callback_url(),
            )
            .build(),
    ))
}

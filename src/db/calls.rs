//! Call table operations, including the lookup chain webhook
//! reconciliation relies on.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Call, CallDirection, CallStatus};

const CALL_COLUMNS: &str = "id, twilio_call_sid, twilio_conference_sid, vapi_call_id, \
     customer_number, agent_id, call_status, call_direction, call_type, \
     caller_country, caller_state, caller_city, call_duration, \
     recording_url, recording_duration, resolution_status, notes, metadata, \
     started_at, ended_at, created_at";

pub async fn get_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Call>, sqlx::Error> {
    sqlx::query_as::<_, Call>(&format!("SELECT {CALL_COLUMNS} FROM calls WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_twilio_sid(pool: &PgPool, sid: &str) -> Result<Option<Call>, sqlx::Error> {
    sqlx::query_as::<_, Call>(&format!(
        "SELECT {CALL_COLUMNS} FROM calls WHERE twilio_call_sid = $1"
    ))
    .bind(sid)
    .fetch_optional(pool)
    .await
}

pub async fn find_by_vapi_id(pool: &PgPool, vapi_call_id: &str) -> Result<Option<Call>, sqlx::Error> {
    sqlx::query_as::<_, Call>(&format!(
        "SELECT {CALL_COLUMNS} FROM calls WHERE vapi_call_id = $1 LIMIT 1"
    ))
    .bind(vapi_call_id)
    .fetch_optional(pool)
    .await
}

pub async fn find_by_vapi_id_in_progress(
    pool: &PgPool,
    vapi_call_id: &str,
) -> Result<Option<Call>, sqlx::Error> {
    sqlx::query_as::<_, Call>(&format!(
        "SELECT {CALL_COLUMNS} FROM calls \
         WHERE vapi_call_id = $1 AND call_status = 'in-progress' LIMIT 1"
    ))
    .bind(vapi_call_id)
    .fetch_optional(pool)
    .await
}

/// Most recent in-progress call for a caller number.
pub async fn find_in_progress_by_number(
    pool: &PgPool,
    customer_number: &str,
) -> Result<Option<Call>, sqlx::Error> {
    sqlx::query_as::<_, Call>(&format!(
        "SELECT {CALL_COLUMNS} FROM calls \
         WHERE customer_number = $1 AND call_status = 'in-progress' \
         ORDER BY created_at DESC LIMIT 1"
    ))
    .bind(customer_number)
    .fetch_optional(pool)
    .await
}

/// Most recent call for a caller number created inside the lookback window.
pub async fn find_recent_by_number(
    pool: &PgPool,
    customer_number: &str,
    window: Duration,
) -> Result<Option<Call>, sqlx::Error> {
    let since = Utc::now() - window;
    sqlx::query_as::<_, Call>(&format!(
        "SELECT {CALL_COLUMNS} FROM calls \
         WHERE customer_number = $1 AND created_at >= $2 \
         ORDER BY created_at DESC LIMIT 1"
    ))
    .bind(customer_number)
    .bind(since)
    .fetch_optional(pool)
    .await
}

/// Create or refresh a call row keyed on the Twilio call SID.
pub async fn upsert_by_twilio_sid(
    pool: &PgPool,
    sid: &str,
    customer_number: Option<&str>,
    status: CallStatus,
    direction: Option<CallDirection>,
) -> Result<Call, sqlx::Error> {
    sqlx::query_as::<_, Call>(&format!(
        "INSERT INTO calls (twilio_call_sid, customer_number, call_status, call_direction, started_at) \
         VALUES ($1, $2, $3, $4, NOW()) \
         ON CONFLICT (twilio_call_sid) DO UPDATE \
         SET call_status = EXCLUDED.call_status \
         RETURNING {CALL_COLUMNS}"
    ))
    .bind(sid)
    .bind(customer_number)
    .bind(status)
    .bind(direction)
    .fetch_one(pool)
    .await
}

/// Full insert used by the status callback when the call was never seen
/// before (e.g. the voice webhook was missed).
#[allow(clippy::too_many_arguments)]
pub async fn create_from_status(
    pool: &PgPool,
    sid: &str,
    conference_sid: Option<&str>,
    customer_number: Option<&str>,
    status: CallStatus,
    direction: Option<CallDirection>,
    caller_country: Option<&str>,
    caller_state: Option<&str>,
    caller_city: Option<&str>,
    call_duration: Option<i32>,
    recording_url: Option<&str>,
    recording_duration: Option<i32>,
) -> Result<Call, sqlx::Error> {
    sqlx::query_as::<_, Call>(&format!(
        "INSERT INTO calls (twilio_call_sid, twilio_conference_sid, customer_number, \
             call_status, call_direction, caller_country, caller_state, caller_city, \
             call_duration, recording_url, recording_duration, started_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW()) \
         RETURNING {CALL_COLUMNS}"
    ))
    .bind(sid)
    .bind(conference_sid)
    .bind(customer_number)
    .bind(status)
    .bind(direction)
    .bind(caller_country)
    .bind(caller_state)
    .bind(caller_city)
    .bind(call_duration)
    .bind(recording_url)
    .bind(recording_duration)
    .fetch_one(pool)
    .await
}

/// Status-callback update: new values win, absent values keep what we had.
/// Terminal statuses stamp `ended_at`.
pub async fn apply_status_update(
    pool: &PgPool,
    id: Uuid,
    status: CallStatus,
    call_duration: Option<i32>,
    recording_url: Option<&str>,
    recording_duration: Option<i32>,
) -> Result<Call, sqlx::Error> {
    sqlx::query_as::<_, Call>(&format!(
        "UPDATE calls SET \
             call_status = $2, \
             call_duration = COALESCE($3, call_duration), \
             recording_url = COALESCE($4, recording_url), \
             recording_duration = COALESCE($5, recording_duration), \
             ended_at = CASE WHEN $6 THEN NOW() ELSE ended_at END \
         WHERE id = $1 \
         RETURNING {CALL_COLUMNS}"
    ))
    .bind(id)
    .bind(status)
    .bind(call_duration)
    .bind(recording_url)
    .bind(recording_duration)
    .bind(status.is_terminal())
    .fetch_one(pool)
    .await
}

/// Inbound call row created on first webhook contact from the AI assistant.
pub async fn create_inbound_ai(
    pool: &PgPool,
    customer_number: &str,
    agent_id: Uuid,
    vapi_call_id: Option<&str>,
    started_at: Option<DateTime<Utc>>,
) -> Result<Call, sqlx::Error> {
    sqlx::query_as::<_, Call>(&format!(
        "INSERT INTO calls (customer_number, agent_id, call_direction, call_status, started_at, vapi_call_id) \
         VALUES ($1, $2, 'inbound', 'in-progress', COALESCE($3, NOW()), $4) \
         RETURNING {CALL_COLUMNS}"
    ))
    .bind(customer_number)
    .bind(agent_id)
    .bind(started_at)
    .bind(vapi_call_id)
    .fetch_one(pool)
    .await
}

pub async fn create_outbound_twilio(
    pool: &PgPool,
    sid: &str,
    to_number: &str,
    agent_id: Option<Uuid>,
) -> Result<Call, sqlx::Error> {
    sqlx::query_as::<_, Call>(&format!(
        "INSERT INTO calls (twilio_call_sid, customer_number, call_status, call_direction, agent_id, started_at) \
         VALUES ($1, $2, 'ringing', 'outbound', $3, NOW()) \
         RETURNING {CALL_COLUMNS}"
    ))
    .bind(sid)
    .bind(to_number)
    .bind(agent_id)
    .fetch_one(pool)
    .await
}

pub async fn create_outbound_ai(
    pool: &PgPool,
    customer_number: &str,
    agent_id: Uuid,
    vapi_call_id: &str,
) -> Result<Call, sqlx::Error> {
    sqlx::query_as::<_, Call>(&format!(
        "INSERT INTO calls (customer_number, agent_id, call_direction, call_status, started_at, vapi_call_id) \
         VALUES ($1, $2, 'outbound', 'in-progress', NOW(), $3) \
         RETURNING {CALL_COLUMNS}"
    ))
    .bind(customer_number)
    .bind(agent_id)
    .bind(vapi_call_id)
    .fetch_one(pool)
    .await
}

/// Ringing escalation row handed to the contact centre when the AI
/// transfers a caller.
pub async fn create_escalation(
    pool: &PgPool,
    customer_number: Option<&str>,
    notes: &str,
    metadata: serde_json::Value,
) -> Result<Call, sqlx::Error> {
    sqlx::query_as::<_, Call>(&format!(
        "INSERT INTO calls (customer_number, call_direction, call_status, call_type, notes, metadata) \
         VALUES ($1, 'inbound', 'ringing', 'escalation', $2, $3) \
         RETURNING {CALL_COLUMNS}"
    ))
    .bind(customer_number)
    .bind(notes)
    .bind(metadata)
    .fetch_one(pool)
    .await
}

pub async fn assign_agent(pool: &PgPool, sid: &str, agent_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE calls SET agent_id = $2 WHERE twilio_call_sid = $1")
        .bind(sid)
        .bind(agent_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Late-bind the provider call id once a number-based match identified the row.
pub async fn set_vapi_call_id(pool: &PgPool, id: Uuid, vapi_call_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE calls SET vapi_call_id = $2 WHERE id = $1")
        .bind(id)
        .bind(vapi_call_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn complete(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE calls SET call_status = 'completed', ended_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Close out a call from the internal end-call API: terminal status,
/// measured duration, transcript folded into notes.
pub async fn finish_with_notes(
    pool: &PgPool,
    id: Uuid,
    call_duration: i32,
    notes: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE calls SET \
             call_status = 'completed', \
             ended_at = NOW(), \
             call_duration = $2, \
             resolution_status = 'resolved', \
             notes = $3 \
         WHERE id = $1",
    )
    .bind(id)
    .bind(call_duration)
    .bind(notes)
    .execute(pool)
    .await?;
    Ok(())
}

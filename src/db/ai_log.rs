//! Audit rows written by the voice-assistant tools.
//!
//! All writes here are best-effort side effects: callers log failures
//! and still return their primary response.

use sqlx::PgPool;

pub async fn log_action(
    pool: &PgPool,
    session_id: &str,
    action_type: &str,
    details: &serde_json::Value,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO ai_actions (session_id, action_type, details) VALUES ($1, $2, $3)")
        .bind(session_id)
        .bind(action_type)
        .bind(details)
        .execute(pool)
        .await?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_ticket(
    pool: &PgPool,
    id: &str,
    session_id: Option<&str>,
    customer_name: &str,
    channel: &str,
    intents: &serde_json::Value,
    actions: &serde_json::Value,
    financial_impact: Option<&str>,
    resolution: &str,
    summary: &str,
    escalated: bool,
    status: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO ai_tickets (id, session_id, customer_name, channel, intents_detected, \
             actions_taken, financial_impact, resolution, summary, escalated, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(id)
    .bind(session_id)
    .bind(customer_name)
    .bind(channel)
    .bind(intents)
    .bind(actions)
    .bind(financial_impact)
    .bind(resolution)
    .bind(summary)
    .bind(escalated)
    .bind(status)
    .execute(pool)
    .await?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_escalation(
    pool: &PgPool,
    id: &str,
    customer_id: Option<&str>,
    customer_name: Option<&str>,
    customer_phone: Option<&str>,
    reason: &str,
    context: &serde_json::Value,
    call_id: Option<&str>,
    transfer_to: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO ai_escalations (id, customer_id, customer_name, customer_phone, \
             reason, context, call_id, transfer_to, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'transferring')",
    )
    .bind(id)
    .bind(customer_id)
    .bind(customer_name)
    .bind(customer_phone)
    .bind(reason)
    .bind(context)
    .bind(call_id)
    .bind(transfer_to)
    .execute(pool)
    .await?;
    Ok(())
}

/// Mark any active assistant session for the customer as escalated.
pub async fn escalate_active_sessions(
    pool: &PgPool,
    customer_id: &str,
    reason: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE ai_sessions SET status = 'escalated', escalation_reason = $2, ended_at = NOW() \
         WHERE customer_id = $1 AND status = 'active'",
    )
    .bind(customer_id)
    .bind(reason)
    .execute(pool)
    .await?;
    Ok(())
}

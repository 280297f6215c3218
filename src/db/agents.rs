//! Agent table operations.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Agent;

const AGENT_COLUMNS: &str = "id, user_id, company_id, name, status, created_at";

/// First agent currently marked online. No ordering preference beyond
/// whatever the planner returns first.
pub async fn first_online(pool: &PgPool) -> Result<Option<Agent>, sqlx::Error> {
    sqlx::query_as::<_, Agent>(&format!(
        "SELECT {AGENT_COLUMNS} FROM agents WHERE status = 'online' LIMIT 1"
    ))
    .fetch_optional(pool)
    .await
}

pub async fn first_for_company(pool: &PgPool, company_id: Uuid) -> Result<Option<Agent>, sqlx::Error> {
    sqlx::query_as::<_, Agent>(&format!(
        "SELECT {AGENT_COLUMNS} FROM agents WHERE company_id = $1 LIMIT 1"
    ))
    .bind(company_id)
    .fetch_optional(pool)
    .await
}

pub async fn first_by_name_like(pool: &PgPool, pattern: &str) -> Result<Option<Agent>, sqlx::Error> {
    sqlx::query_as::<_, Agent>(&format!(
        "SELECT {AGENT_COLUMNS} FROM agents WHERE name ILIKE $1 LIMIT 1"
    ))
    .bind(pattern)
    .fetch_optional(pool)
    .await
}

pub async fn create(
    pool: &PgPool,
    user_id: Uuid,
    company_id: Uuid,
    name: &str,
) -> Result<Agent, sqlx::Error> {
    sqlx::query_as::<_, Agent>(&format!(
        "INSERT INTO agents (user_id, company_id, name, status) \
         VALUES ($1, $2, $3, 'offline') \
         RETURNING {AGENT_COLUMNS}"
    ))
    .bind(user_id)
    .bind(company_id)
    .bind(name)
    .fetch_one(pool)
    .await
}

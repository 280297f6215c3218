//! Company table operations.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Company;

const COMPANY_COLUMNS: &str = "id, user_id, name, created_at";

/// Fetch a company only if it belongs to the given owner.
pub async fn get_owned(
    pool: &PgPool,
    company_id: Uuid,
    owner_id: Uuid,
) -> Result<Option<Company>, sqlx::Error> {
    sqlx::query_as::<_, Company>(&format!(
        "SELECT {COMPANY_COLUMNS} FROM companies WHERE id = $1 AND user_id = $2"
    ))
    .bind(company_id)
    .bind(owner_id)
    .fetch_optional(pool)
    .await
}

pub async fn first_by_name_like(pool: &PgPool, pattern: &str) -> Result<Option<Company>, sqlx::Error> {
    sqlx::query_as::<_, Company>(&format!(
        "SELECT {COMPANY_COLUMNS} FROM companies WHERE name ILIKE $1 LIMIT 1"
    ))
    .bind(pattern)
    .fetch_optional(pool)
    .await
}

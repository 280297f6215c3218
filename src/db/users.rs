//! User account operations.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::User;

const USER_COLUMNS: &str = "id, email, password_hash, full_name, role, phone_number, created_at";

pub async fn get_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub async fn get_by_phone(pool: &PgPool, phone_number: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE phone_number = $1"
    ))
    .bind(phone_number)
    .fetch_optional(pool)
    .await
}

pub async fn create(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
    full_name: &str,
    role: &str,
    phone_number: Option<&str>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (email, password_hash, full_name, role, phone_number) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(email)
    .bind(password_hash)
    .bind(full_name)
    .bind(role)
    .bind(phone_number)
    .fetch_one(pool)
    .await
}

/// Compensating delete for the provisioning saga.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

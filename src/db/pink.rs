//! Pink Mobile demo account queries.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{PinkCustomer, PinkLine};

const CUSTOMER_COLUMNS: &str = "id, name, phone, email, address, pin, created_at";
const LINE_COLUMNS: &str =
    "id, customer_id, line_type, device, phone_number, monthly_price, status, created_at";

pub async fn get_customer(pool: &PgPool, id: Uuid) -> Result<Option<PinkCustomer>, sqlx::Error> {
    sqlx::query_as::<_, PinkCustomer>(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM pink_customers WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn get_customer_by_phone(
    pool: &PgPool,
    phone: &str,
) -> Result<Option<PinkCustomer>, sqlx::Error> {
    sqlx::query_as::<_, PinkCustomer>(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM pink_customers WHERE phone = $1"
    ))
    .bind(phone)
    .fetch_optional(pool)
    .await
}

pub async fn count_lines(pool: &PgPool, customer_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM pink_lines WHERE customer_id = $1")
        .bind(customer_id)
        .fetch_one(pool)
        .await
}

pub async fn get_lines(pool: &PgPool, customer_id: Uuid) -> Result<Vec<PinkLine>, sqlx::Error> {
    sqlx::query_as::<_, PinkLine>(&format!(
        "SELECT {LINE_COLUMNS} FROM pink_lines WHERE customer_id = $1 ORDER BY created_at ASC"
    ))
    .bind(customer_id)
    .fetch_all(pool)
    .await
}

pub async fn get_pending_lines(
    pool: &PgPool,
    customer_id: Uuid,
) -> Result<Vec<PinkLine>, sqlx::Error> {
    sqlx::query_as::<_, PinkLine>(&format!(
        "SELECT {LINE_COLUMNS} FROM pink_lines \
         WHERE customer_id = $1 AND status = 'pending_activation' \
         ORDER BY created_at ASC"
    ))
    .bind(customer_id)
    .fetch_all(pool)
    .await
}

pub async fn add_line(
    pool: &PgPool,
    customer_id: Uuid,
    line_type: &str,
    device: &str,
    phone_number: &str,
    monthly_price: f64,
) -> Result<PinkLine, sqlx::Error> {
    sqlx::query_as::<_, PinkLine>(&format!(
        "INSERT INTO pink_lines (customer_id, line_type, device, phone_number, monthly_price, status) \
         VALUES ($1, $2, $3, $4, $5, 'pending_activation') \
         RETURNING {LINE_COLUMNS}"
    ))
    .bind(customer_id)
    .bind(line_type)
    .bind(device)
    .bind(phone_number)
    .bind(monthly_price)
    .fetch_one(pool)
    .await
}

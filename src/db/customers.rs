//! Customer profile upkeep shared by the Twilio webhook handlers.

use sqlx::PgPool;

use crate::models::CustomerProfile;

const PROFILE_COLUMNS: &str =
    "id, phone_number, name, email, call_history_count, last_interaction_at, created_at";

/// Find-or-create the profile for a caller and bump its interaction
/// counters. `name`/`email` only seed a newly created profile.
pub async fn touch(
    pool: &PgPool,
    phone_number: &str,
    name: Option<&str>,
    email: Option<&str>,
) -> Result<CustomerProfile, sqlx::Error> {
    sqlx::query_as::<_, CustomerProfile>(&format!(
        "INSERT INTO customer_profiles (phone_number, name, email, call_history_count, last_interaction_at) \
         VALUES ($1, $2, $3, 1, NOW()) \
         ON CONFLICT (phone_number) DO UPDATE \
         SET call_history_count = customer_profiles.call_history_count + 1, \
             last_interaction_at = NOW() \
         RETURNING {PROFILE_COLUMNS}"
    ))
    .bind(phone_number)
    .bind(name)
    .bind(email)
    .fetch_one(pool)
    .await
}

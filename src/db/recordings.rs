//! Call recording rows created from Twilio status callbacks.

use sqlx::PgPool;
use uuid::Uuid;

pub async fn upsert(
    pool: &PgPool,
    call_id: Uuid,
    twilio_recording_sid: &str,
    recording_url: &str,
    duration: Option<i32>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO call_recordings (call_id, twilio_recording_sid, recording_url, duration) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (twilio_recording_sid) DO UPDATE \
         SET recording_url = EXCLUDED.recording_url, \
             duration = COALESCE(EXCLUDED.duration, call_recordings.duration)",
    )
    .bind(call_id)
    .bind(twilio_recording_sid)
    .bind(recording_url)
    .bind(duration)
    .execute(pool)
    .await?;
    Ok(())
}

//! Transcript storage with count-based deduplication.
//!
//! Webhook deliveries repeat the full conversation each time; the only
//! dedup applied is comparing the incoming turn count against rows
//! already stored and inserting the suffix. Not content-addressed and
//! not robust to reordering or overlap.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Speaker, Transcript};
use crate::vapi::ConversationTurn;

pub async fn count_for_call(pool: &PgPool, call_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM transcripts WHERE call_id = $1")
        .bind(call_id)
        .fetch_one(pool)
        .await
}

pub async fn get_ordered(pool: &PgPool, call_id: Uuid) -> Result<Vec<Transcript>, sqlx::Error> {
    sqlx::query_as::<_, Transcript>(
        "SELECT id, call_id, speaker, text, created_at \
         FROM transcripts WHERE call_id = $1 ORDER BY created_at ASC",
    )
    .bind(call_id)
    .fetch_all(pool)
    .await
}

/// Insert turns with millisecond timestamp offsets so same-batch rows
/// keep their relative order.
pub async fn insert_turns(
    pool: &PgPool,
    call_id: Uuid,
    turns: &[ConversationTurn],
) -> Result<usize, sqlx::Error> {
    let base = Utc::now();
    for (idx, turn) in turns.iter().enumerate() {
        let Some(text) = turn.text() else { continue };
        let speaker = Speaker::from_role(turn.role.as_deref().unwrap_or(""));
        sqlx::query(
            "INSERT INTO transcripts (call_id, speaker, text, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(call_id)
        .bind(speaker)
        .bind(text)
        .bind(base + Duration::milliseconds(idx as i64))
        .execute(pool)
        .await?;
    }
    Ok(turns.len())
}

/// Spoken turns beyond what is already persisted. A delivery that
/// repeats or shrinks the stored conversation yields nothing.
fn turns_beyond(turns: &[ConversationTurn], existing: usize) -> Vec<ConversationTurn> {
    let valid: Vec<ConversationTurn> = turns
        .iter()
        .filter(|t| t.is_spoken())
        .cloned()
        .collect();

    if valid.len() <= existing {
        return Vec::new();
    }
    valid[existing..].to_vec()
}

/// Append only the turns beyond what is already persisted for the call.
/// Returns how many rows were inserted.
pub async fn append_new_turns(
    pool: &PgPool,
    call_id: Uuid,
    turns: &[ConversationTurn],
) -> Result<usize, sqlx::Error> {
    let existing = count_for_call(pool, call_id).await? as usize;
    let suffix = turns_beyond(turns, existing);
    if suffix.is_empty() {
        return Ok(0);
    }

    insert_turns(pool, call_id, &suffix).await?;
    Ok(suffix.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: &str, text: &str) -> ConversationTurn {
        ConversationTurn {
            role: Some(role.to_string()),
            content: Some(text.to_string()),
            message: None,
        }
    }

    #[test]
    fn growing_delivery_yields_only_the_suffix() {
        let turns = vec![
            turn("assistant", "Hi, thanks for calling."),
            turn("user", "I need help."),
            turn("assistant", "Sure, what's your number?"),
            turn("user", "555-1234."),
        ];
        let suffix = turns_beyond(&turns, 2);
        assert_eq!(suffix.len(), 2);
        assert_eq!(suffix[0].text(), Some("Sure, what's your number?"));
        assert_eq!(suffix[1].text(), Some("555-1234."));
    }

    #[test]
    fn repeated_delivery_yields_nothing() {
        let turns = vec![turn("assistant", "Hi."), turn("user", "Hello.")];
        assert!(turns_beyond(&turns, 2).is_empty());
    }

    #[test]
    fn shorter_than_stored_delivery_yields_nothing() {
        let turns = vec![turn("assistant", "Hi.")];
        assert!(turns_beyond(&turns, 3).is_empty());
    }

    #[test]
    fn system_and_empty_turns_do_not_count_toward_the_suffix() {
        let turns = vec![
            turn("system", "prompt"),
            turn("assistant", "Hi."),
            turn("user", ""),
            turn("user", "Hello."),
        ];
        // Only the two spoken turns count; one is already stored.
        let suffix = turns_beyond(&turns, 1);
        assert_eq!(suffix.len(), 1);
        assert_eq!(suffix[0].text(), Some("Hello."));
    }
}

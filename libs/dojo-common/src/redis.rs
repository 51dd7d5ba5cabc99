use crate::types::AttemptRecord;
use redis::{AsyncCommands, RedisResult};
use uuid::Uuid;

/// Redis key layout for persisted attempts.
/// API and CLI share these so keys stay deterministic.

pub const ATTEMPT_PREFIX: &str = "dojo:attempt";
pub const CHALLENGE_PREFIX: &str = "dojo:challenge";

/// Key holding one attempt record
pub fn attempt_key(attempt_id: &Uuid) -> String {
    format!("{}:{}", ATTEMPT_PREFIX, attempt_id)
}

/// Key of the list of attempt ids recorded for a challenge, newest first
pub fn challenge_attempts_key(challenge_id: &Uuid) -> String {
    format!("{}:{}:attempts", CHALLENGE_PREFIX, challenge_id)
}

fn serde_error(context: &'static str, e: serde_json::Error) -> redis::RedisError {
    redis::RedisError::from((redis::ErrorKind::TypeError, context, e.to_string()))
}

/// Store an attempt with a 24-hour TTL and index it under its challenge
pub async fn store_attempt(
    conn: &mut redis::aio::ConnectionManager,
    attempt: &AttemptRecord,
) -> RedisResult<()> {
    let key = attempt_key(&attempt.id);
    let index = challenge_attempts_key(&attempt.challenge_id);
    let payload = serde_json::to_string(attempt).map_err(|e| serde_error("serialization error", e))?;

    redis::pipe()
        .atomic()
        .set_ex(&key, payload, 86400)
        .ignore()
        .lpush(&index, attempt.id.to_string())
        .ignore()
        .expire(&index, 86400)
        .ignore()
        .query_async::<_, ()>(conn)
        .await
}

/// Retrieve an attempt; `None` once expired or never stored
pub async fn get_attempt(
    conn: &mut redis::aio::ConnectionManager,
    attempt_id: &Uuid,
) -> RedisResult<Option<AttemptRecord>> {
    let payload: Option<String> = conn.get(attempt_key(attempt_id)).await?;

    match payload {
        Some(data) => {
            let attempt = serde_json::from_str(&data).map_err(|e| serde_error("deserialization error", e))?;
            Ok(Some(attempt))
        }
        None => Ok(None),
    }
}

/// Most recent attempt ids for a challenge
pub async fn recent_attempt_ids(
    conn: &mut redis::aio::ConnectionManager,
    challenge_id: &Uuid,
    limit: isize,
) -> RedisResult<Vec<Uuid>> {
    let ids: Vec<String> = conn
        .lrange(challenge_attempts_key(challenge_id), 0, limit - 1)
        .await?;
    Ok(ids.iter().filter_map(|id| Uuid::parse_str(id).ok()).collect())
}

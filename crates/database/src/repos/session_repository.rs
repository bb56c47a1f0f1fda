//! Session repository: bearer tokens issued to users.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use msgat_attachments::{SessionStore, StoreResult};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::types::{DatabaseError, DatabaseResult};

const MAX_TTL_SECONDS: i64 = 100 * 365 * 24 * 60 * 60;

/// An issued session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Repository for session database operations
#[derive(Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
    ttl: Duration,
}

impl SessionRepository {
    /// Sessions created through this repository live for `ttl_seconds`, capped at a century
    pub fn new(pool: SqlitePool, ttl_seconds: i64) -> Self {
        Self {
            pool,
            ttl: Duration::seconds(ttl_seconds.clamp(0, MAX_TTL_SECONDS)),
        }
    }

    /// Issue a new session token for `user_id`
    pub async fn create(&self, user_id: i64) -> DatabaseResult<Session> {
        let created_at = Utc::now();
        let expires_at = created_at
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let token = cuid2::create_id();

        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&token)
        .bind(user_id)
        .bind(created_at.to_rfc3339())
        .bind(expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        info!(user_id, "session created");
        Ok(Session {
            token,
            user_id,
            created_at,
            expires_at,
        })
    }

    /// Find a session by token, expired or not
    pub async fn find_by_token(&self, token: &str) -> DatabaseResult<Option<Session>> {
        let row = sqlx::query(
            "SELECT token, user_id, created_at, expires_at FROM sessions WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let created_at: String = row.try_get("created_at")?;
        let expires_at: String = row.try_get("expires_at")?;

        Ok(Some(Session {
            token: row.try_get("token")?,
            user_id: row.try_get("user_id")?,
            created_at: parse_timestamp(&created_at)?,
            expires_at: parse_timestamp(&expires_at)?,
        }))
    }

    /// Delete a session. Returns whether it existed.
    pub async fn revoke(&self, token: &str) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove every expired session, returning how many were removed
    pub async fn purge_expired(&self) -> DatabaseResult<u64> {
        let now = Utc::now();
        let rows = sqlx::query("SELECT token, expires_at FROM sessions")
            .fetch_all(&self.pool)
            .await?;

        let mut removed = 0;
        for row in rows {
            let expires_at: String = row.try_get("expires_at")?;
            // Unparseable expiry counts as expired.
            let expired = parse_timestamp(&expires_at).map_or(true, |at| at <= now);
            if expired {
                let token: String = row.try_get("token")?;
                if self.revoke(&token).await? {
                    removed += 1;
                }
            }
        }

        debug!(removed, "expired sessions purged");
        Ok(removed)
    }
}

fn parse_timestamp(raw: &str) -> DatabaseResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| DatabaseError::SerializationError(format!("invalid timestamp {raw:?}: {e}")))
}

#[async_trait]
impl SessionStore for SessionRepository {
    async fn resolve_user(&self, token: &str) -> StoreResult<Option<i64>> {
        let Some(session) = self.find_by_token(token).await? else {
            return Ok(None);
        };

        if session.is_expired_at(Utc::now()) {
            debug!(user_id = session.user_id, "session expired");
            return Ok(None);
        }

        Ok(Some(session.user_id))
    }
}

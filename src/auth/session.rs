//! Session storage behind a small trait so the backing store can change
//! (in-process map, Postgres, anything else) without touching handlers or
//! the auth middleware.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use sqlx::{FromRow, PgPool};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::SessionBackend;
use crate::error::AppResult;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

pub trait SessionStore: Send + Sync {
    /// Returns the session only while it has not expired.
    fn get(&self, id: Uuid) -> BoxFuture<'_, AppResult<Option<Session>>>;

    fn set(&self, session: Session) -> BoxFuture<'_, AppResult<()>>;

    /// Clearing an unknown id is not an error.
    fn clear(&self, id: Uuid) -> BoxFuture<'_, AppResult<()>>;

    /// Drops expired sessions, returning how many were removed.
    fn purge_expired(&self) -> BoxFuture<'_, AppResult<u64>>;
}

pub fn build_session_store(backend: SessionBackend, db: PgPool) -> Arc<dyn SessionStore> {
    match backend {
        SessionBackend::Memory => Arc::new(MemorySessionStore::new()),
        SessionBackend::Postgres => Arc::new(PgSessionStore::new(db)),
    }
}

/// Single-instance store; sessions are lost on restart.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<Mutex<HashMap<Uuid, Session>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, id: Uuid) -> BoxFuture<'_, AppResult<Option<Session>>> {
        Box::pin(async move {
            let sessions = self.sessions.lock().await;
            Ok(sessions.get(&id).filter(|s| s.is_live(Utc::now())).cloned())
        })
    }

    fn set(&self, session: Session) -> BoxFuture<'_, AppResult<()>> {
        Box::pin(async move {
            self.sessions.lock().await.insert(session.id, session);
            Ok(())
        })
    }

    fn clear(&self, id: Uuid) -> BoxFuture<'_, AppResult<()>> {
        Box::pin(async move {
            self.sessions.lock().await.remove(&id);
            Ok(())
        })
    }

    fn purge_expired(&self) -> BoxFuture<'_, AppResult<u64>> {
        Box::pin(async move {
            let mut sessions = self.sessions.lock().await;
            let before = sessions.len();
            let now = Utc::now();
            sessions.retain(|_, s| s.is_live(now));
            Ok((before - sessions.len()) as u64)
        })
    }
}

pub struct PgSessionStore {
    db: PgPool,
}

impl PgSessionStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

impl SessionStore for PgSessionStore {
    fn get(&self, id: Uuid) -> BoxFuture<'_, AppResult<Option<Session>>> {
        Box::pin(async move {
            let session = sqlx::query_as::<_, Session>(
                "SELECT id, user_id, expires_at FROM sessions WHERE id = $1 AND expires_at > NOW()",
            )
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
            Ok(session)
        })
    }

    fn set(&self, session: Session) -> BoxFuture<'_, AppResult<()>> {
        Box::pin(async move {
            sqlx::query(
                r#"
                INSERT INTO sessions (id, user_id, expires_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (id) DO UPDATE SET expires_at = EXCLUDED.expires_at
                "#,
            )
            .bind(session.id)
            .bind(session.user_id)
            .bind(session.expires_at)
            .execute(&self.db)
            .await?;
            Ok(())
        })
    }

    fn clear(&self, id: Uuid) -> BoxFuture<'_, AppResult<()>> {
        Box::pin(async move {
            sqlx::query("DELETE FROM sessions WHERE id = $1")
                .bind(id)
                .execute(&self.db)
                .await?;
            Ok(())
        })
    }

    fn purge_expired(&self) -> BoxFuture<'_, AppResult<u64>> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
                .execute(&self.db)
                .await?;
            Ok(result.rows_affected())
        })
    }
}

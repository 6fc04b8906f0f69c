//! PostgreSQL-backed store for deployments that must survive a restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;

use super::{EventStore, InviteStore, MemberStore, SettingsStore, StoreError, StoreResult};
use crate::models::{
    DesireLevel, DomainEvent, Drink, EventKind, InviteToken, Member, MemberId, NewEvent,
};

const MEMBER_COLUMNS: &str = "id, display_name, desire, drink, joined_at";
const EVENT_COLUMNS: &str = "id, kind, actor_id, actor_name, payload, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects and creates the tables if they do not exist yet.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Unavailable(format!("failed to connect postgres: {e}")))?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: PgPool) -> StoreResult<Self> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn init_schema(&self) -> StoreResult<()> {
        let ddl = [
            r#"
            CREATE TABLE IF NOT EXISTS brewcrew_members (
                id BIGINT PRIMARY KEY,
                display_name TEXT NOT NULL,
                desire SMALLINT NOT NULL DEFAULT 0,
                drink TEXT NOT NULL DEFAULT 'coffee',
                joined_at TIMESTAMPTZ NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS brewcrew_invites (
                code TEXT PRIMARY KEY,
                created_by BIGINT,
                created_at TIMESTAMPTZ NOT NULL,
                used_by BIGINT,
                used_at TIMESTAMPTZ,
                active BOOLEAN NOT NULL DEFAULT TRUE
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS brewcrew_events (
                id BIGSERIAL PRIMARY KEY,
                kind TEXT NOT NULL,
                actor_id BIGINT,
                actor_name TEXT,
                payload TEXT,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS brewcrew_events_created_at ON brewcrew_events (created_at)",
            r#"
            CREATE TABLE IF NOT EXISTS brewcrew_settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        ];

        for stmt in ddl {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Unavailable(format!("schema init failed: {e}")))?;
        }
        info!("Postgres schema ready");
        Ok(())
    }
}

#[async_trait]
impl MemberStore for PgStore {
    async fn member_exists(&self, id: MemberId) -> StoreResult<bool> {
        let row = sqlx::query("SELECT 1 FROM brewcrew_members WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.is_some())
    }

    async fn upsert_member(
        &self,
        id: MemberId,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Member> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO brewcrew_members (id, display_name, joined_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET display_name = EXCLUDED.display_name
            RETURNING {MEMBER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(display_name)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        member_from_row(&row)
    }

    async fn get_member(&self, id: MemberId) -> StoreResult<Option<Member>> {
        let row = sqlx::query(&format!(
            "SELECT {MEMBER_COLUMNS} FROM brewcrew_members WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        row.as_ref().map(member_from_row).transpose()
    }

    async fn list_members(&self) -> StoreResult<Vec<Member>> {
        let rows = sqlx::query(&format!(
            "SELECT {MEMBER_COLUMNS} FROM brewcrew_members ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        rows.iter().map(member_from_row).collect()
    }

    async fn set_desire(&self, id: MemberId, level: DesireLevel) -> StoreResult<()> {
        let result = sqlx::query("UPDATE brewcrew_members SET desire = $2 WHERE id = $1")
            .bind(id)
            .bind(i16::from(level.value()))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("member {}", id)));
        }
        Ok(())
    }

    async fn set_drink(&self, id: MemberId, drink: Drink) -> StoreResult<()> {
        let result = sqlx::query("UPDATE brewcrew_members SET drink = $2 WHERE id = $1")
            .bind(id)
            .bind(drink.code())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("member {}", id)));
        }
        Ok(())
    }

    async fn reset_all_desires(&self) -> StoreResult<()> {
        sqlx::query("UPDATE brewcrew_members SET desire = 0")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[async_trait]
impl InviteStore for PgStore {
    async fn create_invite(
        &self,
        code: &str,
        created_by: Option<MemberId>,
        now: DateTime<Utc>,
    ) -> StoreResult<InviteToken> {
        sqlx::query(
            r#"
            INSERT INTO brewcrew_invites (code, created_by, created_at, used_by, used_at, active)
            VALUES ($1, $2, $3, NULL, NULL, TRUE)
            ON CONFLICT (code) DO UPDATE SET
                created_by = EXCLUDED.created_by,
                created_at = EXCLUDED.created_at,
                used_by = NULL,
                used_at = NULL,
                active = TRUE
            "#,
        )
        .bind(code)
        .bind(created_by)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(InviteToken::new(code, created_by, now))
    }

    async fn redeem_invite(
        &self,
        code: &str,
        consumer: MemberId,
        consumer_name: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Member>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // Row lock on the invite decides the winner of concurrent redemptions.
        let won = sqlx::query(
            r#"
            UPDATE brewcrew_invites
            SET active = FALSE, used_by = $2, used_at = $3
            WHERE code = $1 AND active AND used_by IS NULL
            RETURNING code
            "#,
        )
        .bind(code)
        .bind(consumer)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if won.is_none() {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Ok(None);
        }

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO brewcrew_members (id, display_name, joined_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET display_name = EXCLUDED.display_name
            RETURNING {MEMBER_COLUMNS}
            "#
        ))
        .bind(consumer)
        .bind(consumer_name)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        let member = member_from_row(&row)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        debug!("Invite {} redeemed by {} ({})", code, consumer, consumer_name);
        Ok(Some(member))
    }

    async fn get_invite(&self, code: &str) -> StoreResult<Option<InviteToken>> {
        let row = sqlx::query(
            r#"
            SELECT code, created_by, created_at, used_by, used_at, active
            FROM brewcrew_invites WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        row.as_ref().map(invite_from_row).transpose()
    }
}

#[async_trait]
impl EventStore for PgStore {
    async fn append_event(&self, event: NewEvent) -> StoreResult<DomainEvent> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO brewcrew_events (kind, actor_id, actor_name, payload, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(event.kind.as_str())
        .bind(event.actor_id)
        .bind(event.actor_name)
        .bind(event.payload)
        .bind(event.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        event_from_row(&row)
    }

    async fn consumption_timestamps(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<DateTime<Utc>>> {
        let rows = sqlx::query(
            r#"
            SELECT created_at FROM brewcrew_events
            WHERE kind = $1 AND ($2::TIMESTAMPTZ IS NULL OR created_at >= $2)
            ORDER BY created_at, id
            "#,
        )
        .bind(EventKind::Consumption.as_str())
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        rows.iter()
            .map(|row| row.try_get("created_at").map_err(map_sqlx_error))
            .collect()
    }

    async fn events_since(&self, since: Option<DateTime<Utc>>) -> StoreResult<Vec<DomainEvent>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {EVENT_COLUMNS} FROM brewcrew_events
            WHERE $1::TIMESTAMPTZ IS NULL OR created_at >= $1
            ORDER BY created_at, id
            "#
        ))
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        rows.iter().map(event_from_row).collect()
    }
}

#[async_trait]
impl SettingsStore for PgStore {
    async fn get_setting(&self, key: &str) -> StoreResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM brewcrew_settings WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.map(|r| r.try_get("value").map_err(map_sqlx_error))
            .transpose()
    }

    async fn set_setting(&self, key: &str, value: &str) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO brewcrew_settings (key, value) VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn set_setting_if_absent(&self, key: &str, value: &str) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO brewcrew_settings (key, value) VALUES ($1, $2) ON CONFLICT (key) DO NOTHING",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }
}

fn member_from_row(row: &PgRow) -> StoreResult<Member> {
    let desire: i16 = row.try_get("desire").map_err(map_sqlx_error)?;
    let drink: String = row.try_get("drink").map_err(map_sqlx_error)?;
    Ok(Member {
        id: row.try_get("id").map_err(map_sqlx_error)?,
        display_name: row.try_get("display_name").map_err(map_sqlx_error)?,
        desire: DesireLevel::new(i64::from(desire)).map_err(corrupt)?,
        drink: drink.parse().map_err(corrupt)?,
        joined_at: row.try_get("joined_at").map_err(map_sqlx_error)?,
    })
}

fn invite_from_row(row: &PgRow) -> StoreResult<InviteToken> {
    Ok(InviteToken {
        code: row.try_get("code").map_err(map_sqlx_error)?,
        created_by: row.try_get("created_by").map_err(map_sqlx_error)?,
        created_at: row.try_get("created_at").map_err(map_sqlx_error)?,
        used_by: row.try_get("used_by").map_err(map_sqlx_error)?,
        used_at: row.try_get("used_at").map_err(map_sqlx_error)?,
        active: row.try_get("active").map_err(map_sqlx_error)?,
    })
}

fn event_from_row(row: &PgRow) -> StoreResult<DomainEvent> {
    let id: i64 = row.try_get("id").map_err(map_sqlx_error)?;
    let kind: String = row.try_get("kind").map_err(map_sqlx_error)?;
    Ok(DomainEvent {
        id: id as u64,
        kind: kind.parse().map_err(corrupt)?,
        actor_id: row.try_get("actor_id").map_err(map_sqlx_error)?,
        actor_name: row.try_get("actor_name").map_err(map_sqlx_error)?,
        payload: row.try_get("payload").map_err(map_sqlx_error)?,
        created_at: row.try_get("created_at").map_err(map_sqlx_error)?,
    })
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return StoreError::Conflict(db_err.message().to_string());
        }
    }
    StoreError::Unavailable(err.to_string())
}

fn corrupt(err: impl std::fmt::Display) -> StoreError {
    StoreError::Unavailable(format!("unreadable row: {err}"))
}

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool};
use tracing::info;
use uuid::Uuid;

use super::{CardStore, LikeOutcome, StoreError, UserStore};
use crate::config::DatabaseConfig;
use crate::models::{Card, CardDetails, Like, User};

const UNIQUE_VIOLATION: &str = "23505";

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        doc JSONB NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS cards (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL,
        biz_number TEXT NOT NULL UNIQUE,
        doc JSONB NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS cards_user_id_idx ON cards (user_id)",
];

/// Users and cards kept as JSONB documents, with the lookup and unique keys
/// mirrored into plain columns.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!("Created database pool (max {} connections)", config.max_connections);
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create tables and indexes if they are missing.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Database schema is up to date");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }
}

/// Map unique-constraint violations to `Duplicate`, everything else passes through.
fn unique_as_duplicate(field: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |err| match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            StoreError::Duplicate(field)
        }
        _ => StoreError::Sqlx(err),
    }
}

fn decode<T>(result: Result<T, sqlx::Error>) -> Result<T, StoreError> {
    result.map_err(|err| match err {
        sqlx::Error::ColumnDecode { source, .. } => StoreError::Serialization(source.to_string()),
        sqlx::Error::PoolTimedOut => StoreError::Unavailable("timed out waiting for a connection".to_string()),
        other => StoreError::Sqlx(other),
    })
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO users (id, email, doc) VALUES ($1, $2, $3)")
            .bind(user.id)
            .bind(&user.email)
            .bind(Json(user))
            .execute(&self.pool)
            .await
            .map_err(unique_as_duplicate("email"))?;
        Ok(())
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let doc = decode(
            sqlx::query_scalar::<_, Json<User>>("SELECT doc FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await,
        )?;
        Ok(doc.map(|Json(user)| user))
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let doc = decode(
            sqlx::query_scalar::<_, Json<User>>("SELECT doc FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await,
        )?;
        Ok(doc.map(|Json(user)| user))
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let docs = decode(
            sqlx::query_scalar::<_, Json<User>>("SELECT doc FROM users ORDER BY doc->>'createdAt'")
                .fetch_all(&self.pool)
                .await,
        )?;
        Ok(docs.into_iter().map(|Json(user)| user).collect())
    }

    async fn replace_user(&self, user: &User) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE users SET email = $2, doc = $3 WHERE id = $1")
            .bind(user.id)
            .bind(&user.email)
            .bind(Json(user))
            .execute(&self.pool)
            .await
            .map_err(unique_as_duplicate("email"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let doc = decode(
            sqlx::query_scalar::<_, Json<User>>("DELETE FROM users WHERE id = $1 RETURNING doc")
                .bind(id)
                .fetch_optional(&self.pool)
                .await,
        )?;
        Ok(doc.map(|Json(user)| user))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        decode(sqlx::query("SELECT 1").execute(&self.pool).await)?;
        Ok(())
    }
}

#[async_trait]
impl CardStore for PgStore {
    async fn insert_card(&self, card: &Card) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO cards (id, user_id, biz_number, doc) VALUES ($1, $2, $3, $4)")
            .bind(card.id)
            .bind(card.user_id)
            .bind(&card.biz_number)
            .bind(Json(card))
            .execute(&self.pool)
            .await
            .map_err(unique_as_duplicate("bizNumber"))?;
        Ok(())
    }

    async fn card_by_id(&self, id: Uuid) -> Result<Option<Card>, StoreError> {
        let doc = decode(
            sqlx::query_scalar::<_, Json<Card>>("SELECT doc FROM cards WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await,
        )?;
        Ok(doc.map(|Json(card)| card))
    }

    async fn owned_card(&self, id: Uuid, owner: Uuid) -> Result<Option<Card>, StoreError> {
        let doc = decode(
            sqlx::query_scalar::<_, Json<Card>>("SELECT doc FROM cards WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(owner)
                .fetch_optional(&self.pool)
                .await,
        )?;
        Ok(doc.map(|Json(card)| card))
    }

    async fn list_cards(&self) -> Result<Vec<Card>, StoreError> {
        let docs = decode(
            sqlx::query_scalar::<_, Json<Card>>("SELECT doc FROM cards")
                .fetch_all(&self.pool)
                .await,
        )?;
        Ok(docs.into_iter().map(|Json(card)| card).collect())
    }

    async fn cards_by_owner(&self, owner: Uuid) -> Result<Vec<Card>, StoreError> {
        let docs = decode(
            sqlx::query_scalar::<_, Json<Card>>("SELECT doc FROM cards WHERE user_id = $1")
                .bind(owner)
                .fetch_all(&self.pool)
                .await,
        )?;
        Ok(docs.into_iter().map(|Json(card)| card).collect())
    }

    async fn card_by_biz_number(&self, biz_number: &str) -> Result<Option<Card>, StoreError> {
        let doc = decode(
            sqlx::query_scalar::<_, Json<Card>>("SELECT doc FROM cards WHERE biz_number = $1")
                .bind(biz_number)
                .fetch_optional(&self.pool)
                .await,
        )?;
        Ok(doc.map(|Json(card)| card))
    }

    async fn update_card_details(&self, id: Uuid, details: &CardDetails) -> Result<Option<Card>, StoreError> {
        // `||` merges top-level keys, so likes and bizNumber in the stored doc survive.
        let doc = decode(
            sqlx::query_scalar::<_, Json<Card>>("UPDATE cards SET doc = doc || $2 WHERE id = $1 RETURNING doc")
                .bind(id)
                .bind(Json(details))
                .fetch_optional(&self.pool)
                .await,
        )?;
        Ok(doc.map(|Json(card)| card))
    }

    async fn set_biz_number(&self, id: Uuid, biz_number: &str) -> Result<Option<Card>, StoreError> {
        let doc = sqlx::query_scalar::<_, Json<Card>>(
            r#"
            UPDATE cards
            SET biz_number = $2, doc = jsonb_set(doc, '{bizNumber}', to_jsonb($2::text))
            WHERE id = $1
            RETURNING doc
            "#,
        )
        .bind(id)
        .bind(biz_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(unique_as_duplicate("bizNumber"))?;
        Ok(doc.map(|Json(card)| card))
    }

    async fn add_like(&self, id: Uuid, user_id: Uuid) -> Result<LikeOutcome, StoreError> {
        let doc = decode(
            sqlx::query_scalar::<_, Json<Card>>(
                r#"
                UPDATE cards
                SET doc = jsonb_set(doc, '{likes}', COALESCE(doc->'likes', '[]'::jsonb) || jsonb_build_array($2::jsonb))
                WHERE id = $1
                  AND NOT COALESCE(doc->'likes', '[]'::jsonb) @> jsonb_build_array(jsonb_build_object('user_id', $3::text))
                RETURNING doc
                "#,
            )
            .bind(id)
            .bind(Json(Like::new(user_id)))
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await,
        )?;

        if let Some(Json(card)) = doc {
            return Ok(LikeOutcome::Liked(card));
        }

        let exists = decode(
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM cards WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await,
        )?;
        Ok(if exists { LikeOutcome::AlreadyLiked } else { LikeOutcome::NotFound })
    }

    async fn delete_card(&self, id: Uuid) -> Result<Option<Card>, StoreError> {
        let doc = decode(
            sqlx::query_scalar::<_, Json<Card>>("DELETE FROM cards WHERE id = $1 RETURNING doc")
                .bind(id)
                .fetch_optional(&self.pool)
                .await,
        )?;
        Ok(doc.map(|Json(card)| card))
    }
}

use std::fmt::Display;
use std::path::Path;

use sqlx::{Sqlite, migrate::Migrator};

use crate::payment::Payment;

static MIGRATOR: Migrator = sqlx::migrate!(); // defaults to "./migrations"

#[derive(Debug)]
pub enum StoreError {
    /// No row for the requested id, or an empty page.
    NotFound,
    /// A stored attributes payload failed to encode/decode.
    Json(serde_json::Error),
    Database(sqlx::Error),
}

impl std::error::Error for StoreError {}

impl Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound => f.write_str("payment not found"),
            StoreError::Json(e) => write!(f, "attributes payload: {e}"),
            StoreError::Database(e) => write!(f, "database error: {e}"),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::RowNotFound => Self::NotFound,
            e => Self::Database(e),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Persistence operations for a [Payment]. The service layer is written
/// against this trait so it can run on an in-memory substitute in tests.
pub trait PaymentStore {
    async fn get(&self, id: &str) -> Result<Payment, StoreError>;
    async fn create(&self, payment: &Payment) -> Result<(), StoreError>;
    /// Full-record replace keyed on `payment.id`. [StoreError::NotFound] when
    /// no row matches.
    async fn update(&self, payment: &Payment) -> Result<(), StoreError>;
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
    /// Page of payments ordered by id descending. An empty page is
    /// [StoreError::NotFound].
    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Payment>, StoreError>;
    /// Trivial round-trip against the store.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct Db(sqlx::Pool<Sqlite>);

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: String,
    #[sqlx(rename = "type")]
    kind: String,
    version: i64,
    organisation_id: String,
    attributes: String,
}

impl PaymentRow {
    fn into_payment(self) -> Result<Payment, StoreError> {
        Ok(Payment {
            kind: self.kind,
            id: self.id,
            version: self.version,
            organisation_id: self.organisation_id,
            attributes: serde_json::from_str(&self.attributes)?,
        })
    }
}

impl Db {
    pub async fn connect(database_url: &str) -> sqlx::Result<Self> {
        tracing::debug!(%database_url);
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            let path = Path::new(path);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .expect("directory is initialized");
            }
            tokio::fs::OpenOptions::new()
                .write(true)
                .truncate(false)
                .create(true)
                .open(path)
                .await
                .expect("open database file");
        }
        let pool = sqlx::Pool::connect(database_url).await?;
        MIGRATOR.run(&pool).await?;
        Ok(Self(pool))
    }

    pub async fn close(&self) {
        self.0.close().await;
    }

    #[cfg(test)]
    pub(crate) async fn connect_memory() -> sqlx::Result<Self> {
        // A pool of one keeps every query on the same in-memory database.
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        MIGRATOR.run(&pool).await?;
        Ok(Self(pool))
    }
}

impl PaymentStore for Db {
    async fn get(&self, id: &str) -> Result<Payment, StoreError> {
        let row: Option<PaymentRow> = sqlx::query_as(
            "SELECT id, type, version, organisation_id, attributes FROM payments WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.0)
        .await?;
        row.ok_or(StoreError::NotFound)?.into_payment()
    }

    async fn create(&self, payment: &Payment) -> Result<(), StoreError> {
        let attributes = serde_json::to_string(&payment.attributes)?;
        sqlx::query(
            "INSERT INTO payments (id, type, version, organisation_id, attributes) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&payment.id)
        .bind(&payment.kind)
        .bind(payment.version)
        .bind(&payment.organisation_id)
        .bind(attributes)
        .execute(&self.0)
        .await?;
        Ok(())
    }

    async fn update(&self, payment: &Payment) -> Result<(), StoreError> {
        let attributes = serde_json::to_string(&payment.attributes)?;
        let result = sqlx::query(
            "UPDATE payments SET type = ?, version = ?, organisation_id = ?, attributes = ? WHERE id = ?",
        )
        .bind(&payment.kind)
        .bind(payment.version)
        .bind(&payment.organisation_id)
        .bind(attributes)
        .bind(&payment.id)
        .execute(&self.0)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM payments WHERE id = ?")
            .bind(id)
            .execute(&self.0)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Payment>, StoreError> {
        let rows: Vec<PaymentRow> = sqlx::query_as(
            "SELECT id, type, version, organisation_id, attributes FROM payments ORDER BY id DESC LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.0)
        .await?;
        if rows.is_empty() {
            return Err(StoreError::NotFound);
        }
        rows.into_iter().map(PaymentRow::into_payment).collect()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.0).await?;
        Ok(())
    }
}

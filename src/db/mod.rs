use crate::error::PersistenceError;
use crate::models::Ack;
use async_trait::async_trait;
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{Connection, PgConnection};
use uuid::Uuid;

#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Writes exactly one document into `collection`.
    async fn store(&self, collection: &str, document: Value) -> Result<Ack, PersistenceError>;
}

pub fn to_document<T: Serialize>(
    collection: &str,
    value: &T,
) -> Result<Value, PersistenceError> {
    serde_json::to_value(value).map_err(|source| PersistenceError::Encode {
        collection: collection.to_string(),
        source,
    })
}

/// Document store on PostgreSQL: one table per collection, one JSONB
/// document per row. Connects per call; nothing is pooled.
pub struct PgDocumentStore {
    database_url: String,
}

impl PgDocumentStore {
    pub fn new(database_url: impl Into<String>) -> Self {
        PgDocumentStore {
            database_url: database_url.into(),
        }
    }
}

#[async_trait]
impl DocumentSink for PgDocumentStore {
    async fn store(&self, collection: &str, document: Value) -> Result<Ack, PersistenceError> {
        let table = quote_identifier(collection)?;

        let mut conn = PgConnection::connect(&self.database_url)
            .await
            .map_err(PersistenceError::Connect)?;

        let result = insert_document(&mut conn, collection, &table, document).await;

        if let Err(e) = conn.close().await {
            warn!("failed to close document store connection: {}", e);
        }

        if let Ok(ack) = &result {
            info!("Stored document {}", ack);
        }
        result
    }
}

async fn insert_document(
    conn: &mut PgConnection,
    collection: &str,
    table: &str,
    document: Value,
) -> Result<Ack, PersistenceError> {
    let write_err = |source| PersistenceError::Write {
        collection: collection.to_string(),
        source,
    };

    let create = format!(
        "CREATE TABLE IF NOT EXISTS {} (\
            id UUID PRIMARY KEY, \
            document JSONB NOT NULL, \
            inserted_at TIMESTAMPTZ NOT NULL DEFAULT now()\
        )",
        table
    );
    sqlx::query(&create)
        .execute(&mut *conn)
        .await
        .map_err(write_err)?;

    let id = Uuid::new_v4();
    let insert = format!("INSERT INTO {} (id, document) VALUES ($1, $2)", table);
    sqlx::query(&insert)
        .bind(id)
        .bind(Json(document))
        .execute(&mut *conn)
        .await
        .map_err(write_err)?;

    Ok(Ack {
        collection: collection.to_string(),
        id,
    })
}

fn quote_identifier(collection: &str) -> Result<String, PersistenceError> {
    if collection.is_empty() {
        return Err(PersistenceError::EmptyCollection);
    }
    Ok(format!("\"{}\"", collection.replace('"', "\"\"")))
}

//! Postgres-backed document store.
//!
//! Every collection lives in one `documents` table, keyed by
//! `(collection, id)`, with the document body in a JSONB column. Equality
//! filters are evaluated with JSONB containment (`body @> filter`), which for
//! the scalar values the service filters on is plain field equality.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `DuplicateId` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / other | N/A | `Backend` |

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Row};
use tracing::{instrument, Span};

use doyashop_core::DocumentId;

use super::{
    apply_fields, ensure_id, unique_key_filter, upsert_document, DeleteResult, Document,
    DocumentStore, Filter, InsertResult, StoreError, UpdateResult, Upsert, WriteOp, WriteOutcome,
};

const MAX_CONNECTIONS: u32 = 10;

/// Postgres-backed document store.
///
/// Uses the SQLx connection pool, which is `Send + Sync` and shared by all
/// request handlers. Single-document updates lock the matched row for the
/// duration of their transaction; batches run in one transaction.
#[derive(Debug, Clone)]
pub struct PostgresDocumentStore {
    pool: Arc<PgPool>,
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the `documents` table and its containment index if missing.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id UUID NOT NULL,
                body JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_table", e))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS documents_body_idx \
             ON documents USING GIN (body jsonb_path_ops)",
        )
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_index", e))?;

        Ok(())
    }
}

async fn insert_in(
    conn: &mut PgConnection,
    collection: &str,
    mut document: Document,
) -> Result<InsertResult, StoreError> {
    let id = ensure_id(&mut document)?;

    sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
        .bind(collection)
        .bind(id.as_uuid())
        .bind(Json(&document))
        .execute(conn)
        .await
        .map_err(|e| map_sqlx_error("insert_document", e))?;

    Ok(InsertResult::new(id))
}

/// Insert unless `(collection, id)` exists. Returns whether a row was written.
///
/// Waits for a concurrent transaction inserting the same id to finish.
async fn insert_if_absent_in(
    conn: &mut PgConnection,
    collection: &str,
    id: DocumentId,
    document: &Document,
) -> Result<bool, StoreError> {
    let result = sqlx::query(
        r#"
        INSERT INTO documents (collection, id, body)
        VALUES ($1, $2, $3)
        ON CONFLICT (collection, id) DO NOTHING
        "#,
    )
    .bind(collection)
    .bind(id.as_uuid())
    .bind(Json(document))
    .execute(conn)
    .await
    .map_err(|e| map_sqlx_error("upsert_document", e))?;

    Ok(result.rows_affected() == 1)
}

/// Lock the first match and set `fields` on it. `None` when nothing matched.
async fn update_first_match(
    conn: &mut PgConnection,
    collection: &str,
    filter: &Filter,
    fields: &Document,
) -> Result<Option<UpdateResult>, StoreError> {
    let row = sqlx::query(
        r#"
        SELECT id, body
        FROM documents
        WHERE collection = $1 AND body @> $2
        ORDER BY created_at ASC, id ASC
        LIMIT 1
        FOR UPDATE
        "#,
    )
    .bind(collection)
    .bind(Json(filter.to_value()))
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("select_for_update", e))?;

    let Some(row) = row else {
        return Ok(None);
    };

    let id: uuid::Uuid = row
        .try_get("id")
        .map_err(|e| map_sqlx_error("decode_id", e))?;
    let Json(mut body): Json<Document> = row
        .try_get("body")
        .map_err(|e| map_sqlx_error("decode_body", e))?;

    let modified = apply_fields(&mut body, fields);
    if modified {
        sqlx::query("UPDATE documents SET body = $3 WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .bind(Json(&body))
            .execute(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("update_document", e))?;
    }
    Ok(Some(UpdateResult::matched(modified)))
}

async fn set_fields_in(
    conn: &mut PgConnection,
    collection: &str,
    filter: &Filter,
    fields: &Document,
    upsert: Upsert,
) -> Result<UpdateResult, StoreError> {
    if let Some(result) = update_first_match(&mut *conn, collection, filter, fields).await? {
        return Ok(result);
    }

    match upsert {
        Upsert::MatchOnly => Ok(UpdateResult::unmatched()),
        Upsert::CreateIfAbsent => {
            let (id, document) = upsert_document(filter, fields)?;
            if insert_if_absent_in(&mut *conn, collection, id, &document).await? {
                return Ok(UpdateResult::upserted(id));
            }
            // A concurrent upsert created the same document first.
            update_first_match(&mut *conn, collection, filter, fields)
                .await?
                .ok_or_else(|| StoreError::DuplicateId(id.to_string()))
        }
    }
}

fn decode_bodies(rows: Vec<sqlx::postgres::PgRow>) -> Result<Vec<Document>, StoreError> {
    rows.into_iter()
        .map(|row| {
            row.try_get::<Json<Document>, _>("body")
                .map(|Json(body)| body)
                .map_err(|e| map_sqlx_error("decode_body", e))
        })
        .collect()
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    #[instrument(skip(self, document), fields(collection = %collection), err)]
    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<InsertResult, StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))?;
        insert_in(&mut *conn, collection, document).await
    }

    /// Serialized per `(collection, key, value)` with a transaction-scoped
    /// advisory lock, so concurrent inserts of the same value queue up.
    #[instrument(skip(self, document), fields(collection = %collection, key = %key), err)]
    async fn insert_unique(
        &self,
        collection: &str,
        key: &str,
        document: Document,
    ) -> Result<InsertResult, StoreError> {
        let filter = unique_key_filter(key, &document)?;
        let lock_key = format!("{collection}:{key}:{}", filter.to_value());

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(&lock_key)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("advisory_lock", e))?;

        let taken = sqlx::query(
            "SELECT 1 FROM documents WHERE collection = $1 AND body @> $2 LIMIT 1",
        )
        .bind(collection)
        .bind(Json(filter.to_value()))
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("unique_check", e))?;

        if taken.is_some() {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::DuplicateKey(format!(
                "'{key}' is already taken in '{collection}'"
            )));
        }

        let result = insert_in(&mut *tx, collection, document).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(result)
    }

    #[instrument(
        skip(self, filter),
        fields(collection = %collection, document_count = tracing::field::Empty),
        err
    )]
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT body
            FROM documents
            WHERE collection = $1 AND body @> $2
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(collection)
        .bind(Json(filter.to_value()))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find", e))?;

        let documents = decode_bodies(rows)?;
        Span::current().record("document_count", documents.len());
        Ok(documents)
    }

    #[instrument(skip(self, filter), fields(collection = %collection), err)]
    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT body
            FROM documents
            WHERE collection = $1 AND body @> $2
            ORDER BY created_at ASC, id ASC
            LIMIT 1
            "#,
        )
        .bind(collection)
        .bind(Json(filter.to_value()))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_one", e))?;

        Ok(decode_bodies(rows)?.into_iter().next())
    }

    #[instrument(skip(self, filter, fields), fields(collection = %collection), err)]
    async fn set_fields(
        &self,
        collection: &str,
        filter: &Filter,
        fields: Document,
        upsert: Upsert,
    ) -> Result<UpdateResult, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let result = set_fields_in(&mut *tx, collection, filter, &fields, upsert).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(result)
    }

    #[instrument(skip(self, filter), fields(collection = %collection), err)]
    async fn delete_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<DeleteResult, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM documents
            WHERE collection = $1 AND id = (
                SELECT id
                FROM documents
                WHERE collection = $1 AND body @> $2
                ORDER BY created_at ASC, id ASC
                LIMIT 1
            )
            "#,
        )
        .bind(collection)
        .bind(Json(filter.to_value()))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("delete_one", e))?;

        Ok(DeleteResult::new(result.rows_affected()))
    }

    #[instrument(skip(self, ops), fields(op_count = ops.len()), err)]
    async fn apply_batch(&self, ops: Vec<WriteOp>) -> Result<Vec<WriteOutcome>, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let mut outcomes = Vec::with_capacity(ops.len());
        for op in ops {
            let outcome = match op {
                WriteOp::Insert {
                    collection,
                    document,
                } => WriteOutcome::Inserted(insert_in(&mut *tx, &collection, document).await?),
                WriteOp::SetFields {
                    collection,
                    filter,
                    fields,
                    require_match,
                } => {
                    let result =
                        set_fields_in(&mut *tx, &collection, &filter, &fields, Upsert::MatchOnly)
                            .await?;
                    if require_match && result.matched_count == 0 {
                        tx.rollback()
                            .await
                            .map_err(|e| map_sqlx_error("rollback", e))?;
                        return Err(StoreError::PreconditionFailed(format!(
                            "no document in '{collection}' matched the batch filter"
                        )));
                    }
                    WriteOutcome::Updated(result)
                }
            };
            outcomes.push(outcome);
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(outcomes)
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::DuplicateId(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

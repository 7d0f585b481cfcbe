//! Document store abstraction.
//!
//! Collections hold JSON object documents keyed by their `_id`. Queries are
//! conjunctions of top-level field equalities; a document missing a filtered
//! field never matches. Write results mirror the acknowledgements a document
//! database returns, and are sent to clients verbatim.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use doyashop_core::DocumentId;

pub mod collection;
pub mod in_memory;
pub mod postgres;

pub use collection::{to_document, Collection};
pub use in_memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;

/// A stored document: a JSON object carrying its `_id`.
pub type Document = Map<String, Value>;

pub const ID_FIELD: &str = "_id";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A batch precondition did not hold; nothing in the batch was applied.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("duplicate document id: {0}")]
    DuplicateId(String),

    /// Another document already holds the value of a unique field.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Conjunction of top-level field equalities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    criteria: Map<String, Value>,
}

impl Filter {
    /// Matches every document.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: DocumentId) -> Self {
        Self::all().eq(ID_FIELD, id)
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.criteria.insert(field.into(), value.into());
        self
    }

    pub fn from_criteria<I, K>(criteria: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        criteria
            .into_iter()
            .fold(Self::all(), |filter, (field, value)| filter.eq(field, value))
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.criteria
            .iter()
            .all(|(field, expected)| document.get(field) == Some(expected))
    }

    /// The filter as a JSON object, suitable for containment queries.
    pub fn to_value(&self) -> Value {
        Value::Object(self.criteria.clone())
    }

    fn criteria(&self) -> &Map<String, Value> {
        &self.criteria
    }
}

/// Behaviour of a field update when the filter matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// Create a document from the filter's equalities plus the new fields.
    CreateIfAbsent,
    /// Leave the collection untouched.
    MatchOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertResult {
    pub acknowledged: bool,
    pub inserted_id: DocumentId,
}

impl InsertResult {
    pub fn new(inserted_id: DocumentId) -> Self {
        Self {
            acknowledged: true,
            inserted_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_id: Option<DocumentId>,
}

impl UpdateResult {
    pub fn matched(modified: bool) -> Self {
        Self {
            acknowledged: true,
            matched_count: 1,
            modified_count: u64::from(modified),
            upserted_id: None,
        }
    }

    pub fn unmatched() -> Self {
        Self {
            acknowledged: true,
            matched_count: 0,
            modified_count: 0,
            upserted_id: None,
        }
    }

    pub fn upserted(id: DocumentId) -> Self {
        Self {
            acknowledged: true,
            matched_count: 0,
            modified_count: 0,
            upserted_id: Some(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

impl DeleteResult {
    pub fn new(deleted_count: u64) -> Self {
        Self {
            acknowledged: true,
            deleted_count,
        }
    }
}

/// One write inside an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Insert {
        collection: String,
        document: Document,
    },
    /// Update the first match. With `require_match`, an empty match fails the
    /// whole batch.
    SetFields {
        collection: String,
        filter: Filter,
        fields: Document,
        require_match: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Inserted(InsertResult),
    Updated(UpdateResult),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document, assigning an `_id` when it has none.
    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<InsertResult, StoreError>;

    /// Insert unless a document in `collection` already has the same `key`
    /// value. The check and the insert are one atomic step.
    async fn insert_unique(
        &self,
        collection: &str,
        key: &str,
        document: Document,
    ) -> Result<InsertResult, StoreError>;

    /// All matching documents, in insertion order.
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError>;

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError>;

    /// Set `fields` on the first matching document.
    async fn set_fields(
        &self,
        collection: &str,
        filter: &Filter,
        fields: Document,
        upsert: Upsert,
    ) -> Result<UpdateResult, StoreError>;

    /// Delete the first matching document.
    async fn delete_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<DeleteResult, StoreError>;

    /// Apply every op or none of them.
    async fn apply_batch(&self, ops: Vec<WriteOp>) -> Result<Vec<WriteOutcome>, StoreError>;
}

pub fn document_id(document: &Document) -> Result<DocumentId, StoreError> {
    document
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::InvalidDocument("missing string _id".to_string()))?
        .parse()
        .map_err(|_| StoreError::InvalidDocument("_id is not a valid document id".to_string()))
}

/// The filter `insert_unique` checks before writing `document`.
pub(crate) fn unique_key_filter(key: &str, document: &Document) -> Result<Filter, StoreError> {
    match document.get(key) {
        Some(value) if !value.is_null() => Ok(Filter::all().eq(key, value.clone())),
        _ => Err(StoreError::InvalidDocument(format!("missing unique field '{key}'"))),
    }
}

/// Read the document's `_id`, assigning a fresh one when absent.
pub(crate) fn ensure_id(document: &mut Document) -> Result<DocumentId, StoreError> {
    if document.contains_key(ID_FIELD) {
        return document_id(document);
    }
    let id = DocumentId::new();
    document.insert(ID_FIELD.to_string(), id.into());
    Ok(id)
}

/// Overwrite `fields` on `document`. Returns whether anything changed.
pub(crate) fn apply_fields(document: &mut Document, fields: &Document) -> bool {
    let mut modified = false;
    for (field, value) in fields {
        if field == ID_FIELD {
            continue;
        }
        if document.get(field) != Some(value) {
            document.insert(field.clone(), value.clone());
            modified = true;
        }
    }
    modified
}

/// Document created by an upsert that matched nothing.
pub(crate) fn upsert_document(
    filter: &Filter,
    fields: &Document,
) -> Result<(DocumentId, Document), StoreError> {
    let mut document = filter.criteria().clone();
    apply_fields(&mut document, fields);
    let id = ensure_id(&mut document)?;
    Ok((id, document))
}

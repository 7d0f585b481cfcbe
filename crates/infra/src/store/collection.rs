use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use doyashop_core::DocumentId;

use super::{
    DeleteResult, Document, DocumentStore, Filter, InsertResult, StoreError, UpdateResult, Upsert,
    WriteOp,
};

/// Serialize a model into a stored document.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(other) => Err(StoreError::InvalidDocument(format!(
            "expected a JSON object, got {other}"
        ))),
        Err(e) => Err(StoreError::InvalidDocument(e.to_string())),
    }
}

/// Typed handle over one named collection.
///
/// Reads decode each document into `T`. Documents that do not decode (for
/// example placeholders created by an upsert) are skipped and logged.
pub struct Collection<T> {
    store: Arc<dyn DocumentStore>,
    name: &'static str,
    _model: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            name: self.name,
            _model: PhantomData,
        }
    }
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<dyn DocumentStore>, name: &'static str) -> Self {
        Self {
            store,
            name,
            _model: PhantomData,
        }
    }

    fn decode(&self, document: Document) -> Option<T> {
        match serde_json::from_value(Value::Object(document)) {
            Ok(model) => Some(model),
            Err(e) => {
                tracing::warn!(collection = self.name, error = %e, "skipping undecodable document");
                None
            }
        }
    }

    pub async fn insert(&self, model: &T) -> Result<InsertResult, StoreError> {
        self.store.insert_one(self.name, to_document(model)?).await
    }

    /// Insert `model` unless another document shares its `key` value.
    pub async fn insert_unique(&self, key: &str, model: &T) -> Result<InsertResult, StoreError> {
        self.store
            .insert_unique(self.name, key, to_document(model)?)
            .await
    }

    pub async fn find(&self, filter: &Filter) -> Result<Vec<T>, StoreError> {
        let documents = self.store.find(self.name, filter).await?;
        Ok(documents.into_iter().filter_map(|d| self.decode(d)).collect())
    }

    pub async fn find_one(&self, filter: &Filter) -> Result<Option<T>, StoreError> {
        let document = self.store.find_one(self.name, filter).await?;
        Ok(document.and_then(|d| self.decode(d)))
    }

    pub async fn get(&self, id: DocumentId) -> Result<Option<T>, StoreError> {
        self.find_one(&Filter::by_id(id)).await
    }

    pub async fn set_fields(
        &self,
        filter: &Filter,
        fields: Document,
        upsert: Upsert,
    ) -> Result<UpdateResult, StoreError> {
        self.store.set_fields(self.name, filter, fields, upsert).await
    }

    pub async fn delete_one(&self, filter: &Filter) -> Result<DeleteResult, StoreError> {
        self.store.delete_one(self.name, filter).await
    }

    /// Insert of `model`, for use in a batch.
    pub fn insert_op(&self, model: &T) -> Result<WriteOp, StoreError> {
        Ok(WriteOp::Insert {
            collection: self.name.to_string(),
            document: to_document(model)?,
        })
    }

    /// Field update guarded by `filter`, for use in a batch.
    pub fn set_op(&self, filter: Filter, fields: Document, require_match: bool) -> WriteOp {
        WriteOp::SetFields {
            collection: self.name.to_string(),
            filter,
            fields,
            require_match,
        }
    }
}

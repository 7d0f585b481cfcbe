use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{
    apply_fields, document_id, ensure_id, unique_key_filter, upsert_document, DeleteResult,
    Document, DocumentStore, Filter, InsertResult, StoreError, UpdateResult, Upsert, WriteOp,
    WriteOutcome,
};

type Collections = HashMap<String, Vec<Document>>;

/// In-memory document store for tests/dev.
///
/// Each collection keeps insertion order. A batch runs against copies of the
/// collections it touches, which replace the live ones only when every op
/// succeeded.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    inner: RwLock<Collections>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("in-memory store lock poisoned".to_string())
}

fn insert(
    collections: &mut Collections,
    collection: &str,
    mut document: Document,
) -> Result<InsertResult, StoreError> {
    let id = ensure_id(&mut document)?;
    let docs = collections.entry(collection.to_string()).or_default();
    if docs.iter().any(|d| document_id(d).ok() == Some(id)) {
        return Err(StoreError::DuplicateId(id.to_string()));
    }
    docs.push(document);
    Ok(InsertResult::new(id))
}

fn set_fields(
    collections: &mut Collections,
    collection: &str,
    filter: &Filter,
    fields: &Document,
    upsert: Upsert,
) -> Result<UpdateResult, StoreError> {
    let docs = collections.entry(collection.to_string()).or_default();
    if let Some(document) = docs.iter_mut().find(|d| filter.matches(d)) {
        return Ok(UpdateResult::matched(apply_fields(document, fields)));
    }

    match upsert {
        Upsert::MatchOnly => Ok(UpdateResult::unmatched()),
        Upsert::CreateIfAbsent => {
            let (id, document) = upsert_document(filter, fields)?;
            docs.push(document);
            Ok(UpdateResult::upserted(id))
        }
    }
}

fn apply(collections: &mut Collections, op: WriteOp) -> Result<WriteOutcome, StoreError> {
    match op {
        WriteOp::Insert {
            collection,
            document,
        } => insert(collections, &collection, document).map(WriteOutcome::Inserted),
        WriteOp::SetFields {
            collection,
            filter,
            fields,
            require_match,
        } => {
            let result = set_fields(collections, &collection, &filter, &fields, Upsert::MatchOnly)?;
            if require_match && result.matched_count == 0 {
                return Err(StoreError::PreconditionFailed(format!(
                    "no document in '{collection}' matched the batch filter"
                )));
            }
            Ok(WriteOutcome::Updated(result))
        }
    }
}

fn op_collection(op: &WriteOp) -> &str {
    match op {
        WriteOp::Insert { collection, .. } | WriteOp::SetFields { collection, .. } => collection,
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<InsertResult, StoreError> {
        let mut collections = self.inner.write().map_err(|_| poisoned())?;
        insert(&mut collections, collection, document)
    }

    async fn insert_unique(
        &self,
        collection: &str,
        key: &str,
        document: Document,
    ) -> Result<InsertResult, StoreError> {
        let filter = unique_key_filter(key, &document)?;
        let mut collections = self.inner.write().map_err(|_| poisoned())?;
        let taken = collections
            .get(collection)
            .is_some_and(|docs| docs.iter().any(|d| filter.matches(d)));
        if taken {
            return Err(StoreError::DuplicateKey(format!(
                "'{key}' is already taken in '{collection}'"
            )));
        }
        insert(&mut collections, collection, document)
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let collections = self.inner.read().map_err(|_| poisoned())?;
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        let collections = self.inner.read().map_err(|_| poisoned())?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| filter.matches(d)).cloned()))
    }

    async fn set_fields(
        &self,
        collection: &str,
        filter: &Filter,
        fields: Document,
        upsert: Upsert,
    ) -> Result<UpdateResult, StoreError> {
        let mut collections = self.inner.write().map_err(|_| poisoned())?;
        set_fields(&mut collections, collection, filter, &fields, upsert)
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<DeleteResult, StoreError> {
        let mut collections = self.inner.write().map_err(|_| poisoned())?;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(DeleteResult::new(0));
        };
        match docs.iter().position(|d| filter.matches(d)) {
            Some(idx) => {
                docs.remove(idx);
                Ok(DeleteResult::new(1))
            }
            None => Ok(DeleteResult::new(0)),
        }
    }

    async fn apply_batch(&self, ops: Vec<WriteOp>) -> Result<Vec<WriteOutcome>, StoreError> {
        let mut collections = self.inner.write().map_err(|_| poisoned())?;

        let mut staged = Collections::new();
        for op in &ops {
            let name = op_collection(op);
            if !staged.contains_key(name) {
                let docs = collections.get(name).cloned().unwrap_or_default();
                staged.insert(name.to_string(), docs);
            }
        }

        let outcomes = ops
            .into_iter()
            .map(|op| apply(&mut staged, op))
            .collect::<Result<Vec<_>, _>>()?;

        collections.extend(staged);
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use doyashop_core::DocumentId;
    use serde_json::{json, Value};

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn insert_assigns_id_and_find_preserves_order() {
        let store = InMemoryDocumentStore::new();
        let first = store
            .insert_one("users", doc(json!({"email": "a@x.com"})))
            .await
            .unwrap();
        let second = store
            .insert_one("users", doc(json!({"email": "b@x.com"})))
            .await
            .unwrap();
        assert_ne!(first.inserted_id, second.inserted_id);

        let all = store.find("users", &Filter::all()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0]["email"], "a@x.com");
        assert_eq!(document_id(&all[1]).unwrap(), second.inserted_id);
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new();
        store.insert_one("c", doc(json!({"_id": id}))).await.unwrap();
        let err = store.insert_one("c", doc(json!({"_id": id}))).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(_)));
    }

    #[tokio::test]
    async fn upsert_creates_then_is_idempotent() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new();
        let filter = Filter::by_id(id);
        let fields = doc(json!({"status": "verified"}));

        let first = store
            .set_fields("users", &filter, fields.clone(), Upsert::CreateIfAbsent)
            .await
            .unwrap();
        assert_eq!(first.upserted_id, Some(id));

        let second = store
            .set_fields("users", &filter, fields, Upsert::CreateIfAbsent)
            .await
            .unwrap();
        assert_eq!(second.matched_count, 1);
        assert_eq!(second.modified_count, 0);
        assert_eq!(second.upserted_id, None);

        let stored = store.find_one("users", &filter).await.unwrap().unwrap();
        assert_eq!(stored["status"], "verified");
        assert_eq!(store.find("users", &Filter::all()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn match_only_leaves_collection_untouched() {
        let store = InMemoryDocumentStore::new();
        let result = store
            .set_fields(
                "phones",
                &Filter::by_id(DocumentId::new()),
                doc(json!({"stockStatus": "sold"})),
                Upsert::MatchOnly,
            )
            .await
            .unwrap();
        assert_eq!(result, UpdateResult::unmatched());
        assert!(store.find("phones", &Filter::all()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_removes_first_match_only() {
        let store = InMemoryDocumentStore::new();
        store.insert_one("c", doc(json!({"k": 1}))).await.unwrap();
        store.insert_one("c", doc(json!({"k": 1}))).await.unwrap();

        let filter = Filter::all().eq("k", 1);
        assert_eq!(store.delete_one("c", &filter).await.unwrap().deleted_count, 1);
        assert_eq!(store.find("c", &filter).await.unwrap().len(), 1);
        assert_eq!(store.delete_one("missing", &filter).await.unwrap().deleted_count, 0);
    }

    #[tokio::test]
    async fn failed_batch_precondition_applies_nothing() {
        let store = InMemoryDocumentStore::new();
        let ops = vec![
            WriteOp::Insert {
                collection: "payments".to_string(),
                document: doc(json!({"transId": "pi_1"})),
            },
            WriteOp::SetFields {
                collection: "booking".to_string(),
                filter: Filter::by_id(DocumentId::new()).eq("payment", "unpaid"),
                fields: doc(json!({"payment": "paid"})),
                require_match: true,
            },
        ];

        let err = store.apply_batch(ops).await.unwrap_err();
        assert!(matches!(err, StoreError::PreconditionFailed(_)));
        assert!(store.find("payments", &Filter::all()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn successful_batch_applies_every_op() {
        let store = InMemoryDocumentStore::new();
        let booking = store
            .insert_one("booking", doc(json!({"payment": "unpaid"})))
            .await
            .unwrap()
            .inserted_id;

        let outcomes = store
            .apply_batch(vec![
                WriteOp::Insert {
                    collection: "payments".to_string(),
                    document: doc(json!({"bookingId": booking, "transId": "pi_1"})),
                },
                WriteOp::SetFields {
                    collection: "booking".to_string(),
                    filter: Filter::by_id(booking).eq("payment", "unpaid"),
                    fields: doc(json!({"payment": "paid", "transId": "pi_1"})),
                    require_match: true,
                },
            ])
            .await
            .unwrap();

        assert!(matches!(outcomes[0], WriteOutcome::Inserted(_)));
        assert_eq!(outcomes[1], WriteOutcome::Updated(UpdateResult::matched(true)));
        let stored = store
            .find_one("booking", &Filter::by_id(booking))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored["payment"], "paid");
        assert_eq!(store.find("payments", &Filter::all()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unique_insert_rejects_taken_value() {
        let store = InMemoryDocumentStore::new();
        store
            .insert_unique("users", "email", doc(json!({"email": "a@x.com"})))
            .await
            .unwrap();
        store
            .insert_unique("users", "email", doc(json!({"email": "b@x.com"})))
            .await
            .unwrap();

        let err = store
            .insert_unique("users", "email", doc(json!({"email": "a@x.com", "role": "seller"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey(_)));
        assert_eq!(store.find("users", &Filter::all()).await.unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_unique_inserts_store_one_document() {
        let store = Arc::new(InMemoryDocumentStore::new());

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            tasks.spawn(async move {
                store
                    .insert_unique("users", "email", doc(json!({"email": "a@x.com"})))
                    .await
            });
        }

        let mut inserted = 0;
        while let Some(result) = tasks.join_next().await {
            match result.unwrap() {
                Ok(_) => inserted += 1,
                Err(err) => assert!(matches!(err, StoreError::DuplicateKey(_))),
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(store.find("users", &Filter::all()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn batch_leaves_untouched_collections_alone() {
        let store = InMemoryDocumentStore::new();
        store.insert_one("users", doc(json!({"email": "a@x.com"}))).await.unwrap();
        let booking = store
            .insert_one("booking", doc(json!({"payment": "unpaid"})))
            .await
            .unwrap()
            .inserted_id;

        store
            .apply_batch(vec![WriteOp::SetFields {
                collection: "booking".to_string(),
                filter: Filter::by_id(booking),
                fields: doc(json!({"payment": "paid"})),
                require_match: true,
            }])
            .await
            .unwrap();

        assert_eq!(store.find("users", &Filter::all()).await.unwrap().len(), 1);
        let paid = store.find("booking", &Filter::all().eq("payment", "paid")).await.unwrap();
        assert_eq!(paid.len(), 1);
    }
}

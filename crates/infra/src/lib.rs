//! Infrastructure layer: document store, payment processor client, config.

pub mod config;
pub mod payments;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use payments::{GatewayError, IntentRequest, PaymentGateway, PaymentIntent, StripeGateway};
pub use store::{
    to_document, Collection, DeleteResult, Document, DocumentStore, Filter, InMemoryDocumentStore,
    InsertResult, PostgresDocumentStore, StoreError, UpdateResult, Upsert, WriteOp, WriteOutcome,
};

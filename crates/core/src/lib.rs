//! `doyashop-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::Entity;
pub use error::{require_email, require_non_blank, DomainError, DomainResult};
pub use id::DocumentId;
pub use value_object::{Price, ValueObject};

//! Entity trait: identity + continuity across state changes.

use crate::id::DocumentId;

/// Entity marker + minimal interface.
///
/// Every stored document is an entity keyed by a [`DocumentId`].
pub trait Entity {
    /// Returns the entity identifier.
    fn id(&self) -> DocumentId;
}

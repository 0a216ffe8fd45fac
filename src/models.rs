//! Domain entities, their SQL, and the relationships between them.
mod element;
mod ids;
mod relations;
mod section;
mod user;
mod work;

use rusqlite::types::Value;
use thiserror::Error;

pub use element::{Element, ElementKind};
pub use ids::{ElementId, SectionId, WorkId};
pub use relations::{Relation, RelationUpdate, update_relations};
pub use section::{DEFAULT_SECTION_ORDER, Section, reorder_sections, split_sections, word_count};
pub use user::User;
pub use work::Work;

/// Errors raised by model operations that are not plain database failures.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A section order submission did not match `"{id}-{order},..."`.
    #[error("Malformed section order entry: {0:?}")]
    MalformedOrder(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Entities owned by a single user.
///
/// Ownership is the only authorization rule: the stored email must equal the
/// email of the signed-in user.
pub trait Owned {
    fn owner_email(&self) -> &str;

    fn is_owned_by(&self, email: &str) -> bool {
        !email.is_empty() && self.owner_email() == email
    }
}

/// Stores empty strings as NULL for nullable text columns.
pub(crate) fn text_or_null(value: &str) -> Value {
    if value.is_empty() {
        Value::Null
    } else {
        Value::Text(value.to_string())
    }
}

#[cfg(test)]
mod tests;

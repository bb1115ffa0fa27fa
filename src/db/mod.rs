//! Storage layer.
//!
//! The persistence engine is an external collaborator reached through the
//! [`Partition`] trait: a schemaless document collection keyed by an
//! application-level `id` field. Each board lives on its own partition with
//! its own indexes; there are no cross-partition queries or transactions.

mod memory;
mod moderation;
mod posts;
mod router;
mod threads;
mod users;

pub use memory::MemoryPartition;
pub use router::BoardRouter;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub type Document = serde_json::Map<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Unique-index violation; carries the offending field name
    #[error("duplicate value for unique field '{0}'")]
    Duplicate(String),

    #[error("storage backend: {0}")]
    Backend(String),
}

/// Document filter. Clauses are ANDed together.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<Clause>,
}

#[derive(Debug, Clone)]
enum Clause {
    Eq(String, Value),
    Lt(String, Value),
    Lte(String, Value),
}

impl Filter {
    pub fn all() -> Self {
        Filter::default()
    }

    pub fn by_id(id: &str) -> Self {
        Filter::all().eq("id", id)
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.clauses.push(Clause::Eq(field.to_string(), value.into()));
        self
    }

    pub fn lt(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.clauses.push(Clause::Lt(field.to_string(), value.into()));
        self
    }

    pub fn lte(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.clauses.push(Clause::Lte(field.to_string(), value.into()));
        self
    }

    pub(crate) fn matches(&self, doc: &Document) -> bool {
        self.clauses.iter().all(|clause| match clause {
            Clause::Eq(field, value) => doc.get(field).unwrap_or(&Value::Null) == value,
            Clause::Lt(field, value) => {
                let field_value = doc.get(field).unwrap_or(&Value::Null);
                memory::compare_values(field_value, value) == std::cmp::Ordering::Less
            }
            Clause::Lte(field, value) => {
                let field_value = doc.get(field).unwrap_or(&Value::Null);
                memory::compare_values(field_value, value) != std::cmp::Ordering::Greater
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

/// Multi-key sort specification, applied left to right
#[derive(Debug, Clone, Default)]
pub struct Sort {
    keys: Vec<(String, Order)>,
}

impl Sort {
    pub fn by(field: &str, order: Order) -> Self {
        Sort { keys: vec![(field.to_string(), order)] }
    }

    pub fn then(mut self, field: &str, order: Order) -> Self {
        self.keys.push((field.to_string(), order));
        self
    }

    pub(crate) fn keys(&self) -> &[(String, Order)] {
        &self.keys
    }
}

/// Single-document update: `$set`-style field assignment plus `$inc`-style
/// counters, applied atomically by the partition.
#[derive(Debug, Clone, Default)]
pub struct Update {
    set: Document,
    inc: Vec<(String, i64)>,
}

impl Update {
    pub fn new() -> Self {
        Update::default()
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.set.insert(field.to_string(), value.into());
        self
    }

    pub fn inc(mut self, field: &str, delta: i64) -> Self {
        self.inc.push((field.to_string(), delta));
        self
    }

    pub(crate) fn apply(&self, doc: &mut Document) {
        for (field, value) in &self.set {
            doc.insert(field.clone(), value.clone());
        }
        for (field, delta) in &self.inc {
            let current = doc.get(field).and_then(Value::as_i64).unwrap_or(0);
            doc.insert(field.clone(), Value::from(current + delta));
        }
    }
}

/// One isolated storage partition (its own connection, its own index set).
///
/// `update_one` must apply the whole update as a single atomic step against
/// the matched document; callers rely on this for counter increments and
/// conditional lock transitions.
#[async_trait]
pub trait Partition: Send + Sync {
    /// Declare a unique index on `field`; inserts violating it fail with
    /// [`StoreError::Duplicate`]. Null values do not collide.
    async fn ensure_unique_index(&self, collection: &str, field: &str)
        -> Result<(), StoreError>;

    async fn insert_one(&self, collection: &str, doc: Document) -> Result<(), StoreError>;

    async fn find_one(&self, collection: &str, filter: &Filter)
        -> Result<Option<Document>, StoreError>;

    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        sort: &Sort,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Document>, StoreError>;

    /// Returns whether a document matched (and was updated)
    async fn update_one(&self, collection: &str, filter: &Filter, update: &Update)
        -> Result<bool, StoreError>;

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<bool, StoreError>;

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;
}

/// Handle to one partition, with the typed operations layered on top
/// in `users`/`threads`/`posts`/`moderation`.
#[derive(Clone)]
pub struct Db {
    partition: Arc<dyn Partition>,
}

impl Db {
    pub fn new(partition: Arc<dyn Partition>) -> Self {
        Self { partition }
    }

    pub fn partition(&self) -> &dyn Partition {
        self.partition.as_ref()
    }
}

/// Serialize a model into its stored document form. Field names and types
/// round-trip unchanged through create -> read.
pub(crate) fn to_doc<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(StoreError::Backend("model did not serialize to an object".into())),
        Err(e) => Err(StoreError::Backend(e.to_string())),
    }
}

pub(crate) fn from_doc<T: DeserializeOwned>(doc: Document) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(doc)).map_err(|e| StoreError::Backend(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_filter_eq_and_missing_field() {
        let d = doc(json!({"id": "a", "n": 1}));
        assert!(Filter::by_id("a").matches(&d));
        assert!(!Filter::by_id("b").matches(&d));
        // Absent field only matches an explicit null
        assert!(Filter::all().eq("ghost", Value::Null).matches(&d));
        assert!(!Filter::all().eq("ghost", "x").matches(&d));
    }

    #[test]
    fn test_filter_lt_on_timestamps() {
        let d = doc(json!({"updated_at": "2024-01-01T00:00:00Z"}));
        assert!(Filter::all().lt("updated_at", "2024-06-01T00:00:00Z").matches(&d));
        assert!(!Filter::all().lt("updated_at", "2023-01-01T00:00:00Z").matches(&d));
    }

    #[test]
    fn test_update_set_and_inc() {
        let mut d = doc(json!({"post_count": 2, "title": "old"}));
        Update::new().set("title", "new").inc("post_count", 1).apply(&mut d);
        assert_eq!(d["title"], json!("new"));
        assert_eq!(d["post_count"], json!(3));
    }

    #[test]
    fn test_inc_missing_field_starts_at_zero() {
        let mut d = doc(json!({"id": "a"}));
        Update::new().inc("spam_warnings", 1).apply(&mut d);
        assert_eq!(d["spam_warnings"], json!(1));
    }
}

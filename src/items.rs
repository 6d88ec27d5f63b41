//! Paginated result envelope for collection reads

use std::sync::Arc;

use crate::error::TraitError;
use crate::schema::{Instance, SchemaDef};

/// Transient envelope for a collection GET: an ordered window of instances
/// plus the window offset and the total number of items in the backing
/// store.
///
/// The dispatch layer constructs one per request and hands it to the
/// connector's `items` to fill; it is discarded after serialization.
///
/// # Example
///
/// ```rust
/// use restbone::items::ItemsResponse;
/// use restbone::schema::{Instance, SchemaDef};
/// use restbone::traits::TraitDef;
///
/// let schema = SchemaDef::resource("Student")
///     .with(TraitDef::string("name"))
///     .build();
///
/// let mut response = ItemsResponse::new(schema.clone());
/// let student = Instance::with_identifier(schema, "0").unwrap();
/// response.push(student).unwrap();
/// response.set_window(0, 1);
/// assert_eq!(response.items().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ItemsResponse {
    schema: Arc<SchemaDef>,
    items: Vec<Instance>,
    offset: u64,
    total: u64,
}

impl ItemsResponse {
    /// Create an empty response for the given item type
    #[must_use]
    pub fn new(schema: Arc<SchemaDef>) -> Self {
        Self {
            schema,
            items: Vec::new(),
            offset: 0,
            total: 0,
        }
    }

    /// The declared item type
    #[must_use]
    pub fn schema(&self) -> &Arc<SchemaDef> {
        &self.schema
    }

    /// Append an item. The item's schema must match the declared item type.
    pub fn push(&mut self, item: Instance) -> Result<(), TraitError> {
        if item.schema().type_name() != self.schema.type_name() {
            return Err(TraitError::SchemaMismatch {
                expected: self.schema.type_name().to_string(),
                actual: item.schema().type_name().to_string(),
            });
        }
        self.items.push(item);
        Ok(())
    }

    /// Record the window position and the total item count
    pub fn set_window(&mut self, offset: u64, total: u64) {
        self.offset = offset;
        self.total = total;
    }

    /// The items, in backend order
    #[must_use]
    pub fn items(&self) -> &[Instance] {
        &self.items
    }

    /// Index of the first item within the complete data set
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Total number of items available, beyond the returned window
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::TraitDef;

    fn student() -> Arc<SchemaDef> {
        SchemaDef::resource("Student")
            .with(TraitDef::string("name"))
            .build()
    }

    #[test]
    fn test_push_accepts_matching_schema() {
        let schema = student();
        let mut response = ItemsResponse::new(schema.clone());
        let item = Instance::with_identifier(schema, "0").unwrap();
        assert!(response.push(item).is_ok());
        assert_eq!(response.items().len(), 1);
    }

    #[test]
    fn test_push_rejects_mismatched_schema() {
        let mut response = ItemsResponse::new(student());
        let other = SchemaDef::resource("Teacher")
            .with(TraitDef::string("name"))
            .build();
        let item = Instance::with_identifier(other, "0").unwrap();
        assert!(matches!(
            response.push(item),
            Err(TraitError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_window() {
        let mut response = ItemsResponse::new(student());
        assert_eq!(response.offset(), 0);
        assert_eq!(response.total(), 0);
        response.set_window(10, 42);
        assert_eq!(response.offset(), 10);
        assert_eq!(response.total(), 42);
    }
}

//! Collection filtering predicates
//!
//! A filter specification arrives as the JSON-decoded `filter` query
//! argument: an object is interpreted as an AND of per-field equality
//! checks, absence means "match everything". Connectors apply the predicate
//! while filling an items response.

use serde_json::Value;

use crate::error::WebApiError;
use crate::schema::Instance;

/// Predicate over entity instances
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches any instance
    Nop,
    /// Matches when the named trait equals the given value
    Eq {
        /// Trait name to compare
        key: String,
        /// Value the trait must equal
        value: Value,
    },
    /// Matches when every inner filter matches
    And(Vec<Filter>),
}

impl Filter {
    /// Convert a filter specification into a predicate.
    ///
    /// `None` means no filtering. An object becomes an AND of equality
    /// checks over its entries. Any other shape is a usage error.
    pub fn from_spec(spec: Option<&Value>) -> Result<Self, WebApiError> {
        match spec {
            None => Ok(Self::Nop),
            Some(Value::Object(entries)) => Ok(Self::And(
                entries
                    .iter()
                    .map(|(key, value)| Self::Eq {
                        key: key.clone(),
                        value: value.clone(),
                    })
                    .collect(),
            )),
            Some(other) => Err(WebApiError::bad_query_arguments(format!(
                "unsupported filter spec: {}",
                other
            ))),
        }
    }

    /// Whether the instance satisfies this predicate
    #[must_use]
    pub fn matches(&self, resource: &Instance) -> bool {
        match self {
            Self::Nop => true,
            Self::Eq { key, value } => resource.get(key).json_eq(value),
            Self::And(filters) => filters.iter().all(|filter| filter.matches(resource)),
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::Nop
    }
}

//! Model connector: the pluggable backend for one resource type
//!
//! A connector implements CRUD for the schema it declares. Connectors are
//! long-lived and shared (`Arc<dyn ModelConnector>`); per-request state
//! travels in [`RequestContext`], and whatever collection state a connector
//! owns is guarded by its own interior mutability.
//!
//! Every operation has a default body that declines with
//! [`WebApiError::not_implemented`], which the dispatch layer maps to
//! 405 Method Not Allowed. Implement only what the resource supports.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{ErrorKind, WebApiError};
use crate::items::ItemsResponse;
use crate::query::QueryArguments;
use crate::schema::{Instance, SchemaDef};

/// Per-request state passed to every connector operation
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// The user resolved by the authenticator, if any. The framework never
    /// rejects on its own; connectors decide access based on this value.
    pub current_user: Option<String>,
}

/// Backend contract for one resource type.
///
/// The dispatch pipeline always hands connectors framework-shaped values:
/// instances to fill or act on, and an [`ItemsResponse`] to populate for
/// collection reads.
#[async_trait]
pub trait ModelConnector: Send + Sync {
    /// The schema this connector serves. Determines the bound URL name at
    /// registration time.
    fn schema(&self) -> Arc<SchemaDef>;

    /// Create a resource. The instance arrives deserialized and
    /// input-validated, with no identifier; the connector must assign one.
    ///
    /// Corresponds to POST on the collection URL. Raise
    /// [`WebApiError::exists`] when a uniqueness constraint is violated.
    async fn create(
        &self,
        _resource: &mut Instance,
        _context: &RequestContext,
    ) -> Result<(), WebApiError> {
        Err(WebApiError::not_implemented())
    }

    /// Retrieve a resource. The instance arrives carrying only the
    /// identifier; the connector fills the traits.
    ///
    /// Corresponds to GET on the item URL. Raise
    /// [`WebApiError::not_found`] when the identifier resolves to nothing.
    async fn retrieve(
        &self,
        _resource: &mut Instance,
        _context: &RequestContext,
    ) -> Result<(), WebApiError> {
        Err(WebApiError::not_implemented())
    }

    /// Replace a resource with a new representation.
    ///
    /// Corresponds to PUT on the item URL.
    async fn update(
        &self,
        _resource: &Instance,
        _context: &RequestContext,
    ) -> Result<(), WebApiError> {
        Err(WebApiError::not_implemented())
    }

    /// Delete a resource. Only the identifier is filled on the instance.
    ///
    /// Corresponds to DELETE on the item URL.
    async fn delete(
        &self,
        _resource: &Instance,
        _context: &RequestContext,
    ) -> Result<(), WebApiError> {
        Err(WebApiError::not_implemented())
    }

    /// Fill the response with a window of the collection, honoring
    /// `args.limit`, `args.offset`, and `args.filter`. Unrecognized query
    /// arguments arrive verbatim in `args.extra`.
    ///
    /// Corresponds to GET on the collection URL.
    async fn items(
        &self,
        _response: &mut ItemsResponse,
        _args: &QueryArguments,
        _context: &RequestContext,
    ) -> Result<(), WebApiError> {
        Err(WebApiError::not_implemented())
    }

    /// Whether a resource with the instance's identifier exists. The
    /// default probes `retrieve` and maps NotFound to `false`.
    async fn exists(
        &self,
        resource: &Instance,
        context: &RequestContext,
    ) -> Result<bool, WebApiError> {
        let mut probe = resource.clone();
        match self.retrieve(&mut probe, context).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Validate or rewrite the identifier from the URL. Called first in
    /// every item-route request chain.
    ///
    /// A generic (Internal) error here is treated by the dispatch layer as
    /// 404: the URL pattern is valid, the identifier just resolves to
    /// nothing. Taxonomy errors pass through with their own status.
    fn preprocess_identifier(&self, identifier: &str) -> Result<String, WebApiError> {
        Ok(identifier.to_string())
    }

    /// Inspect or rewrite the parsed representation, after the parser and
    /// before the deserializer. The concrete shape depends on the
    /// transport in use.
    ///
    /// A generic (Internal) error here becomes BadRepresentation (400);
    /// taxonomy errors pass through. Returning `None` for a request that
    /// carried a payload is a contract violation and surfaces as 500.
    fn preprocess_representation(
        &self,
        representation: Option<Map<String, Value>>,
    ) -> Result<Option<Map<String, Value>>, WebApiError> {
        Ok(representation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::TraitDef;
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    fn student() -> Arc<SchemaDef> {
        SchemaDef::resource("Student")
            .with(TraitDef::string("name"))
            .build()
    }

    struct EmptyConnector;

    #[async_trait]
    impl ModelConnector for EmptyConnector {
        fn schema(&self) -> Arc<SchemaDef> {
            student()
        }
    }

    struct MapConnector {
        store: RwLock<HashMap<String, String>>,
    }

    #[async_trait]
    impl ModelConnector for MapConnector {
        fn schema(&self) -> Arc<SchemaDef> {
            student()
        }

        async fn retrieve(
            &self,
            resource: &mut Instance,
            _context: &RequestContext,
        ) -> Result<(), WebApiError> {
            let store = self.store.read().await;
            let Some(id) = resource.identifier() else {
                return Err(WebApiError::not_found());
            };
            let Some(name) = store.get(id) else {
                return Err(WebApiError::not_found());
            };
            resource
                .set("name", crate::traits::TraitValue::Str(name.clone()))
                .map_err(|err| WebApiError::internal(anyhow::Error::new(err)))
        }
    }

    #[tokio::test]
    async fn test_defaults_decline_with_not_implemented() {
        let connector = EmptyConnector;
        let context = RequestContext::default();
        let mut instance = Instance::new(student());

        let err = connector.create(&mut instance, &context).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotImplemented);
        let err = connector.update(&instance, &context).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotImplemented);
        let err = connector.delete(&instance, &context).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotImplemented);
    }

    #[tokio::test]
    async fn test_exists_probes_retrieve() {
        let connector = MapConnector {
            store: RwLock::new(HashMap::from([("0".to_string(), "john".to_string())])),
        };
        let context = RequestContext::default();

        let present = Instance::with_identifier(student(), "0").unwrap();
        assert!(connector.exists(&present, &context).await.unwrap());

        let missing = Instance::with_identifier(student(), "1").unwrap();
        assert!(!connector.exists(&missing, &context).await.unwrap());
    }

    #[test]
    fn test_preprocess_defaults_pass_through() {
        let connector = EmptyConnector;
        assert_eq!(connector.preprocess_identifier("7").unwrap(), "7");
        let map = serde_json::json!({"a": 1});
        let out = connector
            .preprocess_representation(Some(map.as_object().unwrap().clone()))
            .unwrap();
        assert_eq!(out, Some(map.as_object().unwrap().clone()));
    }
}

//! Resource registry: bound names → connectors, and route generation
//!
//! The registry is constructed explicitly at application start, populated
//! with [`register`](Registry::register), then frozen behind an `Arc` when
//! the router is built. There is no global instance; pass the registry (or
//! a reference) through application setup.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut registry = Registry::new();
//! registry.register(Arc::new(StudentConnector::default()))?;
//! let app = restbone::dispatch::api_router(Arc::new(registry), "", "v1");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::authenticator::{Authenticator, NullAuthenticator};
use crate::connector::ModelConnector;
use crate::error::RegistryError;
use crate::schema::{SchemaDef, SchemaKind};
use crate::transport::Transport;

/// A registered connector and the routing facts derived from its schema
#[derive(Clone)]
pub struct RegisteredHandler {
    /// The bound URL name (collection name or singleton name)
    pub name: String,
    /// The schema the connector serves
    pub schema: Arc<SchemaDef>,
    /// The connector itself
    pub connector: Arc<dyn ModelConnector>,
}

impl fmt::Debug for RegisteredHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredHandler")
            .field("name", &self.name)
            .field("type_name", &self.schema.type_name())
            .field("kind", &self.schema.kind())
            .finish()
    }
}

/// Category of a generated route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteKind {
    /// Collection URL of a resource type
    Collection,
    /// Item URL of a resource type
    Item,
    /// The single URL of a singleton type
    Singleton,
}

/// One generated route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    /// Trailing-slash-canonical path, with `{identifier}` as the item
    /// placeholder
    pub path: String,
    /// Category of the route
    pub kind: RouteKind,
    /// Bound name of the resource the route serves
    pub name: String,
}

/// Maps bound names to connectors; owns the authenticator and transport
/// shared by the dispatch pipeline.
pub struct Registry {
    entries: HashMap<String, RegisteredHandler>,
    order: Vec<String>,
    authenticator: Arc<dyn Authenticator>,
    transport: Transport,
}

impl Registry {
    /// An empty registry with the null authenticator and the default
    /// JSON/basic-REST transport
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
            authenticator: Arc::new(NullAuthenticator),
            transport: Transport::basic_rest(),
        }
    }

    /// Register a connector under the name derived from its schema:
    /// `collection_name()` for resources, `name()` for singletons.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotRegistrable`] when the connector's schema is a
    /// fragment; [`RegistryError::DuplicateName`] when the bound name is
    /// taken (the message names both colliding types).
    pub fn register(&mut self, connector: Arc<dyn ModelConnector>) -> Result<(), RegistryError> {
        let schema = connector.schema();
        let name = match schema.kind() {
            SchemaKind::Resource => schema.collection_name(),
            SchemaKind::Singleton => schema.name(),
            SchemaKind::Fragment => {
                return Err(RegistryError::NotRegistrable {
                    type_name: schema.type_name().to_string(),
                    kind: "fragment",
                })
            }
        };

        if let Some(existing) = self.entries.get(&name) {
            return Err(RegistryError::DuplicateName {
                name,
                existing: existing.schema.type_name().to_string(),
                incoming: schema.type_name().to_string(),
            });
        }

        self.order.push(name.clone());
        self.entries.insert(
            name.clone(),
            RegisteredHandler {
                name,
                schema,
                connector,
            },
        );
        Ok(())
    }

    /// Look up a registered handler by bound name
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&RegisteredHandler> {
        self.entries.get(name)
    }

    /// Whether the bound name is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// All registered handlers, in registration order. This is the data an
    /// external client-descriptor generator consumes.
    #[must_use]
    pub fn registered_handlers(&self) -> Vec<&RegisteredHandler> {
        self.order
            .iter()
            .filter_map(|name| self.entries.get(name))
            .collect()
    }

    /// The authenticator consulted by the dispatch pipeline
    #[must_use]
    pub fn authenticator(&self) -> &Arc<dyn Authenticator> {
        &self.authenticator
    }

    /// Replace the authenticator
    pub fn set_authenticator(&mut self, authenticator: Arc<dyn Authenticator>) {
        self.authenticator = authenticator;
    }

    /// The transport used for payload conversion
    #[must_use]
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Replace the transport
    pub fn set_transport(&mut self, transport: Transport) {
        self.transport = transport;
    }

    /// Generate the route table: one collection route and one item route
    /// per resource, one route per singleton, all version-prefixed and
    /// trailing-slash canonical.
    #[must_use]
    pub fn api_handlers(&self, base_path: &str, version: &str) -> Vec<RouteSpec> {
        let base = base_path.trim_end_matches('/');
        let mut routes = Vec::new();
        for handler in self.registered_handlers() {
            let collection = format!("{}/api/{}/{}/", base, version, handler.name);
            match handler.schema.kind() {
                SchemaKind::Resource => {
                    routes.push(RouteSpec {
                        path: collection.clone(),
                        kind: RouteKind::Collection,
                        name: handler.name.clone(),
                    });
                    routes.push(RouteSpec {
                        path: format!("{}{{identifier}}/", collection),
                        kind: RouteKind::Item,
                        name: handler.name.clone(),
                    });
                }
                SchemaKind::Singleton => {
                    routes.push(RouteSpec {
                        path: collection,
                        kind: RouteKind::Singleton,
                        name: handler.name.clone(),
                    });
                }
                SchemaKind::Fragment => {}
            }
        }
        routes
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("names", &self.order)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

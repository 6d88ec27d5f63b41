//! # restbone
//!
//! REST-resource web framework layered on axum: declarative schemas with
//! validated traits and Absent semantics, pluggable wire transports,
//! pluggable backends ("model connectors"), and a per-method dispatch
//! pipeline that maps domain errors to HTTP statuses.
//!
//! ## Features
//!
//! - **Declarative schemas**: typed traits with an Absent sentinel,
//!   optional/scope metadata, and one-to-one nested fragments
//! - **Resource lifecycle pipeline**: resolve → authenticate → preprocess →
//!   parse → deserialize → validate → invoke backend → validate → render
//! - **Pluggable transport**: parser, renderer, serializer, and
//!   deserializer behind one façade (JSON/basic-REST by default)
//! - **Pluggable backends**: async CRUD connectors with preprocess hooks,
//!   pagination, and filtering
//! - **Error taxonomy**: NotFound/Exists/BadRepresentation/
//!   BadQueryArguments/Unable with declared HTTP statuses; unexpected
//!   failures are logged and never leak
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use restbone::prelude::*;
//!
//! # struct StudentConnector;
//! # #[async_trait]
//! # impl ModelConnector for StudentConnector {
//! #     fn schema(&self) -> Arc<SchemaDef> {
//! #         SchemaDef::resource("Student").build()
//! #     }
//! # }
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Load configuration and initialize tracing
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     // Register connectors
//!     let mut registry = Registry::new();
//!     registry.register(Arc::new(StudentConnector))?;
//!
//!     // Build the API router and run the server
//!     let app = api_router(
//!         Arc::new(registry),
//!         &config.api.base_path,
//!         &config.api.version,
//!     );
//!     Server::new(config).serve(app).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod authenticator;
pub mod config;
pub mod connector;
pub mod dispatch;
pub mod error;
pub mod filtering;
pub mod items;
pub mod observability;
pub mod query;
pub mod registry;
pub mod schema;
pub mod server;
pub mod traits;
pub mod transport;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::authenticator::{Authenticator, NullAuthenticator, RequestInfo};
    pub use crate::config::{ApiConfig, Config, MiddlewareConfig, ServiceConfig};
    pub use crate::connector::{ModelConnector, RequestContext};
    pub use crate::dispatch::api_router;
    pub use crate::error::{Error, ErrorKind, RegistryError, Result, TraitError, WebApiError};
    pub use crate::filtering::Filter;
    pub use crate::items::ItemsResponse;
    pub use crate::observability::init_tracing;
    pub use crate::query::QueryArguments;
    pub use crate::registry::{RegisteredHandler, Registry, RouteKind, RouteSpec};
    pub use crate::schema::{Instance, SchemaBuilder, SchemaDef, SchemaKind};
    pub use crate::server::Server;
    pub use crate::traits::{Scope, TraitDef, TraitKind, TraitValue};
    pub use crate::transport::{
        BasicRestDeserializer, BasicRestSerializer, Deserializer, JsonParser, JsonRenderer,
        Parser, Renderer, Serializer, Transport,
    };

    pub use axum::{
        http::{HeaderMap, HeaderValue, StatusCode},
        response::{IntoResponse, Json, Response},
        Router,
    };

    pub use serde::{Deserialize, Serialize};

    // Re-export tracing macros
    pub use tracing::{debug, error, info, instrument, trace, warn};

    // Re-export the async runtime and trait machinery
    pub use async_trait::async_trait;
    pub use tokio;

    // Re-export error handling utilities
    pub use anyhow::{self, Context as AnyhowContext};
    pub use thiserror::Error;

    // Re-export futures utilities
    pub use futures::{future, stream, Future, Stream, StreamExt};

    // Re-export HTTP types
    pub use http::{Method, Uri};
}

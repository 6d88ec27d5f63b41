//! Wire-format conversion: parser, renderer, serializer, deserializer
//!
//! The four collaborators are independently pluggable and stateless; a
//! [`Transport`] bundles one of each together with the content type it
//! produces. The default transport is JSON with the basic-REST
//! representation ([`Transport::basic_rest`]).
//!
//! Round-trip law: `deserialize(schema, id, parse(render(serialize(x))))`
//! reconstructs every non-Absent trait value of `x`.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{TraitError, WebApiError};
use crate::items::ItemsResponse;
use crate::schema::{Instance, SchemaDef};

mod json;

pub use json::{BasicRestDeserializer, BasicRestSerializer, JsonParser, JsonRenderer};

/// Converts a raw payload into the parsed wire representation.
pub trait Parser: Send + Sync {
    /// Parse the payload. `None` in means no payload and yields `None` out;
    /// that is a legal state, not an error. Malformed bytes fail with a
    /// `BadRepresentation` error.
    fn parse(&self, payload: Option<&[u8]>) -> Result<Option<Map<String, Value>>, WebApiError>;
}

/// Converts a parsed representation back into payload bytes.
pub trait Renderer: Send + Sync {
    /// Render the representation. `None` in yields `None` out; the caller
    /// is then responsible for a no-content response.
    fn render(&self, representation: Option<&Map<String, Value>>) -> Option<Vec<u8>>;
}

/// Converts framework entities into a parsed wire representation.
pub trait Serializer: Send + Sync {
    /// Serialize one entity instance: a map of its non-Absent traits,
    /// recursing into nested fragments.
    fn serialize_resource(&self, resource: &Instance) -> Map<String, Value>;

    /// Serialize a collection window
    fn serialize_items_response(&self, response: &ItemsResponse) -> Map<String, Value>;

    /// Serialize an error, or `None` when it carries nothing a client
    /// should see.
    fn serialize_exception(&self, error: &WebApiError) -> Option<Map<String, Value>>;
}

/// Builds entity instances from a parsed wire representation.
pub trait Deserializer: Send + Sync {
    /// Construct an instance of `schema`. Resource schemas take the
    /// identifier; singletons and fragments reject one. Traits not present
    /// in `data` remain Absent, which is what makes partial payloads work.
    fn deserialize(
        &self,
        schema: &Arc<SchemaDef>,
        identifier: Option<&str>,
        data: Option<&Map<String, Value>>,
    ) -> Result<Instance, TraitError>;
}

/// The bundle of parser, renderer, serializer, and deserializer for one
/// wire format.
pub struct Transport {
    /// Payload bytes → representation
    pub parser: Box<dyn Parser>,
    /// Representation → payload bytes
    pub renderer: Box<dyn Renderer>,
    /// Entities → representation
    pub serializer: Box<dyn Serializer>,
    /// Representation → entities
    pub deserializer: Box<dyn Deserializer>,
    content_type: String,
}

impl Transport {
    /// Assemble a transport from its four collaborators
    #[must_use]
    pub fn new(
        parser: Box<dyn Parser>,
        renderer: Box<dyn Renderer>,
        serializer: Box<dyn Serializer>,
        deserializer: Box<dyn Deserializer>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            parser,
            renderer,
            serializer,
            deserializer,
            content_type: content_type.into(),
        }
    }

    /// The default transport: JSON payloads, basic-REST representation
    #[must_use]
    pub fn basic_rest() -> Self {
        Self::new(
            Box::new(JsonParser),
            Box::new(JsonRenderer),
            Box::new(BasicRestSerializer),
            Box::new(BasicRestDeserializer),
            "application/json",
        )
    }

    /// The content type this transport produces
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::basic_rest()
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

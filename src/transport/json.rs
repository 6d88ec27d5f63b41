//! JSON parser/renderer and the basic-REST serializer/deserializer

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{ErrorKind, TraitError, WebApiError};
use crate::items::ItemsResponse;
use crate::schema::{Instance, SchemaDef, SchemaKind};
use crate::traits::TraitValue;

use super::{Deserializer, Parser, Renderer, Serializer};

/// Parses JSON payloads into object maps
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

impl Parser for JsonParser {
    fn parse(&self, payload: Option<&[u8]>) -> Result<Option<Map<String, Value>>, WebApiError> {
        let Some(bytes) = payload else {
            return Ok(None);
        };

        let value: Value = serde_json::from_slice(bytes)
            .map_err(|err| WebApiError::bad_representation(format!("invalid JSON: {}", err)))?;

        match value {
            Value::Object(map) => Ok(Some(map)),
            _ => Err(WebApiError::bad_representation(
                "payload must be a JSON object",
            )),
        }
    }
}

/// Renders object maps as JSON payloads
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, representation: Option<&Map<String, Value>>) -> Option<Vec<u8>> {
        representation.map(|map| {
            serde_json::to_vec(map).unwrap_or_else(|err| {
                // A plain JSON map always renders; keep the contract
                // total anyway.
                tracing::error!(error = %err, "failed to render representation");
                Vec::new()
            })
        })
    }
}

/// Serializes entities into the basic-REST representation
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicRestSerializer;

impl BasicRestSerializer {
    fn trait_to_json(&self, value: &TraitValue) -> Option<Value> {
        match value {
            TraitValue::Fragment(nested) => {
                Some(Value::Object(self.serialize_resource(nested)))
            }
            other => Option::<Value>::from(other),
        }
    }
}

impl Serializer for BasicRestSerializer {
    fn serialize_resource(&self, resource: &Instance) -> Map<String, Value> {
        let mut representation = Map::new();
        for def in resource.schema().traits() {
            if let Some(value) = self.trait_to_json(resource.get(def.name())) {
                representation.insert(def.name().to_string(), value);
            }
        }
        representation
    }

    fn serialize_items_response(&self, response: &ItemsResponse) -> Map<String, Value> {
        let mut identifiers = Vec::new();
        let mut items = Map::new();
        for item in response.items() {
            if let Some(identifier) = item.identifier() {
                identifiers.push(Value::from(identifier));
                items.insert(
                    identifier.to_string(),
                    Value::Object(self.serialize_resource(item)),
                );
            }
        }

        let mut representation = Map::new();
        representation.insert("offset".to_string(), Value::from(response.offset()));
        representation.insert("total".to_string(), Value::from(response.total()));
        representation.insert("identifiers".to_string(), Value::Array(identifiers));
        representation.insert("items".to_string(), Value::Object(items));
        representation
    }

    fn serialize_exception(&self, error: &WebApiError) -> Option<Map<String, Value>> {
        // Unexpected failures are logged server-side, never rendered.
        if error.kind == ErrorKind::Internal {
            return None;
        }
        if error.message.is_none() && error.info.is_none() {
            return None;
        }

        let mut representation = Map::new();
        representation.insert("type".to_string(), Value::from(error.kind.as_str()));
        if let Some(ref message) = error.message {
            representation.insert("message".to_string(), Value::from(message.clone()));
        }
        if let Some(ref info) = error.info {
            for (key, value) in info {
                representation.insert(key.clone(), value.clone());
            }
        }
        Some(representation)
    }
}

/// Builds instances from the basic-REST representation
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicRestDeserializer;

impl Deserializer for BasicRestDeserializer {
    fn deserialize(
        &self,
        schema: &Arc<SchemaDef>,
        identifier: Option<&str>,
        data: Option<&Map<String, Value>>,
    ) -> Result<Instance, TraitError> {
        let mut instance = Instance::new(Arc::clone(schema));
        match schema.kind() {
            SchemaKind::Resource => {
                instance.set_identifier(identifier.map(str::to_string))?;
            }
            SchemaKind::Singleton | SchemaKind::Fragment => {
                if identifier.is_some() {
                    return Err(TraitError::IdentifierNotAllowed {
                        type_name: schema.type_name().to_string(),
                    });
                }
            }
        }

        if let Some(data) = data {
            instance.fill(data)?;
        }

        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::TraitDef;
    use serde_json::json;

    fn student() -> Arc<SchemaDef> {
        SchemaDef::resource("Student")
            .with(TraitDef::string("name"))
            .with(TraitDef::int("age"))
            .build()
    }

    fn city() -> Arc<SchemaDef> {
        let mayor = SchemaDef::fragment("Person")
            .with(TraitDef::string("name"))
            .build();
        SchemaDef::resource("City")
            .with(TraitDef::string("name"))
            .with(TraitDef::one_of("mayor", mayor))
            .build()
    }

    #[test]
    fn test_parse_none_is_none() {
        assert!(JsonParser.parse(None).unwrap().is_none());
    }

    #[test]
    fn test_parse_malformed_is_bad_representation() {
        let err = JsonParser.parse(Some(b"hello")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadRepresentation);

        // An empty payload is malformed, not "no payload".
        let err = JsonParser.parse(Some(b"")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadRepresentation);
    }

    #[test]
    fn test_parse_non_object_is_bad_representation() {
        let err = JsonParser.parse(Some(b"[1, 2]")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadRepresentation);
    }

    #[test]
    fn test_render_none_is_none() {
        assert!(JsonRenderer.render(None).is_none());
    }

    #[test]
    fn test_render_round_trips_through_parse() {
        let map = json!({"name": "john"});
        let bytes = JsonRenderer.render(Some(map.as_object().unwrap())).unwrap();
        let reparsed = JsonParser.parse(Some(&bytes)).unwrap().unwrap();
        assert_eq!(Value::Object(reparsed), map);
    }

    #[test]
    fn test_serialize_skips_absent() {
        let schema = student();
        let mut instance = Instance::new(schema);
        instance.set_json("name", &json!("john")).unwrap();

        let representation = BasicRestSerializer.serialize_resource(&instance);
        assert_eq!(representation.get("name"), Some(&Value::from("john")));
        assert!(!representation.contains_key("age"));
        assert!(!representation.contains_key("identifier"));
    }

    #[test]
    fn test_serialize_recurses_into_fragments() {
        let mut instance = Instance::new(city());
        let entity = json!({"name": "Amsterdam", "mayor": {"name": "femke"}});
        instance.fill(entity.as_object().unwrap()).unwrap();

        let representation = BasicRestSerializer.serialize_resource(&instance);
        assert_eq!(
            Value::Object(representation),
            json!({"name": "Amsterdam", "mayor": {"name": "femke"}})
        );
    }

    #[test]
    fn test_serialize_items_response_shape() {
        let schema = student();
        let mut response = ItemsResponse::new(schema.clone());
        for (id, name) in [("1", "john"), ("2", "jane")] {
            let mut item = Instance::with_identifier(schema.clone(), id).unwrap();
            item.set_json("name", &json!(name)).unwrap();
            item.set_json("age", &json!(39)).unwrap();
            response.push(item).unwrap();
        }
        response.set_window(0, 2);

        let representation = BasicRestSerializer.serialize_items_response(&response);
        assert_eq!(
            Value::Object(representation),
            json!({
                "offset": 0,
                "total": 2,
                "identifiers": ["1", "2"],
                "items": {
                    "1": {"name": "john", "age": 39},
                    "2": {"name": "jane", "age": 39},
                }
            })
        );
    }

    #[test]
    fn test_serialize_exception_with_message_and_info() {
        let error = WebApiError::bad_representation("unprocessable").with_info("foo", "bar");
        let representation = BasicRestSerializer.serialize_exception(&error).unwrap();
        assert_eq!(
            Value::Object(representation),
            json!({"type": "BadRepresentation", "message": "unprocessable", "foo": "bar"})
        );
    }

    #[test]
    fn test_serialize_exception_without_payload_is_none() {
        assert!(BasicRestSerializer
            .serialize_exception(&WebApiError::not_found())
            .is_none());
        assert!(BasicRestSerializer
            .serialize_exception(&WebApiError::internal(anyhow::anyhow!("boom")))
            .is_none());
    }

    #[test]
    fn test_deserialize_partial_leaves_absent() {
        let schema = student();
        let data = json!({"name": "john"});
        let instance = BasicRestDeserializer
            .deserialize(&schema, Some("0"), Some(data.as_object().unwrap()))
            .unwrap();
        assert_eq!(instance.identifier(), Some("0"));
        assert_eq!(instance.get("name"), &TraitValue::Str("john".to_string()));
        assert!(instance.get("age").is_absent());
    }

    #[test]
    fn test_deserialize_identifier_rules() {
        let singleton = SchemaDef::singleton("ServerInfo").build();
        assert!(matches!(
            BasicRestDeserializer.deserialize(&singleton, Some("1"), None),
            Err(TraitError::IdentifierNotAllowed { .. })
        ));
        assert!(BasicRestDeserializer
            .deserialize(&singleton, None, None)
            .is_ok());

        // Resources may be built without an identifier (pre-create).
        let instance = BasicRestDeserializer
            .deserialize(&student(), None, None)
            .unwrap();
        assert!(instance.identifier().is_none());
    }

    #[test]
    fn test_deserialize_nested_fragment() {
        let data = json!({"mayor": {"name": "femke"}});
        let instance = BasicRestDeserializer
            .deserialize(&city(), Some("ams"), Some(data.as_object().unwrap()))
            .unwrap();
        let TraitValue::Fragment(mayor) = instance.get("mayor") else {
            panic!("mayor should be a fragment");
        };
        assert_eq!(mayor.get("name"), &TraitValue::Str("femke".to_string()));
    }

    #[test]
    fn test_deserialize_type_error() {
        let schema = student();
        let data = json!({"name": "john", "age": "hello"});
        assert!(matches!(
            BasicRestDeserializer.deserialize(&schema, None, Some(data.as_object().unwrap())),
            Err(TraitError::TypeMismatch { .. })
        ));
    }
}

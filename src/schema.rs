//! Schema model: addressable resources, singletons, and embedded fragments
//!
//! A [`SchemaDef`] is the declarative description of an entity type: its
//! category, its URL name, and its ordered trait table. Definitions are
//! built once at startup and shared as `Arc<SchemaDef>`; instances are
//! request-scoped value objects created fresh per request.
//!
//! # Example
//!
//! ```rust
//! use restbone::schema::{Instance, SchemaDef};
//! use restbone::traits::{Scope, TraitDef};
//!
//! let student = SchemaDef::resource("Student")
//!     .with(TraitDef::string("name"))
//!     .with(TraitDef::int("age"))
//!     .build();
//!
//! assert_eq!(student.collection_name(), "students");
//!
//! let mut instance = Instance::new(student);
//! assert_eq!(
//!     instance.mandatory_absents(Scope::Input),
//!     vec!["age".to_string(), "name".to_string()]
//! );
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::TraitError;
use crate::traits::{Scope, TraitDef, TraitValue};

static ABSENT: TraitValue = TraitValue::Absent;

/// Category of a schema type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    /// Addressable entity with an identifier, part of a collection
    Resource,
    /// Entity existing at most once per deployment; no identifier
    Singleton,
    /// Non-addressable sub-entity embedded via a OneOf trait
    Fragment,
}

impl SchemaKind {
    /// Lowercase category label
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::Singleton => "singleton",
            Self::Fragment => "fragment",
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declarative description of an entity type: category, URL name, and the
/// ordered trait table.
#[derive(Debug)]
pub struct SchemaDef {
    type_name: String,
    kind: SchemaKind,
    bound_name: Option<String>,
    traits: Vec<TraitDef>,
}

impl SchemaDef {
    /// Start building an addressable resource type
    pub fn resource(type_name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(type_name, SchemaKind::Resource)
    }

    /// Start building a singleton type
    pub fn singleton(type_name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(type_name, SchemaKind::Singleton)
    }

    /// Start building a fragment type
    pub fn fragment(type_name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(type_name, SchemaKind::Fragment)
    }

    /// The type name, as given to the builder
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The schema category
    #[must_use]
    pub fn kind(&self) -> SchemaKind {
        self.kind
    }

    /// The collection name used in URLs. By REST convention this is a
    /// plural form: the lowercased type name with an "s" appended. Irregular
    /// pluralizations are handled with [`SchemaBuilder::named`].
    #[must_use]
    pub fn collection_name(&self) -> String {
        match self.bound_name {
            Some(ref name) => name.clone(),
            None => format!("{}s", self.type_name.to_lowercase()),
        }
    }

    /// The singleton name used in URLs: the lowercased type name unless
    /// overridden with [`SchemaBuilder::named`].
    #[must_use]
    pub fn name(&self) -> String {
        match self.bound_name {
            Some(ref name) => name.clone(),
            None => self.type_name.to_lowercase(),
        }
    }

    /// The declared traits, in declaration order
    #[must_use]
    pub fn traits(&self) -> &[TraitDef] {
        &self.traits
    }

    /// Look up a trait by name
    #[must_use]
    pub fn trait_def(&self, name: &str) -> Option<&TraitDef> {
        self.traits.iter().find(|def| def.name() == name)
    }
}

/// Builder for [`SchemaDef`]
#[derive(Debug)]
pub struct SchemaBuilder {
    type_name: String,
    kind: SchemaKind,
    bound_name: Option<String>,
    traits: Vec<TraitDef>,
}

impl SchemaBuilder {
    fn new(type_name: impl Into<String>, kind: SchemaKind) -> Self {
        Self {
            type_name: type_name.into(),
            kind,
            bound_name: None,
            traits: Vec::new(),
        }
    }

    /// Add a trait. Re-declaring an existing name replaces the earlier
    /// definition.
    #[must_use]
    pub fn with(mut self, def: TraitDef) -> Self {
        match self.traits.iter().position(|t| t.name() == def.name()) {
            Some(index) => self.traits[index] = def,
            None => self.traits.push(def),
        }
        self
    }

    /// Override the derived URL name (collection name for resources,
    /// singleton name for singletons).
    #[must_use]
    pub fn named(mut self, bound_name: impl Into<String>) -> Self {
        self.bound_name = Some(bound_name.into());
        self
    }

    /// Finish, producing a shareable definition
    #[must_use]
    pub fn build(self) -> Arc<SchemaDef> {
        Arc::new(SchemaDef {
            type_name: self.type_name,
            kind: self.kind,
            bound_name: self.bound_name,
            traits: self.traits,
        })
    }
}

/// A request-scoped entity instance: trait name → current value, each
/// Absent until set, plus the identifier for resource kinds.
#[derive(Debug, Clone)]
pub struct Instance {
    schema: Arc<SchemaDef>,
    identifier: Option<String>,
    values: BTreeMap<String, TraitValue>,
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.schema.type_name() == other.schema.type_name()
            && self.identifier == other.identifier
            && self.values == other.values
    }
}

impl Instance {
    /// Create an empty instance with no identifier
    #[must_use]
    pub fn new(schema: Arc<SchemaDef>) -> Self {
        Self {
            schema,
            identifier: None,
            values: BTreeMap::new(),
        }
    }

    /// Create an empty instance carrying an identifier. Only resource
    /// schemas accept one.
    pub fn with_identifier(
        schema: Arc<SchemaDef>,
        identifier: impl Into<String>,
    ) -> Result<Self, TraitError> {
        let mut instance = Self::new(schema);
        instance.set_identifier(Some(identifier.into()))?;
        Ok(instance)
    }

    /// The schema this instance conforms to
    #[must_use]
    pub fn schema(&self) -> &Arc<SchemaDef> {
        &self.schema
    }

    /// The identifier, if assigned
    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// Assign or clear the identifier. Singletons and fragments never carry
    /// one.
    pub fn set_identifier(&mut self, identifier: Option<String>) -> Result<(), TraitError> {
        if identifier.is_some() && self.schema.kind() != SchemaKind::Resource {
            return Err(TraitError::IdentifierNotAllowed {
                type_name: self.schema.type_name().to_string(),
            });
        }
        self.identifier = identifier;
        Ok(())
    }

    /// Assign a typed value, validating it against the trait definition.
    /// Assigning `Absent` clears the slot and is always legal.
    pub fn set(&mut self, name: &str, value: TraitValue) -> Result<(), TraitError> {
        let def = self
            .schema
            .trait_def(name)
            .ok_or_else(|| TraitError::UnknownTrait {
                name: name.to_string(),
            })?;
        let value = def.validate(value)?;
        if value.is_absent() {
            self.values.remove(name);
        } else {
            self.values.insert(name.to_string(), value);
        }
        Ok(())
    }

    /// Assign from a JSON value, coercing and validating it
    pub fn set_json(&mut self, name: &str, value: &Value) -> Result<(), TraitError> {
        let def = self
            .schema
            .trait_def(name)
            .ok_or_else(|| TraitError::UnknownTrait {
                name: name.to_string(),
            })?;
        let value = def.validate_json(value)?;
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Current value of a trait, Absent when unset or undeclared
    #[must_use]
    pub fn get(&self, name: &str) -> &TraitValue {
        self.values.get(name).unwrap_or(&ABSENT)
    }

    /// Populate traits from a JSON map. Keys missing from the map leave the
    /// corresponding trait untouched; undeclared keys are ignored. OneOf
    /// traits recursively construct and fill their fragment. Fill is never a
    /// mandatory-check point.
    pub fn fill(&mut self, entity: &Map<String, Value>) -> Result<(), TraitError> {
        let names: Vec<String> = self
            .schema
            .traits()
            .iter()
            .map(|def| def.name().to_string())
            .collect();
        for name in names {
            if let Some(value) = entity.get(&name) {
                self.set_json(&name, value)?;
            }
        }
        Ok(())
    }

    /// Copy non-Absent values from another instance with matching trait
    /// names. Nested fragments are cloned, never aliased.
    pub fn fill_from(&mut self, other: &Instance) -> Result<(), TraitError> {
        let names: Vec<String> = self
            .schema
            .traits()
            .iter()
            .map(|def| def.name().to_string())
            .collect();
        for name in names {
            let value = other.get(&name);
            if !value.is_absent() {
                self.set(&name, value.clone())?;
            }
        }
        Ok(())
    }

    /// Names of traits that are mandatory for the given scope but currently
    /// Absent. OneOf traits report their nested absents as dotted paths
    /// (`"mayor.name"`). The result is sorted.
    #[must_use]
    pub fn mandatory_absents(&self, scope: Scope) -> Vec<String> {
        let mut missing = Vec::new();
        self.collect_mandatory_absents(scope, None, &mut missing);
        missing.sort();
        missing
    }

    fn collect_mandatory_absents(
        &self,
        scope: Scope,
        prefix: Option<&str>,
        out: &mut Vec<String>,
    ) {
        for def in self.schema.traits() {
            if !def.applies_to(scope) {
                continue;
            }
            let path = match prefix {
                Some(prefix) => format!("{}.{}", prefix, def.name()),
                None => def.name().to_string(),
            };
            match self.get(def.name()) {
                TraitValue::Absent => {
                    if !def.is_optional() {
                        out.push(path);
                    }
                }
                TraitValue::Fragment(nested) => {
                    nested.collect_mandatory_absents(scope, Some(&path), out);
                }
                _ => {}
            }
        }
    }

    /// Whether the instance is valid for the given scope: the identifier is
    /// assigned (resource kinds only) and no mandatory trait is Absent.
    #[must_use]
    pub fn is_valid(&self, scope: Scope) -> bool {
        let identified =
            self.schema.kind() != SchemaKind::Resource || self.identifier.is_some();
        identified && self.mandatory_absents(scope).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn student() -> Arc<SchemaDef> {
        SchemaDef::resource("Student")
            .with(TraitDef::string("name"))
            .with(TraitDef::int("age"))
            .with(TraitDef::string("nickname").optional())
            .build()
    }

    fn person_fragment() -> Arc<SchemaDef> {
        SchemaDef::fragment("Person")
            .with(TraitDef::string("name"))
            .with(TraitDef::int("age").optional())
            .build()
    }

    fn city() -> Arc<SchemaDef> {
        SchemaDef::resource("City")
            .with(TraitDef::string("name"))
            .with(TraitDef::one_of("mayor", person_fragment()))
            .build()
    }

    #[test]
    fn test_collection_name_default_and_override() {
        assert_eq!(student().collection_name(), "students");

        let sheep = SchemaDef::resource("Sheep").named("sheep").build();
        assert_eq!(sheep.collection_name(), "sheep");

        let info = SchemaDef::singleton("ServerInfo").build();
        assert_eq!(info.name(), "serverinfo");
    }

    #[test]
    fn test_mandatory_absents_two_mandatory_one_optional() {
        let mut instance = Instance::new(student());
        assert_eq!(
            instance.mandatory_absents(Scope::Input),
            vec!["age".to_string(), "name".to_string()]
        );

        instance.set("name", TraitValue::Str("john wick".to_string())).unwrap();
        assert_eq!(
            instance.mandatory_absents(Scope::Input),
            vec!["age".to_string()]
        );

        instance.set("age", TraitValue::Int(19)).unwrap();
        assert!(instance.mandatory_absents(Scope::Input).is_empty());

        // Valid only once the identifier is also assigned.
        assert!(!instance.is_valid(Scope::Input));
        instance.set_identifier(Some("0".to_string())).unwrap();
        assert!(instance.is_valid(Scope::Input));
    }

    #[test]
    fn test_absent_round_trip_reflags_mandatory() {
        let mut instance = Instance::new(student());
        instance.set("age", TraitValue::Int(19)).unwrap();
        assert!(!instance
            .mandatory_absents(Scope::Input)
            .contains(&"age".to_string()));

        instance.set("age", TraitValue::Absent).unwrap();
        assert!(instance.get("age").is_absent());
        assert!(instance
            .mandatory_absents(Scope::Input)
            .contains(&"age".to_string()));
    }

    #[test]
    fn test_scope_tagged_traits() {
        let schema = SchemaDef::resource("Job")
            .with(TraitDef::string("command").scoped(Scope::Input))
            .with(TraitDef::string("status").scoped(Scope::Output))
            .build();
        let instance = Instance::new(schema);

        assert_eq!(
            instance.mandatory_absents(Scope::Input),
            vec!["command".to_string()]
        );
        assert_eq!(
            instance.mandatory_absents(Scope::Output),
            vec!["status".to_string()]
        );
    }

    #[test]
    fn test_fragment_recursion_dotted_paths() {
        let mut instance = Instance::new(city());

        // The mandatory fragment itself is reported while Absent.
        assert_eq!(
            instance.mandatory_absents(Scope::Input),
            vec!["mayor".to_string(), "name".to_string()]
        );

        // Once present but incomplete, its own absents appear dotted.
        let entity = json!({"name": "Amsterdam", "mayor": {"age": 61}});
        instance.fill(entity.as_object().unwrap()).unwrap();
        assert_eq!(
            instance.mandatory_absents(Scope::Input),
            vec!["mayor.name".to_string()]
        );
    }

    #[test]
    fn test_fill_nested_mapping() {
        let mut instance = Instance::new(city());
        let entity = json!({"name": "Amsterdam", "mayor": {"name": "femke", "age": 61}});
        instance.fill(entity.as_object().unwrap()).unwrap();

        let TraitValue::Fragment(mayor) = instance.get("mayor") else {
            panic!("mayor should be a fragment");
        };
        assert_eq!(mayor.get("name"), &TraitValue::Str("femke".to_string()));
        assert_eq!(mayor.get("age"), &TraitValue::Int(61));
        assert!(instance.mandatory_absents(Scope::Input).is_empty());
    }

    #[test]
    fn test_fill_ignores_undeclared_keys_and_missing_keys() {
        let mut instance = Instance::new(student());
        let entity = json!({"name": "john", "unknown": 1});
        instance.fill(entity.as_object().unwrap()).unwrap();
        assert_eq!(instance.get("name"), &TraitValue::Str("john".to_string()));
        assert!(instance.get("age").is_absent());
    }

    #[test]
    fn test_fill_from_instance() {
        let mut source = Instance::new(student());
        source.set("name", TraitValue::Str("john".to_string())).unwrap();

        let mut target = Instance::new(student());
        target.fill_from(&source).unwrap();
        assert_eq!(target.get("name"), &TraitValue::Str("john".to_string()));
        assert!(target.get("age").is_absent());
    }

    #[test]
    fn test_fragments_in_two_parents_are_independent() {
        let mut first = Instance::new(city());
        let mut second = Instance::new(city());
        let entity = json!({"mayor": {"name": "femke"}});
        first.fill(entity.as_object().unwrap()).unwrap();
        second.fill(entity.as_object().unwrap()).unwrap();

        // Mutating one parent's fragment must not leak into the other.
        let TraitValue::Fragment(mayor) = first.get("mayor").clone() else {
            panic!("mayor should be a fragment");
        };
        let mut mayor = *mayor;
        mayor.set("name", TraitValue::Str("ahmed".to_string())).unwrap();
        first.set("mayor", TraitValue::Fragment(Box::new(mayor))).unwrap();

        let TraitValue::Fragment(other) = second.get("mayor") else {
            panic!("mayor should be a fragment");
        };
        assert_eq!(other.get("name"), &TraitValue::Str("femke".to_string()));
    }

    #[test]
    fn test_identifier_rules() {
        let mut fragment = Instance::new(person_fragment());
        assert!(matches!(
            fragment.set_identifier(Some("1".to_string())),
            Err(TraitError::IdentifierNotAllowed { .. })
        ));

        let singleton = SchemaDef::singleton("ServerInfo").build();
        assert!(Instance::with_identifier(singleton, "1").is_err());

        let resource = Instance::with_identifier(student(), "1").unwrap();
        assert_eq!(resource.identifier(), Some("1"));
    }

    #[test]
    fn test_singleton_valid_without_identifier() {
        let schema = SchemaDef::singleton("ServerInfo")
            .with(TraitDef::string("status"))
            .build();
        let mut instance = Instance::new(schema);
        assert!(!instance.is_valid(Scope::Input));
        instance
            .set("status", TraitValue::Str("ok".to_string()))
            .unwrap();
        assert!(instance.is_valid(Scope::Input));
    }

    #[test]
    fn test_set_unknown_trait() {
        let mut instance = Instance::new(student());
        assert!(matches!(
            instance.set("grade", TraitValue::Int(1)),
            Err(TraitError::UnknownTrait { .. })
        ));
    }

    #[test]
    fn test_absent_round_trip_every_trait_type() {
        let extra = SchemaDef::fragment("Extra")
            .with(TraitDef::string("note").optional())
            .build();
        let schema = SchemaDef::resource("Everything")
            .with(TraitDef::int("count"))
            .with(TraitDef::string("label"))
            .with(TraitDef::boolean("active"))
            .with(TraitDef::float("ratio"))
            .with(TraitDef::list("tags"))
            .with(TraitDef::dict("attributes"))
            .with(TraitDef::one_of("extra", extra))
            .build();

        let pristine = Instance::new(Arc::clone(&schema));
        let mut instance = Instance::new(schema);
        let entity = json!({
            "count": 1,
            "label": "x",
            "active": true,
            "ratio": 0.5,
            "tags": [1],
            "attributes": {"a": 1},
            "extra": {"note": "n"},
        });
        instance.fill(entity.as_object().unwrap()).unwrap();
        assert!(instance.mandatory_absents(Scope::Input).is_empty());

        // Setting every trait back to Absent restores the unset state and
        // re-flags the mandatory ones.
        for name in [
            "count",
            "label",
            "active",
            "ratio",
            "tags",
            "attributes",
            "extra",
        ] {
            instance.set(name, TraitValue::Absent).unwrap();
            assert!(instance.get(name).is_absent());
        }
        assert_eq!(instance, pristine);
        assert_eq!(instance.mandatory_absents(Scope::Input).len(), 7);
    }
}

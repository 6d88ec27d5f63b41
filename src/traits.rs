//! Trait engine: typed, validated attribute descriptors with Absent semantics
//!
//! Every trait value is `Absent` until assigned. Absent is distinct from a
//! JSON null: it means "no value specified", which is what makes partial
//! (PATCH-style) payloads representable, since traits not mentioned in a
//! payload simply stay Absent. Assigning `Absent` is always legal and
//! clears the slot; mandatory traits are only enforced at the validation
//! points chosen by the dispatch layer, never on assignment.
//!
//! # Example
//!
//! ```rust
//! use restbone::traits::{Scope, TraitDef};
//!
//! let age = TraitDef::int("age");
//! let name = TraitDef::string("name").stripped().non_empty();
//! let note = TraitDef::string("note").optional().scoped(Scope::Output);
//!
//! assert!(age.validate_json(&serde_json::json!(19)).is_ok());
//! assert!(age.validate_json(&serde_json::json!("hello")).is_err());
//! assert!(note.applies_to(Scope::Output));
//! assert!(!note.applies_to(Scope::Input));
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::TraitError;
use crate::schema::{Instance, SchemaDef};

/// Scope a trait participates in: request payloads, response payloads, or
/// (when unset on the trait) both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// The trait is part of inbound representations (create/replace)
    Input,
    /// The trait is part of outbound representations (retrieve/items)
    Output,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.write_str("input"),
            Self::Output => f.write_str("output"),
        }
    }
}

impl FromStr for Scope {
    type Err = TraitError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "input" => Ok(Self::Input),
            "output" => Ok(Self::Output),
            other => Err(TraitError::InvalidScope {
                value: other.to_string(),
            }),
        }
    }
}

/// Type constraint of a trait
#[derive(Debug, Clone)]
pub enum TraitKind {
    /// Integral JSON number
    Int,
    /// JSON string, with optional whitespace stripping and empty rejection
    Str {
        /// Trim surrounding whitespace before storing
        strip: bool,
        /// Accept the empty string (after stripping)
        allow_empty: bool,
    },
    /// JSON boolean
    Bool,
    /// JSON number
    Float,
    /// JSON array
    List,
    /// JSON object
    Dict,
    /// One-to-one nested sub-entity of the given schema
    OneOf(Arc<SchemaDef>),
}

impl TraitKind {
    /// Human-readable label used in validation errors
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Int => "an integer",
            Self::Str { .. } => "a string",
            Self::Bool => "a boolean",
            Self::Float => "a number",
            Self::List => "a list",
            Self::Dict => "a dict",
            Self::OneOf(_) => "a nested object",
        }
    }
}

/// A stored trait value. `Absent` means "no value assigned".
#[derive(Debug, Clone, PartialEq)]
pub enum TraitValue {
    /// No value assigned
    Absent,
    /// Integer value
    Int(i64),
    /// String value
    Str(String),
    /// Boolean value
    Bool(bool),
    /// Floating point value
    Float(f64),
    /// List value, items unconstrained
    List(Vec<Value>),
    /// Dict value, entries unconstrained
    Dict(Map<String, Value>),
    /// Nested sub-entity instance
    Fragment(Box<Instance>),
}

impl TraitValue {
    /// Whether this slot is unset
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Compare against a plain JSON value. Absent and nested fragments never
    /// compare equal; this backs equality filtering over scalar fields.
    #[must_use]
    pub fn json_eq(&self, other: &Value) -> bool {
        match self {
            Self::Absent | Self::Fragment(_) => false,
            Self::Int(i) => other.as_i64() == Some(*i),
            Self::Str(s) => other.as_str() == Some(s.as_str()),
            Self::Bool(b) => other.as_bool() == Some(*b),
            Self::Float(f) => other.as_f64() == Some(*f),
            Self::List(items) => other.as_array().is_some_and(|a| a == items),
            Self::Dict(entries) => other.as_object().is_some_and(|o| o == entries),
        }
    }

    fn describe(value: &Value) -> String {
        match value {
            Value::Null => "null".to_string(),
            Value::Bool(_) => "a boolean".to_string(),
            Value::Number(_) => "a number".to_string(),
            Value::String(s) => format!("the string {:?}", s),
            Value::Array(_) => "a list".to_string(),
            Value::Object(_) => "an object".to_string(),
        }
    }
}

impl From<&TraitValue> for Option<Value> {
    /// JSON projection of a scalar trait value; `None` for Absent and for
    /// fragments (serializing a fragment requires schema traversal and is
    /// the serializer's job).
    fn from(value: &TraitValue) -> Self {
        match value {
            TraitValue::Absent | TraitValue::Fragment(_) => None,
            TraitValue::Int(i) => Some(Value::from(*i)),
            TraitValue::Str(s) => Some(Value::from(s.clone())),
            TraitValue::Bool(b) => Some(Value::from(*b)),
            TraitValue::Float(f) => Some(Value::from(*f)),
            TraitValue::List(items) => Some(Value::Array(items.clone())),
            TraitValue::Dict(entries) => Some(Value::Object(entries.clone())),
        }
    }
}

/// Declarative attribute descriptor: a name, a type constraint, and
/// optional/scope metadata.
///
/// Defaults: mandatory, applies to both scopes, strings kept verbatim.
#[derive(Debug, Clone)]
pub struct TraitDef {
    name: String,
    kind: TraitKind,
    optional: bool,
    scope: Option<Scope>,
}

impl TraitDef {
    fn new(name: impl Into<String>, kind: TraitKind) -> Self {
        Self {
            name: name.into(),
            kind,
            optional: false,
            scope: None,
        }
    }

    /// An integer trait
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, TraitKind::Int)
    }

    /// A string trait
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(
            name,
            TraitKind::Str {
                strip: false,
                allow_empty: true,
            },
        )
    }

    /// A boolean trait
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, TraitKind::Bool)
    }

    /// A float trait
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, TraitKind::Float)
    }

    /// A list trait
    pub fn list(name: impl Into<String>) -> Self {
        Self::new(name, TraitKind::List)
    }

    /// A dict trait
    pub fn dict(name: impl Into<String>) -> Self {
        Self::new(name, TraitKind::Dict)
    }

    /// A one-to-one nested sub-entity trait
    pub fn one_of(name: impl Into<String>, schema: Arc<SchemaDef>) -> Self {
        Self::new(name, TraitKind::OneOf(schema))
    }

    /// Mark the trait optional: it may stay Absent at validation points
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Restrict the trait to one scope; untagged traits apply to both
    #[must_use]
    pub fn scoped(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Trim surrounding whitespace on assignment. Only meaningful for
    /// string traits.
    #[must_use]
    pub fn stripped(mut self) -> Self {
        if let TraitKind::Str { ref mut strip, .. } = self.kind {
            *strip = true;
        }
        self
    }

    /// Reject the empty string (after stripping). Only meaningful for
    /// string traits.
    #[must_use]
    pub fn non_empty(mut self) -> Self {
        if let TraitKind::Str {
            ref mut allow_empty,
            ..
        } = self.kind
        {
            *allow_empty = false;
        }
        self
    }

    /// The trait name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The type constraint
    #[must_use]
    pub fn kind(&self) -> &TraitKind {
        &self.kind
    }

    /// Whether the trait may stay Absent at validation points
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// The scope tag, `None` meaning both
    #[must_use]
    pub fn scope(&self) -> Option<Scope> {
        self.scope
    }

    /// Whether the trait participates in the given scope
    #[must_use]
    pub fn applies_to(&self, scope: Scope) -> bool {
        self.scope.is_none() || self.scope == Some(scope)
    }

    /// Validate and convert a JSON value coming off the wire.
    ///
    /// JSON null is not a legal trait value; absence is expressed by leaving
    /// the key out of the payload entirely.
    pub fn validate_json(&self, value: &Value) -> Result<TraitValue, TraitError> {
        let mismatch = || TraitError::TypeMismatch {
            trait_name: self.name.clone(),
            expected: self.kind.label(),
            actual: TraitValue::describe(value),
        };

        match &self.kind {
            TraitKind::Int => value
                .as_i64()
                .map(TraitValue::Int)
                .ok_or_else(mismatch),
            TraitKind::Str { strip, allow_empty } => {
                let raw = value.as_str().ok_or_else(mismatch)?;
                let text = if *strip { raw.trim() } else { raw };
                if !allow_empty && text.is_empty() {
                    return Err(TraitError::EmptyString {
                        trait_name: self.name.clone(),
                    });
                }
                Ok(TraitValue::Str(text.to_string()))
            }
            TraitKind::Bool => value.as_bool().map(TraitValue::Bool).ok_or_else(mismatch),
            TraitKind::Float => value.as_f64().map(TraitValue::Float).ok_or_else(mismatch),
            TraitKind::List => value
                .as_array()
                .map(|items| TraitValue::List(items.clone()))
                .ok_or_else(mismatch),
            TraitKind::Dict => value
                .as_object()
                .map(|entries| TraitValue::Dict(entries.clone()))
                .ok_or_else(mismatch),
            TraitKind::OneOf(schema) => {
                let entries = value.as_object().ok_or_else(mismatch)?;
                let mut nested = Instance::new(Arc::clone(schema));
                nested.fill(entries)?;
                Ok(TraitValue::Fragment(Box::new(nested)))
            }
        }
    }

    /// Validate an already-typed value. Absent always passes; everything
    /// else must match the type constraint.
    pub fn validate(&self, value: TraitValue) -> Result<TraitValue, TraitError> {
        if value.is_absent() {
            return Ok(value);
        }

        let mismatch = |actual: &'static str| TraitError::TypeMismatch {
            trait_name: self.name.clone(),
            expected: self.kind.label(),
            actual: actual.to_string(),
        };

        match (&self.kind, value) {
            (TraitKind::Int, v @ TraitValue::Int(_)) => Ok(v),
            (TraitKind::Str { strip, allow_empty }, TraitValue::Str(raw)) => {
                let text = if *strip {
                    raw.trim().to_string()
                } else {
                    raw
                };
                if !allow_empty && text.is_empty() {
                    return Err(TraitError::EmptyString {
                        trait_name: self.name.clone(),
                    });
                }
                Ok(TraitValue::Str(text))
            }
            (TraitKind::Bool, v @ TraitValue::Bool(_)) => Ok(v),
            (TraitKind::Float, v @ TraitValue::Float(_)) => Ok(v),
            (TraitKind::List, v @ TraitValue::List(_)) => Ok(v),
            (TraitKind::Dict, v @ TraitValue::Dict(_)) => Ok(v),
            (TraitKind::OneOf(schema), TraitValue::Fragment(nested)) => {
                if nested.schema().type_name() != schema.type_name() {
                    return Err(TraitError::SchemaMismatch {
                        expected: schema.type_name().to_string(),
                        actual: nested.schema().type_name().to_string(),
                    });
                }
                Ok(TraitValue::Fragment(nested))
            }
            (_, TraitValue::Int(_)) => Err(mismatch("an integer")),
            (_, TraitValue::Str(_)) => Err(mismatch("a string")),
            (_, TraitValue::Bool(_)) => Err(mismatch("a boolean")),
            (_, TraitValue::Float(_)) => Err(mismatch("a number")),
            (_, TraitValue::List(_)) => Err(mismatch("a list")),
            (_, TraitValue::Dict(_)) => Err(mismatch("a dict")),
            (_, TraitValue::Fragment(_)) => Err(mismatch("a nested object")),
            (_, TraitValue::Absent) => unreachable!("Absent handled above"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scope_from_str() {
        assert_eq!("input".parse::<Scope>().unwrap(), Scope::Input);
        assert_eq!("output".parse::<Scope>().unwrap(), Scope::Output);
        assert!(matches!(
            "both".parse::<Scope>(),
            Err(TraitError::InvalidScope { .. })
        ));
    }

    #[test]
    fn test_untagged_trait_applies_to_both_scopes() {
        let def = TraitDef::int("age");
        assert!(def.applies_to(Scope::Input));
        assert!(def.applies_to(Scope::Output));

        let def = TraitDef::int("age").scoped(Scope::Input);
        assert!(def.applies_to(Scope::Input));
        assert!(!def.applies_to(Scope::Output));
    }

    #[test]
    fn test_int_validation() {
        let def = TraitDef::int("age");
        assert_eq!(
            def.validate_json(&json!(19)).unwrap(),
            TraitValue::Int(19)
        );
        assert!(def.validate_json(&json!("hello")).is_err());
        assert!(def.validate_json(&json!(19.5)).is_err());
        assert!(def.validate_json(&json!(true)).is_err());
        assert!(def.validate_json(&Value::Null).is_err());
    }

    #[test]
    fn test_float_accepts_integral_numbers() {
        let def = TraitDef::float("score");
        assert_eq!(
            def.validate_json(&json!(2)).unwrap(),
            TraitValue::Float(2.0)
        );
        assert_eq!(
            def.validate_json(&json!(2.5)).unwrap(),
            TraitValue::Float(2.5)
        );
    }

    #[test]
    fn test_string_strip_and_empty() {
        let def = TraitDef::string("name").stripped();
        assert_eq!(
            def.validate_json(&json!("  john  ")).unwrap(),
            TraitValue::Str("john".to_string())
        );

        let def = TraitDef::string("name").stripped().non_empty();
        assert!(matches!(
            def.validate_json(&json!("   ")),
            Err(TraitError::EmptyString { .. })
        ));

        // Empty allowed by default.
        let def = TraitDef::string("name");
        assert_eq!(
            def.validate_json(&json!("")).unwrap(),
            TraitValue::Str(String::new())
        );
    }

    #[test]
    fn test_absent_always_validates() {
        for def in [
            TraitDef::int("a"),
            TraitDef::string("a").non_empty(),
            TraitDef::boolean("a"),
            TraitDef::float("a"),
            TraitDef::list("a"),
            TraitDef::dict("a"),
        ] {
            assert_eq!(def.validate(TraitValue::Absent).unwrap(), TraitValue::Absent);
        }
    }

    #[test]
    fn test_typed_validation_rejects_wrong_variant() {
        let def = TraitDef::int("age");
        assert!(def.validate(TraitValue::Str("19".to_string())).is_err());
        assert!(def.validate(TraitValue::Int(19)).is_ok());
    }

    #[test]
    fn test_json_eq() {
        assert!(TraitValue::Int(19).json_eq(&json!(19)));
        assert!(!TraitValue::Int(19).json_eq(&json!(20)));
        assert!(TraitValue::Str("a".to_string()).json_eq(&json!("a")));
        assert!(!TraitValue::Absent.json_eq(&Value::Null));
        assert!(TraitValue::List(vec![json!(1)]).json_eq(&json!([1])));
    }
}

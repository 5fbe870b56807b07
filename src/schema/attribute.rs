use crate::schema::diagnostics::{Diagnostic, Diagnostics};
use crate::schema::validation::Validator;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Int,
    Bool,
}

impl AttributeType {
    pub fn zero_value(self) -> Value {
        match self {
            AttributeType::String => Value::String(String::new()),
            AttributeType::Int => Value::from(0),
            AttributeType::Bool => Value::Bool(false),
        }
    }

    pub fn accepts(self, value: &Value) -> bool {
        match self {
            AttributeType::String => value.is_string(),
            AttributeType::Int => as_integer(value).is_some(),
            AttributeType::Bool => value.is_boolean(),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeType::String => write!(f, "string"),
            AttributeType::Int => write!(f, "int"),
            AttributeType::Bool => write!(f, "bool"),
        }
    }
}

/// Integer value of a JSON number, including integral floats such as `300.0`.
pub(crate) fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
            .map(|f| f as i64)
    })
}

#[derive(Clone, Serialize)]
pub struct Attribute {
    #[serde(rename = "type")]
    pub kind: AttributeType,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub description: &'static str,
    #[serde(skip)]
    pub validator: Option<Validator>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub sensitive: bool,
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("default", &self.default)
            .field("has_validator", &self.validator.is_some())
            .finish()
    }
}

impl Attribute {
    fn new(kind: AttributeType) -> Self {
        Self {
            kind,
            required: false,
            optional: false,
            computed: false,
            default: None,
            description: "",
            validator: None,
            sensitive: false,
        }
    }

    pub fn required(kind: AttributeType) -> Self {
        Self {
            required: true,
            ..Self::new(kind)
        }
    }

    pub fn optional(kind: AttributeType) -> Self {
        Self {
            optional: true,
            ..Self::new(kind)
        }
    }

    pub fn computed(kind: AttributeType) -> Self {
        Self {
            computed: true,
            ..Self::new(kind)
        }
    }

    /// Optional attributes that fall back to the remote value when unset.
    pub fn and_computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Computed attributes that cannot be set from configuration.
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }

    /// The value used when neither configuration nor state provides one.
    pub fn fallback_value(&self) -> Value {
        self.default
            .clone()
            .unwrap_or_else(|| self.kind.zero_value())
    }
}

/// Attribute set describing one resource kind.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Schema {
    attributes: BTreeMap<String, Attribute>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: &str, attribute: Attribute) -> Self {
        self.insert(name, attribute);
        self
    }

    pub fn insert(&mut self, name: &str, attribute: Attribute) {
        self.attributes.insert(name.to_string(), attribute);
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Check a configuration object against the schema.
    pub fn validate(&self, config: &Map<String, Value>) -> Diagnostics {
        let mut diags = Diagnostics::new();

        for key in config.keys() {
            if !self.contains(key) {
                diags.push(
                    Diagnostic::error(format!("Unsupported argument \"{}\"", key))
                        .with_attribute(key.as_str()),
                );
            }
        }

        for (name, attribute) in self.iter() {
            let value = config.get(name).filter(|v| !v.is_null());

            let Some(value) = value else {
                if attribute.required {
                    diags.push(
                        Diagnostic::error(format!("Missing required argument \"{}\"", name))
                            .with_attribute(name),
                    );
                }
                continue;
            };

            if attribute.is_computed_only() {
                diags.push(
                    Diagnostic::error(format!(
                        "\"{}\" is computed and cannot be set in configuration",
                        name
                    ))
                    .with_attribute(name),
                );
                continue;
            }

            if !attribute.kind.accepts(value) {
                diags.push(
                    Diagnostic::error(format!(
                        "Incorrect attribute value type: \"{}\" must be {}",
                        name, attribute.kind
                    ))
                    .with_attribute(name),
                );
                continue;
            }

            if let Some(validator) = &attribute.validator {
                let result = validator(value, name);
                for warning in result.warnings {
                    diags.push(Diagnostic::warning(warning).with_attribute(name));
                }
                for error in result.errors {
                    diags.push(Diagnostic::error(error).with_attribute(name));
                }
            }
        }

        diags
    }

    /// Configuration with defaults filled in for unset attributes.
    pub fn apply_defaults(&self, config: &Map<String, Value>) -> Map<String, Value> {
        let mut resolved: Map<String, Value> = config
            .iter()
            .filter(|(k, v)| self.contains(k) && !v.is_null())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        for (name, attribute) in self.iter() {
            if let Some(default) = &attribute.default {
                resolved
                    .entry(name.to_string())
                    .or_insert_with(|| default.clone());
            }
        }

        resolved
    }
}

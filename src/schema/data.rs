use crate::schema::attribute::{as_integer, Schema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResourceDataError {
    #[error("Invalid address: \"{0}\" is not an attribute of this resource")]
    UnknownAttribute(String),

    #[error("Cannot set \"{key}\": expected {expected}, got {value}")]
    TypeMismatch {
        key: String,
        expected: String,
        value: Value,
    },
}

/// Persisted form of a single resource instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceState {
    pub id: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl InstanceState {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: Map::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

/// Attribute access for a resource operation.
///
/// Lookups resolve, in order: values written during the operation, the
/// desired configuration (with defaults), the prior state for computed
/// attributes, and finally the schema default or zero value. Operations
/// without configuration (read, delete, import) resolve against the prior
/// state instead.
#[derive(Debug, Clone)]
pub struct ResourceData {
    schema: Schema,
    id: String,
    prior: Map<String, Value>,
    config: Option<Map<String, Value>>,
    written: Map<String, Value>,
}

impl ResourceData {
    pub fn new(
        schema: Schema,
        prior: Option<InstanceState>,
        config: Option<&Map<String, Value>>,
    ) -> Self {
        let (id, prior) = match prior {
            Some(state) => (state.id, state.attributes),
            None => (String::new(), Map::new()),
        };
        let config = config.map(|c| schema.apply_defaults(c));

        Self {
            schema,
            id,
            prior,
            config,
            written: Map::new(),
        }
    }

    /// Data for a freshly imported resource: only the id is known.
    pub fn imported(schema: Schema, id: &str) -> Self {
        Self::new(schema, Some(InstanceState::new(id)), None)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// An empty id marks the resource as gone.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Treat everything written so far as the prior state, so later
    /// `has_change` calls diff the configuration against what was just read.
    pub fn promote_written(&mut self) {
        let written = std::mem::take(&mut self.written);
        self.prior.extend(written);
    }

    fn desired(&self, key: &str) -> Value {
        let Some(attribute) = self.schema.get(key) else {
            return Value::Null;
        };

        match &self.config {
            Some(config) => match config.get(key) {
                Some(value) => value.clone(),
                None if attribute.computed => self
                    .prior
                    .get(key)
                    .cloned()
                    .unwrap_or_else(|| attribute.fallback_value()),
                None => attribute.kind.zero_value(),
            },
            None => self
                .prior
                .get(key)
                .cloned()
                .unwrap_or_else(|| attribute.fallback_value()),
        }
    }

    pub fn get(&self, key: &str) -> Value {
        match self.written.get(key) {
            Some(value) => value.clone(),
            None => self.desired(key),
        }
    }

    /// The value when it is set to something other than its zero value.
    pub fn get_ok(&self, key: &str) -> Option<Value> {
        let value = self.get(key);
        if is_zero(&value) {
            None
        } else {
            Some(value)
        }
    }

    pub fn get_string(&self, key: &str) -> String {
        match self.get(key) {
            Value::String(s) => s,
            _ => String::new(),
        }
    }

    pub fn get_int(&self, key: &str) -> i64 {
        as_integer(&self.get(key)).unwrap_or_default()
    }

    pub fn get_str_ok(&self, key: &str) -> Option<String> {
        self.get_ok(key)
            .and_then(|v| v.as_str().map(str::to_string))
    }

    /// True when the desired value differs from the prior state.
    pub fn has_change(&self, key: &str) -> bool {
        if self.config.is_none() {
            return false;
        }
        let Some(attribute) = self.schema.get(key) else {
            return false;
        };

        let old = self
            .prior
            .get(key)
            .cloned()
            .unwrap_or_else(|| attribute.kind.zero_value());
        !values_equal(&old, &self.desired(key))
    }

    /// Names of every attribute whose desired value differs from the prior state.
    pub fn changed_attributes(&self) -> Vec<String> {
        self.schema
            .iter()
            .filter(|(name, attribute)| !attribute.is_computed_only() && self.has_change(name))
            .map(|(name, _)| name.to_string())
            .collect()
    }

    pub fn prior_value(&self, key: &str) -> Option<&Value> {
        self.prior.get(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), ResourceDataError> {
        let value = value.into();
        let attribute = self
            .schema
            .get(key)
            .ok_or_else(|| ResourceDataError::UnknownAttribute(key.to_string()))?;

        if !value.is_null() && !attribute.kind.accepts(&value) {
            return Err(ResourceDataError::TypeMismatch {
                key: key.to_string(),
                expected: attribute.kind.to_string(),
                value,
            });
        }

        self.written.insert(key.to_string(), value);
        Ok(())
    }

    /// Resulting state, or `None` when the id was cleared.
    pub fn state(&self) -> Option<InstanceState> {
        if self.id.is_empty() {
            return None;
        }

        let attributes = self
            .schema
            .iter()
            .map(|(name, _)| (name.to_string(), self.get(name)))
            .map(|(name, value)| {
                let value = match (value.is_null(), self.schema.get(&name)) {
                    (true, Some(attribute)) => attribute.kind.zero_value(),
                    _ => value,
                };
                (name, value)
            })
            .collect();

        Some(InstanceState {
            id: self.id.clone(),
            attributes,
        })
    }
}

pub(crate) fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Bool(b) => !b,
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Numbers compare by value so `300` and `300.0` from hand-written JSON match.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Null, other) | (other, Value::Null) => is_zero(other),
        _ => a == b,
    }
}

use anyhow::{anyhow, Result};

use snr_primitives::manifest::{OptionSpec, OptionType};

/// A startup option value. The non-`Opt` variants double as declared
/// defaults; the `Opt` variants declare an option without one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    Integer(i64),
    Flag(bool),
    OptString,
    OptInteger,
}

impl Value {
    pub fn option_type(&self) -> OptionType {
        match self {
            Value::String(_) | Value::OptString => OptionType::String,
            Value::Integer(_) | Value::OptInteger => OptionType::Int,
            Value::Flag(_) => OptionType::Flag,
        }
    }

    /// The manifest rendition of the default. Flags are spelled as the
    /// strings "true"/"false" on the wire.
    fn default_json(&self) -> Option<serde_json::Value> {
        match self {
            Value::Flag(b) => Some(serde_json::json!(b.to_string())),
            Value::String(s) => Some(serde_json::json!(s)),
            Value::Integer(i) => Some(serde_json::json!(i)),
            Value::OptString | Value::OptInteger => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

/// A declared plugin option, advertised through the manifest and bound
/// from the value the host echoes back in `init`.
#[derive(Debug, Clone)]
pub struct ConfigOption {
    name: String,
    value: Value,
    description: String,
}

impl ConfigOption {
    pub fn new(name: &str, value: Value, description: &str) -> Self {
        Self {
            name: name.to_string(),
            value,
            description: description.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_value(&self) -> &Value {
        &self.value
    }

    pub(crate) fn to_spec(&self) -> OptionSpec {
        OptionSpec {
            name: self.name.clone(),
            option_type: self.value.option_type(),
            default: self.value.default_json(),
            description: self.description.clone(),
        }
    }

    /// Coerces a host-supplied value against the declared type.
    ///
    /// The host is supposed to coerce before echoing, but flags have
    /// arrived both as booleans and as "true"/"false" strings across
    /// host versions.
    pub(crate) fn bind(&self, supplied: &serde_json::Value) -> Result<Value> {
        match (&self.value, supplied) {
            (Value::Flag(_), serde_json::Value::Bool(b)) => Ok(Value::Flag(*b)),
            (Value::Flag(_), serde_json::Value::String(s)) => match s.as_str() {
                "true" => Ok(Value::Flag(true)),
                "false" => Ok(Value::Flag(false)),
                _ => Err(anyhow!("Invalid flag value '{}' for option '{}'", s, self.name)),
            },
            (Value::String(_) | Value::OptString, serde_json::Value::String(s)) => {
                Ok(Value::String(s.clone()))
            }
            (Value::Integer(_) | Value::OptInteger, serde_json::Value::Number(n)) => n
                .as_i64()
                .map(Value::Integer)
                .ok_or_else(|| anyhow!("Invalid integer value for option '{}'", self.name)),
            (Value::Integer(_) | Value::OptInteger, serde_json::Value::String(s)) => s
                .parse()
                .map(Value::Integer)
                .map_err(|_| anyhow!("Invalid integer value '{}' for option '{}'", s, self.name)),
            (_, other) => Err(anyhow!(
                "Value {} does not match the declared type of option '{}'",
                other,
                self.name
            )),
        }
    }
}

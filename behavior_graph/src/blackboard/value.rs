//! Variable values shared by blackboards and runtime variable stores.

use serde::{Deserialize, Serialize};

/// Declared type of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableType {
    Bool,
    Int,
    Float,
    String,
    List,
}

impl VariableType {
    /// The zero value for this type.
    pub fn default_value(&self) -> VariableValue {
        match self {
            VariableType::Bool => VariableValue::Bool(false),
            VariableType::Int => VariableValue::Int(0),
            VariableType::Float => VariableValue::Float(0.0),
            VariableType::String => VariableValue::String(String::new()),
            VariableType::List => VariableValue::List(Vec::new()),
        }
    }
}

impl std::fmt::Display for VariableType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            VariableType::Bool => "bool",
            VariableType::Int => "int",
            VariableType::Float => "float",
            VariableType::String => "string",
            VariableType::List => "list",
        };
        f.write_str(name)
    }
}

/// A variable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<VariableValue>),
}

impl VariableValue {
    /// The type tag of this value.
    pub fn kind(&self) -> VariableType {
        match self {
            VariableValue::Bool(_) => VariableType::Bool,
            VariableValue::Int(_) => VariableType::Int,
            VariableValue::Float(_) => VariableType::Float,
            VariableValue::String(_) => VariableType::String,
            VariableValue::List(_) => VariableType::List,
        }
    }

    /// Boolean view.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            VariableValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view. Floats are not truncated.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            VariableValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; integers widen to floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            VariableValue::Float(f) => Some(*f),
            VariableValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// String view.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            VariableValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for VariableValue {
    fn from(value: bool) -> Self {
        VariableValue::Bool(value)
    }
}

impl From<i64> for VariableValue {
    fn from(value: i64) -> Self {
        VariableValue::Int(value)
    }
}

impl From<f64> for VariableValue {
    fn from(value: f64) -> Self {
        VariableValue::Float(value)
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        VariableValue::String(value.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(value: String) -> Self {
        VariableValue::String(value)
    }
}

impl From<Vec<VariableValue>> for VariableValue {
    fn from(value: Vec<VariableValue>) -> Self {
        VariableValue::List(value)
    }
}

impl std::fmt::Display for VariableValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VariableValue::Bool(b) => write!(f, "{}", b),
            VariableValue::Int(i) => write!(f, "{}", i),
            VariableValue::Float(x) => write!(f, "{}", x),
            VariableValue::String(s) => write!(f, "{:?}", s),
            VariableValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

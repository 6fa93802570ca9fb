//! Shared data model for the parser (§3 Data Model, `Resource`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Source format detected by [`crate::gateway::parser::detect_format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IacFormat {
    Terraform,
    Bicep,
    Unknown,
}

impl fmt::Display for IacFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IacFormat::Terraform => write!(f, "terraform"),
            IacFormat::Bicep => write!(f, "bicep"),
            IacFormat::Unknown => write!(f, "unknown"),
        }
    }
}

/// A tagged property value. Terraform and Bicep both parse down to this
/// shape so every rule evaluates the two formats uniformly (§4.1 invariant
/// iii).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    String(String),
    Bool(bool),
    Integer(i64),
    Float(f64),
    Map(BTreeMap<String, PropertyValue>),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            PropertyValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            PropertyValue::Integer(i) => Some(*i as f64),
            PropertyValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, PropertyValue>> {
        match self {
            PropertyValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Parse a raw HCL/Bicep scalar token into its tagged form, per the value
    /// parsing rules in §4.1: quoted string, `true`/`false`, integer, float,
    /// else the raw trimmed token (to preserve expressions like `var.x`).
    pub fn parse_scalar(raw: &str) -> PropertyValue {
        let trimmed = raw.trim().trim_end_matches(',').trim();
        if let Some(stripped) = strip_quotes(trimmed) {
            return PropertyValue::String(stripped.to_string());
        }
        match trimmed {
            "true" => return PropertyValue::Bool(true),
            "false" => return PropertyValue::Bool(false),
            _ => {}
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return PropertyValue::Integer(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return PropertyValue::Float(f);
        }
        PropertyValue::String(trimmed.to_string())
    }
}

fn strip_quotes(s: &str) -> Option<&str> {
    if s.len() >= 2 {
        if s.starts_with('"') && s.ends_with('"') {
            return Some(&s[1..s.len() - 1]);
        }
        if s.starts_with('\'') && s.ends_with('\'') {
            return Some(&s[1..s.len() - 1]);
        }
    }
    None
}

/// A single parsed IaC resource (§3 Data Model, `Resource`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Canonical Terraform type name; Bicep types are mapped to these.
    pub resource_type: String,
    pub name: String,
    pub properties: BTreeMap<String, PropertyValue>,
    pub line: usize,
    pub raw_block: String,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>, line: usize) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            properties: BTreeMap::new(),
            line,
            raw_block: String::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(PropertyValue::as_bool)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PropertyValue::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(PropertyValue::as_i64)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(PropertyValue::as_f64)
    }
}

//! Response-schema descriptors.
//!
//! A [`SchemaDescriptor`] is declared to Gemini as `responseSchema` so the model
//! is constrained to a single JSON document, and the same descriptor is used to
//! check what actually came back. The model honours the schema most of the time,
//! not always.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{MzaniGoError, Result};
use crate::models::TransportType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SchemaType {
    Array,
    Object,
    String,
    Number,
    Integer,
    Boolean,
}

/// Subset of the OpenAPI schema object understood by `generateContent`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDescriptor {
    #[serde(rename = "type")]
    pub kind: SchemaType,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaDescriptor>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, SchemaDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub property_ordering: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
}

impl SchemaDescriptor {
    fn of(kind: SchemaType) -> Self {
        Self {
            kind,
            enum_values: None,
            items: None,
            properties: BTreeMap::new(),
            property_ordering: Vec::new(),
            required: Vec::new(),
            minimum: None,
            maximum: None,
        }
    }

    pub fn string() -> Self {
        Self::of(SchemaType::String)
    }

    pub fn number() -> Self {
        Self::of(SchemaType::Number)
    }

    pub fn integer() -> Self {
        Self::of(SchemaType::Integer)
    }

    pub fn boolean() -> Self {
        Self::of(SchemaType::Boolean)
    }

    pub fn object() -> Self {
        Self::of(SchemaType::Object)
    }

    pub fn array_of(items: SchemaDescriptor) -> Self {
        let mut schema = Self::of(SchemaType::Array);
        schema.items = Some(Box::new(items));
        schema
    }

    pub fn string_enum<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut schema = Self::string();
        schema.enum_values = Some(values.into_iter().map(Into::into).collect());
        schema
    }

    pub fn range(mut self, minimum: Option<f64>, maximum: Option<f64>) -> Self {
        self.minimum = minimum;
        self.maximum = maximum;
        self
    }

    /// Add a property; declaration order is kept in `propertyOrdering`
    pub fn property(mut self, name: &str, schema: SchemaDescriptor, required: bool) -> Self {
        self.properties.insert(name.to_string(), schema);
        self.property_ordering.push(name.to_string());
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    /// Check a JSON value against this descriptor
    pub fn validate(&self, value: &Value) -> Result<()> {
        self.validate_at("$", value)
    }

    fn validate_at(&self, path: &str, value: &Value) -> Result<()> {
        match self.kind {
            SchemaType::Array => {
                let items = value
                    .as_array()
                    .ok_or_else(|| MzaniGoError::validation(path, "expected an array"))?;
                if let Some(item_schema) = &self.items {
                    for (i, item) in items.iter().enumerate() {
                        item_schema.validate_at(&format!("{path}[{i}]"), item)?;
                    }
                }
            }
            SchemaType::Object => {
                let map = value
                    .as_object()
                    .ok_or_else(|| MzaniGoError::validation(path, "expected an object"))?;
                for name in &self.required {
                    match map.get(name) {
                        None | Some(Value::Null) => {
                            return Err(MzaniGoError::validation(
                                &format!("{path}.{name}"),
                                "required field is missing",
                            ));
                        }
                        Some(_) => {}
                    }
                }
                for (name, schema) in &self.properties {
                    match map.get(name) {
                        None | Some(Value::Null) => {}
                        Some(v) => schema.validate_at(&format!("{path}.{name}"), v)?,
                    }
                }
            }
            SchemaType::String => {
                let s = value
                    .as_str()
                    .ok_or_else(|| MzaniGoError::validation(path, "expected a string"))?;
                if let Some(allowed) = &self.enum_values {
                    if !allowed.iter().any(|a| a == s) {
                        return Err(MzaniGoError::validation(
                            path,
                            format!("'{s}' is not one of {}", allowed.join(", ")),
                        ));
                    }
                }
            }
            SchemaType::Number | SchemaType::Integer => {
                let n = value
                    .as_f64()
                    .ok_or_else(|| MzaniGoError::validation(path, "expected a number"))?;
                if self.kind == SchemaType::Integer && !(value.is_i64() || value.is_u64()) {
                    return Err(MzaniGoError::validation(path, "expected an integer"));
                }
                if let Some(min) = self.minimum {
                    if n < min {
                        return Err(MzaniGoError::validation(
                            path,
                            format!("{n} is below the minimum of {min}"),
                        ));
                    }
                }
                if let Some(max) = self.maximum {
                    if n > max {
                        return Err(MzaniGoError::validation(
                            path,
                            format!("{n} is above the maximum of {max}"),
                        ));
                    }
                }
            }
            SchemaType::Boolean => {
                if !value.is_boolean() {
                    return Err(MzaniGoError::validation(path, "expected a boolean"));
                }
            }
        }
        Ok(())
    }
}

/// Schema for a single route card
pub fn route_option_schema() -> SchemaDescriptor {
    SchemaDescriptor::object()
        .property("id", SchemaDescriptor::string(), true)
        .property(
            "type",
            SchemaDescriptor::string_enum(TransportType::ALL.iter().map(|t| t.as_str())),
            true,
        )
        .property("provider", SchemaDescriptor::string(), true)
        .property("departureTime", SchemaDescriptor::string(), true)
        .property("duration", SchemaDescriptor::string(), true)
        .property(
            "price",
            SchemaDescriptor::number().range(Some(0.0), None),
            true,
        )
        .property(
            "stops",
            SchemaDescriptor::array_of(SchemaDescriptor::string()),
            true,
        )
        .property(
            "reliability",
            SchemaDescriptor::number().range(Some(0.0), Some(100.0)),
            true,
        )
        .property("isSponsored", SchemaDescriptor::boolean(), false)
}

/// Top-level schema the route model must answer with
pub fn route_list_schema() -> SchemaDescriptor {
    SchemaDescriptor::array_of(route_option_schema())
}

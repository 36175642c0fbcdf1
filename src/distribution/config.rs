use serde_json::Value;

use crate::core::types::{DestinationConfig, DestinationFieldDescriptor};

use super::errors::DeliveryError;

/// Semantic type a raw config value is coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Boolean,
}

/// Static description of one configuration field of a destination variant.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub secret: bool,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn text(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            secret: false,
            kind: FieldKind::Text,
        }
    }

    pub const fn integer(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            secret: false,
            kind: FieldKind::Integer,
        }
    }

    pub const fn boolean(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            secret: false,
            kind: FieldKind::Boolean,
        }
    }

    pub const fn secret(self) -> Self {
        Self {
            secret: true,
            ..self
        }
    }

    pub fn descriptor(&self) -> DestinationFieldDescriptor {
        DestinationFieldDescriptor {
            field: self.name.to_string(),
            description: self.description.to_string(),
            is_secret: self.secret,
        }
    }
}

/// Implemented by every destination variant: a declared field table plus an
/// explicit decode step that reads those fields from raw config.
pub trait ConfigFields {
    const FIELDS: &'static [FieldSpec];

    /// Overwrites every field present in `reader`. Absent fields keep their
    /// current value.
    fn apply(&mut self, reader: &ConfigReader<'_>) -> Result<(), DeliveryError>;
}

/// Reads named values out of an untyped destination config with explicit
/// coercion. Unknown keys are never looked at.
pub struct ConfigReader<'a> {
    raw: &'a DestinationConfig,
}

impl<'a> ConfigReader<'a> {
    pub fn new(raw: &'a DestinationConfig) -> Self {
        Self { raw }
    }

    fn value(&self, field: &str) -> Option<&'a Value> {
        self.raw.get(field).filter(|value| !value.is_null())
    }

    pub fn text(&self, field: &str, target: &mut String) -> Result<(), DeliveryError> {
        let Some(value) = self.value(field) else {
            return Ok(());
        };
        *target = match value {
            Value::String(text) => text.clone(),
            Value::Number(number) => number.to_string(),
            Value::Bool(flag) => flag.to_string(),
            _ => return Err(DeliveryError::decode(field, "expected a string")),
        };
        Ok(())
    }

    pub fn integer<T: TryFrom<i64>>(
        &self,
        field: &str,
        target: &mut T,
    ) -> Result<(), DeliveryError> {
        let Some(value) = self.value(field) else {
            return Ok(());
        };
        let number = match value {
            Value::Number(number) => number.as_i64().ok_or_else(|| {
                DeliveryError::decode(field, format!("expected an integer, got {number}"))
            })?,
            Value::String(text) => text
                .trim()
                .parse::<i64>()
                .map_err(|_| {
                    DeliveryError::decode(field, format!("expected an integer, got '{text}'"))
                })?,
            _ => return Err(DeliveryError::decode(field, "expected an integer")),
        };
        *target = T::try_from(number)
            .map_err(|_| DeliveryError::decode(field, format!("{number} is out of range")))?;
        Ok(())
    }

    pub fn flag(&self, field: &str, target: &mut bool) -> Result<(), DeliveryError> {
        let Some(value) = self.value(field) else {
            return Ok(());
        };
        *target = match value {
            Value::Bool(flag) => *flag,
            Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" | "" => false,
                _ => {
                    return Err(DeliveryError::decode(
                        field,
                        format!("expected a boolean, got '{text}'"),
                    ));
                }
            },
            Value::Number(number) => match number.as_i64() {
                Some(0) => false,
                Some(1) => true,
                _ => {
                    return Err(DeliveryError::decode(
                        field,
                        format!("expected a boolean, got {number}"),
                    ));
                }
            },
            _ => return Err(DeliveryError::decode(field, "expected a boolean")),
        };
        Ok(())
    }
}

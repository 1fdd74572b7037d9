// Tag identity and registry domain models
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Canonical tag identifier.
///
/// Upstream sources emit tag ids both as JSON numbers and as strings. Every
/// boundary coerces to this single string form so a tag written under one
/// representation is always found under the other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TagId(String);

impl TagId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TagId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for TagId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<i64> for TagId {
    fn from(raw: i64) -> Self {
        Self(raw.to_string())
    }
}

impl From<u64> for TagId {
    fn from(raw: u64) -> Self {
        Self(raw.to_string())
    }
}

impl<'de> Deserialize<'de> for TagId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TagIdVisitor;

        impl serde::de::Visitor<'_> for TagIdVisitor {
            type Value = TagId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a tag id as a string or a number")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<TagId, E> {
                Ok(TagId::new(v))
            }

            fn visit_string<E: serde::de::Error>(self, v: String) -> Result<TagId, E> {
                Ok(TagId::new(v))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<TagId, E> {
                Ok(TagId::from(v))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<TagId, E> {
                Ok(TagId::from(v))
            }

            fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<TagId, E> {
                // Integral floats keep the integer form ("7", not "7.0")
                if v.fract() == 0.0 && v.is_finite() {
                    Ok(TagId::from(v as i64))
                } else {
                    Ok(TagId::new(v.to_string()))
                }
            }
        }

        deserializer.deserialize_any(TagIdVisitor)
    }
}

/// A configured measurement point, as listed by the tag/PLC registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub plc_id: TagId,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub data_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plc {
    pub id: TagId,
    pub name: String,
    pub brand: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_and_string_forms_normalize_identically() {
        let from_number = TagId::from(42_i64);
        let from_string = TagId::new("42");
        assert_eq!(from_number, from_string);
    }

    #[test]
    fn test_deserializes_from_number_and_string() {
        let from_number: TagId = serde_json::from_str("17").unwrap();
        let from_string: TagId = serde_json::from_str("\"17\"").unwrap();
        assert_eq!(from_number, from_string);
        assert_eq!(from_number.as_str(), "17");
    }

    #[test]
    fn test_integral_float_keeps_integer_form() {
        let id: TagId = serde_json::from_str("7.0").unwrap();
        assert_eq!(id, TagId::new("7"));
    }

    #[test]
    fn test_serializes_as_string() {
        let id = TagId::from(9_i64);
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"9\"");
    }
}

use std::any::type_name;
use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::store::Error;

/// The value map carried by a session: an ordered mapping from string keys to
/// [`Value`]s. Ordering keeps serialized payloads deterministic.
pub type ValueMap = BTreeMap<String, Value>;

/// A session value.
///
/// Plain variants (`Null` through `Map`) are portable across both serializers.
/// `Tagged` carries an arbitrary serde type as opaque MessagePack bytes plus
/// the Rust type name it was encoded from; it survives the binary serializer
/// but is rejected by the structured one. Build rich values with
/// [`Value::encode`] and read them back with [`Value::decode`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Seq(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Tagged { type_name: String, bytes: Vec<u8> },
}

impl Value {
    /// Encodes an arbitrary serde type as a tagged value.
    pub fn encode<T: Serialize>(value: &T) -> Result<Self, Error> {
        let bytes = rmp_serde::to_vec(value).map_err(|e| Error::Serialize(e.to_string()))?;
        Ok(Value::Tagged {
            type_name: type_name::<T>().to_owned(),
            bytes,
        })
    }

    /// Decodes a tagged value back into the type it was encoded from.
    ///
    /// Fails if the value is not `Tagged`, if it was encoded from a different
    /// type, or if the stored bytes are malformed.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, Error> {
        match self {
            Value::Tagged { type_name: tag, bytes } => {
                if tag != type_name::<T>() {
                    return Err(Error::Deserialize(format!(
                        "tagged value holds `{tag}`, requested `{}`",
                        type_name::<T>()
                    )));
                }
                rmp_serde::from_slice(bytes).map_err(|e| Error::Deserialize(e.to_string()))
            }
            other => Err(Error::Deserialize(format!(
                "expected a tagged value, found {other:?}"
            ))),
        }
    }

    /// Whether this value (recursively) contains no `Tagged` variant, i.e. is
    /// representable by the structured serializer.
    pub(crate) fn is_plain(&self) -> bool {
        match self {
            Value::Tagged { .. } => false,
            Value::Seq(items) => items.iter().all(Value::is_plain),
            Value::Map(entries) => entries.values().all(Value::is_plain),
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Seq(v)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Value::Map(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Notice {
        level: String,
        text: String,
    }

    #[test]
    fn tagged_round_trip() {
        let notice = Notice {
            level: "info".into(),
            text: "saved".into(),
        };
        let value = Value::encode(&notice).unwrap();
        assert_eq!(value.decode::<Notice>().unwrap(), notice);
    }

    #[test]
    fn tagged_type_mismatch() {
        let value = Value::encode(&42i64).unwrap();
        let err = value.decode::<Notice>().unwrap_err();
        assert!(err.to_string().contains("i64"));
    }

    #[test]
    fn plainness_is_recursive() {
        let nested = Value::Seq(vec![Value::Int(1), Value::encode(&7i32).unwrap()]);
        assert!(!nested.is_plain());
        assert!(Value::Seq(vec![Value::Int(1)]).is_plain());
    }
}

//! Payload serialization for session value maps.

use crate::session::ValueMap;
use crate::store::Error;

/// The serialization strategy a store uses for session payloads.
///
/// Chosen at store construction time:
///
/// - [`Binary`](Serializer::Binary) (default) uses [`bincode`] and round-trips
///   every [`Value`](crate::Value) variant, including
///   [`Tagged`](crate::Value::Tagged) values carrying arbitrary serde types.
/// - [`Structured`](Serializer::Structured) uses MessagePack
///   ([`rmp_serde`]) and only accepts plain data (numbers, strings, bools,
///   bytes, nested maps and sequences). Serializing a map containing tagged
///   values fails; callers choosing this variant accept that rich types are
///   not portable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Serializer {
    #[default]
    Binary,
    Structured,
}

impl Serializer {
    /// Serializes a value map to bytes.
    pub fn serialize(&self, values: &ValueMap) -> Result<Vec<u8>, Error> {
        match self {
            Serializer::Binary => {
                bincode::serde::encode_to_vec(values, bincode::config::standard())
                    .map_err(|e| Error::Serialize(e.to_string()))
            }
            Serializer::Structured => {
                if let Some(key) = values.iter().find(|(_, v)| !v.is_plain()).map(|(k, _)| k) {
                    return Err(Error::Serialize(format!(
                        "structured serializer cannot encode tagged value at key `{key}`"
                    )));
                }
                rmp_serde::to_vec(values).map_err(|e| Error::Serialize(e.to_string()))
            }
        }
    }

    /// Deserializes bytes back into a value map.
    pub fn deserialize(&self, bytes: &[u8]) -> Result<ValueMap, Error> {
        match self {
            Serializer::Binary => {
                bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                    .map(|(values, _)| values)
                    .map_err(|e| Error::Deserialize(e.to_string()))
            }
            Serializer::Structured => {
                rmp_serde::from_slice(bytes).map_err(|e| Error::Deserialize(e.to_string()))
            }
        }
    }
}

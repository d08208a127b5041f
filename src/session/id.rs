use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use base64::{DecodeError, Engine};
use rand::TryRngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use std::{fmt, str};

/// An opaque session identifier: 32 random bytes, rendered as a 43-character
/// url-safe base64 string. Generated once per session lifetime, on the first
/// successful save.
#[derive(Copy, Clone, Debug, Deserialize, Serialize, Eq, Hash, PartialEq)]
pub struct Id([u8; 32]);

impl Default for Id {
    fn default() -> Self {
        let mut bytes = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut bytes)
            .expect("OS entropy source must be available");
        Self(bytes)
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut encoded = [0; 43];
        BASE64_URL_SAFE_NO_PAD
            .encode_slice(self.0, &mut encoded)
            .expect("encoded ID must be exactly 43 bytes");
        let encoded = str::from_utf8(&encoded).expect("encoded ID must be valid UTF-8");

        f.write_str(encoded)
    }
}

impl FromStr for Id {
    type Err = base64::DecodeSliceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut decoded = [0; 32];
        let bytes_decoded = URL_SAFE_NO_PAD.decode_slice(s.as_bytes(), &mut decoded)?;
        if bytes_decoded != 32 {
            let err = DecodeError::InvalidLength(bytes_decoded);
            return Err(base64::DecodeSliceError::DecodeError(err));
        }

        Ok(Self(decoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_display() {
        let id = Id::default();
        let parsed: Id = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn rejects_short_input() {
        assert!("c2hvcnQ".parse::<Id>().is_err());
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(Id::default(), Id::default());
    }
}

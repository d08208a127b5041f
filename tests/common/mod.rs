#![allow(dead_code)]

use http::HeaderMap;
use http::header::SET_COOKIE;
use sessio::{KeyPair, KeyRing};

pub fn signing_ring() -> KeyRing {
    KeyRing::new(vec![KeyPair::signing(b"an-authentication-key-for-tests")])
}

pub fn sealed_ring() -> KeyRing {
    KeyRing::new(vec![
        KeyPair::new(b"an-authentication-key-for-tests", &[7u8; 32]).unwrap(),
    ])
}

/// The full `Set-Cookie` header for `name`, attributes included.
pub fn set_cookie_header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{name}=")))
        .map(ToOwned::to_owned)
}

/// The bare `name=value` pair for `name`, ready to replay in a `Cookie`
/// request header.
pub fn cookie_pair(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = set_cookie_header(headers, name)?;
    Some(header.split(';').next().unwrap_or(&header).to_owned())
}

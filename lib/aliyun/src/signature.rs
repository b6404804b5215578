//! RPC style request signing, version 1.0
//!
//! See https://www.alibabacloud.com/help/en/sdk/product-overview/rpc-mechanism

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use ring::hmac;

/// RFC 3986 unreserved characters are left as is, everything else is encoded,
/// space becomes `%20` and `~` is kept.
const RFC3986: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";
pub const SIGNATURE_VERSION: &str = "1.0";

pub fn percent_encode(input: &str) -> String {
    utf8_percent_encode(input, RFC3986).to_string()
}

/// Parameters sorted by key, both key and value encoded.
pub fn canonicalized_query(params: &BTreeMap<String, String>) -> String {
    let mut query = String::new();

    for (key, value) in params {
        if !query.is_empty() {
            query.push('&');
        }

        query.push_str(&percent_encode(key));
        query.push('=');
        query.push_str(&percent_encode(value));
    }

    query
}

pub fn string_to_sign(method: &str, canonicalized_query: &str) -> String {
    format!(
        "{}&{}&{}",
        method,
        percent_encode("/"),
        percent_encode(canonicalized_query)
    )
}

pub fn sign(access_key_secret: &str, string_to_sign: &str) -> String {
    let key = hmac::Key::new(
        hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY,
        format!("{access_key_secret}&").as_bytes(),
    );
    let tag = hmac::sign(&key, string_to_sign.as_bytes());

    STANDARD.encode(tag.as_ref())
}

//! Cookie value codec for the session record.
//!
//! The record is serialized as JSON, percent-encoded, then base64-encoded
//! so the resulting value contains no characters a cookie would reject.
//! Decoding is deliberately lenient: any failure at any stage yields
//! `None` — a cookie we cannot read is a cookie we do not have.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use percent_encoding::{NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::{SessionError, SessionRecord};

/// Encodes a record into a cookie-safe string.
pub fn encode_cookie_value(
    record: &SessionRecord,
) -> Result<String, SessionError> {
    let json =
        serde_json::to_string(record).map_err(SessionError::Encode)?;
    let escaped =
        utf8_percent_encode(&json, NON_ALPHANUMERIC).to_string();
    Ok(STANDARD.encode(escaped))
}

/// Decodes a cookie value back into a record.
///
/// Returns `None` on any decoding failure — corrupt values must never
/// propagate as errors past this boundary.
pub fn decode_cookie_value(value: &str) -> Option<SessionRecord> {
    let bytes = STANDARD.decode(value).ok()?;
    let escaped = String::from_utf8(bytes).ok()?;
    let json = percent_decode_str(&escaped).decode_utf8().ok()?;
    serde_json::from_str(&json).ok()
}

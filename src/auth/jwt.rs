//! Access token expiry
//!
//! Tokens are opaque to the client except for one thing: when the server
//! sends no explicit lifetime, the `exp` claim of a JWT tells us when to
//! refresh. Signatures are not checked here; the server is the authority.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

/// Decode the `exp` claim of a JWT, if the token is one
pub fn decode_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut segments = token.split('.');
    let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?;
    let seconds = exp.as_i64().or_else(|| exp.as_f64().map(|f| f as i64))?;

    DateTime::from_timestamp(seconds, 0)
}

/// Whether a token expiring at `expires_at` should be refreshed now.
///
/// Tokens without a known expiry never count as expiring. An expiry too
/// close to the minimum representable time to subtract the leeway from is
/// long past.
pub fn is_expiring(expires_at: Option<DateTime<Utc>>, leeway: Duration, now: DateTime<Utc>) -> bool {
    match expires_at {
        Some(at) => at.checked_sub_signed(leeway).map_or(true, |due| due <= now),
        None => false,
    }
}

#[cfg(test)]
pub(crate) fn test_token(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"user_id":1,"exp":{}}}"#, exp));
    format!("{}.{}.signature", header, payload)
}

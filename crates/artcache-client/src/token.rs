//! Unverified claim extraction from a signed bearer token.
//!
//! The signature is checked by the service, not here. This module only splits
//! `header.claims.signature`, decodes the claims segment and returns the claim
//! object. It must never reject a token on signature or expiry grounds.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{Map, Value as JsonValue};

use crate::error::ConfigError;

/// Claim holding the JSON-encoded scope list.
pub(crate) const ACCESS_CONTROL_CLAIM: &str = "ac";

/// Decodes the claims segment of a token without verifying its signature.
pub(crate) fn parse_unverified_claims(token: &str) -> Result<Map<String, JsonValue>, ConfigError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(ConfigError::MalformedToken(format!(
            "expected 3 segments, got {}",
            parts.len()
        )));
    }

    // The header segment is not decoded: a token is accepted whatever its
    // `alg`, including none or an unreadable header.
    let claims_bytes = URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| ConfigError::MalformedToken(format!("invalid claims encoding: {e}")))?;

    match serde_json::from_slice::<JsonValue>(&claims_bytes) {
        Ok(JsonValue::Object(claims)) => Ok(claims),
        Ok(_) => Err(ConfigError::MalformedToken("claims are not an object".into())),
        Err(e) => Err(ConfigError::MalformedToken(format!("invalid claims: {e}"))),
    }
}

/// Returns the raw access-control claim string.
pub(crate) fn access_control_claim(token: &str) -> Result<String, ConfigError> {
    let claims = parse_unverified_claims(token)?;
    match claims.get(ACCESS_CONTROL_CLAIM) {
        None => Err(ConfigError::MissingAccessControl),
        Some(JsonValue::String(ac)) => Ok(ac.clone()),
        Some(_) => Err(ConfigError::AccessControlType),
    }
}

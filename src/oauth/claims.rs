//! ID-token claim extraction.
//!
//! Decoding only: the token signature, issuer and audience are **not**
//! checked, so the resulting claims must not be treated as verified identity.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Map, Value};

use crate::error::CodeflowError;

/// Claims carried in an OpenID Connect ID token payload.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenIdClaim {
    claims: Map<String, Value>,
}

impl OpenIdClaim {
    pub fn from_map(claims: Map<String, Value>) -> Self {
        Self { claims }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.claims
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.claims
    }

    fn str_claim(&self, name: &str) -> Option<&str> {
        self.claims.get(name).and_then(Value::as_str)
    }

    fn bool_claim(&self, name: &str) -> Option<bool> {
        self.claims.get(name).and_then(Value::as_bool)
    }

    pub fn sub(&self) -> Option<&str> {
        self.str_claim("sub")
    }

    pub fn name(&self) -> Option<&str> {
        self.str_claim("name")
    }

    pub fn given_name(&self) -> Option<&str> {
        self.str_claim("given_name")
    }

    pub fn family_name(&self) -> Option<&str> {
        self.str_claim("family_name")
    }

    pub fn middle_name(&self) -> Option<&str> {
        self.str_claim("middle_name")
    }

    pub fn nickname(&self) -> Option<&str> {
        self.str_claim("nickname")
    }

    pub fn preferred_username(&self) -> Option<&str> {
        self.str_claim("preferred_username")
    }

    pub fn profile(&self) -> Option<&str> {
        self.str_claim("profile")
    }

    pub fn picture(&self) -> Option<&str> {
        self.str_claim("picture")
    }

    pub fn website(&self) -> Option<&str> {
        self.str_claim("website")
    }

    pub fn email(&self) -> Option<&str> {
        self.str_claim("email")
    }

    pub fn email_verified(&self) -> Option<bool> {
        self.bool_claim("email_verified")
    }

    pub fn gender(&self) -> Option<&str> {
        self.str_claim("gender")
    }

    pub fn birthdate(&self) -> Option<&str> {
        self.str_claim("birthdate")
    }

    pub fn zoneinfo(&self) -> Option<&str> {
        self.str_claim("zoneinfo")
    }

    pub fn locale(&self) -> Option<&str> {
        self.str_claim("locale")
    }

    pub fn phone_number(&self) -> Option<&str> {
        self.str_claim("phone_number")
    }

    pub fn phone_number_verified(&self) -> Option<bool> {
        self.bool_claim("phone_number_verified")
    }

    /// Seconds since the epoch at which the profile was last updated.
    pub fn updated_at(&self) -> Option<i64> {
        self.claims.get("updated_at").and_then(Value::as_i64)
    }
}

/// Decode the payload segment of a compact token into its claims.
pub fn decode_claims(token: &str) -> Result<OpenIdClaim, CodeflowError> {
    let payload = token.split('.').nth(1).ok_or_else(|| {
        CodeflowError::MalformedToken("expected at least two '.'-separated segments".into())
    })?;

    let bytes = decode_segment(payload)?;
    let text = String::from_utf8(bytes)
        .map_err(|e| CodeflowError::ParseError(format!("payload is not UTF-8: {e}")))?;

    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(claims)) => Ok(OpenIdClaim::from_map(claims)),
        Ok(other) => Err(CodeflowError::ParseError(format!(
            "payload is not a JSON object: {other}"
        ))),
        Err(e) => Err(CodeflowError::ParseError(format!("invalid JSON payload: {e}"))),
    }
}

/// Base64url segment to raw bytes, restoring the stripped padding.
fn decode_segment(segment: &str) -> Result<Vec<u8>, CodeflowError> {
    let mut standard: String = segment
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .collect();

    match standard.len() % 4 {
        0 => {}
        2 => standard.push_str("=="),
        3 => standard.push('='),
        _ => {
            return Err(CodeflowError::DecodeError(format!(
                "segment length {} cannot be valid base64",
                segment.len()
            )))
        }
    }

    STANDARD
        .decode(standard.as_bytes())
        .map_err(|e| CodeflowError::DecodeError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    use super::*;

    fn token_with_payload(payload: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{header}.{body}.signature")
    }

    #[test]
    fn decodes_unpadded_payload() {
        let claims = decode_claims("header.eyJzdWIiOiIxMjMifQ.sig").unwrap();
        assert_eq!(claims.sub(), Some("123"));
        assert_eq!(claims.as_map().len(), 1);
    }

    #[test]
    fn two_segments_are_enough() {
        let claims = decode_claims("header.eyJzdWIiOiIxMjMifQ").unwrap();
        assert_eq!(claims.sub(), Some("123"));
    }

    #[test]
    fn single_segment_is_malformed() {
        let err = decode_claims("eyJzdWIiOiIxMjMifQ").unwrap_err();
        assert!(matches!(err, CodeflowError::MalformedToken(_)));
        let err = decode_claims("").unwrap_err();
        assert!(matches!(err, CodeflowError::MalformedToken(_)));
    }

    #[test]
    fn payload_with_every_padding_remainder() {
        // Payload lengths chosen so the encoded segment hits mod 4 == 0, 2, 3.
        for sub in ["a", "ab", "abc"] {
            let payload = serde_json::json!({ "sub": sub });
            let token = token_with_payload(&payload);
            let claims = decode_claims(&token).unwrap();
            assert_eq!(Value::Object(claims.into_map()), payload);
        }
    }

    #[test]
    fn url_safe_characters_are_translated() {
        // Encodes to "eyJzdWIiOiI_Pz4-In0" in the url-safe alphabet.
        let payload = serde_json::json!({ "sub": "??>>" });
        let token = token_with_payload(&payload);
        let segment = token.split('.').nth(1).unwrap();
        assert!(segment.contains('_') && segment.contains('-'));
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.sub(), Some("??>>"));
    }

    #[test]
    fn length_mod_four_of_one_is_decode_error() {
        let err = decode_claims("h.abcde.s").unwrap_err();
        assert!(matches!(err, CodeflowError::DecodeError(_)));
    }

    #[test]
    fn invalid_characters_are_decode_error() {
        let err = decode_claims("h.ab*d.s").unwrap_err();
        assert!(matches!(err, CodeflowError::DecodeError(_)));
    }

    #[test]
    fn non_json_payload_is_parse_error() {
        let token = format!("h.{}.s", URL_SAFE_NO_PAD.encode("not json"));
        let err = decode_claims(&token).unwrap_err();
        assert!(matches!(err, CodeflowError::ParseError(_)));
    }

    #[test]
    fn non_object_payload_is_parse_error() {
        let token = format!("h.{}.s", URL_SAFE_NO_PAD.encode("[1,2,3]"));
        let err = decode_claims(&token).unwrap_err();
        assert!(matches!(err, CodeflowError::ParseError(_)));
    }

    #[test]
    fn standard_claim_accessors() {
        let payload = serde_json::json!({
            "sub": "248289761001",
            "name": "Jane Doe",
            "given_name": "Jane",
            "family_name": "Doe",
            "preferred_username": "j.doe",
            "email": "janedoe@example.com",
            "email_verified": true,
            "locale": "en-US",
            "updated_at": 1311280970,
            "groups": ["admins"]
        });
        let claims = decode_claims(&token_with_payload(&payload)).unwrap();
        assert_eq!(claims.sub(), Some("248289761001"));
        assert_eq!(claims.name(), Some("Jane Doe"));
        assert_eq!(claims.given_name(), Some("Jane"));
        assert_eq!(claims.family_name(), Some("Doe"));
        assert_eq!(claims.preferred_username(), Some("j.doe"));
        assert_eq!(claims.email(), Some("janedoe@example.com"));
        assert_eq!(claims.email_verified(), Some(true));
        assert_eq!(claims.locale(), Some("en-US"));
        assert_eq!(claims.updated_at(), Some(1311280970));
        assert!(claims.phone_number().is_none());
        assert_eq!(claims.get("groups"), Some(&serde_json::json!(["admins"])));
    }
}

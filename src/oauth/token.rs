use serde_json::{Map, Value};

use crate::error::CodeflowError;

/// Fields of interest in a token endpoint response.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// `expires_in`, in the string form it is stored under.
    pub expires_in: Option<String>,
    /// `refresh_expires_in` (Keycloak), in the string form it is stored under.
    pub refresh_expires_in: Option<String>,
    pub id_token: Option<String>,
}

impl TokenGrant {
    /// Extract the grant from a response object. `access_token` is required.
    pub fn from_map(response: &Map<String, Value>) -> Result<Self, CodeflowError> {
        let access_token = response
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                CodeflowError::ProtocolError(
                    "token response has no string 'access_token'".to_string(),
                )
            })?
            .to_string();

        Ok(Self {
            access_token,
            refresh_token: string_field(response, "refresh_token"),
            expires_in: number_field(response, "expires_in"),
            refresh_expires_in: number_field(response, "refresh_expires_in"),
            id_token: string_field(response, "id_token"),
        })
    }
}

fn string_field(response: &Map<String, Value>, key: &str) -> Option<String> {
    response.get(key).and_then(Value::as_str).map(str::to_string)
}

// Numbers only; a string-typed lifetime is not what the field promises.
fn number_field(response: &Map<String, Value>, key: &str) -> Option<String> {
    match response.get(key) {
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test fixture must be an object"),
        }
    }

    #[test]
    fn full_response() {
        let grant = TokenGrant::from_map(&object(serde_json::json!({
            "access_token": "AT1",
            "refresh_token": "RT1",
            "expires_in": 300,
            "refresh_expires_in": 1800,
            "id_token": "h.p.s",
            "token_type": "Bearer"
        })))
        .unwrap();
        assert_eq!(grant.access_token, "AT1");
        assert_eq!(grant.refresh_token.as_deref(), Some("RT1"));
        assert_eq!(grant.expires_in.as_deref(), Some("300"));
        assert_eq!(grant.refresh_expires_in.as_deref(), Some("1800"));
        assert_eq!(grant.id_token.as_deref(), Some("h.p.s"));
    }

    #[test]
    fn minimal_response() {
        let grant =
            TokenGrant::from_map(&object(serde_json::json!({ "access_token": "AT1" }))).unwrap();
        assert!(grant.refresh_token.is_none());
        assert!(grant.expires_in.is_none());
        assert!(grant.refresh_expires_in.is_none());
        assert!(grant.id_token.is_none());
    }

    #[test]
    fn fractional_lifetime_keeps_its_digits() {
        let grant = TokenGrant::from_map(&object(serde_json::json!({
            "access_token": "AT1",
            "expires_in": 299.5
        })))
        .unwrap();
        assert_eq!(grant.expires_in.as_deref(), Some("299.5"));
    }

    #[test]
    fn string_lifetime_is_ignored() {
        let grant = TokenGrant::from_map(&object(serde_json::json!({
            "access_token": "AT1",
            "expires_in": "300"
        })))
        .unwrap();
        assert!(grant.expires_in.is_none());
    }

    #[test]
    fn missing_access_token_is_protocol_error() {
        let err = TokenGrant::from_map(&object(serde_json::json!({ "refresh_token": "RT1" })))
            .unwrap_err();
        assert!(matches!(err, CodeflowError::ProtocolError(_)));
    }

    #[test]
    fn non_string_access_token_is_protocol_error() {
        let err = TokenGrant::from_map(&object(serde_json::json!({ "access_token": 42 })))
            .unwrap_err();
        assert!(matches!(err, CodeflowError::ProtocolError(_)));
    }
}

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::CodeflowError;

/// A response body, classified once by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// A JSON object.
    Object(Map<String, Value>),
    /// A bare string: either a JSON string or a non-JSON text body.
    Text(String),
    /// No body at all.
    Empty,
    /// Any other JSON value (array, number, boolean, null).
    Other(Value),
}

impl ResponseBody {
    /// Classify a raw response body.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return ResponseBody::Empty;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(map)) => ResponseBody::Object(map),
            Ok(Value::String(s)) => ResponseBody::Text(s),
            Ok(other) => ResponseBody::Other(other),
            Err(_) => ResponseBody::Text(trimmed.to_string()),
        }
    }

    /// Short name of the shape, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ResponseBody::Object(_) => "object",
            ResponseBody::Text(_) => "text",
            ResponseBody::Empty => "empty",
            ResponseBody::Other(_) => "other",
        }
    }
}

impl std::fmt::Debug for dyn HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport").finish()
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// POST `params` form-encoded to `url` and return the classified body.
    ///
    /// Network failures map to `TransportError`, non-success statuses to
    /// `HttpStatus`.
    async fn post_form(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<ResponseBody, CodeflowError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_object() {
        let body = ResponseBody::parse(r#"{"access_token":"AT1"}"#);
        match body {
            ResponseBody::Object(map) => assert_eq!(map["access_token"], "AT1"),
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn parse_json_string_is_text() {
        assert_eq!(ResponseBody::parse(r#""AT2""#), ResponseBody::Text("AT2".into()));
    }

    #[test]
    fn parse_plain_text_is_trimmed() {
        assert_eq!(ResponseBody::parse("AT3\n"), ResponseBody::Text("AT3".into()));
    }

    #[test]
    fn parse_empty_body() {
        assert_eq!(ResponseBody::parse(""), ResponseBody::Empty);
        assert_eq!(ResponseBody::parse("  \r\n"), ResponseBody::Empty);
    }

    #[test]
    fn parse_array_is_other() {
        let body = ResponseBody::parse("[1, 2]");
        assert_eq!(body.kind(), "other");
    }
}

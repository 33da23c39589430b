use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::error::CodeflowError;

/// Pull the authorization code out of a redirect payload.
///
/// The payload may be a full redirect URL, a path with a query string, or a
/// bare query string. A payload without `code` means the user declined (or
/// the server refused), and is reported as `AuthorizationDenied`.
pub fn extract_code(payload: &str) -> Result<String, CodeflowError> {
    let query = match payload.split_once('?') {
        Some((_, query)) => query,
        None => payload,
    };
    // A fragment is never part of the query.
    let query = query.split('#').next().unwrap_or_default();

    let mut code = None;
    let mut error = None;
    let mut description = None;
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "code" if !value.is_empty() => code = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "error_description" => description = Some(value.into_owned()),
            _ => {}
        }
    }

    code.ok_or_else(|| {
        let reason = description
            .or(error)
            .unwrap_or_else(|| "user cancelled authorization".to_string());
        CodeflowError::AuthorizationDenied(reason)
    })
}

/// Accept a single loopback redirect and return its request target
/// (e.g. `/callback?code=...`).
pub async fn listen_for_redirect(
    listener: TcpListener,
    timeout: Duration,
) -> Result<String, CodeflowError> {
    let accept_future = async {
        // Browsers may open speculative connections that never send a
        // request line; keep accepting until one does.
        let (mut stream, target) = loop {
            let (mut stream, _) = listener.accept().await?;
            let mut buf = vec![0u8; 4096];
            let n = stream.read(&mut buf).await?;
            match request_target(&String::from_utf8_lossy(&buf[..n])) {
                Some(target) => break (stream, target),
                None => tracing::debug!("ignoring empty loopback connection"),
            }
        };

        let body = if extract_code(&target).is_ok() {
            "<!DOCTYPE html><html><body><h1>Authorization complete</h1>\
             <p>You can close this window and return to the terminal.</p></body></html>"
        } else {
            "<!DOCTYPE html><html><body><h1>Authorization was not granted</h1>\
             <p>Return to the terminal for details.</p></body></html>"
        };
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await?;
        stream.shutdown().await?;

        Ok::<String, CodeflowError>(target)
    };

    tokio::time::timeout(timeout, accept_future)
        .await
        .map_err(|_| CodeflowError::AuthorizationTimeout(timeout))?
}

fn request_target(request: &str) -> Option<String> {
    // "GET /callback?code=... HTTP/1.1"
    let first_line = request.lines().next()?;
    let mut parts = first_line.split_whitespace();
    let _method = parts.next()?;
    parts.next().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_from_full_url() {
        let code = extract_code("org.example.app://oauth2Callback?code=abc123&state=xyz").unwrap();
        assert_eq!(code, "abc123");
    }

    #[test]
    fn code_from_path_and_bare_query() {
        assert_eq!(extract_code("/callback?code=abc").unwrap(), "abc");
        assert_eq!(extract_code("code=abc&state=1").unwrap(), "abc");
    }

    #[test]
    fn code_is_percent_decoded() {
        assert_eq!(extract_code("?code=abc%2F123").unwrap(), "abc/123");
    }

    #[test]
    fn fragment_is_ignored() {
        assert_eq!(extract_code("app://cb?code=abc#_=_").unwrap(), "abc");
    }

    #[test]
    fn error_param_is_denied() {
        let err = extract_code("app://cb?error=access_denied&state=xyz").unwrap_err();
        match err {
            CodeflowError::AuthorizationDenied(reason) => assert_eq!(reason, "access_denied"),
            other => panic!("expected AuthorizationDenied, got {other:?}"),
        }
    }

    #[test]
    fn error_description_preferred() {
        let err = extract_code("?error=access_denied&error_description=User+said+no")
            .unwrap_err();
        assert_eq!(err.to_string(), "Authorization denied: User said no");
    }

    #[test]
    fn empty_code_is_denied() {
        let err = extract_code("app://cb?code=&state=xyz").unwrap_err();
        assert!(matches!(err, CodeflowError::AuthorizationDenied(_)));
    }

    #[test]
    fn no_query_is_cancelled() {
        let err = extract_code("app://cb").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Authorization denied: user cancelled authorization"
        );
    }

    #[test]
    fn request_target_from_get_line() {
        let request = "GET /callback?code=abc123&state=xyz HTTP/1.1\r\nHost: localhost\r\n";
        assert_eq!(
            request_target(request).as_deref(),
            Some("/callback?code=abc123&state=xyz")
        );
        assert!(request_target("").is_none());
    }

    #[tokio::test]
    async fn listener_returns_target() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(listen_for_redirect(listener, Duration::from_secs(5)));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /callback?code=xyz HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("Authorization complete"));

        let target = server.await.unwrap().unwrap();
        assert_eq!(target, "/callback?code=xyz");
    }

    #[tokio::test]
    async fn listener_skips_empty_connections() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(listen_for_redirect(listener, Duration::from_secs(5)));

        let idle = tokio::net::TcpStream::connect(addr).await.unwrap();
        drop(idle);

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /cb?error=access_denied HTTP/1.1\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.contains("not granted"));

        assert_eq!(server.await.unwrap().unwrap(), "/cb?error=access_denied");
    }

    #[tokio::test]
    async fn listener_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let err = listen_for_redirect(listener, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, CodeflowError::AuthorizationTimeout(_)));
    }
}

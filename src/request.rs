use crate::error::Error;
use url::Url;

/// Builds the client-side HTTP upgrade request for `ws_url`, returning
/// `(request, host:port, host, use_tls)`. The host/port pair is what the
/// caller dials over TCP; `use_tls` tells it whether to wrap the socket in
/// a TLS client handshake before sending this request.
pub fn construct_http_request(ws_url: &str, key: &str) -> Result<(String, String, String, bool), Error> {
    let parsed_url = Url::parse(ws_url)?;
    let mut use_tls = false;

    let http_port: u16 = match parsed_url.scheme() {
        "ws" => 80,
        "wss" => {
            use_tls = true;
            443
        }
        _ => return Err(Error::InvalidSchemeURL),
    };

    let host = parsed_url.host_str().ok_or(Error::URLNoHost)?;
    let port = parsed_url.port().unwrap_or(http_port);

    let request_host_field = match parsed_url.port() {
        Some(port) => format!("{host}:{port}"),
        None => String::from(host),
    };
    let host_with_port = format!("{host}:{port}");

    let request_path = match parsed_url.query() {
        Some(query) => format!("{}?{}", parsed_url.path(), query),
        None => parsed_url.path().to_string(),
    };

    let request = format!(
        "GET {request_path} HTTP/1.1\r\nHost: {request_host_field}\r\nConnection: Upgrade\r\nUpgrade: websocket\r\nSec-WebSocket-Key: {key}\r\nSec-WebSocket-Version: 13\r\n\r\n",
    );

    Ok((request, host_with_port, String::from(host), use_tls))
}

/// Parses a complete HTTP upgrade request (`buf` must include the trailing
/// `\r\n\r\n`) and returns the `Sec-WebSocket-Key` value, after validating
/// the headers RFC 6455 §4.2.1 requires a server to check.
pub fn parse_websocket_key(buf: &[u8]) -> Result<String, Error> {
    let mut headers = [httparse::EMPTY_HEADER; 32];
    let mut req = httparse::Request::new(&mut headers);
    match req.parse(buf)? {
        httparse::Status::Complete(_) => {}
        httparse::Status::Partial => return Err(Error::IncompleteHTTPRequest),
    }

    let header_value = |name: &str| -> Option<String> {
        req.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| String::from_utf8_lossy(h.value).into_owned())
    };

    let connection = header_value("Connection").ok_or(Error::NoConnectionHeaderPresent)?;
    if !connection.split(',').any(|tok| tok.trim().eq_ignore_ascii_case("upgrade")) {
        return Err(Error::NoConnectionHeaderPresent);
    }

    let upgrade = header_value("Upgrade").ok_or(Error::NoUpgradeHeaderPresent)?;
    if !upgrade.eq_ignore_ascii_case("websocket") {
        return Err(Error::NoUpgradeHeaderPresent);
    }

    header_value("Sec-WebSocket-Key").ok_or(Error::NoSecWebsocketKey)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_ws_request_with_default_port() {
        let (request, host_with_port, host, use_tls) =
            construct_http_request("ws://example.com/chat", "dGhlIHNhbXBsZSBub25jZQ==").unwrap();
        assert!(request.starts_with("GET /chat HTTP/1.1\r\n"));
        assert!(request.contains("Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n"));
        assert_eq!(host_with_port, "example.com:80");
        assert_eq!(host, "example.com");
        assert!(!use_tls);
    }

    #[test]
    fn wss_scheme_selects_tls_and_port_443() {
        let (_, host_with_port, _, use_tls) = construct_http_request("wss://example.com", "key").unwrap();
        assert_eq!(host_with_port, "example.com:443");
        assert!(use_tls);
    }

    #[test]
    fn parses_key_from_a_well_formed_request() {
        let req = b"GET /chat HTTP/1.1\r\nHost: example.com\r\nConnection: Upgrade\r\nUpgrade: websocket\r\nSec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n";
        assert_eq!(parse_websocket_key(req).unwrap(), "dGhlIHNhbXBsZSBub25jZQ==");
    }

    #[test]
    fn rejects_request_missing_upgrade_header() {
        let req = b"GET /chat HTTP/1.1\r\nHost: example.com\r\nConnection: Upgrade\r\nSec-WebSocket-Key: abc\r\n\r\n";
        assert!(parse_websocket_key(req).is_err());
    }
}

use crate::config::WebSocketConfig;
use crate::error::Error;
use crate::request::{construct_http_request, parse_websocket_key};
use crate::sender::{Role, Sender};
use base64::prelude::*;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

const UUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";
const MAX_REQUEST_SIZE: usize = 16 * 1024;
const REQUEST_TERMINATOR: &[u8] = b"\r\n\r\n";

fn accept_value(key: &str) -> String {
    let mut sha1 = Sha1::new();
    sha1.update(key.as_bytes());
    sha1.update(UUID.as_bytes());
    BASE64_STANDARD.encode(sha1.finalize())
}

/// Reads request bytes off `stream` until the header terminator, one read
/// at a time, bounded by [`MAX_REQUEST_SIZE`] (spec's out-of-scope "session
/// lifecycle and handshake" collaborator — implemented here to round out a
/// runnable crate, grounded on the teacher's own bounded read loop).
async fn read_request<T: AsyncRead + Unpin>(stream: &mut T) -> Result<Vec<u8>, Error> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        if buf.len() > MAX_REQUEST_SIZE {
            return Err(Error::IncompleteHTTPRequest);
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(Error::IncompleteHTTPRequest);
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(REQUEST_TERMINATOR.len()).any(|w| w == REQUEST_TERMINATOR) {
            return Ok(buf);
        }
    }
}

/// Performs the server side of the RFC 6455 opening handshake on an
/// already-accepted connection, and returns a [`Sender`] ready to write
/// frames to it. Does not hand back a receive-path reader — reassembling
/// and dispatching inbound frames is out of scope for this crate (see
/// [`crate::recv`] for the minimal single-frame reader it does offer).
pub async fn accept_async_with_config<T: AsyncRead + AsyncWrite + Unpin + Send + 'static>(
    mut stream: T,
    config: Option<WebSocketConfig>,
) -> Result<Sender<T>, Error> {
    let request = read_request(&mut stream).await?;
    let key = parse_websocket_key(&request)?;
    let accept = accept_value(&key);

    let response = format!(
        "HTTP/1.1 101 Switching Protocols\r\nConnection: Upgrade\r\nUpgrade: websocket\r\nSec-WebSocket-Accept: {accept}\r\n\r\n"
    );
    stream.write_all(response.as_bytes()).await?;

    let config = config.unwrap_or_default();
    Ok(Sender::new(stream, Role::Server, &config))
}

/// Performs the client side of the opening handshake against a plain-text
/// `ws://` endpoint and returns a [`Sender`] for it. `wss://` is left to
/// the caller: wrap the dialed `TcpStream` in a TLS client connector and
/// hand the resulting stream to [`crate::sender::Sender::new`] directly
/// with the same request bytes this function builds.
pub async fn connect_async(url: &str, config: Option<WebSocketConfig>) -> Result<Sender<TcpStream>, Error> {
    let key_bytes: [u8; 16] = rand::Rng::random(&mut rand::rng());
    let key = BASE64_STANDARD.encode(key_bytes);
    let (request, host_with_port, _host, use_tls) = construct_http_request(url, &key)?;
    if use_tls {
        return Err(Error::Deployment(
            "wss:// requires a TLS client connector; use the ws:// request built by construct_http_request with your own TLS stream".to_string(),
        ));
    }

    let mut stream = TcpStream::connect(&host_with_port).await?;
    stream.write_all(request.as_bytes()).await?;

    let response = read_request(&mut stream).await?;
    let status_line = String::from_utf8_lossy(&response);
    if !status_line.starts_with("HTTP/1.1 101") {
        return Err(Error::NoUpgrade);
    }

    let config = config.unwrap_or_default();
    Ok(Sender::new(stream, Role::Client, &config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_value_matches_rfc6455_example() {
        assert_eq!(accept_value("dGhlIHNhbXBsZSBub25jZQ=="), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[tokio::test]
    async fn server_handshake_completes_over_duplex() {
        let (mut client, server) = tokio::io::duplex(4096);
        let handshake = tokio::spawn(accept_async_with_config(server, None));

        client
            .write_all(b"GET /chat HTTP/1.1\r\nHost: x\r\nConnection: Upgrade\r\nUpgrade: websocket\r\nSec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n")
            .await
            .unwrap();

        let sender = handshake.await.unwrap().unwrap();
        sender.send_ping(vec![]).await.unwrap();

        let mut response = [0u8; 129];
        let n = client.read(&mut response).await.unwrap();
        let text = String::from_utf8_lossy(&response[..n]);
        assert!(text.starts_with("HTTP/1.1 101 Switching Protocols"));
        assert!(text.contains("Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo="));
    }
}

use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsStream;

/// Transport union accepted by the server side of the handshake: a plain
/// TCP socket, or one upgraded to TLS by a `rustls` acceptor. `Sender<W>`
/// only needs `AsyncWrite`, but the handshake reads the HTTP request off
/// the same socket first, so this carries `AsyncRead` too.
pub enum SocketFlowStream {
    Plain(TcpStream),
    Secure(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for SocketFlowStream {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            SocketFlowStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            SocketFlowStream::Secure(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for SocketFlowStream {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            SocketFlowStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            SocketFlowStream::Secure(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            SocketFlowStream::Plain(s) => Pin::new(s).poll_flush(cx),
            SocketFlowStream::Secure(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            SocketFlowStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            SocketFlowStream::Secure(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

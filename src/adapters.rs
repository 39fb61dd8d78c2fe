use crate::config::OUTPUT_BUFFER_SIZE;
use crate::error::Error;
use crate::sender::Sender;
use tokio::io::AsyncWrite;

/// Byte-stream adapter for sending one binary message progressively (spec
/// §4.8). Bytes are buffered locally and flushed as non-final binary
/// partial frames once the buffer fills; `close()` flushes the remainder as
/// the final frame. Acquiring one puts the endpoint in `StreamWriting`
/// until `close()` returns it to `Open`.
pub struct ByteSendStream<W: AsyncWrite + Unpin + Send + 'static> {
    sender: Sender<W>,
    buf: Vec<u8>,
    closed: bool,
}

impl<W: AsyncWrite + Unpin + Send + 'static> ByteSendStream<W> {
    pub(crate) fn new(sender: Sender<W>) -> Self {
        Self {
            sender,
            buf: Vec::with_capacity(OUTPUT_BUFFER_SIZE),
            closed: false,
        }
    }

    /// Buffers `data`, flushing a non-final partial frame whenever the
    /// local buffer reaches [`OUTPUT_BUFFER_SIZE`].
    pub async fn write(&mut self, data: &[u8]) -> Result<(), Error> {
        if self.closed {
            return Err(Error::IllegalState("write() called on a closed stream"));
        }
        self.buf.extend_from_slice(data);
        while self.buf.len() >= OUTPUT_BUFFER_SIZE {
            let tail = self.buf.split_off(OUTPUT_BUFFER_SIZE);
            let chunk = std::mem::replace(&mut self.buf, tail);
            self.flush_chunk(chunk, false).await?;
        }
        Ok(())
    }

    /// Flushes whatever is currently buffered as a non-final partial frame,
    /// without closing the message. Flushing an empty buffer still emits a
    /// zero-length partial frame (spec §4.8 Open Question, resolved in
    /// DESIGN.md to match the primitive's literal behavior rather than
    /// special-casing the empty case).
    pub async fn flush(&mut self) -> Result<(), Error> {
        if self.closed {
            return Err(Error::IllegalState("flush() called on a closed stream"));
        }
        let chunk = std::mem::take(&mut self.buf);
        self.flush_chunk(chunk, false).await
    }

    /// Sends whatever remains buffered as the final frame of the message.
    /// Idempotent: a second call is a no-op.
    pub async fn close(&mut self) -> Result<(), Error> {
        if self.closed {
            return Ok(());
        }
        let chunk = std::mem::take(&mut self.buf);
        self.flush_chunk(chunk, true).await?;
        self.closed = true;
        Ok(())
    }

    async fn flush_chunk(&mut self, chunk: Vec<u8>, last: bool) -> Result<(), Error> {
        self.sender.send_data_part(crate::frame::OpCode::Binary, chunk, last).await?;
        Ok(())
    }
}

/// Char-stream adapter for sending one text message progressively (spec
/// §4.8). `String`/`&str` are always valid UTF-8 in Rust, so unlike the
/// `CharsetEncoder` this is modeled after, there is no overflow/malformed
/// state to track — writes just accumulate bytes and flush on the same
/// size threshold as [`ByteSendStream`].
pub struct CharSendWriter<W: AsyncWrite + Unpin + Send + 'static> {
    sender: Sender<W>,
    buf: String,
    closed: bool,
}

impl<W: AsyncWrite + Unpin + Send + 'static> CharSendWriter<W> {
    pub(crate) fn new(sender: Sender<W>) -> Self {
        Self {
            sender,
            buf: String::with_capacity(OUTPUT_BUFFER_SIZE),
            closed: false,
        }
    }

    pub async fn write_str(&mut self, s: &str) -> Result<(), Error> {
        if self.closed {
            return Err(Error::IllegalState("write_str() called on a closed writer"));
        }
        self.buf.push_str(s);
        while self.buf.len() >= OUTPUT_BUFFER_SIZE {
            let split_at = floor_char_boundary(&self.buf, OUTPUT_BUFFER_SIZE);
            let tail = self.buf.split_off(split_at);
            let chunk = std::mem::replace(&mut self.buf, tail);
            self.flush_chunk(chunk, false).await?;
        }
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<(), Error> {
        if self.closed {
            return Err(Error::IllegalState("flush() called on a closed writer"));
        }
        let chunk = std::mem::take(&mut self.buf);
        self.flush_chunk(chunk, false).await
    }

    pub async fn close(&mut self) -> Result<(), Error> {
        if self.closed {
            return Ok(());
        }
        let chunk = std::mem::take(&mut self.buf);
        self.flush_chunk(chunk, true).await?;
        self.closed = true;
        Ok(())
    }

    async fn flush_chunk(&mut self, chunk: String, last: bool) -> Result<(), Error> {
        self.sender
            .send_data_part(crate::frame::OpCode::Text, chunk.into_bytes(), last)
            .await?;
        Ok(())
    }
}

/// Largest byte index `<= at` that lands on a UTF-8 character boundary.
fn floor_char_boundary(s: &str, at: usize) -> usize {
    if at >= s.len() {
        return s.len();
    }
    let mut idx = at;
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WebSocketConfig;
    use crate::sender::Role;
    use tokio::io::AsyncReadExt;

    async fn server_pair() -> (Sender<tokio::io::DuplexStream>, tokio::io::DuplexStream) {
        let (a, b) = tokio::io::duplex(1 << 16);
        (Sender::new(a, Role::Server, &WebSocketConfig::default()), b)
    }

    #[tokio::test]
    async fn byte_stream_flushes_final_frame_on_close() {
        let (sender, mut peer) = server_pair().await;
        let mut stream = sender.get_send_stream().await.unwrap();
        stream.write(b"hello").await.unwrap();
        stream.close().await.unwrap();

        let mut buf = [0u8; 7];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [0x82, 0x05, b'h', b'e', b'l', b'l', b'o']);
    }

    #[tokio::test]
    async fn byte_stream_flushes_a_full_chunk_as_non_final() {
        let (sender, mut peer) = server_pair().await;
        let mut stream = sender.get_send_stream().await.unwrap();
        stream.write(&vec![0xAB; OUTPUT_BUFFER_SIZE]).await.unwrap();

        let mut header = [0u8; 4];
        peer.read_exact(&mut header).await.unwrap();
        assert_eq!(header[0], 0x02); // binary opcode, FIN=0 (not final)
        assert_eq!(&header[1..], &[0x7E, 0x20, 0x00]); // 126 marker, len=8192
        stream.close().await.unwrap();
    }

    #[tokio::test]
    async fn char_writer_sends_text_opcode() {
        let (sender, mut peer) = server_pair().await;
        let mut writer = sender.get_send_writer().await.unwrap();
        writer.write_str("hi").await.unwrap();
        writer.close().await.unwrap();

        let mut buf = [0u8; 4];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [0x81, 0x02, b'h', b'i']);
    }

    #[tokio::test]
    async fn second_stream_rejected_while_first_is_open() {
        let (sender, _peer) = server_pair().await;
        let _stream = sender.get_send_stream().await.unwrap();
        assert!(sender.get_send_writer().await.is_err());
    }
}

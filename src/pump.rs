use crate::config::OUTPUT_BUFFER_SIZE;
use crate::mask::apply_mask;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Chunked, reusable output buffer that spools header+payload bytes through
/// a fixed-size buffer before handing them to the transport (spec §4.5).
///
/// Unlike the Java NIO original this pump is modeled after, tokio's
/// `AsyncWrite::write_all` already absorbs partial-write resumption, so
/// this pump's job reduces to two things the transport can't do on its
/// own: batching small frames across calls, and chunking payloads whose
/// masked copy would otherwise have to be materialized all at once.
pub struct OutputBufferPump {
    buf: Vec<u8>,
}

impl OutputBufferPump {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(OUTPUT_BUFFER_SIZE),
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Writes one frame's header and (optionally masked) payload through
    /// the pump (spec §4.5 steps 1–3). When `batching` is false and the
    /// frame is unmasked, the pump is bypassed entirely and the two buffers
    /// are scatter-written straight to the transport, saving a copy.
    pub async fn write_frame<W: AsyncWrite + Unpin>(
        &mut self,
        transport: &mut W,
        header: &[u8],
        payload: &[u8],
        mask: Option<[u8; 4]>,
        batching: bool,
    ) -> std::io::Result<()> {
        if !batching && mask.is_none() && self.buf.is_empty() {
            transport.write_all(header).await?;
            transport.write_all(payload).await?;
            return Ok(());
        }

        self.push(transport, header).await?;

        if let Some(mask) = mask {
            let mut offset = 0;
            while offset < payload.len() {
                let space = OUTPUT_BUFFER_SIZE - self.buf.len();
                if space == 0 {
                    self.flush(transport).await?;
                    continue;
                }
                let take = space.min(payload.len() - offset);
                let start = self.buf.len();
                self.buf.extend_from_slice(&payload[offset..offset + take]);
                apply_mask(&mut self.buf[start..], mask, offset);
                offset += take;
            }
        } else {
            self.push(transport, payload).await?;
        }

        if !batching {
            self.flush(transport).await?;
        }
        Ok(())
    }

    async fn push<W: AsyncWrite + Unpin>(&mut self, transport: &mut W, mut data: &[u8]) -> std::io::Result<()> {
        while !data.is_empty() {
            let space = OUTPUT_BUFFER_SIZE - self.buf.len();
            if space == 0 {
                self.flush(transport).await?;
                continue;
            }
            let take = space.min(data.len());
            self.buf.extend_from_slice(&data[..take]);
            data = &data[take..];
        }
        Ok(())
    }

    /// Flushes any batched bytes to the transport (spec §4.11).
    pub async fn flush<W: AsyncWrite + Unpin>(&mut self, transport: &mut W) -> std::io::Result<()> {
        if !self.buf.is_empty() {
            transport.write_all(&self.buf).await?;
            self.buf.clear();
        }
        Ok(())
    }
}

impl Default for OutputBufferPump {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unmasked_unbatched_bypasses_buffer() {
        let mut out = Vec::new();
        let mut pump = OutputBufferPump::new();
        pump.write_frame(&mut out, &[0x82, 0x02], &[0xDE, 0xAD], None, false)
            .await
            .unwrap();
        assert_eq!(out, vec![0x82, 0x02, 0xDE, 0xAD]);
        assert!(!pump.has_pending());
    }

    #[tokio::test]
    async fn masked_frame_applies_mask_through_pump() {
        let mut out = Vec::new();
        let mut pump = OutputBufferPump::new();
        let mask = [0x01, 0x02, 0x03, 0x04];
        pump.write_frame(&mut out, &[0x81, 0x82, 1, 2, 3, 4], b"Hi", Some(mask), false)
            .await
            .unwrap();
        assert_eq!(out, vec![0x81, 0x82, 1, 2, 3, 4, 0x49, 0x6B]);
    }

    #[tokio::test]
    async fn batching_retains_bytes_until_flush() {
        let mut out = Vec::new();
        let mut pump = OutputBufferPump::new();
        pump.write_frame(&mut out, &[0x82, 0x01], &[0xAA], None, true)
            .await
            .unwrap();
        assert!(out.is_empty());
        assert!(pump.has_pending());
        pump.flush(&mut out).await.unwrap();
        assert_eq!(out, vec![0x82, 0x01, 0xAA]);
    }

    #[tokio::test]
    async fn large_masked_payload_chunks_through_small_buffer() {
        let mut out = Vec::new();
        let mut pump = OutputBufferPump::new();
        let mask = [0xAA, 0xBB, 0xCC, 0xDD];
        let payload = vec![0x5Au8; OUTPUT_BUFFER_SIZE * 3];
        pump.write_frame(&mut out, &[0x82, 0x7F, 0, 0, 0, 0, 0, 0, 0x60, 0], &payload, Some(mask), false)
            .await
            .unwrap();

        let mut expected = payload.clone();
        apply_mask(&mut expected, mask, 0);
        assert_eq!(&out[10..], &expected[..]);
    }
}

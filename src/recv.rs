use crate::error::Error;
use crate::frame::{Frame, OpCode, MAX_PAYLOAD_SIZE};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Reads exactly one RFC 6455 frame off `reader` and unmasks its payload
/// if masked. This is deliberately *not* a receive-path message
/// reassembler: fragment reassembly is out of scope for this crate (the
/// sender it ships never needs one). It exists so demos and tests can
/// observe what [`crate::sender::Sender`] wrote, grounded on the teacher's
/// own frame-reading loop.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Frame, Error> {
    let mut header = [0u8; 2];
    reader.read_exact(&mut header).await?;

    let final_fragment = (header[0] & 0b1000_0000) != 0;
    let opcode = OpCode::from(header[0] & 0b0000_1111)?;

    if !final_fragment && opcode.is_control() {
        return Err(Error::ControlFramesFragmented);
    }

    let masked = (header[1] & 0b1000_0000) != 0;
    let mut length = (header[1] & 0b0111_1111) as usize;

    if length == 126 {
        let mut ext = [0u8; 2];
        reader.read_exact(&mut ext).await?;
        length = u16::from_be_bytes(ext) as usize;
    } else if length == 127 {
        let mut ext = [0u8; 8];
        reader.read_exact(&mut ext).await?;
        length = u64::from_be_bytes(ext) as usize;
    }

    if length > MAX_PAYLOAD_SIZE {
        return Err(Error::MaxFrameSize);
    }

    if opcode.is_control() && length > 125 {
        return Err(Error::ControlFramePayloadSize);
    }

    let mask = if masked {
        let mut mask = [0u8; 4];
        reader.read_exact(&mut mask).await?;
        Some(mask)
    } else {
        None
    };

    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload).await?;

    if let Some(mask) = mask {
        crate::mask::apply_mask(&mut payload, mask, 0);
    }

    Ok(Frame::new(final_fragment, opcode, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WebSocketConfig;
    use crate::sender::{Role, Sender};

    #[tokio::test]
    async fn reads_back_a_masked_client_frame() {
        let (a, mut b) = tokio::io::duplex(4096);
        let sender = Sender::new(a, Role::Client, &WebSocketConfig::default());
        sender.send_binary(vec![1, 2, 3]).await.unwrap();

        let frame = read_frame(&mut b).await.unwrap();
        assert!(frame.final_fragment);
        assert_eq!(frame.opcode, OpCode::Binary);
        assert_eq!(frame.payload, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn reads_back_an_unmasked_server_frame() {
        let (a, mut b) = tokio::io::duplex(4096);
        let sender = Sender::new(a, Role::Server, &WebSocketConfig::default());
        sender.send_text("hi".to_string()).await.unwrap();

        let frame = read_frame(&mut b).await.unwrap();
        assert_eq!(frame.opcode, OpCode::Text);
        assert_eq!(frame.payload, b"hi");
    }
}

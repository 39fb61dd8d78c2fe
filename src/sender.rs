use crate::config::WebSocketConfig;
use crate::encode::{self, EncodeOutcome, EncoderEntry};
use crate::error::Error;
use crate::frame::{self, OpCode, MAX_HEADER_SIZE};
use crate::handler::{SendFuture, SendHandler, SendResult};
use crate::mask::generate_mask;
use crate::pump::OutputBufferPump;
use crate::queue::{MessagePart, PartBody, QueueState};
use crate::state::StateMachine;
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWrite;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::timeout;

/// Largest control-frame payload allowed on the wire (RFC 6455 §5.5).
const MAX_CONTROL_PAYLOAD: usize = 125;

/// Whether this endpoint masks outgoing frames. Clients must mask every
/// frame they send; servers must not (RFC 6455 §5.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

impl Role {
    fn is_masked(self) -> bool {
        matches!(self, Role::Client)
    }
}

struct TransportState<W> {
    transport: W,
    pump: OutputBufferPump,
}

struct Inner<W> {
    transport: AsyncMutex<TransportState<W>>,
    queue: AsyncMutex<QueueState>,
    state_machine: StateMachine,
    batching: AtomicBool,
    role: Role,
    send_timeout_ms: AsyncMutex<Option<u64>>,
    encoders: Vec<EncoderEntry>,
}

/// The endpoint's send side (spec §4): fragmentation engine, coordination
/// state machine, message-part queue and output-buffer pump combined behind
/// one cheaply-cloneable handle. Grounded on `split.rs::WSWriter` in the
/// teacher repo, generalized from its single `send`/`send_as_binary` pair to
/// the full state-machine-gated, queue-serialized pipeline this crate models.
pub struct Sender<W> {
    inner: Arc<Inner<W>>,
}

impl<W> Clone for Sender<W> {
    fn clone(&self) -> Self {
        Sender { inner: self.inner.clone() }
    }
}

/// §4.9 step 1's "primitive scalar with no matching encoder" rule: a
/// numeric/boolean/character value falls back to `sendString(toString(obj))`
/// rather than `NoEncoderMatched`.
fn scalar_to_string(value: &dyn Any) -> Option<String> {
    macro_rules! try_downcast {
        ($($ty:ty),+ $(,)?) => {
            $(if let Some(v) = value.downcast_ref::<$ty>() {
                return Some(v.to_string());
            })+
        };
    }
    try_downcast!(
        i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char,
    );
    None
}

impl<W: AsyncWrite + Unpin + Send + 'static> Sender<W> {
    pub fn new(transport: W, role: Role, config: &WebSocketConfig) -> Self {
        Self::with_encoders(transport, role, config, Vec::new())
    }

    pub fn with_encoders(transport: W, role: Role, config: &WebSocketConfig, encoders: Vec<EncoderEntry>) -> Self {
        Sender {
            inner: Arc::new(Inner {
                transport: AsyncMutex::new(TransportState {
                    transport,
                    pump: OutputBufferPump::new(),
                }),
                queue: AsyncMutex::new(QueueState::new()),
                state_machine: StateMachine::new(),
                batching: AtomicBool::new(config.batching_allowed),
                role,
                send_timeout_ms: AsyncMutex::new(config.blocking_send_timeout_ms),
                encoders,
            }),
        }
    }

    /// Current coordination-state-machine state (spec §4.3), mostly useful
    /// for diagnostics — sends are gated by the machine regardless of
    /// whether a caller ever inspects it.
    pub async fn state(&self) -> crate::state::SenderState {
        self.inner.state_machine.current().await
    }

    /// Whether the output-buffer pump has bytes spooled that a flush would
    /// push to the transport.
    pub async fn has_pending_output(&self) -> bool {
        self.inner.transport.lock().await.pump.has_pending()
    }

    // -- batching (spec §4.11) --------------------------------------------

    pub fn batching_allowed(&self) -> bool {
        self.inner.batching.load(Ordering::Acquire)
    }

    /// Sets the batching flag; disabling it flushes any bytes already
    /// spooled in the output buffer (spec §4.11).
    pub async fn set_batching_allowed(&self, allowed: bool) -> SendResult {
        let was = self.inner.batching.swap(allowed, Ordering::AcqRel);
        if was && !allowed {
            self.flush_batch().await?;
        }
        Ok(())
    }

    pub async fn flush_batch(&self) -> SendResult {
        let (handler, fut) = SendFuture::pair();
        self.submit(MessagePart::flush(handler)).await;
        fut.await
    }

    // -- timeout (spec §6) --------------------------------------------------

    pub async fn send_timeout_ms(&self) -> Option<u64> {
        *self.inner.send_timeout_ms.lock().await
    }

    pub async fn set_send_timeout_ms(&self, value: Option<u64>) {
        *self.inner.send_timeout_ms.lock().await = value;
    }

    async fn blocking(&self, fut: SendFuture) -> SendResult {
        let bound = *self.inner.send_timeout_ms.lock().await;
        match bound {
            Some(ms) => match timeout(std::time::Duration::from_millis(ms), fut).await {
                Ok(result) => result,
                Err(elapsed) => Err(Error::from(elapsed)),
            },
            None => fut.await,
        }
    }

    // -- full (single-frame) sends -------------------------------------------

    pub async fn send_binary(&self, data: Vec<u8>) -> SendResult {
        self.inner.state_machine.binary_start().await?;
        self.send_data_part(OpCode::Binary, data, true).await
    }

    pub async fn send_text(&self, text: String) -> SendResult {
        self.inner.state_machine.text_start().await?;
        self.send_data_part(OpCode::Text, text.into_bytes(), true).await
    }

    pub fn send_binary_with_completion(&self, data: Vec<u8>, handler: SendHandler) {
        self.spawn_full(OpCode::Binary, data, handler);
    }

    pub fn send_text_with_completion(&self, text: String, handler: SendHandler) {
        self.spawn_full(OpCode::Text, text.into_bytes(), handler);
    }

    pub fn send_binary_future(&self, data: Vec<u8>) -> SendFuture {
        let (handler, fut) = SendFuture::pair();
        self.send_binary_with_completion(data, handler);
        fut
    }

    pub fn send_text_future(&self, text: String) -> SendFuture {
        let (handler, fut) = SendFuture::pair();
        self.send_text_with_completion(text, handler);
        fut
    }

    fn spawn_full(&self, opcode: OpCode, data: Vec<u8>, handler: SendHandler) {
        let this = self.clone();
        tokio::spawn(async move {
            let start = match opcode {
                OpCode::Text => this.inner.state_machine.text_start().await,
                _ => this.inner.state_machine.binary_start().await,
            };
            if let Err(e) = start {
                handler(Err(e));
                return;
            }
            let result = this.send_data_part(opcode, data, true).await;
            handler(result);
        });
    }

    // -- partial (fragmented) sends ------------------------------------------

    pub async fn send_binary_partial(&self, data: Vec<u8>, last: bool) -> SendResult {
        self.inner.state_machine.binary_partial_start().await?;
        self.send_data_part(OpCode::Binary, data, last).await
    }

    pub async fn send_text_partial(&self, text: String, last: bool) -> SendResult {
        self.inner.state_machine.text_partial_start().await?;
        self.send_data_part(OpCode::Text, text.into_bytes(), last).await
    }

    // -- control frames (spec §4.7, bypass the state machine) ---------------

    pub async fn send_ping(&self, payload: Vec<u8>) -> SendResult {
        self.send_control(OpCode::Ping, payload).await
    }

    pub async fn send_pong(&self, payload: Vec<u8>) -> SendResult {
        self.send_control(OpCode::Pong, payload).await
    }

    async fn send_control(&self, opcode: OpCode, payload: Vec<u8>) -> SendResult {
        if payload.len() > MAX_CONTROL_PAYLOAD {
            return Err(Error::InvalidArgument(format!(
                "control frame payload of {} bytes exceeds {MAX_CONTROL_PAYLOAD}",
                payload.len()
            )));
        }
        let (handler, fut) = SendFuture::pair();
        self.submit(MessagePart::frame(opcode, payload, true, handler)).await;
        self.blocking(fut).await
    }

    /// Closes the connection: disables batching (flushing whatever was
    /// pending) and sends a close frame (spec §4.7 step "CLOSE disables
    /// batching synchronously").
    pub async fn close(&self) -> SendResult {
        self.set_batching_allowed(false).await?;
        self.send_control(OpCode::Close, Vec::new()).await
    }

    // -- stream/writer adapters (spec §4.8) ----------------------------------

    pub async fn get_send_stream(&self) -> Result<crate::adapters::ByteSendStream<W>, Error> {
        self.inner.state_machine.stream_start().await?;
        Ok(crate::adapters::ByteSendStream::new(self.clone()))
    }

    pub async fn get_send_writer(&self) -> Result<crate::adapters::CharSendWriter<W>, Error> {
        self.inner.state_machine.write_start().await?;
        Ok(crate::adapters::CharSendWriter::new(self.clone()))
    }

    // -- object dispatch (spec §4.9) -----------------------------------------

    pub async fn send_object(&self, value: &dyn Any) -> SendResult {
        match encode::dispatch(&self.inner.encoders, value) {
            Ok(EncodeOutcome::Text(s)) => self.send_text(s).await,
            Ok(EncodeOutcome::Binary(b)) => self.send_binary(b).await,
            Err(Error::NoEncoderMatched) => {
                if let Some(s) = value.downcast_ref::<String>() {
                    return self.send_text(s.clone()).await;
                }
                if let Some(s) = value.downcast_ref::<&str>() {
                    return self.send_text(s.to_string()).await;
                }
                if let Some(b) = value.downcast_ref::<Vec<u8>>() {
                    return self.send_binary(b.clone()).await;
                }
                if let Some(s) = scalar_to_string(value) {
                    return self.send_text(s).await;
                }
                Err(Error::NoEncoderMatched)
            }
            Err(e) => Err(e),
        }
    }

    // -- internal plumbing ----------------------------------------------------

    /// Submits a data part, awaits its completion, and advances the state
    /// machine on success only (spec §4.10 `StateUpdateHandler`, which wraps
    /// single-shot sends and "on OK, advances state with `complete`").
    pub(crate) async fn send_data_part(&self, opcode: OpCode, payload: Vec<u8>, last: bool) -> SendResult {
        let (handler, fut) = SendFuture::pair();
        self.submit(MessagePart::frame(opcode, payload, last, handler)).await;
        let result = self.blocking(fut).await;
        if result.is_ok() {
            self.inner.state_machine.complete(last).await?;
        }
        result
    }

    /// Enqueues a part (spec §4.4 `startMessage`): if nothing is in flight,
    /// becomes the active writer and drains synchronously; otherwise joins
    /// the FIFO and is drained once earlier parts complete.
    async fn submit(&self, part: MessagePart) {
        let mut to_process = None;
        {
            let mut q = self.inner.queue.lock().await;
            if q.in_progress {
                q.queue.push_back(part);
            } else {
                q.in_progress = true;
                to_process = Some(part);
            }
        }
        if let Some(part) = to_process {
            self.drain_from(part).await;
        }
    }

    async fn drain_from(&self, mut part: MessagePart) {
        loop {
            let result = self.write_one_part(&part.body).await;
            (part.handler)(result);

            let next = {
                let mut q = self.inner.queue.lock().await;
                q.commit_staged_flags();
                let next = q.queue.pop_front();
                if next.is_none() {
                    q.in_progress = false;
                }
                next
            };
            match next {
                Some(p) => part = p,
                None => break,
            }
        }
    }

    /// Performs the bookkeeping and actual write for one queued part (spec
    /// §4.7 `writeMessagePart`). Bookkeeping happens under the queue lock;
    /// the write itself runs after releasing it, so parts can keep queuing
    /// up behind an in-flight write without blocking on it.
    async fn write_one_part(&self, body: &PartBody) -> SendResult {
        match body {
            PartBody::Flush => {
                {
                    let mut q = self.inner.queue.lock().await;
                    if q.closed {
                        return Err(Error::ClosedDuringMessage);
                    }
                    q.next_fragmented = q.fragmented;
                    q.next_text = q.text;
                }
                let mut t = self.inner.transport.lock().await;
                let TransportState { transport, pump } = &mut *t;
                pump.flush(transport).await.map_err(Error::from)
            }
            PartBody::Frame { opcode, payload, last } => {
                let first = {
                    let mut q = self.inner.queue.lock().await;
                    if q.closed {
                        return Err(Error::ClosedDuringMessage);
                    }
                    if opcode.is_control() {
                        if *opcode == OpCode::Close {
                            q.closed = true;
                        }
                        q.next_fragmented = q.fragmented;
                        q.next_text = q.text;
                        true
                    } else {
                        let is_text = *opcode == OpCode::Text;
                        if q.fragmented {
                            if is_text != q.text {
                                return Err(Error::IllegalState(
                                    "cannot change message type mid-fragment",
                                ));
                            }
                            q.next_fragmented = !*last;
                            q.next_text = q.text;
                            false
                        } else {
                            q.next_fragmented = !*last;
                            q.next_text = is_text;
                            true
                        }
                    }
                };

                let mask = if self.inner.role.is_masked() {
                    Some(generate_mask())
                } else {
                    None
                };
                let mut header = [0u8; MAX_HEADER_SIZE];
                let n = frame::write_header(&mut header, *opcode, payload.len(), first, *last, mask);

                let batching = self.inner.batching.load(Ordering::Acquire);
                let mut t = self.inner.transport.lock().await;
                let TransportState { transport, pump } = &mut *t;
                pump.write_frame(transport, &header[..n], payload, mask, batching)
                    .await
                    .map_err(Error::from)
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WebSocketConfig;

    async fn server_over_duplex() -> (Sender<tokio::io::DuplexStream>, tokio::io::DuplexStream) {
        let (a, b) = tokio::io::duplex(4096);
        let cfg = WebSocketConfig::default();
        (Sender::new(a, Role::Server, &cfg), b)
    }

    #[tokio::test]
    async fn unmasked_server_send_round_trips_frame_bytes() {
        use tokio::io::AsyncReadExt;
        let (sender, mut peer) = server_over_duplex().await;
        sender.send_binary(vec![1, 2, 3]).await.unwrap();
        let mut buf = [0u8; 5];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [0x82, 0x03, 1, 2, 3]);
    }

    #[tokio::test]
    async fn second_full_send_is_rejected_while_partial_in_flight() {
        let (sender, _peer) = server_over_duplex().await;
        sender.send_binary_partial(vec![1], false).await.unwrap();
        assert!(sender.send_text("x".to_string()).await.is_err());
    }

    #[tokio::test]
    async fn control_frames_bypass_the_state_machine() {
        use tokio::io::AsyncReadExt;
        let (sender, mut peer) = server_over_duplex().await;
        sender.send_binary_partial(vec![1], false).await.unwrap();
        sender.send_ping(vec![9]).await.unwrap();
        let mut buf = [0u8; 3];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [0x02, 0x01, 1]);
        let mut buf2 = [0u8; 3];
        peer.read_exact(&mut buf2).await.unwrap();
        assert_eq!(buf2, [0x89, 0x01, 9]);
    }

    #[tokio::test]
    async fn batched_sends_stay_pending_until_flush() {
        use tokio::io::AsyncReadExt;
        let (sender, mut peer) = server_over_duplex().await;
        sender.set_batching_allowed(true).await.unwrap();
        sender.send_binary(vec![7]).await.unwrap();

        let mut probe = [0u8; 1];
        let poll = tokio::time::timeout(std::time::Duration::from_millis(20), peer.read(&mut probe)).await;
        assert!(poll.is_err(), "no bytes should have reached the peer before a flush");

        sender.flush_batch().await.unwrap();
        peer.read_exact(&mut probe).await.unwrap();
        assert_eq!(probe, [0x82]);
    }

    #[tokio::test]
    async fn close_disables_batching_and_flushes_pending_output() {
        use tokio::io::AsyncReadExt;
        let (sender, mut peer) = server_over_duplex().await;
        sender.set_batching_allowed(true).await.unwrap();
        sender.send_binary(vec![7]).await.unwrap();
        sender.close().await.unwrap();

        let mut buf = [0u8; 5];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [0x82, 0x01, 7, 0x88, 0x00]);
        assert!(!sender.batching_allowed());
    }

    #[tokio::test]
    async fn send_object_falls_back_to_string_without_a_registered_encoder() {
        let (sender, _peer) = server_over_duplex().await;
        let value: String = "hi".to_string();
        sender.send_object(&value).await.unwrap();
    }

    #[tokio::test]
    async fn send_object_falls_back_to_scalar_to_string() {
        use tokio::io::AsyncReadExt;
        let (sender, mut peer) = server_over_duplex().await;
        let value: i32 = 42;
        sender.send_object(&value).await.unwrap();

        let mut buf = [0u8; 4];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, &[0x81, 2, b'4', b'2']);
    }
}

use crate::frame::OpCode;
use crate::handler::SendHandler;
use std::collections::VecDeque;

/// Body of a queued message part (spec §3 `MessagePart`). `Flush` is the
/// internal, never-wire-visible opcode of spec §4.7/§9 — expressed here as
/// a Rust enum variant rather than a reserved opcode byte, since nothing
/// downstream ever needs to smuggle it through a `u8`.
pub enum PartBody {
    Frame {
        opcode: OpCode,
        payload: Vec<u8>,
        last: bool,
    },
    Flush,
}

pub struct MessagePart {
    pub body: PartBody,
    pub handler: SendHandler,
}

impl MessagePart {
    pub fn frame(opcode: OpCode, payload: Vec<u8>, last: bool, handler: SendHandler) -> Self {
        Self {
            body: PartBody::Frame { opcode, payload, last },
            handler,
        }
    }

    pub fn flush(handler: SendHandler) -> Self {
        Self {
            body: PartBody::Flush,
            handler,
        }
    }
}

/// State guarded by the endpoint's `messagePartLock` (spec §4.4): the FIFO
/// itself, the in-progress flag, fragmentation bookkeeping, and `closed`.
#[derive(Default)]
pub struct QueueState {
    pub in_progress: bool,
    pub queue: VecDeque<MessagePart>,
    pub closed: bool,
    pub fragmented: bool,
    pub text: bool,
    pub next_fragmented: bool,
    pub next_text: bool,
}

impl QueueState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commits the staged fragmentation flags (spec §4.4 step 1 of
    /// `endMessage`): the write that just completed was asynchronous, so
    /// the flags it would have set synchronously in a blocking port are
    /// staged here and committed only once the write is known to have
    /// finished.
    pub fn commit_staged_flags(&mut self) {
        self.fragmented = self.next_fragmented;
        self.text = self.next_text;
    }
}

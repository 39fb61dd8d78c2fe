use crate::error::Error;
use tokio::sync::Mutex;

/// Sender-side state machine (spec §4.3). Guards every public send entry
/// point against illegal interleavings: at most one fragmented partial
/// message in flight, no switching message type mid-fragment, no new
/// message once closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    Open,
    StreamWriting,
    WriterWriting,
    BinaryPartialWriting,
    BinaryPartialReady,
    BinaryFullWriting,
    TextPartialWriting,
    TextPartialReady,
    TextFullWriting,
}

pub struct StateMachine {
    state: Mutex<SenderState>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SenderState::Open),
        }
    }

    pub async fn current(&self) -> SenderState {
        *self.state.lock().await
    }

    pub async fn stream_start(&self) -> Result<(), Error> {
        self.transition(&[SenderState::Open], SenderState::StreamWriting, "streamStart")
            .await
    }

    pub async fn write_start(&self) -> Result<(), Error> {
        self.transition(&[SenderState::Open], SenderState::WriterWriting, "writeStart")
            .await
    }

    pub async fn binary_start(&self) -> Result<(), Error> {
        self.transition(&[SenderState::Open], SenderState::BinaryFullWriting, "binaryStart")
            .await
    }

    pub async fn text_start(&self) -> Result<(), Error> {
        self.transition(&[SenderState::Open], SenderState::TextFullWriting, "textStart")
            .await
    }

    pub async fn binary_partial_start(&self) -> Result<(), Error> {
        self.transition(
            &[SenderState::Open, SenderState::BinaryPartialReady],
            SenderState::BinaryPartialWriting,
            "binaryPartialStart",
        )
        .await
    }

    pub async fn text_partial_start(&self) -> Result<(), Error> {
        self.transition(
            &[SenderState::Open, SenderState::TextPartialReady],
            SenderState::TextPartialWriting,
            "textPartialStart",
        )
        .await
    }

    /// `complete(last)` (spec §4.3 transition table).
    pub async fn complete(&self, last: bool) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        *state = match (*state, last) {
            (
                SenderState::StreamWriting
                | SenderState::WriterWriting
                | SenderState::BinaryPartialWriting
                | SenderState::BinaryFullWriting
                | SenderState::TextPartialWriting
                | SenderState::TextFullWriting,
                true,
            ) => SenderState::Open,
            (SenderState::BinaryPartialWriting, false) => SenderState::BinaryPartialReady,
            (SenderState::TextPartialWriting, false) => SenderState::TextPartialReady,
            (s @ (SenderState::StreamWriting | SenderState::WriterWriting), false) => s,
            _ => return Err(Error::IllegalState("complete() called from an invalid state")),
        };
        Ok(())
    }

    async fn transition(
        &self,
        legal_from: &[SenderState],
        to: SenderState,
        op: &'static str,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        if !legal_from.contains(&state) {
            log::debug!("{op} rejected: illegal from state {state:?}");
            return Err(Error::IllegalState(op));
        }
        *state = to;
        Ok(())
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_binary_start_while_partial_in_flight() {
        let sm = StateMachine::new();
        sm.binary_partial_start().await.unwrap();
        assert!(sm.binary_start().await.is_err());
    }

    #[tokio::test]
    async fn rejects_text_partial_after_binary_partial_without_final() {
        let sm = StateMachine::new();
        sm.binary_partial_start().await.unwrap();
        sm.complete(false).await.unwrap();
        assert_eq!(sm.current().await, SenderState::BinaryPartialReady);
        assert!(sm.text_partial_start().await.is_err());
    }

    #[tokio::test]
    async fn full_partial_binary_cycle_returns_to_open() {
        let sm = StateMachine::new();
        sm.binary_partial_start().await.unwrap();
        sm.complete(false).await.unwrap();
        sm.binary_partial_start().await.unwrap();
        sm.complete(true).await.unwrap();
        assert_eq!(sm.current().await, SenderState::Open);
    }
}

use crate::error::Error;
use crate::sender::Sender;
use crate::stream::SocketFlowStream;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc::Receiver;
use uuid::Uuid;

pub type ID = Uuid;

pub fn generate_new_uuid() -> Uuid {
    let bytes: [u8; 16] = rand::Rng::random(&mut rand::rng());
    Uuid::new_v8(bytes)
}

/// One server-side lifecycle event (spec's out-of-scope "session
/// lifecycle" collaborator). Inbound message dispatch isn't modeled here —
/// reassembling the receive path is out of scope for this crate — so the
/// only events are a new client handing over its [`Sender`], and errors
/// encountered while accepting or handshaking a connection.
pub enum Event {
    NewClient(ID, Sender<SocketFlowStream>),
    Error(ID, Error),
}

pub struct EventStream {
    receiver: Receiver<Event>,
}

impl EventStream {
    pub fn new(receiver: Receiver<Event>) -> Self {
        Self { receiver }
    }
}

impl Stream for EventStream {
    type Item = Event;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        Pin::new(&mut this.receiver).poll_recv(cx)
    }
}

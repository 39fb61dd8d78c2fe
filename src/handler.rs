use crate::error::Error;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Outcome of a single send (spec §4.10). `Ok` carries no payload; failures
/// carry the error that would otherwise have been returned synchronously
/// had the call not been asynchronous.
pub type SendResult = Result<(), Error>;

/// A completion callback (spec §4.10 `SendHandler`): fires exactly once,
/// never blocks the pump that invokes it. Modeled as a boxed `FnOnce`
/// rather than a trait object with a named method — the contract really is
/// "one method, called once", which a closure expresses directly.
pub type SendHandler = Box<dyn FnOnce(SendResult) + Send + 'static>;

pub fn noop_handler() -> SendHandler {
    Box::new(|_| {})
}

/// Adapts a [`SendHandler`] completion into an `await`-able future (spec
/// §4.10 "future adapter"). Built on `tokio::sync::oneshot`, the idiomatic
/// single-value completion channel, rather than a latch + manual poll.
pub struct SendFuture {
    rx: oneshot::Receiver<SendResult>,
}

impl SendFuture {
    /// Creates a linked (handler, future) pair: the handler half is handed
    /// to the send path, the future half is returned to the caller.
    pub fn pair() -> (SendHandler, SendFuture) {
        let (tx, rx) = oneshot::channel();
        let handler: SendHandler = Box::new(move |result| {
            let _ = tx.send(result);
        });
        (handler, SendFuture { rx })
    }
}

impl Future for SendFuture {
    type Output = SendResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(Error::CommunicationError)),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn future_adapter_latches_result() {
        let (handler, fut) = SendFuture::pair();
        handler(Ok(()));
        assert!(fut.await.is_ok());
    }

    #[tokio::test]
    async fn future_adapter_forwards_error() {
        let (handler, fut) = SendFuture::pair();
        handler(Err(Error::IllegalState("x")));
        assert!(fut.await.is_err());
    }
}

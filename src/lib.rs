//! An async RFC 6455 WebSocket send-side implementation for the Tokio stack.
//!
//! The centerpiece is [`sender::Sender`]: given any `AsyncWrite` transport
//! it turns application-level send calls (binary, text, ping/pong, close,
//! fragmented partials, byte/char streams, or typed objects routed through
//! user encoders) into correctly framed, optionally-masked bytes, while a
//! small state machine rejects illegal call interleavings and a message-part
//! queue serializes concurrent senders without blocking them on the
//! network.
//!
//! Connection setup ([`handshake`], [`server`]) and a minimal frame reader
//! ([`recv`]) are included to make the crate runnable end-to-end, but the
//! receive path does not reassemble fragmented messages — that is out of
//! scope for this crate.

pub mod adapters;
pub mod config;
pub mod encode;
pub mod error;
pub mod event;
pub mod frame;
pub mod handler;
pub mod handshake;
mod mask;
pub mod message;
mod pump;
mod queue;
pub mod recv;
pub mod request;
pub mod sender;
pub mod server;
pub mod state;
pub mod stream;

pub use error::Error;
pub use sender::{Role, Sender};

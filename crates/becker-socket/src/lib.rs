//! Connection layer for Becker CentralControl gateways.
//!
//! [`Socket`] maintains a single websocket session to the gateway's JSON-RPC
//! service and turns the event-driven transport into a call-and-result API:
//! [`Socket::send`] transmits one typed command and waits, bounded by the
//! configured request timeout, until the reader task delivers the response
//! carrying the matching correlation id.
//!
//! The RPC service does not pipeline, so the socket keeps at most one request
//! in flight; concurrent senders queue on an internal gate. Lifecycle changes
//! are reported as [`SocketEvent`]s on the channel returned by
//! [`Socket::new`]. Reconnect policy belongs to the caller (see
//! `becker-bridge`); the socket itself never redials.

pub mod config;
pub mod error;
pub mod socket;
pub mod transport;

pub use config::SocketConfig;
pub use error::SocketError;
pub use socket::{Socket, SocketEvent};

//! Error taxonomy for socket operations.

use becker_protocol::CodecError;
use thiserror::Error;

/// Errors returned by socket operations.
///
/// Only [`SocketError::Transport`] coincides with a connection teardown;
/// every other variant leaves the session usable.
#[derive(Debug, Error)]
pub enum SocketError {
    /// A send was attempted without a live session.
    #[error("not connected")]
    NotConnected,

    /// No response arrived within the request timeout. The request id stays
    /// consumed; a late reply is dropped as stale.
    #[error("timed out waiting for response")]
    Timeout,

    /// The transport failed or was closed while the request was in flight.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response carried no `result` body.
    #[error("gateway reported an error: {0}")]
    Protocol(String),

    /// The request parameters could not be serialized.
    #[error("could not encode request")]
    Encode(#[source] CodecError),

    /// The response `result` body did not match the command's result shape.
    #[error("could not decode result")]
    Decode(#[source] CodecError),
}

//! Websocket transport to the gateway.
//!
//! Thin wrapper around `tokio-tungstenite`; everything above this module
//! works with the split halves of [`WsStream`].

use std::time::Duration;

use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::SocketError;

/// Concrete websocket stream type.
pub type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Origin header expected by stock firmware; the value itself is arbitrary
/// but the header must be present.
const ORIGIN: &str = "http://127.0.0.1:12345";

/// Subprotocol the gateway speaks. Frames are binary despite carrying text.
const SUBPROTOCOL: &str = "binary";

/// Opens a websocket to `endpoint`, bounded by `connect_timeout`.
pub(crate) async fn open(
    endpoint: &str,
    connect_timeout: Duration,
) -> Result<WsStream, SocketError> {
    let mut request = endpoint
        .into_client_request()
        .map_err(|e| SocketError::Transport(format!("invalid endpoint {endpoint}: {e}")))?;

    let headers = request.headers_mut();
    headers.insert("Origin", HeaderValue::from_static(ORIGIN));
    headers.insert("Sec-WebSocket-Protocol", HeaderValue::from_static(SUBPROTOCOL));

    let (stream, _response) = tokio::time::timeout(connect_timeout, connect_async(request))
        .await
        .map_err(|_| SocketError::Transport(format!("connect to {endpoint} timed out")))?
        .map_err(|e| SocketError::Transport(format!("connect to {endpoint} failed: {e}")))?;

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn handshake_carries_origin_and_subprotocol() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            use tokio_tungstenite::tungstenite::handshake::server::{
                ErrorResponse, Request, Response,
            };
            let ws = tokio_tungstenite::accept_hdr_async(
                stream,
                |request: &Request, mut response: Response| -> Result<Response, ErrorResponse> {
                    assert_eq!(
                        request.headers().get("Origin"),
                        Some(&HeaderValue::from_static(ORIGIN))
                    );
                    assert_eq!(
                        request.headers().get("Sec-WebSocket-Protocol"),
                        Some(&HeaderValue::from_static(SUBPROTOCOL))
                    );
                    // The client insists on the subprotocol being granted.
                    response
                        .headers_mut()
                        .insert("Sec-WebSocket-Protocol", HeaderValue::from_static(SUBPROTOCOL));
                    Ok(response)
                },
            )
            .await
            .unwrap();
            drop(ws);
        });

        let endpoint = format!("ws://127.0.0.1:{port}/jrpc");
        let mut stream = open(&endpoint, Duration::from_secs(5)).await.unwrap();
        // Drain until the server side goes away.
        while stream.next().await.is_some() {}

        server.await.unwrap();
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_error() {
        // Bind and drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let endpoint = format!("ws://127.0.0.1:{port}/jrpc");
        let err = open(&endpoint, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, SocketError::Transport(_)));
    }
}

//! Integration tests driving [`Bridge`] against a loopback fake gateway.

use std::time::Duration;

use becker_bridge::{Bridge, BridgeConfig};
use becker_protocol::GroupCommand;
use becker_socket::SocketConfig;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

type ServerWs = WebSocketStream<TcpStream>;

async fn listen() -> (TcpListener, BridgeConfig) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let mut socket = SocketConfig::new("127.0.0.1", port);
    socket.request_timeout = Duration::from_millis(500);

    let mut config = BridgeConfig::new(socket);
    config.connect_delay = Duration::ZERO;
    config.reconnect_interval = Duration::from_millis(100);
    config.refresh_interval = Duration::from_secs(30);
    (listener, config)
}

/// Accepts a client, echoing the `binary` subprotocol like the gateway does.
async fn accept(listener: &TcpListener) -> ServerWs {
    let (stream, _) = listener.accept().await.unwrap();
    tokio_tungstenite::accept_hdr_async(
        stream,
        |_request: &Request, mut response: Response| -> Result<Response, ErrorResponse> {
            response
                .headers_mut()
                .insert("Sec-WebSocket-Protocol", HeaderValue::from_static("binary"));
            Ok(response)
        },
    )
    .await
    .unwrap()
}

/// Answers every request on one session with canned gateway data until the
/// client goes away.
async fn run_gateway(mut ws: ServerWs, register_success: bool) {
    while let Some(Ok(message)) = ws.next().await {
        let data = match message {
            Message::Binary(data) => data,
            Message::Close(_) => break,
            _ => continue,
        };
        for part in data.split(|b| *b == 0u8).filter(|p| !p.is_empty()) {
            let request: Value = serde_json::from_slice(part).unwrap();
            let result = match request["method"].as_str().unwrap() {
                "rpc_client_register" => json!({ "success": register_success }),
                "systemd.info_hw_variant_read" => json!({ "variant": "cc41" }),
                "systemd.info_hw_serialno_read" => json!({ "serialno": "0042" }),
                "systemd.info_release_data_read" => {
                    json!({ "rcode": "4.1", "rdate": "20201022" })
                }
                "deviced.deviced_get_item_list" => {
                    match request["params"]["list_type"].as_str().unwrap() {
                        "receivers" => json!({ "item_list": [
                            { "id": 3, "type": "group", "device_type": "shutter", "name": "Kitchen" },
                            { "id": 4, "type": "receiver", "device_type": "shutter" },
                        ] }),
                        _ => json!({ "item_list": [ { "id": 0, "type": "group" } ] }),
                    }
                }
                "deviced.group_send_command" => json!({}),
                other => panic!("unexpected method {other}"),
            };

            let response = json!({ "id": request["id"], "result": result });
            let mut bytes = serde_json::to_vec(&response).unwrap();
            bytes.push(0);
            ws.send(Message::Binary(bytes)).await.unwrap();
        }
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn registers_polls_and_moves_groups() {
    let (listener, config) = listen().await;
    let bridge = Bridge::new(config);
    let handle = bridge.handle();
    let run = tokio::spawn(bridge.run());

    let gateway = tokio::spawn(async move {
        let ws = accept(&listener).await;
        run_gateway(ws, true).await;
    });

    // Registration, property refresh and the first poll happen on connect.
    wait_until(|| !handle.devices().is_empty()).await;

    let devices = handle.devices();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].id, 3);
    assert_eq!(devices[0].name.as_deref(), Some("Kitchen"));
    assert_eq!(handle.device(4), None); // receivers are not addressable

    let properties = handle.properties();
    assert_eq!(properties.vendor.as_deref(), Some("BECKER-Antriebe GmbH"));
    assert_eq!(properties.variant.as_deref(), Some("cc41"));
    assert_eq!(properties.serial.as_deref(), Some("0042"));
    assert_eq!(properties.firmware.as_deref(), Some("4.1-20201022"));

    handle.move_group(3, GroupCommand::Down).await.unwrap();

    handle.close();
    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("supervision loop did not stop")
        .unwrap();
    gateway.await.unwrap();
}

#[tokio::test]
async fn failed_registration_triggers_reconnect() {
    let (listener, config) = listen().await;
    let bridge = Bridge::new(config);
    let handle = bridge.handle();
    let run = tokio::spawn(bridge.run());

    let gateway = tokio::spawn(async move {
        // First session refuses the registration; the bridge must drop the
        // connection and dial again.
        let ws = accept(&listener).await;
        run_gateway(ws, false).await;

        let ws = accept(&listener).await;
        run_gateway(ws, true).await;
    });

    wait_until(|| handle.properties().serial.is_some()).await;
    assert_eq!(handle.properties().serial.as_deref(), Some("0042"));

    handle.close();
    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("supervision loop did not stop")
        .unwrap();
    gateway.await.unwrap();
}

//! Connects to a CentralControl gateway and logs the groups it reports.
//!
//! ```text
//! cargo run --example monitor -- <host> [port]
//! ```

use std::time::Duration;

use becker_bridge::{Bridge, BridgeConfig};
use becker_socket::SocketConfig;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,becker_socket=debug".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let host = args.next().ok_or("usage: monitor <host> [port]")?;
    let port = args.next().map(|p| p.parse()).transpose()?.unwrap_or(80);

    let mut config = BridgeConfig::new(SocketConfig::new(host, port));
    config.connect_delay = Duration::ZERO;

    let bridge = Bridge::new(config);
    let handle = bridge.handle();
    let run = tokio::spawn(bridge.run());

    let printer = {
        let handle = handle.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(30)).await;
                let devices = handle.devices();
                info!("{} known groups", devices.len());
                for device in &devices {
                    info!("  {device} {:?}", device.name);
                }
            }
        })
    };

    tokio::signal::ctrl_c().await?;
    handle.close();
    printer.abort();
    run.await?;
    Ok(())
}

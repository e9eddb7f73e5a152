//! Gateway supervision: connection schedule, registration, polling.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use becker_protocol::{
    Device, DeviceListType, GroupCommand, ReadDeviceList, ReadFirmwareVersion, ReadHardwareSerial,
    ReadHardwareVariant, RegisterClient,
};
use becker_socket::{Socket, SocketConfig, SocketError, SocketEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::registry::{BridgeProperties, DeviceRegistry};

/// Device vendor reported in the gateway properties.
pub const VENDOR: &str = "BECKER-Antriebe GmbH";

/// Hardware variants this bridge is known to work with.
const SUPPORTED_VARIANTS: [&str; 3] = ["cc31", "cc41", "cc51"];

/// Scheduling parameters around a [`SocketConfig`].
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub socket: SocketConfig,
    /// Delay before the first connection attempt.
    pub connect_delay: Duration,
    /// Delay before redialing after an abnormal disconnect.
    pub reconnect_interval: Duration,
    /// Period of the device-list poll, which doubles as keep-alive traffic.
    pub refresh_interval: Duration,
}

impl BridgeConfig {
    pub fn new(socket: SocketConfig) -> Self {
        Self {
            socket,
            connect_delay: Duration::from_secs(3),
            reconnect_interval: Duration::from_secs(60),
            refresh_interval: Duration::from_secs(300),
        }
    }
}

/// Supervises one gateway connection.
///
/// Created with [`Bridge::new`], observed through [`Bridge::handle`], and
/// driven by [`Bridge::run`], which owns the socket's event stream.
pub struct Bridge {
    shared: Arc<BridgeShared>,
    events: mpsc::UnboundedReceiver<SocketEvent>,
    config: BridgeConfig,
}

struct BridgeShared {
    socket: Socket,
    registry: DeviceRegistry,
    properties: Mutex<BridgeProperties>,
}

impl Bridge {
    pub fn new(config: BridgeConfig) -> Self {
        let (socket, events) = Socket::new(config.socket.clone());
        Self {
            shared: Arc::new(BridgeShared {
                socket,
                registry: DeviceRegistry::default(),
                properties: Mutex::new(BridgeProperties::default()),
            }),
            events,
            config,
        }
    }

    /// Handle for device integrations; stays valid across reconnects.
    pub fn handle(&self) -> BridgeHandle {
        BridgeHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Runs the supervision loop until the bridge is closed via its handle.
    pub async fn run(mut self) {
        tokio::time::sleep(self.config.connect_delay).await;
        self.shared.socket.connect();

        let mut refresh: Option<JoinHandle<()>> = None;
        while let Some(event) = self.events.recv().await {
            match event {
                SocketEvent::Connected => {
                    if self.shared.refresh_device_info().await {
                        let shared = Arc::clone(&self.shared);
                        let interval = self.config.refresh_interval;
                        refresh = Some(tokio::spawn(async move {
                            loop {
                                shared.refresh_devices().await;
                                tokio::time::sleep(interval).await;
                            }
                        }));
                    }
                }
                SocketEvent::Disconnected { cause } => {
                    if let Some(task) = refresh.take() {
                        task.abort();
                    }
                    match cause {
                        Some(cause) => {
                            warn!(%cause, "connection lost, scheduling reconnect");
                            tokio::time::sleep(self.config.reconnect_interval).await;
                            self.shared.socket.connect();
                        }
                        None => {
                            debug!("bridge closed");
                            break;
                        }
                    }
                }
            }
        }
    }
}

impl BridgeShared {
    /// Registers as a client and refreshes the gateway identity properties.
    /// Returns whether the session is usable.
    async fn refresh_device_info(&self) -> bool {
        debug!("refreshing device information");

        let registered = match self.socket.send(&RegisterClient::new(client_name())).await {
            Ok(registration) => registration.success,
            Err(e) => {
                debug!("registration failed: {e}");
                false
            }
        };
        if !registered {
            self.socket.fail("client registration failed");
            return false;
        }
        info!("registered with gateway");

        let mut properties = BridgeProperties {
            vendor: Some(VENDOR.into()),
            ..BridgeProperties::default()
        };

        match self.socket.send(&ReadHardwareVariant {}).await {
            Ok(result) => {
                if let Some(variant) = &result.variant {
                    if !SUPPORTED_VARIANTS.contains(&variant.as_str()) {
                        warn!(%variant, "unsupported hardware variant");
                    }
                }
                properties.variant = result.variant;
            }
            Err(e) => debug!("could not read hardware variant: {e}"),
        }

        match self.socket.send(&ReadHardwareSerial {}).await {
            Ok(result) => properties.serial = result.serialno,
            Err(e) => debug!("could not read hardware serial: {e}"),
        }

        match self.socket.send(&ReadFirmwareVersion {}).await {
            Ok(result) => properties.firmware = result.version(),
            Err(e) => debug!("could not read firmware version: {e}"),
        }

        *self.properties.lock().unwrap() = properties;
        true
    }

    /// Polls both device lists and replaces the registry when changed.
    async fn refresh_devices(&self) {
        debug!("retrieving devices");

        let mut devices: HashMap<i32, Device> = HashMap::new();
        for list_type in [DeviceListType::Receivers, DeviceListType::Groups] {
            match self.socket.send(&ReadDeviceList::new(list_type)).await {
                Ok(list) => {
                    devices.extend(
                        list.devices
                            .into_iter()
                            .filter(Device::is_group)
                            .map(|device| (device.id, device)),
                    );
                }
                Err(e) => debug!(%list_type, "could not read device list: {e}"),
            }
        }

        if self.registry.replace(devices) {
            info!(count = self.registry.len(), "devices have changed");
        }
    }
}

/// Cloneable view of the bridge for device integrations.
#[derive(Clone)]
pub struct BridgeHandle {
    shared: Arc<BridgeShared>,
}

impl BridgeHandle {
    /// Snapshot of the known groups.
    pub fn devices(&self) -> Vec<Device> {
        self.shared.registry.devices()
    }

    pub fn device(&self, id: i32) -> Option<Device> {
        self.shared.registry.get(id)
    }

    /// Gateway identity properties from the last registration.
    pub fn properties(&self) -> BridgeProperties {
        self.shared.properties.lock().unwrap().clone()
    }

    /// Sends a movement command to a group.
    pub async fn move_group(&self, id: i32, command: GroupCommand) -> Result<(), SocketError> {
        self.shared.socket.send(&command.for_group(id)).await?;
        Ok(())
    }

    /// Closes the connection and stops the supervision loop.
    pub fn close(&self) {
        self.shared.socket.close();
    }
}

/// Unique client name per registration; the gateway tracks clients by name.
fn client_name() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    format!("becker-bridge_{millis}")
}

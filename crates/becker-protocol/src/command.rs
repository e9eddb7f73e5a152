//! Typed commands understood by the CentralControl RPC service.
//!
//! Each command pairs a method name with a serializable parameter set and the
//! result shape a successful response decodes to. Building a command never
//! fails; correlation ids are assigned at send time by the connection layer.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::device::{Device, DeviceListType};
use crate::error::CodecError;

/// A request/result pair executable over the socket.
///
/// The serialized form of the implementing type becomes the `params` object
/// of the request envelope; an empty object is omitted from the wire.
/// `Display` is used for log lines and should identify the command tersely.
pub trait Command: Serialize + fmt::Display {
    /// The result type a successful response decodes to.
    type Output: DeserializeOwned;

    /// JSON-RPC method name.
    fn method(&self) -> &'static str;

    /// Decodes a response `result` body into [`Self::Output`].
    fn decode_result(&self, result: Value) -> Result<Self::Output, CodecError> {
        Ok(serde_json::from_value(result)?)
    }
}

/// Registers this client with the gateway.
///
/// Must be the first command on a fresh session; the gateway rejects
/// everything else until a registration succeeded.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterClient {
    pub name: String,
}

impl RegisterClient {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Command for RegisterClient {
    type Output = Registration;

    fn method(&self) -> &'static str {
        "rpc_client_register"
    }
}

impl fmt::Display for RegisterClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} as {}", self.method(), self.name)
    }
}

/// Whether the gateway accepted the registration.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub success: bool,
}

/// Reads the list of devices of one category attached to the gateway.
#[derive(Debug, Clone, Serialize)]
pub struct ReadDeviceList {
    pub list_type: DeviceListType,
}

impl ReadDeviceList {
    pub fn new(list_type: DeviceListType) -> Self {
        Self { list_type }
    }
}

impl Command for ReadDeviceList {
    type Output = DeviceList;

    fn method(&self) -> &'static str {
        "deviced.deviced_get_item_list"
    }
}

impl fmt::Display for ReadDeviceList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} for {}", self.method(), self.list_type)
    }
}

/// The devices read by a [`ReadDeviceList`].
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceList {
    #[serde(rename = "item_list", default)]
    pub devices: Vec<Device>,
}

/// Reads general device configuration from the gateway.
#[derive(Debug, Clone, Serialize)]
pub struct ReadDeviceInfo {}

impl Command for ReadDeviceInfo {
    type Output = DeviceInfo;

    fn method(&self) -> &'static str {
        "deviced.deviced_get_info"
    }
}

impl fmt::Display for ReadDeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceInfo {
    /// Runtime in seconds the gateway uses when closing roof windows
    /// automatically.
    #[serde(rename = "auto_roof_window_time", default = "default_roof_window_time")]
    pub auto_roof_window_time: u32,
}

fn default_roof_window_time() -> u32 {
    3
}

/// Reads the firmware version of the gateway.
#[derive(Debug, Clone, Serialize)]
pub struct ReadFirmwareVersion {}

impl Command for ReadFirmwareVersion {
    type Output = FirmwareVersion;

    fn method(&self) -> &'static str {
        "systemd.info_release_data_read"
    }
}

impl fmt::Display for ReadFirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}

/// Release code and date components of the firmware version.
#[derive(Debug, Clone, Deserialize)]
pub struct FirmwareVersion {
    #[serde(default)]
    pub rcode: Option<String>,
    #[serde(default)]
    pub rdate: Option<String>,
}

impl FirmwareVersion {
    /// Combined version string, `None` until both components are known.
    pub fn version(&self) -> Option<String> {
        match (&self.rcode, &self.rdate) {
            (Some(rcode), Some(rdate)) => Some(format!("{rcode}-{rdate}")),
            _ => None,
        }
    }
}

/// Reads the hardware serial number of the gateway.
#[derive(Debug, Clone, Serialize)]
pub struct ReadHardwareSerial {}

impl Command for ReadHardwareSerial {
    type Output = HardwareSerial;

    fn method(&self) -> &'static str {
        "systemd.info_hw_serialno_read"
    }
}

impl fmt::Display for ReadHardwareSerial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HardwareSerial {
    #[serde(default)]
    pub serialno: Option<String>,
}

/// Reads the hardware variant (cc31, cc41, cc51) of the gateway.
#[derive(Debug, Clone, Serialize)]
pub struct ReadHardwareVariant {}

impl Command for ReadHardwareVariant {
    type Output = HardwareVariant;

    fn method(&self) -> &'static str {
        "systemd.info_hw_variant_read"
    }
}

impl fmt::Display for ReadHardwareVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HardwareVariant {
    #[serde(default)]
    pub variant: Option<String>,
}

/// Sends a movement command to a group of receivers.
///
/// Built through [`GroupCommand::for_group`]; the `command`/`value` pairing
/// is part of the gateway contract and not meant to be assembled by hand.
#[derive(Debug, Clone, Serialize)]
pub struct SendGroup {
    #[serde(rename = "group_id")]
    pub id: i32,
    pub command: &'static str,
    pub value: i32,
}

impl Command for SendGroup {
    type Output = Acknowledged;

    fn method(&self) -> &'static str {
        "deviced.group_send_command"
    }
}

impl fmt::Display for SendGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.method(), self.id)
    }
}

/// Empty result body acknowledging a movement command.
#[derive(Debug, Clone, Deserialize)]
pub struct Acknowledged {}

/// Movement commands addressable to a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupCommand {
    Up,
    Stop,
    Down,
}

impl GroupCommand {
    /// Builds the [`SendGroup`] targeting `id`.
    pub fn for_group(self, id: i32) -> SendGroup {
        let (command, value) = match self {
            GroupCommand::Up => ("move", -1),
            GroupCommand::Stop => ("move", 0),
            GroupCommand::Down => ("move", 1),
        };
        SendGroup { id, command, value }
    }
}

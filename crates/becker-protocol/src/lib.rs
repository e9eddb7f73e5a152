//! Wire protocol for Becker CentralControl gateways.
//!
//! CentralControl units (cc31/cc41/cc51) expose a JSON-RPC 2.0 service over a
//! binary websocket. Each request is a UTF-8 JSON envelope followed by a
//! single NUL byte, and the gateway may batch several NUL-terminated messages
//! into one physical frame. This crate covers the data side of the protocol:
//!
//! - request/response envelopes and the framing rules (`envelope`)
//! - the typed command catalogue (`command`)
//! - device records returned by list queries (`device`)
//!
//! Correlation ids are allocated by the connection layer (`becker-socket`);
//! this crate only encodes and decodes them.

pub mod command;
pub mod device;
pub mod envelope;
pub mod error;

pub use command::{
    Acknowledged, Command, DeviceInfo, DeviceList, FirmwareVersion, GroupCommand, HardwareSerial,
    HardwareVariant, ReadDeviceInfo, ReadDeviceList, ReadFirmwareVersion, ReadHardwareSerial,
    ReadHardwareVariant, RegisterClient, Registration, SendGroup,
};
pub use device::{Device, DeviceListType};
pub use envelope::{
    decode_response, encode_request, split_frame, Response, FRAME_TERMINATOR, JSONRPC_VERSION,
};
pub use error::CodecError;

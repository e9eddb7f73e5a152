//! Device management on top of `becker-socket`.
//!
//! [`Bridge`] owns the socket lifecycle: it dials after a startup delay,
//! registers as an RPC client on every new session, refreshes gateway
//! identity properties, polls the attached device groups, and redials after
//! abnormal disconnects. [`BridgeHandle`] is the face shown to device
//! integrations: the current group registry, the gateway properties, and
//! movement commands.

pub mod bridge;
pub mod registry;

pub use bridge::{Bridge, BridgeConfig, BridgeHandle, VENDOR};
pub use registry::{BridgeProperties, DeviceRegistry};

//! Device records reported by the gateway.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One device attached to the gateway, as returned by the device-list query.
///
/// The gateway reports `"none"` placeholders and zero ids for slots it knows
/// nothing about; absent fields map to `None` here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    #[serde(default)]
    pub id: i32,
    /// Coarse category, `"group"` for addressable receiver groups.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Hardware-specific subtype such as `"shutter"` or `"venetian"`.
    #[serde(rename = "device_type", default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Device {
    /// Whether this record is an addressable group with a usable id.
    pub fn is_group(&self) -> bool {
        self.id > 0 && self.kind.as_deref() == Some("group")
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.kind.as_deref().unwrap_or("unknown"),
            self.subtype.as_deref().unwrap_or("unknown"),
            self.id
        )
    }
}

/// Device categories the gateway can enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceListType {
    Receivers,
    Groups,
}

impl fmt::Display for DeviceListType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceListType::Receivers => f.write_str("receivers"),
            DeviceListType::Groups => f.write_str("groups"),
        }
    }
}

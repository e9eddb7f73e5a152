//! Shared snapshots of gateway state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use becker_protocol::Device;

/// Identity and firmware details of the gateway, filled in after each
/// successful registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeProperties {
    pub vendor: Option<String>,
    pub variant: Option<String>,
    pub serial: Option<String>,
    pub firmware: Option<String>,
}

/// Thread-safe registry of the groups attached to the gateway.
///
/// The registry survives reconnects; it is only replaced when a poll
/// reports a different set of devices.
#[derive(Clone, Default)]
pub struct DeviceRegistry {
    inner: Arc<Mutex<HashMap<i32, Device>>>,
}

impl DeviceRegistry {
    /// Snapshot of the current devices, in no particular order.
    pub fn devices(&self) -> Vec<Device> {
        self.inner.lock().unwrap().values().cloned().collect()
    }

    pub fn get(&self, id: i32) -> Option<Device> {
        self.inner.lock().unwrap().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    /// Replaces the registry contents. Returns whether anything changed.
    pub(crate) fn replace(&self, devices: HashMap<i32, Device>) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if *inner == devices {
            false
        } else {
            *inner = devices;
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn group(id: i32, name: &str) -> Device {
        serde_json::from_value(json!({
            "id": id,
            "type": "group",
            "device_type": "shutter",
            "name": name,
        }))
        .unwrap()
    }

    #[test]
    fn replace_reports_changes_only() {
        let registry = DeviceRegistry::default();
        assert!(registry.is_empty());

        let devices: HashMap<_, _> = [(1, group(1, "a")), (2, group(2, "b"))].into();
        assert!(registry.replace(devices.clone()));
        assert_eq!(registry.len(), 2);
        assert!(!registry.replace(devices));

        assert_eq!(registry.get(1).unwrap().name.as_deref(), Some("a"));
        assert_eq!(registry.get(3), None);
    }
}

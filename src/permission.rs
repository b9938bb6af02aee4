//! # Permission Gate Module
//!
//! Capabilities the radio needs before it may scan, and the gate that is
//! asked for them. Desktop platforms grant radio access without a runtime
//! prompt, so `PlatformGate` always answers yes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    FineLocation,
    BluetoothScan,
    BluetoothConnect,
}

impl Capability {
    pub fn all() -> Vec<Capability> {
        vec![
            Capability::FineLocation,
            Capability::BluetoothScan,
            Capability::BluetoothConnect,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::FineLocation => "fine_location",
            Capability::BluetoothScan => "bluetooth_scan",
            Capability::BluetoothConnect => "bluetooth_connect",
        }
    }
}

/// Answers whether every capability in a set is granted.
///
/// Implementations may suspend (e.g. while a system prompt is shown) but
/// must eventually resolve.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    async fn request(&self, capabilities: &[Capability]) -> bool;
}

pub struct PlatformGate;

#[async_trait]
impl PermissionGate for PlatformGate {
    async fn request(&self, capabilities: &[Capability]) -> bool {
        let names: Vec<&str> = capabilities.iter().map(Capability::as_str).collect();
        log::debug!("No runtime permission gate on this platform, granting {:?}", names);
        true
    }
}

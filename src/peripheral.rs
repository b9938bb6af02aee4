//! # Peripheral Records
//!
//! Discovered devices and the per-session table that accumulates them.
//!
//! `ResultSet` is insert-only and keyed by identity: the first advertisement
//! seen for an identity wins, later ones for the same identity are dropped
//! without touching the stored name or signal strength. Iteration order is
//! first-discovery order.

use crate::error::ScanError;
use crate::radio::RawAdvertisement;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peripheral {
    /// Hardware address, unique within a session
    pub identity: String,
    pub display_name: Option<String>,
    /// dBm, as first observed
    pub signal_strength: i16,
}

impl Peripheral {
    /// List text: advertised name (or `unknown_label`) followed by the address
    pub fn display_label(&self, unknown_label: &str) -> String {
        let name = self
            .display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(unknown_label);
        format!("{} ({})", name, self.identity)
    }
}

#[derive(Debug, Default)]
pub struct ResultSet {
    records: Vec<Peripheral>,
    seen: HashSet<String>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an advertisement.
    ///
    /// Returns the new record if the identity was not seen before, `None` for
    /// a duplicate, and `MalformedEvent` if the advertisement has no identity.
    pub fn record(&mut self, raw: RawAdvertisement) -> Result<Option<&Peripheral>, ScanError> {
        let identity = raw.identity.trim();
        if identity.is_empty() {
            return Err(ScanError::MalformedEvent(
                "advertisement without an address".to_string(),
            ));
        }

        if self.seen.contains(identity) {
            return Ok(None);
        }

        let identity = identity.to_string();
        self.seen.insert(identity.clone());
        self.records.push(Peripheral {
            identity,
            display_name: raw.name,
            signal_strength: raw.rssi,
        });
        Ok(self.records.last())
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_vec(&self) -> Vec<Peripheral> {
        self.records.clone()
    }
}

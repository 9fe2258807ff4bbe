//! Device registry: advertised names mapped to friendly configuration.
//!
//! The registry is static configuration, loaded once and read-only to the
//! rest of the pipeline. Only devices listed here produce readings.

use serde::Deserialize;
use std::collections::BTreeMap;

/// A type alias for advertised-name-to-entry mappings.
pub type DeviceRegistry = BTreeMap<String, DeviceEntry>;

/// Registry entry for one configured device.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceEntry {
    /// Human-readable name, e.g. "Living Room".
    pub name: String,
    /// Optional correlation id of an associated radiator valve.
    #[serde(default)]
    pub trv_id: Option<String>,
}

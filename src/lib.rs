//! `govee-collector` library.
//!
//! The binary (`src/main.rs`) is responsible for CLI parsing, startup
//! connections and process exit codes. The core business logic lives in
//! [`crate::app`] where it can be tested deterministically with an injected
//! scanner and injected sinks.

pub mod advertisement;
pub mod app;
pub mod config;
pub mod coordinator;
pub mod decode;
pub mod mac_address;
pub mod reading;
pub mod registry;
pub mod router;
pub mod scanner;
pub mod sink;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export commonly used types at the crate root
pub use advertisement::RawAdvertisement;
pub use config::{Config, Mode};
pub use coordinator::{EnsureOutcome, KvStore, SetCoordinator, StoreError};
pub use decode::{DecodeError, apply_humidity_correction, decode_humidity, decode_temperature, read_packet};
pub use mac_address::MacAddress;
pub use reading::{Reading, SCHEMA_VERSION};
pub use registry::{DeviceEntry, DeviceRegistry};
pub use router::{RouteDecision, route};
pub use scanner::ScanError;
pub use sink::{Sink, SinkError};

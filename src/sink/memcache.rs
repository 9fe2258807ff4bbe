//! Memcached sink: latest-value cache plus shared-set bookkeeping.
//!
//! Stores the latest reading and the latest signal strength under
//! deterministic keys, then runs the set coordination so the fleet can
//! discover which receivers and devices exist. The rssi key is namespaced by
//! receiver hostname so multiple receivers' views of the same device do not
//! overwrite each other.

use super::{ConnectError, Sink, SinkError};
use crate::coordinator::{KvStore, SetCoordinator, StoreError};
use crate::reading::Reading;
use memcache::{Client, CommandError, MemcacheError};
use tracing::info;

/// Key prefix shared by all collector instances.
const NAMESPACE: &str = "govee_hygrometers";

/// Shared set of advertised device names.
pub const KNOWN_DEVICES_KEY: &str = "govee_hygrometers";

/// Shared set of receiver hostnames.
pub const KNOWN_RECEIVERS_KEY: &str = "govee_hygrometers_receivers";

/// Key of the latest reading JSON for a device.
pub fn reading_key(ble_name: &str) -> String {
    format!("{NAMESPACE}_{ble_name}")
}

/// Key of the latest signal strength for a (device, receiver) pair.
pub fn rssi_key(ble_name: &str, hostname: &str) -> String {
    format!("{NAMESPACE}_rssi_{ble_name}_{hostname}")
}

/// Memcached-backed [`KvStore`]. The client pools and reconnects internally;
/// its `add` command is the atomic create-if-absent the coordinator needs.
pub struct MemcacheStore {
    client: Client,
}

impl MemcacheStore {
    /// Connect and ping the server. Unreachable memcached at startup is
    /// fatal by design.
    pub fn connect(server: &str, port: u16) -> Result<Self, ConnectError> {
        let url = format!("memcache://{server}:{port}?timeout=5");
        let client = Client::connect(url).map_err(|e| ConnectError::Memcache(e.to_string()))?;
        client
            .version()
            .map_err(|e| ConnectError::Memcache(e.to_string()))?;
        info!(server, port, "connected to memcached");
        Ok(Self { client })
    }
}

fn backend_error(e: MemcacheError) -> StoreError {
    StoreError::Backend(e.to_string())
}

impl KvStore for MemcacheStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.client.get(key).map_err(backend_error)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.client.set(key, value, 0).map_err(backend_error)
    }

    fn add(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        match self.client.add(key, value, 0) {
            Ok(()) => Ok(true),
            Err(MemcacheError::CommandError(CommandError::KeyExists)) => Ok(false),
            Err(e) => Err(backend_error(e)),
        }
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.client.delete(key).map(|_| ()).map_err(backend_error)
    }
}

/// Cache sink; owns the store handle and the set coordination.
pub struct MemcacheSink<S: KvStore> {
    store: S,
    coordinator: SetCoordinator,
    hostname: String,
}

impl<S: KvStore> MemcacheSink<S> {
    pub fn new(store: S, hostname: impl Into<String>) -> Self {
        let hostname = hostname.into();
        Self {
            coordinator: SetCoordinator::new(hostname.clone()),
            store,
            hostname,
        }
    }
}

impl<S: KvStore> Sink for MemcacheSink<S> {
    fn name(&self) -> &'static str {
        "memcache"
    }

    fn publish(&self, reading: &Reading) -> Result<(), SinkError> {
        let payload = serde_json::to_string(reading)?;
        self.store
            .set(&reading_key(&reading.ble_name), &payload)?;
        self.store.set(
            &rssi_key(&reading.ble_name, &self.hostname),
            &reading.rssi.to_string(),
        )?;

        // Membership bookkeeping: receivers first, then devices. Contention
        // is expected and retried on a later advertisement.
        self.coordinator
            .ensure_member(&self.store, KNOWN_RECEIVERS_KEY, &self.hostname)?;
        self.coordinator
            .ensure_member(&self.store, KNOWN_DEVICES_KEY, &reading.ble_name)?;
        Ok(())
    }
}

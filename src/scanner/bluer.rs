//! BlueZ D-Bus backend for hygrometer scanning.
//!
//! This backend uses the `bluer` crate to communicate with the BlueZ daemon
//! via D-Bus. It requires the `bluetoothd` daemon to be running.

use super::{ADVERTISEMENT_CHANNEL_BUFFER_SIZE, ScanError};
use crate::advertisement::RawAdvertisement;
use crate::mac_address::MacAddress;
use bluer::monitor::{Monitor, MonitorEvent, Pattern};
use bluer::{Adapter, Address, Session};
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::debug;

impl From<bluer::Error> for ScanError {
    fn from(err: bluer::Error) -> Self {
        ScanError::Bluetooth(err.to_string())
    }
}

/// Govee manufacturer ID (little-endian bytes for pattern matching).
///
/// Bluetooth LE advertisements use little-endian byte order for manufacturer
/// IDs. This is the byte representation of 0xEC88 used for filtering
/// advertisements.
const GOVEE_MANUFACTURER_ID_BYTES: [u8; 2] = [0x88, 0xEC];

/// Govee manufacturer ID for data lookup (big-endian form).
const GOVEE_MANUFACTURER_ID: u16 = 0xEC88;

/// Bluetooth manufacturer-specific data type (AD type 0xFF)
const MANUFACTURER_DATA_TYPE: u8 = 0xff;

/// Start scanning for hygrometer advertisements over BlueZ.
///
/// Initializes the Bluetooth adapter and registers a passive monitor for the
/// Govee manufacturer id. Raw advertisement events are sent through the
/// returned channel. Runs indefinitely until interrupted.
pub async fn start_scan() -> Result<mpsc::Receiver<RawAdvertisement>, ScanError> {
    let session = Session::new().await?;
    let adapter = session.default_adapter().await?;
    adapter.set_powered(true).await?;

    let (tx, rx) = mpsc::channel(ADVERTISEMENT_CHANNEL_BUFFER_SIZE);

    let pattern = Pattern {
        data_type: MANUFACTURER_DATA_TYPE,
        start_position: 0,
        content: GOVEE_MANUFACTURER_ID_BYTES.to_vec(),
    };

    let monitor_manager = adapter.monitor().await?;
    let mut monitor_handle = monitor_manager
        .register(Monitor {
            patterns: Some(vec![pattern]),
            ..Default::default()
        })
        .await?;

    // Spawn a task that owns all Bluetooth state and runs the event loop
    tokio::spawn(async move {
        // Keep all Bluetooth state alive by moving it into this task
        let _session = session;
        let _monitor_manager = monitor_manager;

        while let Some(event) = monitor_handle.next().await {
            if let MonitorEvent::DeviceFound(device_id) = event
                && let Err(error) = process_device(&adapter, device_id.device, &tx).await
            {
                debug!(%error, "failed to read advertisement");
            }
        }
    });

    Ok(rx)
}

/// Read one discovered device's advertisement properties and forward them.
///
/// The decode contract counts offsets from the start of the manufacturer AD
/// structure value, company id included; BlueZ strips the id when building
/// its map, so it is prepended again here.
async fn process_device(
    adapter: &Adapter,
    address: Address,
    tx: &mpsc::Sender<RawAdvertisement>,
) -> Result<(), ScanError> {
    let device = adapter.device(address)?;

    let manufacturer_data = match device.manufacturer_data().await? {
        Some(data) => data,
        None => return Ok(()), // No manufacturer data available
    };

    let payload = match manufacturer_data.get(&GOVEE_MANUFACTURER_ID) {
        Some(data) => data,
        None => return Ok(()), // Not a Govee device
    };
    let mut full = GOVEE_MANUFACTURER_ID_BYTES.to_vec();
    full.extend_from_slice(payload);

    let advertisement = RawAdvertisement {
        name: device.name().await?,
        manufacturer_data: full,
        rssi: device.rssi().await?.unwrap_or(0),
        address: MacAddress::from(address),
    };
    let _ = tx.send(advertisement).await;

    Ok(())
}

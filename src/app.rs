//! Core receive loop (business logic) for `govee-collector`.
//!
//! This module is intentionally decoupled from CLI parsing, process exit
//! codes and the real sink backends so it can be tested deterministically.
//! One advertisement is handled at a time; concurrency only exists across
//! independent collector processes sharing the external store.

use crate::advertisement::RawAdvertisement;
use crate::config::Mode;
use crate::registry::DeviceRegistry;
use crate::router::{self, RouteDecision};
use crate::scanner::ScanError;
use crate::sink::{Sink, publish_all};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Errors returned by the core run loop.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Scanner abstraction to enable deterministic unit tests without Bluetooth
/// hardware.
pub trait Scanner: Send + Sync {
    fn start_scan(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<mpsc::Receiver<RawAdvertisement>, ScanError>> + Send + '_>>;
}

/// Real scanner implementation that delegates to the compiled-in backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealScanner;

impl Scanner for RealScanner {
    fn start_scan(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<mpsc::Receiver<RawAdvertisement>, ScanError>> + Send + '_>>
    {
        Box::pin(crate::scanner::start_scan())
    }
}

/// Run the receive loop until the advertisement stream closes.
///
/// Per accepted advertisement, in fixed order: decode, correct, publish to
/// every sink. Decode failures drop the advertisement and continue;
/// unregistered vendor-prefixed devices produce one advisory warning; in
/// passive mode readings are decoded and logged but no sink is invoked.
pub async fn run_loop(
    mode: Mode,
    registry: &DeviceRegistry,
    hostname: &str,
    scanner: &dyn Scanner,
    sinks: &[Box<dyn Sink>],
) -> Result<(), RunError> {
    let mut advertisements = scanner.start_scan().await?;

    while let Some(advertisement) = advertisements.recv().await {
        match router::route(&advertisement, registry) {
            RouteDecision::Ignore => {}
            RouteDecision::UnknownVendor(name) => {
                warn!(name, rssi = advertisement.rssi, "unknown device");
            }
            RouteDecision::Accept {
                advertised_name,
                entry,
            } => match router::build_reading(&advertisement, advertised_name, entry, hostname) {
                Ok(reading) => {
                    debug!(
                        ble_name = %reading.ble_name,
                        name = %reading.config_name,
                        packet = reading.packet,
                        temperature = reading.temperature,
                        humidity = reading.humidity,
                        battery = reading.battery,
                        rssi = reading.rssi,
                        "decoded reading"
                    );
                    if mode.is_active() {
                        publish_all(sinks, &reading);
                    }
                }
                Err(error) => {
                    debug!(advertised_name, %error, "dropping undecodable advertisement");
                }
            },
        }
    }

    Ok(())
}

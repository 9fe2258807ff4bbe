//! BLE advertisement source.
//!
//! The radio subsystem is an external collaborator: it pushes raw
//! advertisement events into a channel and offers no back-pressure to the
//! producer. Everything downstream (routing, decoding, publishing) is
//! testable without this module; the real backend is feature-gated behind
//! `bluer`.

#[cfg(feature = "bluer")]
pub mod bluer;

use crate::advertisement::RawAdvertisement;
use thiserror::Error;
use tokio::sync::mpsc;

/// Error type for scanner startup.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Bluetooth/adapter related error
    #[error("Bluetooth error: {0}")]
    Bluetooth(String),
    /// Backend not available (not compiled in)
    #[error("Backend '{0}' not available (not compiled in)")]
    BackendNotAvailable(String),
}

/// Channel buffer size for advertisement events.
pub const ADVERTISEMENT_CHANNEL_BUFFER_SIZE: usize = 100;

/// Start scanning for hygrometer advertisements.
///
/// Returns a receiver of raw advertisement events. Runs until the process
/// terminates.
#[cfg(feature = "bluer")]
pub async fn start_scan() -> Result<mpsc::Receiver<RawAdvertisement>, ScanError> {
    bluer::start_scan().await
}

#[cfg(not(feature = "bluer"))]
pub async fn start_scan() -> Result<mpsc::Receiver<RawAdvertisement>, ScanError> {
    Err(ScanError::BackendNotAvailable("bluer".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_error_display() {
        let err = ScanError::Bluetooth("adapter off".to_string());
        assert_eq!(format!("{}", err), "Bluetooth error: adapter off");

        let err = ScanError::BackendNotAvailable("bluer".to_string());
        assert_eq!(
            format!("{}", err),
            "Backend 'bluer' not available (not compiled in)"
        );
    }
}

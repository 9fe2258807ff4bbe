//! Decoder for the Govee hygrometer advertisement payload.
//!
//! Govee GVH50xx devices pack temperature and humidity into a single 24-bit
//! integer inside the manufacturer-specific data, followed by a battery byte.
//! The temperature uses a sign-magnitude encoding: bit 23 is a sign flag, not
//! part of the magnitude.

use thiserror::Error;

/// Sign flag for negative temperatures in the 24-bit packet integer.
pub const SIGN_BIT: u32 = 0x80_0000;

/// Error types for decoding Govee manufacturer data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Manufacturer data does not contain the packet and battery bytes.
    #[error("manufacturer data too short: {0} bytes, need at least 7")]
    TooShort(usize),
}

/// Extract the 24-bit packet integer and battery byte from manufacturer data.
///
/// Bytes 3, 4 and 5 are concatenated big-endian into the packet integer;
/// byte 6 is the battery level. Offsets count from the start of the
/// manufacturer-specific AD structure value, company id included. The battery
/// byte is taken verbatim, without range validation.
pub fn read_packet(data: &[u8]) -> Result<(u32, u8), DecodeError> {
    if data.len() < 7 {
        return Err(DecodeError::TooShort(data.len()));
    }
    let packet = (u32::from(data[3]) << 16) | (u32::from(data[4]) << 8) | u32::from(data[5]);
    Ok((packet, data[6]))
}

/// Decode the temperature in Celsius from the packet integer.
///
/// If bit 23 is set the value is negative: clear the bit, negate and divide
/// by 10000. Otherwise divide by 10000 and round to two decimal places.
pub fn decode_temperature(packet: u32) -> f64 {
    if packet & SIGN_BIT != 0 {
        -(f64::from(packet ^ SIGN_BIT) / 10000.0)
    } else {
        (f64::from(packet) / 10000.0 * 100.0).round() / 100.0
    }
}

/// Decode the relative humidity in percent from the packet integer.
///
/// Always `(packet % 1000) / 10`, independent of the sign bit.
pub fn decode_humidity(packet: u32) -> f64 {
    f64::from(packet % 1000) / 10.0
}

/// Empirical humidity correction for a known sensor firmware artifact.
///
/// When the temperature is at or below freezing and the reported humidity is
/// below 60.8%, the sensor under-reports humidity by 39.2 points. This is a
/// literal behavioral contract carried over from field observation, not a
/// derived formula. Apply exactly once, before publishing or storing.
pub fn apply_humidity_correction(temperature: f64, humidity: f64) -> f64 {
    if temperature <= 0.0 && humidity < 60.8 {
        humidity + 39.2
    } else {
        humidity
    }
}

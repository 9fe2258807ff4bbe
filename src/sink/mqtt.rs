//! MQTT sink: fleet-wide and per-device reading topics.

use super::{ConnectError, Sink, SinkError};
use crate::reading::Reading;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::time::Duration;
use tracing::{info, warn};

/// Fleet-wide topic every reading is published to.
pub const FLEET_TOPIC: &str = "govee-hygrometers/readings";

/// Per-device topic for device-scoped subscribers.
pub fn device_topic(ble_name: &str) -> String {
    format!("govee-hygrometers/{ble_name}/readings")
}

/// Outbound queue capacity for the async client.
const CLIENT_QUEUE_CAPACITY: usize = 16;

/// Publishes every reading twice: once to [`FLEET_TOPIC`], once to the
/// device-scoped topic. Duplicate delivery is part of the contract;
/// consumers deduplicate if they care.
pub struct MqttSink {
    client: AsyncClient,
}

impl MqttSink {
    /// Connect to the broker, waiting for the ConnAck before returning.
    ///
    /// An unreachable or refusing broker is a startup failure: downstream
    /// consumers assume liveness implies delivery, so running without the
    /// bus is worse than not running. After the initial handshake a
    /// background task drives the event loop and rides out reconnects.
    pub async fn connect(server: &str, port: u16, hostname: &str) -> Result<Self, ConnectError> {
        let client_id = format!("govee-collector-{hostname}");
        let mut options = MqttOptions::new(client_id, server, port);
        options.set_keep_alive(Duration::from_secs(5));

        let (client, mut event_loop) = AsyncClient::new(options, CLIENT_QUEUE_CAPACITY);

        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => break,
                Ok(_) => continue,
                Err(e) => return Err(ConnectError::Mqtt(e.to_string())),
            }
        }
        info!(server, port, "connected to MQTT broker");

        tokio::spawn(async move {
            loop {
                if let Err(error) = event_loop.poll().await {
                    warn!(%error, "mqtt event loop error, reconnecting");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        });

        Ok(Self { client })
    }
}

impl Sink for MqttSink {
    fn name(&self) -> &'static str {
        "mqtt"
    }

    fn publish(&self, reading: &Reading) -> Result<(), SinkError> {
        let payload = serde_json::to_string(reading)?;
        self.client
            .try_publish(FLEET_TOPIC, QoS::AtMostOnce, false, payload.clone())
            .map_err(|e| SinkError::Mqtt(e.to_string()))?;
        self.client
            .try_publish(
                device_topic(&reading.ble_name),
                QoS::AtMostOnce,
                false,
                payload,
            )
            .map_err(|e| SinkError::Mqtt(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_topic_is_scoped_by_advertised_name() {
        assert_eq!(
            device_topic("GVH5075_ABCD"),
            "govee-hygrometers/GVH5075_ABCD/readings"
        );
    }
}

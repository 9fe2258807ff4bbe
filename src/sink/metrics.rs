//! Prometheus gauge sink and pull-based exposition endpoint.
//!
//! Four gauge families, last-write-wins per label set, no history. The
//! registry is created once at startup and injected into the sink rather
//! than living in ambient global state.

use super::{ConnectError, Sink, SinkError};
use crate::reading::Reading;
use axum::Router;
use axum::extract::State;
use axum::routing::get;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use tokio::net::TcpListener;
use tracing::{error, info};

/// Fixed port of the metrics endpoint.
pub const METRICS_PORT: u16 = 38256;

/// The process-wide gauge registry. Cloning shares the underlying series.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    temperature: GaugeVec,
    humidity: GaugeVec,
    battery: GaugeVec,
    rssi: GaugeVec,
}

impl Metrics {
    pub fn new() -> Result<Self, ConnectError> {
        let registry = Registry::new();
        let temperature = GaugeVec::new(
            Opts::new("govee_temperature", "Reported temperature"),
            &["address", "name"],
        )
        .map_err(|e| ConnectError::Metrics(e.to_string()))?;
        let humidity = GaugeVec::new(
            Opts::new("govee_humidity", "Reported relative humidity"),
            &["address", "name"],
        )
        .map_err(|e| ConnectError::Metrics(e.to_string()))?;
        let battery = GaugeVec::new(
            Opts::new("govee_battery", "Reported battery level"),
            &["address", "name"],
        )
        .map_err(|e| ConnectError::Metrics(e.to_string()))?;
        let rssi = GaugeVec::new(
            Opts::new("govee_rssi", "Reported RSSI"),
            &["address", "name", "receiver"],
        )
        .map_err(|e| ConnectError::Metrics(e.to_string()))?;

        for gauge in [&temperature, &humidity, &battery, &rssi] {
            registry
                .register(Box::new(gauge.clone()))
                .map_err(|e| ConnectError::Metrics(e.to_string()))?;
        }

        Ok(Self {
            registry,
            temperature,
            humidity,
            battery,
            rssi,
        })
    }

    /// Render the registry in the Prometheus text format.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if encoder.encode(&self.registry.gather(), &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

/// Gauge-updating sink. Updates cannot fail once the registry exists.
pub struct MetricsSink {
    metrics: Metrics,
}

impl MetricsSink {
    pub fn new(metrics: Metrics) -> Self {
        Self { metrics }
    }
}

impl Sink for MetricsSink {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn publish(&self, reading: &Reading) -> Result<(), SinkError> {
        let address = reading.ble_address.as_str();
        let name = reading.config_name.as_str();
        let m = &self.metrics;
        m.temperature
            .with_label_values(&[address, name])
            .set(reading.temperature);
        m.humidity
            .with_label_values(&[address, name])
            .set(reading.humidity);
        m.battery
            .with_label_values(&[address, name])
            .set(f64::from(reading.battery));
        m.rssi
            .with_label_values(&[address, name, &reading.received_by])
            .set(f64::from(reading.rssi));
        Ok(())
    }
}

/// Bind and serve the `/metrics` endpoint in a background task.
///
/// Binding happens before the task is spawned, so an occupied port is a
/// startup failure rather than a silent degradation.
pub async fn serve(metrics: Metrics, port: u16) -> Result<(), ConnectError> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|e| ConnectError::Metrics(e.to_string()))?;
    info!(port, "metrics endpoint listening");

    let app = Router::new()
        .route("/metrics", get(render_metrics))
        .with_state(metrics);

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, app).await {
            error!(%error, "metrics endpoint terminated");
        }
    });

    Ok(())
}

async fn render_metrics(State(metrics): State<Metrics>) -> String {
    metrics.render()
}

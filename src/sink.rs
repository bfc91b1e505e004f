//! Measurement sinks.
//!
//! A deployment wires the driver's output channels to whatever consumes
//! them (a metrics exporter, an MQTT publisher, a plain print). Each
//! channel is independently optional; a channel with no sink is simply
//! never invoked.

use std::fmt;
use tracing::info;

type Sink = Box<dyn Fn(f64) + Send + Sync>;

/// The set of physical channels the driver can emit.
///
/// Register a sink per channel with the builder-style `on_*` methods:
///
/// ```
/// use airthings_wave_ble::MeasurementSinks;
///
/// let sinks = MeasurementSinks::new()
///     .on_radon(|bq| println!("radon: {bq} Bq/m³"))
///     .on_temperature(|c| println!("temperature: {c} °C"));
/// ```
#[derive(Default)]
pub struct MeasurementSinks {
    humidity: Option<Sink>,
    radon: Option<Sink>,
    radon_long_term: Option<Sink>,
    temperature: Option<Sink>,
    pressure: Option<Sink>,
    co2: Option<Sink>,
    tvoc: Option<Sink>,
}

impl MeasurementSinks {
    /// Create an empty sink set with no channels wired.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire the relative-humidity channel (%RH).
    pub fn on_humidity(mut self, sink: impl Fn(f64) + Send + Sync + 'static) -> Self {
        self.humidity = Some(Box::new(sink));
        self
    }

    /// Wire the short-term radon channel (Bq/m³).
    pub fn on_radon(mut self, sink: impl Fn(f64) + Send + Sync + 'static) -> Self {
        self.radon = Some(Box::new(sink));
        self
    }

    /// Wire the long-term radon channel (Bq/m³).
    pub fn on_radon_long_term(mut self, sink: impl Fn(f64) + Send + Sync + 'static) -> Self {
        self.radon_long_term = Some(Box::new(sink));
        self
    }

    /// Wire the temperature channel (°C).
    pub fn on_temperature(mut self, sink: impl Fn(f64) + Send + Sync + 'static) -> Self {
        self.temperature = Some(Box::new(sink));
        self
    }

    /// Wire the pressure channel (hPa).
    pub fn on_pressure(mut self, sink: impl Fn(f64) + Send + Sync + 'static) -> Self {
        self.pressure = Some(Box::new(sink));
        self
    }

    /// Wire the CO₂ channel (ppm).
    pub fn on_co2(mut self, sink: impl Fn(f64) + Send + Sync + 'static) -> Self {
        self.co2 = Some(Box::new(sink));
        self
    }

    /// Wire the total-VOC channel (ppb).
    pub fn on_tvoc(mut self, sink: impl Fn(f64) + Send + Sync + 'static) -> Self {
        self.tvoc = Some(Box::new(sink));
        self
    }

    pub(crate) fn publish_humidity(&self, value: f64) {
        if let Some(sink) = &self.humidity {
            sink(value);
        }
    }

    pub(crate) fn publish_radon(&self, value: f64) {
        if let Some(sink) = &self.radon {
            sink(value);
        }
    }

    pub(crate) fn publish_radon_long_term(&self, value: f64) {
        if let Some(sink) = &self.radon_long_term {
            sink(value);
        }
    }

    pub(crate) fn publish_temperature(&self, value: f64) {
        if let Some(sink) = &self.temperature {
            sink(value);
        }
    }

    pub(crate) fn publish_pressure(&self, value: f64) {
        if let Some(sink) = &self.pressure {
            sink(value);
        }
    }

    pub(crate) fn publish_co2(&self, value: f64) {
        if let Some(sink) = &self.co2 {
            sink(value);
        }
    }

    pub(crate) fn publish_tvoc(&self, value: f64) {
        if let Some(sink) = &self.tvoc {
            sink(value);
        }
    }

    /// Log which channels are wired, one line per channel.
    pub(crate) fn log_config(&self) {
        let channels: [(&str, bool); 7] = [
            ("Humidity", self.humidity.is_some()),
            ("Radon", self.radon.is_some()),
            ("Radon Long Term", self.radon_long_term.is_some()),
            ("Temperature", self.temperature.is_some()),
            ("Pressure", self.pressure.is_some()),
            ("CO2", self.co2.is_some()),
            ("TVOC", self.tvoc.is_some()),
        ];
        for (name, wired) in channels {
            info!(
                "  {}: {}",
                name,
                if wired { "configured" } else { "not configured" }
            );
        }
    }
}

impl fmt::Debug for MeasurementSinks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeasurementSinks")
            .field("humidity", &self.humidity.is_some())
            .field("radon", &self.radon.is_some())
            .field("radon_long_term", &self.radon_long_term.is_some())
            .field("temperature", &self.temperature.is_some())
            .field("pressure", &self.pressure.is_some())
            .field("co2", &self.co2.is_some())
            .field("tvoc", &self.tvoc.is_some())
            .finish()
    }
}

use crate::prelude::*;
use crate::uvr::{MeasurementKind, Readings};

use influxdb2::models::{DataPoint, FieldValue};
use influxdb2::Client;
use std::future::Future;
use std::time::Duration;

static MEASUREMENT: &str = "solar";
const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub enum ChannelData {
    Readings(Box<Snapshot>),
    Shutdown,
}

#[derive(Clone)]
pub struct Influx {
    config: ConfigWrapper,
    channels: Channels,
}

impl Influx {
    pub fn new(config: ConfigWrapper, channels: Channels) -> Self {
        Self { config, channels }
    }

    pub async fn start(&self) -> Result<()> {
        let config = self.config.influx();
        if !config.enabled() {
            info!("influx disabled, skipping");
            return Ok(());
        }

        info!("initializing influx at {}", config.url());

        let client = Client::new(config.url(), config.org(), config.token());

        self.sender(client).await
    }

    pub fn stop(&self) {
        let _ = self.channels.to_influx.send(ChannelData::Shutdown);
    }

    async fn sender(&self, client: Client) -> Result<()> {
        let mut receiver = self.channels.to_influx.subscribe();
        let bucket = self.config.influx().bucket().to_string();

        loop {
            match receiver.recv().await {
                Ok(ChannelData::Shutdown) => break,
                Ok(ChannelData::Readings(snapshot)) => {
                    let point = match Self::point(&snapshot) {
                        Ok(point) => point,
                        Err(e) => {
                            error!("failed to build influx point: {}", e);
                            continue;
                        }
                    };
                    trace!("sending to influx: {:?}", point);

                    let written = Self::with_retries(RETRY_DELAY, || {
                        client.write(&bucket, futures::stream::iter(vec![point.clone()]))
                    })
                    .await;

                    if written {
                        debug!("influx point written to {}", bucket);
                    } else {
                        error!("failed to send snapshot to influx after {} attempts", MAX_ATTEMPTS);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("influx sender lagging, skipped {} snapshots", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }

        info!("influx sender exiting");

        Ok(())
    }

    /// Runs `write` until it succeeds or `MAX_ATTEMPTS` have failed,
    /// sleeping `delay` between attempts but not after the last one.
    async fn with_retries<F, Fut, E>(delay: Duration, mut write: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<(), E>>,
        E: std::fmt::Debug,
    {
        for attempt in 1..=MAX_ATTEMPTS {
            match write().await {
                Ok(()) => return true,
                Err(err) => {
                    error!("influx push failed: {:?} (attempt {}/{})", err, attempt, MAX_ATTEMPTS);
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        false
    }

    pub fn point(snapshot: &Snapshot) -> Result<DataPoint> {
        let timestamp = snapshot
            .time
            .timestamp_nanos_opt()
            .ok_or_else(|| anyhow!("snapshot time out of range: {}", snapshot.time))?;

        let point = Self::fields(&snapshot.readings)
            .into_iter()
            .fold(
                DataPoint::builder(MEASUREMENT).tag("name", MEASUREMENT),
                |builder, (name, value)| builder.field(name, value),
            )
            .timestamp(timestamp)
            .build()?;

        Ok(point)
    }

    /// Field set for one poll cycle. Sensor fields keep the channel index
    /// across the whole frame set; unconfigured channels are left out.
    pub fn fields(readings: &Readings) -> Vec<(String, FieldValue)> {
        let mut r = Vec::new();

        for (i, sensor) in readings.sensors.iter().enumerate() {
            let prefix = match sensor.kind {
                MeasurementKind::Unconfigured => continue,
                MeasurementKind::Digital => "digital",
                MeasurementKind::Temperature => "temperature",
                MeasurementKind::RoomTemperature => "room_temperature",
                MeasurementKind::Volume => "volume",
                MeasurementKind::Radiation => "radiation",
            };
            r.push((
                format!("{}_{}", prefix, i),
                FieldValue::F64(Utils::round_reading(sensor.value)),
            ));
        }

        for (i, on) in readings.outputs.iter().enumerate() {
            r.push((format!("output_{}", i), FieldValue::Bool(*on)));
        }

        for (i, rate) in readings.rates.iter().enumerate() {
            r.push((format!("rate_{}", i), FieldValue::I64(i64::from(*rate))));
        }

        for (i, heat) in readings.heat.iter().enumerate() {
            r.push((
                format!("power_{}", i),
                FieldValue::F64(Utils::round_reading(heat.power)),
            ));
            r.push((
                format!("energy_{}", i),
                FieldValue::F64(Utils::round_reading(heat.energy)),
            ));
        }

        r
    }
}

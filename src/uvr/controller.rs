use crate::prelude::*;
use crate::error::Error;
use crate::uvr::{Mode, Readings, Session};

use {
    chrono::{DateTime, Local},
    serde::Serialize,
    std::sync::{Arc, Mutex},
    tokio::time::MissedTickBehavior,
    tokio_serial::{DataBits, Parity, SerialPort, StopBits},
};

pub type Port = Box<dyn SerialPort>;

#[derive(Clone, Debug)]
pub enum ChannelData {
    Shutdown,
}

/// One decoded poll cycle, stamped with the time it was read.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    pub time: DateTime<Local>,
    pub mode: Mode,
    pub readings: Readings,
}

#[derive(Default, Debug)]
pub struct PollStats {
    polls: u64,
    successes: u64,
    io_errors: u64,
    mode_errors: u64,
    frame_errors: u64,
    checksum_errors: u64,
    decode_errors: u64,
    connects: u64,
    connect_errors: u64,
}

impl PollStats {
    fn record(&mut self, result: &Result<Readings, Error>) {
        self.polls += 1;
        match result {
            Ok(_) => self.successes += 1,
            Err(Error::Io(_)) => self.io_errors += 1,
            Err(Error::UnknownMode(_) | Error::UnsupportedMode) => self.mode_errors += 1,
            Err(Error::UnknownFrameType(_) | Error::TruncatedFrame { .. }) => self.frame_errors += 1,
            Err(Error::ChecksumMismatch { .. }) => self.checksum_errors += 1,
            Err(Error::Decode(_)) => self.decode_errors += 1,
        }
    }

    pub fn print_summary(&self) {
        info!("Poll Statistics:");
        info!("  Connections opened: {}", self.connects);
        info!("  Connection failures: {}", self.connect_errors);
        info!("  Polls: {}", self.polls);
        info!("  Successful: {}", self.successes);
        info!("  Failed:");
        info!("    I/O errors: {}", self.io_errors);
        info!("    Mode errors: {}", self.mode_errors);
        info!("    Frame errors: {}", self.frame_errors);
        info!("    Checksum mismatches: {}", self.checksum_errors);
        info!("    Decode errors: {}", self.decode_errors);
    }
}

enum Next {
    Reconnect,
    Shutdown,
}

/// Owns the serial link to one data logger and polls it on an interval.
#[derive(Clone)]
pub struct Controller {
    config: ConfigWrapper,
    channels: Channels,
    pub stats: Arc<Mutex<PollStats>>,
}

impl Controller {
    pub fn new(config: ConfigWrapper, channels: Channels) -> Self {
        Self {
            config,
            channels,
            stats: Arc::new(Mutex::new(PollStats::default())),
        }
    }

    pub async fn start(&self) -> Result<()> {
        let config = self.config.controller();
        if !config.enabled() {
            info!("controller disabled, skipping");
            return Ok(());
        }

        let result = self.run(&config).await;

        info!("controller {}: exiting", config.device());
        self.with_stats(|s| s.print_summary());

        result
    }

    async fn run(&self, config: &config::Controller) -> Result<()> {
        let mut shutdown = self.channels.to_controller.subscribe();
        let mut failures = 0;

        loop {
            info!("controller {}: connecting at {} baud", config.device(), config.baud_rate());

            let connected = tokio::select! {
                _ = shutdown.recv() => break,
                r = Self::connect(config) => r,
            };

            match connected {
                Ok(session) => {
                    self.with_stats(|s| s.connects += 1);
                    match self.poll_loop(session, config, &mut shutdown, &mut failures).await? {
                        Next::Shutdown => break,
                        Next::Reconnect => {}
                    }
                }
                Err(e) => {
                    self.with_stats(|s| s.connect_errors += 1);
                    failures += 1;
                    warn!("controller {}: connect failed: {}", config.device(), e);
                    Self::check_failures(failures, config)?;
                }
            }

            info!(
                "controller {}: reconnecting in {}s",
                config.device(),
                config.reconnect_delay().as_secs()
            );
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = tokio::time::sleep(config.reconnect_delay()) => {}
            }
        }

        Ok(())
    }

    pub fn stop(&self) {
        let _ = self.channels.to_controller.send(ChannelData::Shutdown);
    }

    async fn connect(config: &config::Controller) -> Result<Session<Port>> {
        let device = config.device().to_string();
        let baud_rate = config.baud_rate();
        let timeout = config.read_timeout();

        tokio::task::spawn_blocking(move || -> Result<Session<Port>> {
            let port = tokio_serial::new(&device, baud_rate)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::One)
                .timeout(timeout)
                .open()
                .map_err(|e| anyhow!("failed to open {}: {}", device, e))?;

            Ok(Session::negotiate(port)?)
        })
        .await?
    }

    async fn poll_loop(
        &self,
        mut session: Session<Port>,
        config: &config::Controller,
        shutdown: &mut broadcast::Receiver<ChannelData>,
        failures: &mut u32,
    ) -> Result<Next> {
        let mut interval = tokio::time::interval(config.poll_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.recv() => return Ok(Next::Shutdown),
                _ = interval.tick() => {}
            }

            let mode = session.mode();
            let (returned, result) = tokio::task::spawn_blocking(move || {
                let result = session.poll();
                (session, result)
            })
            .await?;
            session = returned;

            self.with_stats(|s| s.record(&result));

            match result {
                Ok(readings) => {
                    *failures = 0;
                    debug!(
                        "controller {}: {} sensors, {} outputs, {} heat meters",
                        config.device(),
                        readings.sensors.len(),
                        readings.outputs.len(),
                        readings.heat.len()
                    );
                    self.publish(Snapshot {
                        time: Local::now(),
                        mode,
                        readings,
                    });
                }
                Err(e) => {
                    *failures += 1;
                    warn!("controller {}: poll failed ({} in a row): {}", config.device(), failures, e);
                    Self::check_failures(*failures, config)?;

                    if e.needs_reconnect() {
                        return Ok(Next::Reconnect);
                    }
                }
            }
        }
    }

    fn publish(&self, snapshot: Snapshot) {
        let snapshot = Box::new(snapshot);

        // sends only fail when a sink is disabled and has no receiver
        if self
            .channels
            .to_readings_cache
            .send(crate::readings_cache::ChannelData::Update(snapshot.clone()))
            .is_err()
        {
            trace!("no readings cache listening");
        }
        if self
            .channels
            .to_influx
            .send(crate::influx::ChannelData::Readings(snapshot.clone()))
            .is_err()
        {
            trace!("no influx sender listening");
        }
        if self
            .channels
            .to_datalog
            .send(crate::datalog_writer::ChannelData::Readings(snapshot))
            .is_err()
        {
            trace!("no datalog writer listening");
        }
    }

    fn check_failures(failures: u32, config: &config::Controller) -> Result<()> {
        let max = config.max_failures();
        if max > 0 && failures >= max {
            bail!("controller {}: giving up after {} consecutive failures", config.device(), failures);
        }

        Ok(())
    }

    fn with_stats<F: FnOnce(&mut PollStats)>(&self, f: F) {
        match self.stats.lock() {
            Ok(mut stats) => f(&mut stats),
            Err(e) => f(&mut e.into_inner()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;

    fn controller_config(max_failures: u32) -> config::Controller {
        let yaml = format!(
            "controller:\n  device: /dev/ttyUSB0\n  max_failures: {}\n",
            max_failures
        );
        Config::from_yaml(&yaml).unwrap().controller
    }

    #[test]
    fn stats_count_by_error_kind() {
        let mut stats = PollStats::default();

        stats.record(&Ok(Readings::default()));
        stats.record(&Err(Error::ChecksumMismatch {
            received: 1,
            calculated: 2,
        }));
        stats.record(&Err(Error::UnknownFrameType(0x42)));
        stats.record(&Err(Error::Decode(DecodeError::UndefinedMeasurementKind {
            channel: 0,
            code: 4,
        })));

        assert_eq!(stats.polls, 4);
        assert_eq!(stats.successes, 1);
        assert_eq!(stats.checksum_errors, 1);
        assert_eq!(stats.frame_errors, 1);
        assert_eq!(stats.decode_errors, 1);
        assert_eq!(stats.io_errors, 0);
    }

    #[test]
    fn gives_up_after_max_failures() {
        let config = controller_config(3);

        assert!(Controller::check_failures(2, &config).is_ok());
        assert!(Controller::check_failures(3, &config).is_err());
    }

    #[test]
    fn zero_max_failures_never_gives_up() {
        let config = controller_config(0);

        assert!(Controller::check_failures(u32::MAX, &config).is_ok());
    }

    #[tokio::test]
    async fn disabled_controller_returns_immediately() -> Result<()> {
        let yaml = "controller:\n  enabled: false\n  device: /dev/ttyUSB0\n";
        let controller = Controller::new(
            ConfigWrapper::from_config(Config::from_yaml(yaml)?),
            Channels::new(),
        );

        controller.start().await
    }

    #[tokio::test]
    async fn connect_failure_ends_start_with_stats_recorded() -> Result<()> {
        let yaml = "controller:\n  device: /nonexistent/uvr-tty\n  max_failures: 1\n";
        let controller = Controller::new(
            ConfigWrapper::from_config(Config::from_yaml(yaml)?),
            Channels::new(),
        );

        assert!(controller.start().await.is_err());

        let stats = controller.stats.lock().unwrap();
        assert_eq!(stats.connect_errors, 1);
        assert_eq!(stats.connects, 0);
        assert_eq!(stats.polls, 0);

        Ok(())
    }
}

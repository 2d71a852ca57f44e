use crate::prelude::*;
use crate::uvr::Readings;

use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug)]
pub enum ChannelData {
    Readings(Box<Snapshot>),
    Shutdown,
}

/// Appends one dlogg-style CSV line per poll cycle to a monthly file.
#[derive(Clone)]
pub struct DatalogWriter {
    config: ConfigWrapper,
    channels: Channels,
    lines_written: Arc<Mutex<u64>>,
}

impl DatalogWriter {
    pub fn new(config: ConfigWrapper, channels: Channels) -> Self {
        Self {
            config,
            channels,
            lines_written: Arc::new(Mutex::new(0)),
        }
    }

    pub async fn start(&self) -> Result<()> {
        let config = self.config.datalog();
        if !config.enabled() {
            info!("datalog disabled, skipping");
            return Ok(());
        }

        std::fs::create_dir_all(config.directory())?;
        info!("writing datalog files to {}", config.directory());

        let mut receiver = self.channels.to_datalog.subscribe();

        loop {
            match receiver.recv().await {
                Ok(ChannelData::Shutdown) => break,
                Ok(ChannelData::Readings(snapshot)) => {
                    if let Err(e) = self.write(Path::new(config.directory()), &snapshot) {
                        error!("datalog write failed: {}", e);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("datalog writer lagging, skipped {} snapshots", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }

        info!("datalog writer exiting");

        Ok(())
    }

    pub fn stop(&self) {
        let _ = self.channels.to_datalog.send(ChannelData::Shutdown);
    }

    pub fn write(&self, directory: &Path, snapshot: &Snapshot) -> Result<()> {
        let path = Self::path_for(directory, &snapshot.time);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| anyhow!("failed to open datalog file {}: {}", path.display(), e))?;

        file.write_all(Self::format_line(snapshot).as_bytes())?;
        file.flush()?;

        let mut lines_written = self
            .lines_written
            .lock()
            .map_err(|_| anyhow!("failed to lock line counter"))?;
        *lines_written += 1;
        debug!("{} lines written to {}", *lines_written, path.display());

        Ok(())
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written.lock().map(|n| *n).unwrap_or_default()
    }

    /// `E<yy><mm>.csv`, one file per month.
    pub fn path_for(directory: &Path, time: &DateTime<Local>) -> PathBuf {
        directory.join(time.format("E%y%m.csv").to_string())
    }

    pub fn format_line(snapshot: &Snapshot) -> String {
        let readings = &snapshot.readings;
        let mut line = snapshot.time.format("%d.%m.%y;%H:%M:%S;").to_string();

        for sensor in &readings.sensors {
            if sensor.is_configured() {
                let _ = write!(line, " {:.1};", sensor.value);
            } else {
                line.push_str(" ---;");
            }
        }

        // A1, A2, A6 and A7 carry a rate column, in that order
        for output in 0..12 {
            line.push_str(&Self::output(readings, output));
            match output {
                0 | 1 => line.push_str(&Self::rate(readings, output)),
                5 | 6 => line.push_str(&Self::rate(readings, output - 3)),
                _ => {}
            }
        }

        for heat in &readings.heat {
            let _ = write!(line, " {:.1};{:.1};", heat.power, heat.energy);
        }

        line.push_str(" ---; ---;\n");
        line
    }

    fn output(readings: &Readings, index: usize) -> String {
        match readings.outputs.get(index) {
            Some(on) => format!(" {};", u8::from(*on)),
            None => " ---;".to_string(),
        }
    }

    fn rate(readings: &Readings, index: usize) -> String {
        match readings.rates.get(index) {
            Some(rate) => format!("{};", rate),
            None => "---;".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uvr::{HeatMeasurement, MeasurementKind, Mode, Sensor};
    use chrono::TimeZone;

    fn snapshot() -> Snapshot {
        let sensor = |kind, value| Sensor { kind, value };

        Snapshot {
            time: Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap(),
            mode: Mode::SingleFrame,
            readings: Readings {
                sensors: vec![
                    sensor(MeasurementKind::Temperature, 53.4),
                    sensor(MeasurementKind::Unconfigured, 0.0),
                    sensor(MeasurementKind::Volume, 120.0),
                ],
                outputs: (0..15).map(|i| i % 2 == 0).collect(),
                rates: vec![1, 2, 3, 4],
                heat: vec![HeatMeasurement {
                    power: 1.5,
                    energy: 54519.1,
                }],
            },
        }
    }

    #[test]
    fn formats_dlogg_line() {
        assert_eq!(
            DatalogWriter::format_line(&snapshot()),
            "07.03.24;09:05:01; 53.4; ---; 120.0; 1;1; 0;2; 1; 0; 1; 0;3; 1;4; 0; 1; 0; 1; 0; 1.5;54519.1; ---; ---;\n"
        );
    }

    #[test]
    fn missing_outputs_and_rates_are_dashed() {
        let mut snapshot = snapshot();
        snapshot.readings.outputs.truncate(3);
        snapshot.readings.rates.truncate(1);
        snapshot.readings.heat.clear();

        let line = DatalogWriter::format_line(&snapshot);

        assert!(line.starts_with("07.03.24;09:05:01; 53.4; ---; 120.0; 1;1; 0;---; 1; ---; ---; ---;---; ---;---;"));
        assert!(line.ends_with(" ---; ---; ---; ---; ---; ---; ---;\n"));
    }

    #[test]
    fn appends_to_monthly_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let writer = DatalogWriter::new(
            ConfigWrapper::from_config(Config::from_yaml("controller:\n  device: /dev/null\n")?),
            Channels::new(),
        );

        writer.write(dir.path(), &snapshot())?;
        writer.write(dir.path(), &snapshot())?;

        let path = dir.path().join("E2403.csv");
        assert_eq!(DatalogWriter::path_for(dir.path(), &snapshot().time), path);

        let contents = std::fs::read_to_string(path)?;
        assert_eq!(contents.lines().count(), 2);
        assert_eq!(writer.lines_written(), 2);

        Ok(())
    }
}

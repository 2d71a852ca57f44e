use crate::prelude::*;
use std::sync::{Arc, Mutex};

type Reply = Arc<Mutex<Option<oneshot::Sender<Option<Snapshot>>>>>;

#[derive(Clone, Debug)]
pub enum ChannelData {
    Read(Reply),
    Update(Box<Snapshot>),
    Shutdown,
}

/// Holds the last successfully decoded poll cycle.
pub struct ReadingsCache {
    channels: Channels,
    latest: Arc<Mutex<Option<Snapshot>>>,
}

impl ReadingsCache {
    pub fn new(channels: Channels) -> Self {
        Self {
            channels,
            latest: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn start(&self) -> Result<()> {
        futures::try_join!(self.cache_getter(), self.cache_setter())?;

        Ok(())
    }

    pub fn stop(&self) {
        let _ = self.channels.read_readings_cache.send(ChannelData::Shutdown);
        let _ = self.channels.to_readings_cache.send(ChannelData::Shutdown);
    }

    // external helper method to simplify access to the cache, use like so:
    //
    //   ReadingsCache::get(&self.channels).await?;
    //
    pub async fn get(channels: &Channels) -> Result<Option<Snapshot>> {
        let (tx, rx) = oneshot::channel();
        let tx = Arc::new(Mutex::new(Some(tx)));
        channels
            .read_readings_cache
            .send(ChannelData::Read(tx))
            .map_err(|_| anyhow!("readings cache is not running"))?;

        rx.await
            .map_err(|_| anyhow!("readings cache dropped the request"))
    }

    async fn cache_getter(&self) -> Result<()> {
        let mut receiver = self.channels.read_readings_cache.subscribe();

        debug!("readings_cache getter starting");

        while let Ok(data) = receiver.recv().await {
            match data {
                ChannelData::Read(tx) => {
                    let latest = self.latest()?;
                    if let Ok(mut tx) = tx.lock() {
                        if let Some(tx) = tx.take() {
                            let _ = tx.send(latest);
                        }
                    }
                }
                ChannelData::Shutdown => break,
                _ => (),
            }
        }

        Ok(())
    }

    async fn cache_setter(&self) -> Result<()> {
        let mut receiver = self.channels.to_readings_cache.subscribe();

        debug!("readings_cache setter starting");

        while let Ok(data) = receiver.recv().await {
            match data {
                ChannelData::Update(snapshot) => {
                    *self
                        .latest
                        .lock()
                        .map_err(|_| anyhow!("readings cache lock poisoned"))? = Some(*snapshot);
                }
                ChannelData::Shutdown => break,
                _ => (),
            }
        }

        Ok(())
    }

    fn latest(&self) -> Result<Option<Snapshot>> {
        Ok(self
            .latest
            .lock()
            .map_err(|_| anyhow!("readings cache lock poisoned"))?
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uvr::{Mode, Readings};

    fn snapshot(rate: i8) -> Snapshot {
        Snapshot {
            time: chrono::Local::now(),
            mode: Mode::SingleFrame,
            readings: Readings {
                rates: vec![rate],
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn returns_latest_snapshot() -> Result<()> {
        let channels = Channels::new();
        let cache = ReadingsCache::new(channels.clone());

        let c = channels.clone();
        let test = async move {
            // let the cache tasks subscribe
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;

            assert_eq!(ReadingsCache::get(&c).await?, None);

            c.to_readings_cache
                .send(ChannelData::Update(Box::new(snapshot(3))))?;
            c.to_readings_cache
                .send(ChannelData::Update(Box::new(snapshot(7))))?;
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;

            let latest = ReadingsCache::get(&c).await?.expect("snapshot cached");
            assert_eq!(latest.readings.rates, vec![7]);

            let _ = c.read_readings_cache.send(ChannelData::Shutdown);
            let _ = c.to_readings_cache.send(ChannelData::Shutdown);
            Ok::<(), anyhow::Error>(())
        };

        futures::try_join!(cache.start(), test)?;

        Ok(())
    }
}

use crate::prelude::*;

#[derive(Debug, Clone)]
pub struct Channels {
    pub to_controller: broadcast::Sender<uvr::controller::ChannelData>,
    pub to_influx: broadcast::Sender<crate::influx::ChannelData>,
    pub to_datalog: broadcast::Sender<crate::datalog_writer::ChannelData>,
    pub to_http: broadcast::Sender<crate::http::ChannelData>,
    pub read_readings_cache: broadcast::Sender<crate::readings_cache::ChannelData>,
    pub to_readings_cache: broadcast::Sender<crate::readings_cache::ChannelData>,
}

impl Default for Channels {
    fn default() -> Self {
        Self::new()
    }
}

impl Channels {
    pub fn new() -> Self {
        Self {
            to_controller: Self::channel(),
            to_influx: Self::channel(),
            to_datalog: Self::channel(),
            to_http: Self::channel(),
            read_readings_cache: Self::channel(),
            to_readings_cache: Self::channel(),
        }
    }

    fn channel<T: Clone>() -> broadcast::Sender<T> {
        broadcast::channel(2048).0
    }
}

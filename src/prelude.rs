pub use anyhow::{anyhow, bail, Result};
pub use log::{debug, error, info, trace, warn};
pub use std::io::Write as _;
pub use tokio::sync::{broadcast, oneshot};

pub use crate::channels::Channels;
pub use crate::config::{self, Config, ConfigWrapper};
pub use crate::readings_cache::ReadingsCache;
pub use crate::uvr::{self, controller::Snapshot};
pub use crate::utils::Utils;

use std::io::{Read, Write};

use log::{debug, info};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::Serialize;

use crate::error::Error;
use crate::uvr::fields::Readings;
use crate::uvr::frame::{self, SubFrame};

/// Request byte for the module mode identification.
pub const QUERY_MODE: u8 = 0x81;

/// How the data logger is wired to the controller(s), as reported by the
/// handshake reply byte.
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive, Serialize)]
#[repr(u8)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// One controller, one sub-frame per query.
    SingleFrame = 0xA8,
    /// Two controllers, two sub-frames per query.
    DualFrame = 0xD1,
    /// CAN bus logging. Recognised but not supported.
    Bus = 0xDC,
}

/// Sends the mode identification request and classifies the reply.
pub fn negotiate_mode<C>(channel: &mut C) -> Result<Mode, Error>
where
    C: Read + Write + ?Sized,
{
    frame::write_byte(channel, QUERY_MODE)?;
    let reply = frame::read_byte(channel)?;
    debug!("mode reply 0x{:02X}", reply);

    Mode::try_from(reply).map_err(|_| Error::UnknownMode(reply))
}

/// A channel together with the mode negotiated on it.
///
/// The mode is fixed for the life of the session; open a new session after
/// reconnecting.
pub struct Session<C> {
    channel: C,
    mode: Mode,
}

impl<C> Session<C>
where
    C: Read + Write,
{
    pub fn negotiate(mut channel: C) -> Result<Self, Error> {
        let mode = negotiate_mode(&mut channel)?;
        info!("data logger reports {:?} mode", mode);

        Ok(Self { channel, mode })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn query_current_data(&mut self) -> Result<Vec<SubFrame>, Error> {
        frame::query_current_data(&mut self.channel, self.mode)
    }

    /// One complete poll cycle: query, validate and decode.
    pub fn poll(&mut self) -> Result<Readings, Error> {
        let frames = self.query_current_data()?;
        Ok(Readings::decode(&frames)?)
    }

    pub fn into_inner(self) -> C {
        self.channel
    }
}

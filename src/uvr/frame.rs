use std::io::{ErrorKind, Read, Write};

use log::{debug, trace};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::Serialize;

use crate::error::Error;
use crate::uvr::layout::{Layout, UVR1611_LAYOUT, UVR61_3_LAYOUT};
use crate::uvr::session::Mode;

/// Request byte for the current live data.
pub const QUERY_CURRENT_DATA: u8 = 0xAB;

// {{{ DeviceKind
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive, Serialize)]
#[repr(u8)]
pub enum DeviceKind {
    Uvr1611 = 0x80,
    Uvr61_3 = 0x90,
}

impl DeviceKind {
    pub fn layout(self) -> &'static Layout {
        match self {
            DeviceKind::Uvr1611 => &UVR1611_LAYOUT,
            DeviceKind::Uvr61_3 => &UVR61_3_LAYOUT,
        }
    }

    pub fn payload_len(self) -> usize {
        self.layout().payload_len
    }
} // }}}

// {{{ SubFrame
/// One controller's record: type byte plus its fixed size payload.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubFrame {
    kind: DeviceKind,
    payload: Vec<u8>,
}

impl SubFrame {
    /// Fails with `TruncatedFrame` unless `payload` has exactly the length
    /// `kind` requires.
    pub fn new(kind: DeviceKind, payload: Vec<u8>) -> Result<Self, Error> {
        if payload.len() != kind.payload_len() {
            return Err(Error::TruncatedFrame {
                expected: kind.payload_len(),
                received: payload.len(),
            });
        }

        Ok(Self { kind, payload })
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn type_byte(&self) -> u8 {
        self.kind.into()
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn layout(&self) -> &'static Layout {
        self.kind.layout()
    }
} // }}}

/// Sum of every type and payload byte, modulo 256.
pub fn calc_checksum(frames: &[SubFrame]) -> u8 {
    frames.iter().fold(0u8, |sum, frame| {
        frame
            .payload
            .iter()
            .fold(sum.wrapping_add(frame.type_byte()), |sum, b| sum.wrapping_add(*b))
    })
}

/// Asks the controller for its current data and returns the validated
/// sub-frames in the order they arrived.
pub fn query_current_data<C>(channel: &mut C, mode: Mode) -> Result<Vec<SubFrame>, Error>
where
    C: Read + Write + ?Sized,
{
    let count = match mode {
        Mode::SingleFrame => 1,
        Mode::DualFrame => 2,
        Mode::Bus => return Err(Error::UnsupportedMode),
    };

    write_byte(channel, QUERY_CURRENT_DATA)?;
    trace!("data query issued, expecting {} sub-frame(s)", count);

    let mut frames = Vec::with_capacity(count);
    for _ in 0..count {
        frames.push(read_sub_frame(channel)?);
    }

    let received = read_byte(channel)?;
    let calculated = calc_checksum(&frames);
    if received != calculated {
        return Err(Error::ChecksumMismatch {
            received,
            calculated,
        });
    }
    trace!("checksum 0x{:02X} matched", received);

    Ok(frames)
}

/// Reads one type byte and the payload it announces.
pub fn read_sub_frame<C>(channel: &mut C) -> Result<SubFrame, Error>
where
    C: Read + ?Sized,
{
    let type_byte = read_byte(channel)?;
    let kind = DeviceKind::try_from(type_byte).map_err(|_| Error::UnknownFrameType(type_byte))?;

    let mut payload = vec![0; kind.payload_len()];
    let received = read_full(channel, &mut payload)?;
    if received != payload.len() {
        return Err(Error::TruncatedFrame {
            expected: payload.len(),
            received,
        });
    }

    debug!("RX {:?} {}", kind, hex::encode(&payload));

    SubFrame::new(kind, payload)
}

pub(crate) fn write_byte<C>(channel: &mut C, byte: u8) -> Result<(), Error>
where
    C: Write + ?Sized,
{
    let written = channel.write(&[byte])?;
    if written != 1 {
        return Err(short_transfer(ErrorKind::WriteZero, "wrote", written));
    }
    channel.flush()?;

    Ok(())
}

pub(crate) fn read_byte<C>(channel: &mut C) -> Result<u8, Error>
where
    C: Read + ?Sized,
{
    let mut buf = [0u8; 1];
    let read = channel.read(&mut buf)?;
    if read != 1 {
        return Err(short_transfer(ErrorKind::UnexpectedEof, "read", read));
    }

    Ok(buf[0])
}

// Keeps reading until `buf` is full, the channel reports end of data, or a
// read times out after some data has already arrived. Returns how many bytes
// were filled; a timeout before any data arrived is an error.
fn read_full<C>(channel: &mut C, buf: &mut [u8]) -> std::io::Result<usize>
where
    C: Read + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        match channel.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == ErrorKind::TimedOut && filled > 0 => break,
            Err(e) => return Err(e),
        }
    }

    Ok(filled)
}

fn short_transfer(kind: ErrorKind, verb: &str, count: usize) -> Error {
    Error::Io(std::io::Error::new(
        kind,
        format!("{} {} bytes, expected exactly 1", verb, count),
    ))
}

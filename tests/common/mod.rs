#![allow(dead_code)]

use std::io::{self, Cursor, Read, Write};

/// In-memory serial link: replays `input` to reads and records writes.
pub struct MockChannel {
    input: Cursor<Vec<u8>>,
    pub written: Vec<u8>,
    pub refuse_writes: bool,
    pub read_error: Option<io::ErrorKind>,
}

impl MockChannel {
    pub fn new(input: Vec<u8>) -> Self {
        Self {
            input: Cursor::new(input),
            written: Vec::new(),
            refuse_writes: false,
            read_error: None,
        }
    }

    pub fn refusing_writes() -> Self {
        Self {
            refuse_writes: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn failing_reads(kind: io::ErrorKind) -> Self {
        Self {
            read_error: Some(kind),
            ..Self::new(Vec::new())
        }
    }

    pub fn remaining(&self) -> usize {
        self.input.get_ref().len() - self.input.position() as usize
    }
}

impl Read for MockChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(kind) = self.read_error {
            return Err(io::Error::new(kind, "mock read error"));
        }
        self.input.read(buf)
    }
}

impl Write for MockChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.refuse_writes {
            return Ok(0);
        }
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct Factory;

impl Factory {
    /// A live UVR1611 record: six temperatures, one volume flow sensor, all
    /// outputs off and heat meter 1 enabled.
    pub fn uvr1611_payload() -> Vec<u8> {
        vec![
            22, 34, 35, 35, 189, 34, 0, 0, 165, 33, 168, 34, 243, 33, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            0, 0, 0, 0, 0, 0, 0, 0, 48, 0, 0, 0, 128, 128, 128, 1, 0, 0, 0, 0, 71, 20, 54, 0, 0,
            1, 0, 1, 0, 1, 0, 1,
        ]
    }

    /// A UVR61-3 record: three temperatures, three unconfigured channels,
    /// outputs 1 and 3 on.
    pub fn uvr61_3_payload() -> Vec<u8> {
        let mut payload = vec![0u8; 26];
        payload[..6].copy_from_slice(&[0x2C, 0x21, 0xF4, 0x21, 0x83, 0xAF]);
        payload[12] = 0b101;
        payload
    }

    /// Wire bytes for a data reply: each sub-frame as type byte plus
    /// payload, then the checksum over all of them.
    pub fn reply(frames: &[(u8, Vec<u8>)]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for (type_byte, payload) in frames {
            bytes.push(*type_byte);
            bytes.extend_from_slice(payload);
        }
        let checksum = bytes.iter().fold(0u8, |sum, b| sum.wrapping_add(*b));
        bytes.push(checksum);
        bytes
    }

    pub fn single_reply() -> Vec<u8> {
        Self::reply(&[(0x80, Self::uvr1611_payload())])
    }

    pub fn dual_reply() -> Vec<u8> {
        Self::reply(&[
            (0x80, Self::uvr1611_payload()),
            (0x80, Self::uvr1611_payload()),
        ])
    }
}

pub fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 0.01
}

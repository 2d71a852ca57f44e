use thiserror::Error;

/// Everything that can go wrong during one negotiate/query/decode cycle.
///
/// None of these are fatal to the process; the caller decides whether to
/// retry, reconnect or give up.
#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown mode reply 0x{0:02X}")]
    UnknownMode(u8),

    #[error("controller is in CAN bus mode, which is not supported")]
    UnsupportedMode,

    #[error("unknown frame type 0x{0:02X}")]
    UnknownFrameType(u8),

    #[error("truncated frame: expected {expected} payload bytes, received {received}")]
    TruncatedFrame { expected: usize, received: usize },

    #[error("checksum mismatch: received 0x{received:02X}, calculated 0x{calculated:02X}")]
    ChecksumMismatch { received: u8, calculated: u8 },

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("sensor {channel} has undefined measurement kind {code}")]
    UndefinedMeasurementKind { channel: usize, code: u8 },

    #[error("sensor {channel} is unconfigured but carries value {value}")]
    UnconfiguredValue { channel: usize, value: f32 },

    #[error("{field} at offset {offset}..{end} lies outside the {len} byte payload")]
    FieldOutOfRange {
        field: &'static str,
        offset: usize,
        end: usize,
        len: usize,
    },
}

impl Error {
    /// Errors after which the serial link can no longer be trusted to be in
    /// step with the controller.
    pub fn needs_reconnect(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::UnknownMode(_)
                | Error::UnsupportedMode
                | Error::UnknownFrameType(_)
                | Error::TruncatedFrame { .. }
        )
    }
}

use num_enum::IntoPrimitive;
use serde::Serialize;

use crate::error::DecodeError;
use crate::uvr::codec::{self, HEAT_METER_LEN};
use crate::uvr::frame::SubFrame;

// {{{ MeasurementKind
/// Physical unit of a sensor channel, bits 4-6 of the channel's high byte.
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, Serialize)]
#[repr(u8)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementKind {
    Unconfigured = 0,
    Digital = 1,
    Temperature = 2,
    Volume = 3,
    Radiation = 6,
    RoomTemperature = 7,
}

impl MeasurementKind {
    pub fn from_code(channel: usize, code: u8) -> Result<Self, DecodeError> {
        use MeasurementKind::*;

        match code {
            0 => Ok(Unconfigured),
            1 => Ok(Digital),
            2 => Ok(Temperature),
            3 => Ok(Volume),
            6 => Ok(Radiation),
            7 => Ok(RoomTemperature),
            4 | 5 | 8..=u8::MAX => Err(DecodeError::UndefinedMeasurementKind { channel, code }),
        }
    }
} // }}}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Sensor {
    pub kind: MeasurementKind,
    pub value: f32,
}

impl Sensor {
    /// Decodes one channel pair; `channel` is only used in error reports.
    pub fn decode(channel: usize, lo: u8, hi: u8) -> Result<Self, DecodeError> {
        let kind = MeasurementKind::from_code(channel, (hi >> 4) & 0x07)?;
        let raw = codec::decode_signed_magnitude(lo, hi);

        let value = match kind {
            MeasurementKind::Unconfigured => {
                if raw != 0.0 {
                    return Err(DecodeError::UnconfiguredValue { channel, value: raw });
                }
                raw
            }
            MeasurementKind::Digital => {
                if hi & 0x80 == 0x80 {
                    1.0
                } else {
                    0.0
                }
            }
            // 0.1 °C
            MeasurementKind::Temperature | MeasurementKind::RoomTemperature => raw / 10.0,
            // 4 l/h
            MeasurementKind::Volume => raw * 4.0,
            // W/m²
            MeasurementKind::Radiation => raw,
        };

        Ok(Self { kind, value })
    }

    pub fn is_configured(&self) -> bool {
        self.kind != MeasurementKind::Unconfigured
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HeatMeasurement {
    /// kW
    pub power: f32,
    /// kWh
    pub energy: f32,
}

/// Everything decoded from one poll cycle, in frame order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Readings {
    pub sensors: Vec<Sensor>,
    pub outputs: Vec<bool>,
    pub rates: Vec<i8>,
    pub heat: Vec<HeatMeasurement>,
}

impl Readings {
    pub fn decode(frames: &[SubFrame]) -> Result<Self, DecodeError> {
        Ok(Self {
            sensors: sensors(frames)?,
            outputs: digital_outputs(frames)?,
            rates: rates(frames)?,
            heat: heat_measurements(frames)?,
        })
    }
}

pub fn sensors(frames: &[SubFrame]) -> Result<Vec<Sensor>, DecodeError> {
    let mut r = Vec::new();

    for frame in frames {
        let layout = frame.layout();
        let bytes = window(
            frame,
            "sensors",
            layout.sensors_offset,
            layout.sensor_count * 2,
        )?;

        for pair in bytes.chunks_exact(2) {
            r.push(Sensor::decode(r.len(), pair[0], pair[1])?);
        }
    }

    Ok(r)
}

pub fn digital_outputs(frames: &[SubFrame]) -> Result<Vec<bool>, DecodeError> {
    let mut r = Vec::new();

    for frame in frames {
        let layout = frame.layout();
        let bytes = window(frame, "outputs", layout.outputs_offset, layout.outputs_width)?;

        // little endian, output 1 in bit 0
        let bits = bytes
            .iter()
            .rev()
            .fold(0u32, |acc, b| (acc << 8) | u32::from(*b));

        r.extend((0..layout.output_count).map(|i| bits & (1 << i) != 0));
    }

    Ok(r)
}

pub fn rates(frames: &[SubFrame]) -> Result<Vec<i8>, DecodeError> {
    let mut r = Vec::new();

    for frame in frames {
        let layout = frame.layout();
        let bytes = window(frame, "rates", layout.rates_offset, layout.rate_count)?;

        r.extend(bytes.iter().map(|b| {
            if b & 0x80 == 0x80 {
                0 // rate control inactive
            } else {
                (b & 0x1F) as i8
            }
        }));
    }

    Ok(r)
}

pub fn heat_measurements(frames: &[SubFrame]) -> Result<Vec<HeatMeasurement>, DecodeError> {
    let mut r = Vec::new();

    for frame in frames {
        let layout = frame.layout();
        let enabled = window(frame, "heat meter enable", layout.heat_enable_offset, 1)?[0];

        for (bit, offset) in layout.heat_meter_offsets.iter().enumerate() {
            if enabled & (1 << bit) == 0 {
                continue;
            }

            let rest = frame.payload().get(*offset..).unwrap_or_default();
            let (_, (power, energy)) = codec::power_energy(rest)
                .map_err(|_| out_of_range(frame, "heat meter", *offset, HEAT_METER_LEN))?;

            r.push(HeatMeasurement { power, energy });
        }
    }

    Ok(r)
}

fn window<'a>(
    frame: &'a SubFrame,
    field: &'static str,
    offset: usize,
    len: usize,
) -> Result<&'a [u8], DecodeError> {
    frame
        .payload()
        .get(offset..offset + len)
        .ok_or_else(|| out_of_range(frame, field, offset, len))
}

fn out_of_range(frame: &SubFrame, field: &'static str, offset: usize, len: usize) -> DecodeError {
    DecodeError::FieldOutOfRange {
        field,
        offset,
        end: offset + len,
        len: frame.payload().len(),
    }
}

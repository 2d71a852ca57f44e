use nom::{bytes::complete::take, combinator::map_res, IResult};

/// Size of one packed heat meter group (power + energy).
pub const HEAT_METER_LEN: usize = 8;

/// Decodes a sensor value pair.
///
/// The low 12 bits carry the magnitude as a 16-bit two's complement value;
/// bit 7 of `hi` is the sign flag, which sign-extends through the upper
/// nibble. Bits 4-6 of `hi` (the measurement kind) are ignored here and no
/// scaling is applied.
pub fn decode_signed_magnitude(lo: u8, hi: u8) -> f32 {
    let mut raw = u16::from(lo) | (u16::from(hi & 0x0F) << 8);
    if hi & 0x80 == 0x80 {
        raw |= 0xF000;
    }

    f32::from(raw as i16)
}

/// Decodes a heat meter group into (power in kW, energy in kWh).
///
/// Layout, all little endian:
///
/// ```text
///   0      fraction of power, 1/256ths of 0.1 kW
///   1..4   whole power, 0.1 kW
///   4..6   energy, signed, 0.1 kWh
///   6..8   energy, signed, MWh
/// ```
pub fn decode_power_energy(bytes: &[u8; HEAT_METER_LEN]) -> (f32, f32) {
    let fraction = f32::from(bytes[0]);
    let whole = u32::from_le_bytes([bytes[1], bytes[2], bytes[3], 0]);
    let power = (whole as f32 + fraction / 256.0) / 10.0;

    let energy_low = f32::from(i16::from_le_bytes([bytes[4], bytes[5]])) / 10.0;
    let energy_high = f32::from(i16::from_le_bytes([bytes[6], bytes[7]])) * 1000.0;

    (power, energy_low + energy_high)
}

/// nom parser for one heat meter group; fails if fewer than eight bytes remain.
pub fn power_energy(input: &[u8]) -> IResult<&[u8], (f32, f32)> {
    map_res(take(HEAT_METER_LEN), |group: &[u8]| {
        <&[u8; HEAT_METER_LEN]>::try_from(group).map(decode_power_energy)
    })(input)
}

/// Byte offsets of every field inside one sub-frame payload.
///
/// The two controller models share nothing structurally beyond being offset
/// tables, so each gets its own table rather than a formula.
#[derive(Debug, PartialEq, Eq)]
pub struct Layout {
    pub payload_len: usize,

    // sensor channel i lives at sensors_offset + 2*i, low byte first
    pub sensors_offset: usize,
    pub sensor_count: usize,

    pub outputs_offset: usize,
    pub outputs_width: usize,
    pub output_count: usize,

    pub rates_offset: usize,
    pub rate_count: usize,

    pub heat_enable_offset: usize,
    pub heat_meter_offsets: [usize; 2],
}

/// UVR1611, frame type 0x80.
pub const UVR1611_LAYOUT: Layout = Layout {
    payload_len: 55,
    sensors_offset: 0,
    sensor_count: 16,
    outputs_offset: 32,
    outputs_width: 2,
    output_count: 15,
    rates_offset: 34,
    rate_count: 4,
    heat_enable_offset: 38,
    heat_meter_offsets: [39, 47],
};

/// UVR61-3, frame type 0x90.
///
/// Only the sensor and output positions are confirmed against real frames.
/// The rate and heat meter positions are the ones the data logger documents
/// for the UVR1611 and run past the end of this payload; decoding them yields
/// a `DecodeError::FieldOutOfRange` until the real positions are known.
pub const UVR61_3_LAYOUT: Layout = Layout {
    payload_len: 26,
    sensors_offset: 0,
    sensor_count: 6,
    outputs_offset: 12,
    outputs_width: 1,
    output_count: 3,
    rates_offset: 34,
    rate_count: 1,
    heat_enable_offset: 38,
    heat_meter_offsets: [39, 47],
};

use bitfield::bitfield;

use crate::{frame::FRAME_LENGTH_TYPE_CRC, CHANNEL_COUNT};

/// Each channel is packed into this many bits.
const CHANNEL_BITS: usize = 11;
const CHANNEL_MASK: u32 = 0x07FF;

/// The first byte of a subset payload carries the starting channel in its
/// low bits; the remaining bits already belong to the first channel.
const SUBSET_START_CHANNEL_BITS: usize = 5;
const SUBSET_START_CHANNEL_MASK: u8 = 0x1F;

/// Stores the unpacked RC channel values of a standard frame
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RcChannels(pub [u16; CHANNEL_COUNT]);

impl RcChannels {
    /// Minimum channel value seen on the wire
    pub const CHANNEL_VALUE_MIN: u16 = 172;
    /// Middle channel value
    pub const CHANNEL_VALUE_MID: u16 = 992;
    /// Max channel value seen on the wire
    pub const CHANNEL_VALUE_MAX: u16 = 1811;

    /// Payload length of a standard RC channels frame
    pub const PAYLOAD_LENGTH: usize = 22;

    /// Unpacks the 16 consecutive 11 bit fields of a standard payload.
    pub fn parse(data: &[u8; Self::PAYLOAD_LENGTH]) -> Self {
        let raw_channels = RcChannelsPacked(data);

        Self([
            raw_channels.ch0(),
            raw_channels.ch1(),
            raw_channels.ch2(),
            raw_channels.ch3(),
            raw_channels.ch4(),
            raw_channels.ch5(),
            raw_channels.ch6(),
            raw_channels.ch7(),
            raw_channels.ch8(),
            raw_channels.ch9(),
            raw_channels.ch10(),
            raw_channels.ch11(),
            raw_channels.ch12(),
            raw_channels.ch13(),
            raw_channels.ch14(),
            raw_channels.ch15(),
        ])
    }

    /// Packs the channel values back into a standard payload.
    pub fn write(&self, data: &mut [u8; Self::PAYLOAD_LENGTH]) {
        use bitfield::BitRangeMut;

        let mut raw_channels = RcChannelsPacked(&mut data[..]);
        for (i, &val) in self.0.iter().enumerate() {
            raw_channels.set_bit_range(CHANNEL_BITS * (i + 1) - 1, CHANNEL_BITS * i, val);
        }
    }
}

impl core::ops::Deref for RcChannels {
    type Target = [u16; CHANNEL_COUNT];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl core::ops::DerefMut for RcChannels {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

bitfield! {
    struct RcChannelsPacked([u8]);
    u16;
    ch0, _: 10, 0;
    ch1, _: 21, 11;
    ch2, _: 32, 22;
    ch3, _: 43, 33;
    ch4, _: 54, 44;
    ch5, _: 65, 55;
    ch6, _: 76, 66;
    ch7, _: 87, 77;
    ch8, _: 98, 88;
    ch9, _: 109, 99;
    ch10, _: 120, 110;
    ch11, _: 131, 121;
    ch12, _: 142, 132;
    ch13, _: 153, 143;
    ch14, _: 164, 154;
    ch15, _: 175, 165;
}

/// Decodes a subset channels payload into `channels`, leaving channels
/// outside the carried range at their previous values.
///
/// The payload opens with a 5 bit starting channel index; the rest is a
/// stream of 11 bit fields pulled through an accumulator, least significant
/// bits first. The channel count follows from the frame length. Returns
/// `false` without touching `channels` when the advertised count would
/// overrun the channel array or the payload itself, since the wire format
/// carries no other guard against an inconsistent length byte.
pub fn decode_subset(
    payload: &[u8],
    frame_length: u8,
    channels: &mut [u16; CHANNEL_COUNT],
) -> bool {
    let Some(&first) = payload.first() else {
        return false;
    };

    let payload_bits = (frame_length as usize)
        .saturating_sub(FRAME_LENGTH_TYPE_CRC)
        .saturating_mul(8);
    let num_channels = payload_bits.saturating_sub(SUBSET_START_CHANNEL_BITS) / CHANNEL_BITS;

    let start_channel = (first & SUBSET_START_CHANNEL_MASK) as usize;
    if start_channel + num_channels > CHANNEL_COUNT {
        return false;
    }

    let needed_bits = SUBSET_START_CHANNEL_BITS + num_channels * CHANNEL_BITS;
    if needed_bits.div_ceil(8) > payload.len() {
        return false;
    }

    let mut acc = (first >> SUBSET_START_CHANNEL_BITS) as u32;
    let mut bits_merged = 8 - SUBSET_START_CHANNEL_BITS;
    let mut read_index = 1;

    for n in 0..num_channels {
        while bits_merged < CHANNEL_BITS {
            acc |= (payload[read_index] as u32) << bits_merged;
            read_index += 1;
            bits_merged += 8;
        }
        channels[start_channel + n] = (acc & CHANNEL_MASK) as u16;
        acc >>= CHANNEL_BITS;
        bits_merged -= CHANNEL_BITS;
    }

    true
}

/// Maps a raw 11 bit channel value to the conventional pulse width range,
/// digital center 992 landing on 1500.
pub fn to_pulse(raw: u16) -> u16 {
    ((raw as i32 - RcChannels::CHANNEL_VALUE_MID as i32) * 5 / 8 + 1500) as u16
}

/// Channel value the array is filled with before the first frame arrives,
/// derived from the configured midpoint (1500 gives the digital center).
pub const fn initial_channel_value(midrc: u16) -> u16 {
    ((16 * midrc as i32) / 10 - 1408) as u16
}

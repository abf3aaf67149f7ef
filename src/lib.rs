//! This crate provides a `no-std` CRSF serial receiver.
//!
//! CRSF is a half-duplex, single wire uart protocol: the transmitter module
//! sends one frame every few milliseconds and the receiver replies with
//! telemetry between two frames. 420000 baud, not inverted, 8 data bits,
//! 1 stop bit, max frame size 64 bytes. Every frame has the structure
//! `[device address][frame length][type][payload][crc]`, where the length
//! byte counts type, payload and crc.
//!
//! The [`CrsfReceiver`] reassembles frames one byte at a time from the
//! receive interrupt (or whatever byte source the target offers), validates
//! them and keeps the latest RC channel values available for the flight
//! loop:
//!
//! ```rust
//! use crsf_rx::{CrsfReceiver, FrameStatus, RxConfig, SerialLink};
//!
//! struct Wire;
//! impl SerialLink for Wire {
//!     fn write(&mut self, _data: &[u8]) {}
//!     fn set_baud_rate(&mut self, _baud: u32) {}
//! }
//!
//! let mut rx = CrsfReceiver::new(RxConfig::default(), Wire);
//!
//! // An RC channels frame with all 16 channels at zero.
//! let mut frame = [0u8; 26];
//! frame[0] = 0xC8; // flight controller address
//! frame[1] = 24;
//! frame[2] = 0x16; // RC_CHANNELS_PACKED
//! frame[25] = 239; // crc
//!
//! for (i, &byte) in frame.iter().enumerate() {
//!     rx.feed(byte, i as u32 * 21, &mut ());
//! }
//!
//! assert_eq!(rx.frame_status(), FrameStatus::Complete);
//! assert_eq!(rx.read_channel(0), 880);
//! ```

#![no_std]

mod address;
pub use address::*;

mod typ;
pub use typ::*;

mod frame;
pub use frame::*;

mod assembler;
pub use assembler::*;

mod channels;
pub use channels::*;

mod stats;
pub use stats::*;

mod telemetry;
pub use telemetry::*;

mod serial;
pub use serial::*;

mod receiver;
pub use receiver::*;

mod util;

/// Maximum size of a frame on the wire.
pub const MAX_FRAME_LEN: usize = 64;

/// Number of RC channels carried by the protocol.
pub const CHANNEL_COUNT: usize = 16;

/// Default (and fallback) baud rate.
pub const CRSF_BAUDRATE: u32 = 420_000;

/// Fastest interval between two frames from the transmitter, 150 Hz.
pub const TIME_BETWEEN_FRAMES_US: u32 = 6667;

/// Frame integrity crc, over `[type..payload]`.
pub(crate) const CRC8: crc::Crc<u8> = crc::Crc::<u8>::new(&crc::CRC_8_DVB_S2);

/// Command frames carry a second crc with a distinct polynomial, layered
/// inside the outer one. It covers `[type..payload]` minus its own byte.
const CRC_8_CMD_ALG: crc::Algorithm<u8> = crc::Algorithm {
    width: 8,
    poly: 0xBA,
    init: 0x00,
    refin: false,
    refout: false,
    xorout: 0x00,
    check: 0x20,
    residue: 0x00,
};

pub(crate) const CRC8_CMD: crc::Crc<u8> = crc::Crc::<u8>::new(&CRC_8_CMD_ALG);

use snafu::Snafu;

use crate::MAX_FRAME_LEN;

/// Number of bytes of the address and length fields preceding the type byte.
pub(crate) const FRAME_LENGTH_ADDRESS: usize = 1;
pub(crate) const FRAME_LENGTH_FRAMELENGTH: usize = 1;

/// The length byte counts the type and crc bytes on top of the payload.
pub(crate) const FRAME_LENGTH_TYPE_CRC: usize = 2;

/// Enum of frame level errors.
#[non_exhaustive]
#[derive(Debug, PartialEq, Snafu)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    #[snafu(display("Crc checksum mismatch: expected {expected:#04x}, got {actual:#04x}"))]
    ChecksumMismatch { expected: u8, actual: u8 },
    #[snafu(display("Frame of {len} bytes does not fit the {MAX_FRAME_LEN} byte buffer"))]
    BufferOverrun { len: usize },
}

/// Represents a raw frame as received on the wire, after crc validation.
///
/// Byte 0 is the device address the frame was sent to, byte 1 the frame
/// length, byte 2 the type; the crc closes the frame.
#[derive(Clone, Copy, Debug)]
pub struct RawFrame {
    pub(crate) buf: [u8; MAX_FRAME_LEN],
    pub(crate) len: usize,
}

impl RawFrame {
    pub(crate) const fn empty() -> RawFrame {
        RawFrame {
            buf: [0u8; MAX_FRAME_LEN],
            len: 0,
        }
    }

    /// Create a new RawFrame from the given slice. The slice must be
    /// at most `MAX_FRAME_LEN` bytes long.
    pub fn new(slice: &[u8]) -> Result<RawFrame, FrameError> {
        let mut frame = RawFrame {
            buf: [0u8; MAX_FRAME_LEN],
            len: slice.len(),
        };

        frame
            .buf
            .get_mut(..slice.len())
            .ok_or(FrameError::BufferOverrun { len: slice.len() })?
            .copy_from_slice(slice);

        Ok(frame)
    }

    /// Get the slice of the raw frame's buffer
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len.min(MAX_FRAME_LEN)]
    }

    /// Get the device address the frame was sent to
    pub fn device_address(&self) -> u8 {
        self.buf[0]
    }

    /// Get the value of the frame length field
    pub fn frame_length(&self) -> u8 {
        self.buf[1]
    }

    /// Get the raw frame type byte
    pub fn frame_type(&self) -> u8 {
        self.buf[2]
    }

    /// Get the payload section of the raw frame
    pub fn payload(&self) -> Option<&[u8]> {
        match self.as_slice() {
            // Skip the [addr], [len], [type] and [crc] bytes
            [_, _, _, payload @ .., _] => Some(payload),
            _ => None,
        }
    }

    /// Get the payload of an extended frame, minus the destination and
    /// origin bytes
    pub fn ext_payload(&self) -> Option<&[u8]> {
        match self.as_slice() {
            // Additionally skip the [dst] and [src] bytes
            [_, _, _, _, _, payload @ .., _] => Some(payload),
            _ => None,
        }
    }
}

use crate::{
    frame::{FRAME_LENGTH_ADDRESS, FRAME_LENGTH_FRAMELENGTH},
    FrameError, CRC8, MAX_FRAME_LEN,
};

/// A character must arrive within this long of the frame start to still
/// belong to that frame. 700 us on the wire plus 400 us for a potential
/// ad-hoc request.
pub const FRAME_DEADLINE_US: u32 = 1100;

/// Until the length byte has been received the frame is assumed to be this
/// long, so a completion check never fires before the length is known.
const MIN_FRAME_LEN: usize = 5;

/// Byte level state machine reassembling frames from the receive stream.
///
/// There is no sync byte to scan for: the wire is quiet between frames, so
/// a byte arriving after [`FRAME_DEADLINE_US`] is taken as the start of a
/// new frame. Resynchronization after noise therefore happens by timeout,
/// never by content.
///
/// +---------------------+  length known  +--------------+
/// | AWAITING_FIRST_BYTE |--------------->| ACCUMULATING |
/// +---------------------+                +--------------+
///           ^                                   |
///           |   frame complete / deadline hit   |
///           +-----------------------------------+
///
pub struct FrameAssembler {
    buf: [u8; MAX_FRAME_LEN],
    position: usize,
    frame_start_us: u32,
}

impl FrameAssembler {
    /// Creates a new `FrameAssembler`.
    pub const fn new() -> Self {
        Self {
            buf: [0; MAX_FRAME_LEN],
            position: 0,
            frame_start_us: 0,
        }
    }

    /// Resets the assembler to the start of a frame.
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Consumes one byte from the wire, stamped with the current time in
    /// microseconds, and returns a complete frame once one is available.
    ///
    /// Meant to be called from the receive interrupt; it never blocks and
    /// does a bounded amount of work per byte.
    pub fn feed(&mut self, byte: u8, now_us: u32) -> Option<Result<&[u8], FrameError>> {
        if now_us.wrapping_sub(self.frame_start_us) > FRAME_DEADLINE_US {
            // Too late to belong to the current frame, so this must be the
            // start of a new one.
            self.position = 0;
        }
        if self.position == 0 {
            self.frame_start_us = now_us;
        }

        // The full frame length includes the address and length fields,
        // which the length byte itself does not count. Clamped so that an
        // inconsistent length byte cannot run past the buffer.
        let full_len = if self.position < 3 {
            MIN_FRAME_LEN
        } else {
            (self.buf[1] as usize + FRAME_LENGTH_ADDRESS + FRAME_LENGTH_FRAMELENGTH)
                .min(MAX_FRAME_LEN)
        };

        if self.position < full_len {
            self.buf[self.position] = byte;
            self.position += 1;

            if self.position >= full_len {
                self.position = 0;

                let expected = self.buf[full_len - 1];
                let actual = CRC8.checksum(&self.buf[2..full_len - 1]);

                return Some(if actual == expected {
                    Ok(&self.buf[..full_len])
                } else {
                    Err(FrameError::ChecksumMismatch { expected, actual })
                });
            }
        }

        None
    }
}

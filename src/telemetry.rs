use crate::SerialLink;

/// Single slot staging buffer for the next outbound telemetry frame.
///
/// The telemetry side builds a frame whenever it likes; the receiver drains
/// the slot during the transmitter's listen window. There is no queue: a
/// write before the flush replaces the pending frame entirely.
pub struct TelemetryBuf<const C: usize> {
    buf: [u8; C],
    len: usize,
}

impl<const C: usize> TelemetryBuf<C> {
    pub const fn new() -> Self {
        Self {
            buf: [0; C],
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stages `data` as the pending frame, silently truncating it to the
    /// buffer capacity.
    pub fn write(&mut self, data: &[u8]) {
        let len = data.len().min(C);
        self.buf[..len].copy_from_slice(&data[..len]);
        self.len = len;
    }

    /// Puts the pending frame on the wire and clears the slot. Does
    /// nothing when the slot is empty.
    pub fn flush(&mut self, link: &mut impl SerialLink) {
        if self.len > 0 {
            link.write(&self.buf[..self.len]);
            self.len = 0;
        }
    }
}

//! Trait boundary towards the serial port driver. Opening and configuring
//! the port stays with the integrator; the receiver only ever writes
//! telemetry bytes and requests baud rate changes through this trait.

/// Serial link operations the receiver needs
pub trait SerialLink {
    /// Write all bytes to the wire
    fn write(&mut self, data: &[u8]);

    /// Reconfigure the link's baud rate
    fn set_baud_rate(&mut self, baud: u32);
}

use crate::{
    channels::{decode_subset, initial_channel_value, to_pulse, RcChannels},
    frame::{RawFrame, FRAME_LENGTH_TYPE_CRC},
    stats::{
        handle_link_statistics, handle_link_statistics_tx, LinkStatistics, LinkStatisticsTx,
        LinkStatsSink, LINK_STATISTICS_PAYLOAD_SIZE,
    },
    util::ref_array_start,
    FrameAssembler, FrameType, PacketAddress, SerialLink, TelemetryBuf, CHANNEL_COUNT,
    CRC8_CMD, CRSF_BAUDRATE, MAX_FRAME_LEN,
};

/// After this many consecutive frame integrity failures the link falls
/// back to the default baud rate, recovering a transmitter that silently
/// reverted from a negotiated higher speed.
pub const FRAME_ERROR_COUNT_THRESHOLD: u32 = 100;

/// MSP frames carried over telemetry have a fixed body size.
pub(crate) const RX_MSP_FRAME_SIZE: usize = 8;

/// Struct for configuring a `CrsfReceiver`.
///
/// The capability flags select at construction which statistics sources are
/// forwarded, so both protocol variants can live in one binary.
#[non_exhaustive]
#[derive(Clone, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxConfig {
    /// Configured channel midpoint, in pulse width units. 1500 puts the
    /// channel array at the digital center 992 before the first frame.
    pub midrc: u16,
    /// Signal inversion for the port. The receiver itself never looks at
    /// this; it is carried for the integrator opening the port.
    pub inverted: bool,
    /// RSSI readings originate from this protocol's statistics frames.
    pub rssi_source_crsf: bool,
    /// Link quality originates from this protocol's statistics frames.
    pub link_quality_source_crsf: bool,
    /// Surface dBm RSSI readings from TX statistics frames.
    pub rssi_dbm: bool,
    /// Substitute SNR for RSSI on the dBm path.
    pub use_rx_snr: bool,
}

impl RxConfig {
    pub const fn default() -> Self {
        Self {
            midrc: 1500,
            inverted: false,
            rssi_source_crsf: true,
            link_quality_source_crsf: true,
            rssi_dbm: true,
            use_rx_snr: false,
        }
    }
}

/// Answer to the scheduler's "is a frame ready?" poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameStatus {
    /// A new frame was decoded into the channel array.
    Complete,
    /// Nothing new since the last poll.
    Pending,
}

/// Collaborator hooks invoked while dispatching validated frames. All
/// methods default to no-ops; the unit type implements the trait for
/// hook-less operation.
pub trait RxHooks: LinkStatsSink {
    /// Buffer one MSP-over-telemetry frame. Return `true` once a complete
    /// command has been buffered and a response should be scheduled.
    fn on_msp_frame(&mut self, _frame: &[u8]) -> bool {
        false
    }

    fn schedule_msp_response(&mut self) {}

    fn schedule_device_info_response(&mut self) {}

    fn on_display_port_cmd(&mut self, _cmd: &[u8]) {}

    /// Process a command frame body that passed the inner command crc.
    fn on_command(&mut self, _cmd: &[u8]) {}
}

impl RxHooks for () {}

/// The CRSF receiver: frame reassembly, channel decoding, statistics
/// forwarding and telemetry staging behind one owned object.
///
/// Two call sites drive it. [`CrsfReceiver::feed`] is the producer side,
/// one call per received byte from the wire, and [`CrsfReceiver::frame_status`]
/// is the consumer side, polled by the scheduler. Both sides borrow the
/// receiver mutably, so a torn channel decode is unrepresentable.
/// Integrators that genuinely run the two sides on different execution
/// contexts wrap the receiver in whatever single-producer handoff their
/// platform provides and hold it only for the duration of the call.
pub struct CrsfReceiver<S> {
    config: RxConfig,
    link: S,
    assembler: FrameAssembler,
    snapshot: RawFrame,
    frame_done: bool,
    channel_data: [u16; CHANNEL_COUNT],
    consecutive_errors: u32,
    telemetry: TelemetryBuf<MAX_FRAME_LEN>,
}

impl<S: SerialLink> CrsfReceiver<S> {
    /// Creates a receiver over an open serial link. The channel array
    /// starts at the value derived from the configured midpoint.
    pub fn new(config: RxConfig, link: S) -> Self {
        let initial = initial_channel_value(config.midrc);

        Self {
            config,
            link,
            assembler: FrameAssembler::new(),
            snapshot: RawFrame::empty(),
            frame_done: false,
            channel_data: [initial; CHANNEL_COUNT],
            consecutive_errors: 0,
            telemetry: TelemetryBuf::new(),
        }
    }

    /// Consumes one byte from the wire. Producer side; safe to call from
    /// the receive interrupt, never blocks.
    pub fn feed<H: RxHooks>(&mut self, byte: u8, now_us: u32, hooks: &mut H) {
        match self.assembler.feed(byte, now_us) {
            Some(Ok(slice)) => {
                // the assembler never yields more than MAX_FRAME_LEN bytes
                let Ok(frame) = RawFrame::new(slice) else {
                    return;
                };

                self.consecutive_errors = 0;
                self.dispatch(frame, hooks);
            }
            Some(Err(_)) => {
                if self.consecutive_errors < FRAME_ERROR_COUNT_THRESHOLD {
                    self.consecutive_errors += 1;
                }
                if self.consecutive_errors >= FRAME_ERROR_COUNT_THRESHOLD {
                    // speed mismatch: the transmitter has most likely reset
                    // to the default rate
                    self.link.set_baud_rate(CRSF_BAUDRATE);
                    self.consecutive_errors = 0;
                }
            }
            None => {}
        }
    }

    fn dispatch<H: RxHooks>(&mut self, frame: RawFrame, hooks: &mut H) {
        let Ok(typ) = FrameType::try_from(frame.frame_type()) else {
            return;
        };

        match typ {
            FrameType::RcChannelsPacked | FrameType::SubsetRcChannelsPacked => {
                if frame.device_address() == PacketAddress::FlightController as u8 {
                    self.snapshot = frame;
                    self.frame_done = true;
                }
            }
            FrameType::MspReq | FrameType::MspWrite => {
                if let Some(msp) = frame
                    .ext_payload()
                    .and_then(|p| p.get(..RX_MSP_FRAME_SIZE))
                {
                    if hooks.on_msp_frame(msp) {
                        hooks.schedule_msp_response();
                    }
                }
            }
            FrameType::DevicePing => hooks.schedule_device_info_response(),
            FrameType::DisplayportCmd => {
                if let Some(cmd) = frame.ext_payload() {
                    hooks.on_display_port_cmd(cmd);
                }
            }
            FrameType::LinkStatistics => {
                if self.config.rssi_source_crsf
                    && frame.frame_length() as usize
                        == LINK_STATISTICS_PAYLOAD_SIZE + FRAME_LENGTH_TYPE_CRC
                {
                    if let Some(stats) = frame.payload().and_then(LinkStatistics::parse) {
                        handle_link_statistics(&stats, hooks);
                    }
                }
            }
            // Recognized but reserved: the protocol defines the layout and
            // assigns no receiver-side action.
            FrameType::LinkStatisticsRx => {}
            FrameType::LinkStatisticsTx => {
                if self.config.rssi_source_crsf
                    && frame.device_address() == PacketAddress::FlightController as u8
                    && frame.frame_length() as usize
                        == LINK_STATISTICS_PAYLOAD_SIZE + FRAME_LENGTH_TYPE_CRC
                {
                    if let Some(stats) = frame.payload().and_then(LinkStatisticsTx::parse) {
                        handle_link_statistics_tx(&stats, &self.config, hooks);
                    }
                }
            }
            FrameType::Command => {
                let slice = frame.as_slice();
                if slice.len() < 7 {
                    return;
                }

                // the command body carries its own crc right before the
                // frame crc, computed with the command polynomial
                let inner_crc = slice[slice.len() - 2];
                let computed = CRC8_CMD.checksum(&slice[2..slice.len() - 2]);

                if computed == inner_crc && slice[3] == PacketAddress::FlightController as u8 {
                    if let Some((_, cmd)) = frame.ext_payload().and_then(|p| p.split_last()) {
                        hooks.on_command(cmd);
                    }
                }
            }
            _ => {}
        }
    }

    /// Consumer side poll: reports whether a new RC frame arrived since
    /// the last call and, if so, decodes it into the channel array.
    pub fn frame_status(&mut self) -> FrameStatus {
        if !self.frame_done {
            return FrameStatus::Pending;
        }
        self.frame_done = false;

        let Some(payload) = self.snapshot.payload() else {
            return FrameStatus::Pending;
        };

        if self.snapshot.frame_type() == FrameType::RcChannelsPacked as u8 {
            let Some(data) = ref_array_start::<{ RcChannels::PAYLOAD_LENGTH }>(payload) else {
                return FrameStatus::Pending;
            };
            self.channel_data = RcChannels::parse(data).0;
        } else if !decode_subset(
            payload,
            self.snapshot.frame_length(),
            &mut self.channel_data,
        ) {
            // inconsistent subset frame, dropped
            return FrameStatus::Pending;
        }

        FrameStatus::Complete
    }

    /// Reads one channel as a pulse width value, center at 1500.
    ///
    /// Panics if `chan` is not below [`CHANNEL_COUNT`].
    pub fn read_channel(&self, chan: usize) -> u16 {
        to_pulse(self.channel_data[chan])
    }

    /// The raw 11 bit channel values of the last decoded frame.
    pub fn channels(&self) -> &[u16; CHANNEL_COUNT] {
        &self.channel_data
    }

    /// Stages `data` as the next telemetry frame, replacing any pending
    /// one and silently truncating to the wire's maximum frame size.
    pub fn write_telemetry(&mut self, data: &[u8]) {
        self.telemetry.write(data);
    }

    /// Sends the pending telemetry frame during the transmitter's listen
    /// window. No-op when nothing is staged.
    pub fn flush_telemetry(&mut self) {
        self.telemetry.flush(&mut self.link);
    }

    /// True while the receiver holds its serial link. Construction
    /// requires one, so call sites polling an optional receiver can treat
    /// this as a liveness check.
    pub fn is_active(&self) -> bool {
        true
    }

    /// Access to the underlying serial link.
    pub fn link_mut(&mut self) -> &mut S {
        &mut self.link
    }
}

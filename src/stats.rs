//! Link statistics frames and their forwarding to the flight controller's
//! RSSI / link quality state.

use crate::{receiver::RxConfig, util::ref_array_start};

/// Payload length of a general link statistics frame
pub(crate) const LINK_STATISTICS_PAYLOAD_SIZE: usize = 10;

/// Represents a LinkStatistics frame payload (type 0x14)
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs)]
pub struct LinkStatistics {
    pub uplink_rssi_1: u8,
    pub uplink_rssi_2: u8,
    pub uplink_link_quality: u8,
    pub uplink_snr: i8,
    pub active_antenna: u8,
    pub rf_mode: u8,
    pub uplink_tx_power: u8,
    pub downlink_rssi: u8,
    pub downlink_link_quality: u8,
    pub downlink_snr: i8,
}

impl LinkStatistics {
    /// Parses a `LinkStatistics` payload.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let data: &[u8; LINK_STATISTICS_PAYLOAD_SIZE] = ref_array_start(data)?;

        Some(LinkStatistics {
            uplink_rssi_1: data[0],
            uplink_rssi_2: data[1],
            uplink_link_quality: data[2],
            uplink_snr: data[3] as i8,
            active_antenna: data[4],
            rf_mode: data[5],
            uplink_tx_power: data[6],
            downlink_rssi: data[7],
            downlink_link_quality: data[8],
            downlink_snr: data[9] as i8,
        })
    }
}

/// Represents a LinkStatisticsTx frame payload (type 0x1D, protocol v3)
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs)]
pub struct LinkStatisticsTx {
    pub uplink_rssi: u8,
    pub uplink_rssi_percentage: u8,
    pub uplink_link_quality: u8,
    pub uplink_snr: i8,
    pub downlink_power: u8,
    pub uplink_fps: u8,
}

impl LinkStatisticsTx {
    const LEN: usize = 6;

    /// Parses a `LinkStatisticsTx` payload.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let data: &[u8; Self::LEN] = ref_array_start(data)?;

        Some(LinkStatisticsTx {
            uplink_rssi: data[0],
            uplink_rssi_percentage: data[1],
            uplink_link_quality: data[2],
            uplink_snr: data[3] as i8,
            downlink_power: data[4],
            uplink_fps: data[5],
        })
    }
}

/// Sink for the scalar link state derived from statistics frames. All
/// methods default to no-ops so integrators only wire up what they track.
///
/// The unit type implements this for hook-less operation.
pub trait LinkStatsSink {
    fn set_rssi(&mut self, _rssi: i16) {}
    fn set_rssi_dbm(&mut self, _rssi_dbm: i16) {}
    fn set_link_quality(&mut self, _lq: u8) {}
    fn set_snr(&mut self, _snr: i8) {}
    fn set_rf_mode(&mut self, _mode: u8) {}
    fn set_tx_power(&mut self, _power: u8) {}
}

impl LinkStatsSink for () {}

/// Worst-case composite of the two antenna RSSI readings. A reading of
/// exactly zero means that antenna has no measurement, so the other one is
/// taken as-is; otherwise the minimum wins, negated back into dBm since the
/// wire carries the magnitude.
pub fn composite_rssi(uplink_rssi_1: u8, uplink_rssi_2: u8) -> i16 {
    if uplink_rssi_1 == 0 {
        uplink_rssi_2 as i16
    } else if uplink_rssi_2 == 0 {
        uplink_rssi_1 as i16
    } else {
        -(uplink_rssi_1.min(uplink_rssi_2) as i16)
    }
}

pub(crate) fn handle_link_statistics(stats: &LinkStatistics, sink: &mut impl LinkStatsSink) {
    sink.set_link_quality(stats.uplink_link_quality);
    sink.set_rf_mode(stats.rf_mode);
    sink.set_snr(stats.downlink_snr);
    sink.set_tx_power(stats.uplink_tx_power);
    sink.set_rssi(composite_rssi(stats.uplink_rssi_1, stats.uplink_rssi_2));
}

pub(crate) fn handle_link_statistics_tx(
    stats: &LinkStatisticsTx,
    config: &RxConfig,
    sink: &mut impl LinkStatsSink,
) {
    if config.rssi_source_crsf {
        sink.set_rssi(stats.uplink_rssi_percentage as i16);
    }

    if config.rssi_dbm {
        let rssi_dbm = if config.use_rx_snr {
            stats.uplink_snr as i16
        } else {
            -(stats.uplink_rssi as i16)
        };
        sink.set_rssi_dbm(rssi_dbm);
    }

    if config.link_quality_source_crsf {
        sink.set_link_quality(stats.uplink_link_quality);
    }
}

#[cfg(test)]
mod tests {
    use super::{
        composite_rssi, handle_link_statistics, handle_link_statistics_tx, LinkStatistics,
        LinkStatisticsTx, LinkStatsSink,
    };
    use crate::receiver::RxConfig;

    #[derive(Default)]
    struct RecordingSink {
        rssi: Option<i16>,
        rssi_dbm: Option<i16>,
        lq: Option<u8>,
        snr: Option<i8>,
        rf_mode: Option<u8>,
        tx_power: Option<u8>,
    }

    impl LinkStatsSink for RecordingSink {
        fn set_rssi(&mut self, rssi: i16) {
            self.rssi = Some(rssi);
        }
        fn set_rssi_dbm(&mut self, rssi_dbm: i16) {
            self.rssi_dbm = Some(rssi_dbm);
        }
        fn set_link_quality(&mut self, lq: u8) {
            self.lq = Some(lq);
        }
        fn set_snr(&mut self, snr: i8) {
            self.snr = Some(snr);
        }
        fn set_rf_mode(&mut self, mode: u8) {
            self.rf_mode = Some(mode);
        }
        fn set_tx_power(&mut self, power: u8) {
            self.tx_power = Some(power);
        }
    }

    #[test]
    fn test_composite_rssi() {
        assert_eq!(composite_rssi(0, 40), 40);
        assert_eq!(composite_rssi(40, 0), 40);
        assert_eq!(composite_rssi(30, 50), -30);
        assert_eq!(composite_rssi(50, 30), -30);
    }

    #[test]
    fn test_link_statistics_parse() {
        let data = [30, 50, 95, 5, 0, 2, 3, 40, 90, 251];
        let stats = LinkStatistics::parse(&data).unwrap();

        assert_eq!(stats.uplink_rssi_1, 30);
        assert_eq!(stats.uplink_rssi_2, 50);
        assert_eq!(stats.uplink_link_quality, 95);
        assert_eq!(stats.uplink_snr, 5);
        assert_eq!(stats.active_antenna, 0);
        assert_eq!(stats.rf_mode, 2);
        assert_eq!(stats.uplink_tx_power, 3);
        assert_eq!(stats.downlink_rssi, 40);
        assert_eq!(stats.downlink_link_quality, 90);
        assert_eq!(stats.downlink_snr, -5);

        assert!(LinkStatistics::parse(&data[..9]).is_none());
    }

    #[test]
    fn test_general_frame_forwarding() {
        let stats = LinkStatistics {
            uplink_rssi_1: 30,
            uplink_rssi_2: 50,
            uplink_link_quality: 95,
            uplink_snr: 5,
            active_antenna: 0,
            rf_mode: 2,
            uplink_tx_power: 3,
            downlink_rssi: 40,
            downlink_link_quality: 90,
            downlink_snr: -5,
        };

        let mut sink = RecordingSink::default();
        handle_link_statistics(&stats, &mut sink);

        assert_eq!(sink.rssi, Some(-30));
        assert_eq!(sink.lq, Some(95));
        assert_eq!(sink.snr, Some(-5));
        assert_eq!(sink.rf_mode, Some(2));
        assert_eq!(sink.tx_power, Some(3));
    }

    #[test]
    fn test_tx_frame_capability_gating() {
        let stats = LinkStatisticsTx {
            uplink_rssi: 50,
            uplink_rssi_percentage: 80,
            uplink_link_quality: 99,
            uplink_snr: 7,
            downlink_power: 2,
            uplink_fps: 15,
        };

        let mut config = RxConfig::default();
        let mut sink = RecordingSink::default();
        handle_link_statistics_tx(&stats, &config, &mut sink);
        assert_eq!(sink.rssi, Some(80));
        assert_eq!(sink.rssi_dbm, Some(-50));
        assert_eq!(sink.lq, Some(99));

        // SNR substitution on the dBm path
        config.use_rx_snr = true;
        let mut sink = RecordingSink::default();
        handle_link_statistics_tx(&stats, &config, &mut sink);
        assert_eq!(sink.rssi_dbm, Some(7));

        // with every source flag off nothing is surfaced
        let config = RxConfig {
            rssi_source_crsf: false,
            link_quality_source_crsf: false,
            rssi_dbm: false,
            ..RxConfig::default()
        };
        let mut sink = RecordingSink::default();
        handle_link_statistics_tx(&stats, &config, &mut sink);
        assert_eq!(sink.rssi, None);
        assert_eq!(sink.rssi_dbm, None);
        assert_eq!(sink.lq, None);
    }
}

//! Link lifecycle events delivered by the radio engine
//!
//! Numeric codes follow the event numbering used by LMIC-style MAC engines,
//! so an engine that only reports raw codes can be bridged with
//! [`LinkEvent::from_code`].

/// Outcome of a completed transmit cycle (including its RX windows)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxResult {
    /// The network acknowledged the uplink
    pub acked: bool,
    /// Bytes of downlink application payload received in RX1/RX2
    pub downlink_len: usize,
}

/// One lifecycle event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    ScanTimeout,
    BeaconFound,
    BeaconMissed,
    BeaconTracked,
    Joining,
    Joined,
    Rfu1,
    JoinFailed,
    RejoinFailed,
    /// A full send has finished, RX windows included
    TxComplete(TxResult),
    LostTsync,
    Reset,
    /// Data received in a ping slot
    RxComplete { len: usize },
    LinkDead,
    LinkAlive,
    ScanFound,
    TxStart,
    /// Event code this firmware does not know about
    Unknown(u8),
}

impl LinkEvent {
    /// Map a raw event code. Variants that carry details get empty ones.
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::ScanTimeout,
            2 => Self::BeaconFound,
            3 => Self::BeaconMissed,
            4 => Self::BeaconTracked,
            5 => Self::Joining,
            6 => Self::Joined,
            7 => Self::Rfu1,
            8 => Self::JoinFailed,
            9 => Self::RejoinFailed,
            10 => Self::TxComplete(TxResult::default()),
            11 => Self::LostTsync,
            12 => Self::Reset,
            13 => Self::RxComplete { len: 0 },
            14 => Self::LinkDead,
            15 => Self::LinkAlive,
            16 => Self::ScanFound,
            17 => Self::TxStart,
            other => Self::Unknown(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::ScanTimeout => 1,
            Self::BeaconFound => 2,
            Self::BeaconMissed => 3,
            Self::BeaconTracked => 4,
            Self::Joining => 5,
            Self::Joined => 6,
            Self::Rfu1 => 7,
            Self::JoinFailed => 8,
            Self::RejoinFailed => 9,
            Self::TxComplete(_) => 10,
            Self::LostTsync => 11,
            Self::Reset => 12,
            Self::RxComplete { .. } => 13,
            Self::LinkDead => 14,
            Self::LinkAlive => 15,
            Self::ScanFound => 16,
            Self::TxStart => 17,
            Self::Unknown(code) => *code,
        }
    }

    /// Name used in log lines
    pub fn name(&self) -> &'static str {
        match self {
            Self::ScanTimeout => "EV_SCAN_TIMEOUT",
            Self::BeaconFound => "EV_BEACON_FOUND",
            Self::BeaconMissed => "EV_BEACON_MISSED",
            Self::BeaconTracked => "EV_BEACON_TRACKED",
            Self::Joining => "EV_JOINING",
            Self::Joined => "EV_JOINED",
            Self::Rfu1 => "EV_RFU1",
            Self::JoinFailed => "EV_JOIN_FAILED",
            Self::RejoinFailed => "EV_REJOIN_FAILED",
            Self::TxComplete(_) => "EV_TXCOMPLETE",
            Self::LostTsync => "EV_LOST_TSYNC",
            Self::Reset => "EV_RESET",
            Self::RxComplete { .. } => "EV_RXCOMPLETE",
            Self::LinkDead => "EV_LINK_DEAD",
            Self::LinkAlive => "EV_LINK_ALIVE",
            Self::ScanFound => "EV_SCAN_FOUND",
            Self::TxStart => "EV_TXSTART",
            Self::Unknown(_) => "Unknown event",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_map_back() {
        for code in 1..=17 {
            let event = LinkEvent::from_code(code);
            assert!(!matches!(event, LinkEvent::Unknown(_)));
            assert_eq!(event.code(), code);
        }
    }

    #[test]
    fn test_unknown_codes() {
        assert_eq!(LinkEvent::from_code(0), LinkEvent::Unknown(0));
        assert_eq!(LinkEvent::from_code(200), LinkEvent::Unknown(200));
        assert_eq!(LinkEvent::Unknown(200).code(), 200);
    }

    #[test]
    fn test_tx_complete_from_code_has_no_details() {
        assert_eq!(
            LinkEvent::from_code(10),
            LinkEvent::TxComplete(TxResult {
                acked: false,
                downlink_len: 0
            })
        );
    }
}

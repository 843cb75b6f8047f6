//! Status codes reported by the module.

use std::fmt;

/// Modem status reported in a `ModemStatus` (0x8A) frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModemStatus {
    /// Hardware reset or power up.
    HardwareReset,
    /// Watchdog timer reset.
    WatchdogReset,
    /// Joined a network (or associated).
    JoinedNetwork,
    /// Left the network (or disassociated).
    Disassociated,
    /// Coordinator started.
    CoordinatorStarted,
    /// Network security key was updated.
    NetworkKeyUpdated,
    /// Network woke up.
    NetworkWokeUp,
    /// Network went to sleep.
    NetworkWentToSleep,
    /// Supply voltage limit exceeded.
    VoltageSupplyExceeded,
    /// Configuration changed while a join was in progress.
    ConfigChangedDuringJoin,
    /// Any other status; values from 0x80 are network stack errors.
    Other(u8),
}

impl ModemStatus {
    /// Parses a modem status from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => Self::HardwareReset,
            0x01 => Self::WatchdogReset,
            0x02 => Self::JoinedNetwork,
            0x03 => Self::Disassociated,
            0x06 => Self::CoordinatorStarted,
            0x07 => Self::NetworkKeyUpdated,
            0x0B => Self::NetworkWokeUp,
            0x0C => Self::NetworkWentToSleep,
            0x0D => Self::VoltageSupplyExceeded,
            0x11 => Self::ConfigChangedDuringJoin,
            other => Self::Other(other),
        }
    }

    /// Encodes the status to its wire byte.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::HardwareReset => 0x00,
            Self::WatchdogReset => 0x01,
            Self::JoinedNetwork => 0x02,
            Self::Disassociated => 0x03,
            Self::CoordinatorStarted => 0x06,
            Self::NetworkKeyUpdated => 0x07,
            Self::NetworkWokeUp => 0x0B,
            Self::NetworkWentToSleep => 0x0C,
            Self::VoltageSupplyExceeded => 0x0D,
            Self::ConfigChangedDuringJoin => 0x11,
            Self::Other(byte) => byte,
        }
    }

    /// Returns true for a status produced by a module reset.
    #[must_use]
    pub const fn is_reset(self) -> bool {
        matches!(self, Self::HardwareReset | Self::WatchdogReset)
    }

    /// Human readable description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::HardwareReset => "hardware reset or power up",
            Self::WatchdogReset => "watchdog timer reset",
            Self::JoinedNetwork => "joined network",
            Self::Disassociated => "disassociated",
            Self::CoordinatorStarted => "coordinator started",
            Self::NetworkKeyUpdated => "network security key was updated",
            Self::NetworkWokeUp => "network woke up",
            Self::NetworkWentToSleep => "network went to sleep",
            Self::VoltageSupplyExceeded => "voltage supply limit exceeded",
            Self::ConfigChangedDuringJoin => {
                "modem configuration changed while join in progress"
            }
            Self::Other(byte) if byte >= 0x80 => "network stack error",
            Self::Other(_) => "unknown modem status",
        }
    }
}

impl fmt::Display for ModemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02x})", self.description(), self.to_byte())
    }
}

/// Status byte of a (remote) AT command response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AtCommandStatus {
    /// Command accepted.
    #[default]
    Ok,
    /// Generic error.
    Error,
    /// Unknown command.
    InvalidCommand,
    /// Parameter rejected.
    InvalidParameter,
    /// Remote command could not be transmitted.
    TxFailure,
    /// Any other status value.
    Other(u8),
}

impl AtCommandStatus {
    /// Parses an AT command status from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => Self::Ok,
            0x01 => Self::Error,
            0x02 => Self::InvalidCommand,
            0x03 => Self::InvalidParameter,
            0x04 => Self::TxFailure,
            other => Self::Other(other),
        }
    }

    /// Encodes the status to its wire byte.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::Ok => 0x00,
            Self::Error => 0x01,
            Self::InvalidCommand => 0x02,
            Self::InvalidParameter => 0x03,
            Self::TxFailure => 0x04,
            Self::Other(byte) => byte,
        }
    }

    /// Returns true if the command succeeded.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for AtCommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Ok => "status OK",
            Self::Error => "status error",
            Self::InvalidCommand => "invalid command",
            Self::InvalidParameter => "invalid parameter",
            Self::TxFailure => "tx failure",
            Self::Other(_) => "unknown status",
        };
        write!(f, "{text} (0x{:02x})", self.to_byte())
    }
}

/// Delivery status of a transmission (`TxStatus` and `TransmitStatus` frames).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeliveryStatus {
    /// Delivered.
    #[default]
    Success,
    /// No MAC-level acknowledgment.
    MacAckFailure,
    /// Clear channel assessment failed.
    CcaFailure,
    /// Transmission purged (indirect message timed out).
    Purged,
    /// Invalid destination endpoint.
    InvalidDestinationEndpoint,
    /// No network-level acknowledgment.
    NetworkAckFailure,
    /// Module is not joined to a network.
    NotJoined,
    /// Module tried to send to itself.
    SelfAddressed,
    /// Destination address not found.
    AddressNotFound,
    /// No route to the destination.
    RouteNotFound,
    /// Payload exceeds the maximum size.
    PayloadTooLarge,
    /// Any other status value.
    Other(u8),
}

impl DeliveryStatus {
    /// Parses a delivery status from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => Self::Success,
            0x01 => Self::MacAckFailure,
            0x02 => Self::CcaFailure,
            0x03 => Self::Purged,
            0x15 => Self::InvalidDestinationEndpoint,
            0x21 => Self::NetworkAckFailure,
            0x22 => Self::NotJoined,
            0x23 => Self::SelfAddressed,
            0x24 => Self::AddressNotFound,
            0x25 => Self::RouteNotFound,
            0x74 => Self::PayloadTooLarge,
            other => Self::Other(other),
        }
    }

    /// Encodes the status to its wire byte.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::Success => 0x00,
            Self::MacAckFailure => 0x01,
            Self::CcaFailure => 0x02,
            Self::Purged => 0x03,
            Self::InvalidDestinationEndpoint => 0x15,
            Self::NetworkAckFailure => 0x21,
            Self::NotJoined => 0x22,
            Self::SelfAddressed => 0x23,
            Self::AddressNotFound => 0x24,
            Self::RouteNotFound => 0x25,
            Self::PayloadTooLarge => 0x74,
            Self::Other(byte) => byte,
        }
    }

    /// Returns true if the transmission was delivered.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Success => "success",
            Self::MacAckFailure => "MAC ACK failure",
            Self::CcaFailure => "CCA failure",
            Self::Purged => "transmission purged",
            Self::InvalidDestinationEndpoint => "invalid destination endpoint",
            Self::NetworkAckFailure => "network ACK failure",
            Self::NotJoined => "not joined to network",
            Self::SelfAddressed => "self-addressed",
            Self::AddressNotFound => "address not found",
            Self::RouteNotFound => "route not found",
            Self::PayloadTooLarge => "data payload too large",
            Self::Other(_) => "unknown delivery status",
        };
        write!(f, "{text} (0x{:02x})", self.to_byte())
    }
}

/// Discovery overhead reported in a `TransmitStatus` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DiscoveryStatus {
    /// No discovery overhead.
    #[default]
    NoOverhead,
    /// Address discovery.
    Address,
    /// Route discovery.
    Route,
    /// Address and route discovery.
    AddressAndRoute,
    /// Extended timeout discovery.
    ExtendedTimeout,
    /// Any other status value.
    Other(u8),
}

impl DiscoveryStatus {
    /// Parses a discovery status from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => Self::NoOverhead,
            0x01 => Self::Address,
            0x02 => Self::Route,
            0x03 => Self::AddressAndRoute,
            0x40 => Self::ExtendedTimeout,
            other => Self::Other(other),
        }
    }

    /// Encodes the status to its wire byte.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::NoOverhead => 0x00,
            Self::Address => 0x01,
            Self::Route => 0x02,
            Self::AddressAndRoute => 0x03,
            Self::ExtendedTimeout => 0x40,
            Self::Other(byte) => byte,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modem_status_bytes() {
        for byte in 0..=u8::MAX {
            assert_eq!(ModemStatus::from_byte(byte).to_byte(), byte);
            assert_eq!(AtCommandStatus::from_byte(byte).to_byte(), byte);
            assert_eq!(DeliveryStatus::from_byte(byte).to_byte(), byte);
            assert_eq!(DiscoveryStatus::from_byte(byte).to_byte(), byte);
        }
    }

    #[test]
    fn test_modem_status_description() {
        assert!(ModemStatus::HardwareReset.is_reset());
        assert!(!ModemStatus::JoinedNetwork.is_reset());
        assert_eq!(
            ModemStatus::from_byte(0x82).description(),
            "network stack error"
        );
    }

    #[test]
    fn test_status_display() {
        assert_eq!(
            AtCommandStatus::InvalidParameter.to_string(),
            "invalid parameter (0x03)"
        );
        assert_eq!(
            DeliveryStatus::RouteNotFound.to_string(),
            "route not found (0x25)"
        );
    }
}

//! API frame type identifiers.
//!
//! The frame type is the first byte of every frame payload and selects
//! the layout of the bytes that follow.

/// Known API frame types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameType {
    // Requests (host to module)
    /// 802.15.4 transmit request, 64-bit destination.
    Tx64Request = 0x00,
    /// 802.15.4 transmit request, 16-bit destination.
    Tx16Request = 0x01,
    /// Local AT command, applied immediately.
    AtCommand = 0x08,
    /// Local AT command, queued until `AC`.
    AtCommandQueue = 0x09,
    /// Transmit request.
    TransmitRequest = 0x10,
    /// Explicit addressing transmit request.
    ExplicitAddressing = 0x11,
    /// Remote AT command request.
    RemoteAtCommand = 0x17,
    /// User data relay to another interface.
    UserDataRelay = 0x2D,

    // Responses and indicators (module to host)
    /// 802.15.4 receive, 64-bit source.
    Rx64 = 0x80,
    /// 802.15.4 receive, 16-bit source.
    Rx16 = 0x81,
    /// Local AT command response.
    AtCommandResponse = 0x88,
    /// 802.15.4 transmit status.
    TxStatus = 0x89,
    /// Modem status.
    ModemStatus = 0x8A,
    /// Transmit status.
    TransmitStatus = 0x8B,
    /// Receive packet.
    Receive = 0x90,
    /// Explicit receive indicator.
    ExplicitRx = 0x91,
    /// IO data sample receive indicator.
    IoSampleRx = 0x92,
    /// Node identification indicator.
    NodeIdentification = 0x95,
    /// Remote AT command response.
    RemoteAtCommandResponse = 0x97,
    /// User data relay output.
    UserDataRelayOutput = 0xAD,
}

impl FrameType {
    /// Attempts to parse a frame type from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Tx64Request),
            0x01 => Some(Self::Tx16Request),
            0x08 => Some(Self::AtCommand),
            0x09 => Some(Self::AtCommandQueue),
            0x10 => Some(Self::TransmitRequest),
            0x11 => Some(Self::ExplicitAddressing),
            0x17 => Some(Self::RemoteAtCommand),
            0x2D => Some(Self::UserDataRelay),
            0x80 => Some(Self::Rx64),
            0x81 => Some(Self::Rx16),
            0x88 => Some(Self::AtCommandResponse),
            0x89 => Some(Self::TxStatus),
            0x8A => Some(Self::ModemStatus),
            0x8B => Some(Self::TransmitStatus),
            0x90 => Some(Self::Receive),
            0x91 => Some(Self::ExplicitRx),
            0x92 => Some(Self::IoSampleRx),
            0x95 => Some(Self::NodeIdentification),
            0x97 => Some(Self::RemoteAtCommandResponse),
            0xAD => Some(Self::UserDataRelayOutput),
            _ => None,
        }
    }

    /// Short name used in logs and errors.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Tx64Request => "TX (64-bit)",
            Self::Tx16Request => "TX (16-bit)",
            Self::AtCommand => "AT command",
            Self::AtCommandQueue => "AT command queue",
            Self::TransmitRequest => "transmit request",
            Self::ExplicitAddressing => "explicit addressing",
            Self::RemoteAtCommand => "remote AT command",
            Self::UserDataRelay => "user data relay",
            Self::Rx64 => "RX (64-bit)",
            Self::Rx16 => "RX (16-bit)",
            Self::AtCommandResponse => "AT command response",
            Self::TxStatus => "TX status",
            Self::ModemStatus => "modem status",
            Self::TransmitStatus => "transmit status",
            Self::Receive => "receive packet",
            Self::ExplicitRx => "explicit RX indicator",
            Self::IoSampleRx => "IO data sample",
            Self::NodeIdentification => "node identification",
            Self::RemoteAtCommandResponse => "remote AT command response",
            Self::UserDataRelayOutput => "user data relay output",
        }
    }

    /// Returns true if frames of this type originate from the module.
    #[must_use]
    pub const fn is_incoming(self) -> bool {
        (self as u8) >= 0x80
    }

    /// Returns true if frames of this type carry a frame ID.
    #[must_use]
    pub const fn has_frame_id(self) -> bool {
        matches!(
            self,
            Self::Tx64Request
                | Self::Tx16Request
                | Self::AtCommand
                | Self::AtCommandQueue
                | Self::TransmitRequest
                | Self::ExplicitAddressing
                | Self::RemoteAtCommand
                | Self::UserDataRelay
                | Self::AtCommandResponse
                | Self::TxStatus
                | Self::TransmitStatus
                | Self::RemoteAtCommandResponse
        )
    }
}

impl From<FrameType> for u8 {
    fn from(frame_type: FrameType) -> Self {
        frame_type as Self
    }
}

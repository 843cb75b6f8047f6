//! Transmit and receive option bit fields.

/// Options byte of a received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ReceiveOptions(u8);

impl ReceiveOptions {
    /// No options set.
    pub const NONE: Self = Self(0x00);
    /// Packet was acknowledged.
    pub const ACKNOWLEDGED: Self = Self(0x01);
    /// Packet was a broadcast.
    pub const BROADCAST: Self = Self(0x02);
    /// Packet was APS encrypted.
    pub const APS_ENCRYPTED: Self = Self(0x20);
    /// Packet was sent from an end device.
    pub const FROM_END_DEVICE: Self = Self(0x40);

    /// Wraps a raw options byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    /// Returns the raw options byte.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        self.0
    }

    /// Returns true if all bits of `other` are set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true if the packet was received as a broadcast.
    ///
    /// 802.15.4 firmware reports broadcasts with bit 2 (PAN broadcast)
    /// as well as bit 1.
    #[must_use]
    pub const fn is_broadcast(self) -> bool {
        self.0 & 0x06 != 0
    }
}

impl std::ops::BitOr for ReceiveOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Options byte of a transmit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TransmitOptions(u8);

impl TransmitOptions {
    /// No options set.
    pub const NONE: Self = Self(0x00);
    /// Disable retries and route repair.
    pub const DISABLE_ACK: Self = Self(0x01);
    /// Disable route discovery (DigiMesh) / address discovery.
    pub const DISABLE_ROUTE_DISCOVERY: Self = Self(0x02);
    /// Enable unicast NACK messages.
    pub const ENABLE_UNICAST_NACK: Self = Self(0x04);
    /// Send a broadcast on the PAN (802.15.4).
    pub const BROADCAST_PAN: Self = Self(0x04);
    /// Enable APS end-to-end encryption.
    pub const ENABLE_APS_ENCRYPTION: Self = Self(0x20);
    /// Use the extended transmission timeout.
    pub const USE_EXTENDED_TIMEOUT: Self = Self(0x40);

    /// Wraps a raw options byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    /// Returns the raw options byte.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        self.0
    }

    /// Returns true if all bits of `other` are set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for TransmitOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Options byte of a remote AT command request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RemoteAtOptions(u8);

impl RemoteAtOptions {
    /// Queue the change; an explicit `AC` applies it.
    pub const NONE: Self = Self(0x00);
    /// Disable retries.
    pub const DISABLE_ACK: Self = Self(0x01);
    /// Apply the change immediately.
    pub const APPLY_CHANGES: Self = Self(0x02);

    /// Wraps a raw options byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    /// Returns the raw options byte.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        self.0
    }
}

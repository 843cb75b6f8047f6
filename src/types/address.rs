//! XBee addressing.

use std::fmt;

/// Length of a 64-bit address in bytes.
pub const ADDRESS_64_LEN: usize = 8;

/// Length of a 16-bit network address in bytes.
pub const ADDRESS_16_LEN: usize = 2;

/// The permanent 64-bit (IEEE) address of a module.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct XBee64BitAddress([u8; ADDRESS_64_LEN]);

impl XBee64BitAddress {
    /// Address of the network coordinator.
    pub const COORDINATOR: Self = Self([0; ADDRESS_64_LEN]);

    /// Broadcast address.
    pub const BROADCAST: Self = Self([0, 0, 0, 0, 0, 0, 0xFF, 0xFF]);

    /// Unknown address marker.
    pub const UNKNOWN: Self = Self([0xFF; ADDRESS_64_LEN]);

    /// Creates an address from its 8 big-endian bytes.
    #[must_use]
    pub const fn new(bytes: [u8; ADDRESS_64_LEN]) -> Self {
        Self(bytes)
    }

    /// Creates an address from the high (`SH`) and low (`SL`) halves.
    #[must_use]
    pub const fn from_parts(high: u32, low: u32) -> Self {
        Self::from_u64(((high as u64) << 32) | low as u64)
    }

    /// Creates an address from its integer value.
    #[must_use]
    pub const fn from_u64(value: u64) -> Self {
        Self(value.to_be_bytes())
    }

    /// Tries to create an address from a slice.
    ///
    /// Returns `None` if the slice is not exactly 8 bytes.
    #[must_use]
    pub fn try_from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; ADDRESS_64_LEN]>::try_from(bytes).ok().map(Self)
    }

    /// Returns the address as a byte slice.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_64_LEN] {
        &self.0
    }

    /// Returns the address as an integer.
    #[must_use]
    pub const fn to_u64(self) -> u64 {
        u64::from_be_bytes(self.0)
    }

    /// Returns the address as an upper-case hex string.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    /// Parses an address from a hex string (16 hex digits).
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; ADDRESS_64_LEN];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for XBee64BitAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "XBee64BitAddress({})", self.to_hex())
    }
}

impl fmt::Display for XBee64BitAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// The 16-bit network address assigned when a module joins a network.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct XBee16BitAddress([u8; ADDRESS_16_LEN]);

impl XBee16BitAddress {
    /// Address of the network coordinator.
    pub const COORDINATOR: Self = Self([0, 0]);

    /// Broadcast address.
    pub const BROADCAST: Self = Self([0xFF, 0xFF]);

    /// Unknown (or "use 64-bit address") marker.
    pub const UNKNOWN: Self = Self([0xFF, 0xFE]);

    /// Creates an address from its 2 big-endian bytes.
    #[must_use]
    pub const fn new(bytes: [u8; ADDRESS_16_LEN]) -> Self {
        Self(bytes)
    }

    /// Creates an address from its integer value.
    #[must_use]
    pub const fn from_u16(value: u16) -> Self {
        Self(value.to_be_bytes())
    }

    /// Tries to create an address from a slice.
    #[must_use]
    pub fn try_from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; ADDRESS_16_LEN]>::try_from(bytes).ok().map(Self)
    }

    /// Returns the address as a byte slice.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_16_LEN] {
        &self.0
    }

    /// Returns the address as an integer.
    #[must_use]
    pub const fn to_u16(self) -> u16 {
        u16::from_be_bytes(self.0)
    }

    /// Returns the address as an upper-case hex string.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    /// Parses an address from a hex string (4 hex digits).
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; ADDRESS_16_LEN];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for XBee16BitAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "XBee16BitAddress({})", self.to_hex())
    }
}

impl fmt::Display for XBee16BitAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

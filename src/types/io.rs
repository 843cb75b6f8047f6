//! IO line sampling.
//!
//! Sample layout (`IoSampleRx` frames and the `IS` command response):
//! ```text
//! [count:1] [digital_mask:2BE] [analog_mask:1]
//! [digital:2BE if digital_mask != 0] [analog:2BE per analog_mask bit...]
//! ```

use bytes::{Buf, BufMut, BytesMut};

use crate::protocol::codec;

/// Analog channel that carries the supply voltage instead of a pin.
pub const SUPPLY_VOLTAGE_CHANNEL: u8 = 7;

/// Minimum size of a sample payload (count + masks).
pub const IO_SAMPLE_HEADER_LEN: usize = 4;

/// Digital level of an IO line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoValue {
    /// Line is low.
    Low,
    /// Line is high.
    High,
}

/// One IO sample set read from a module.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IoSample {
    /// Number of sample sets (always 1 on current firmware).
    pub sample_count: u8,
    /// Digital lines enabled for sampling (bit N = DIO N).
    pub digital_mask: u16,
    /// Analog channels enabled for sampling (bit N = AD N, bit 7 = supply voltage).
    pub analog_mask: u8,
    /// Digital line states, present when `digital_mask` is non-zero.
    pub digital_values: Option<u16>,
    /// Analog readings in ascending channel order, one per `analog_mask` bit.
    pub analog_values: Vec<u16>,
}

impl IoSample {
    /// Parses a sample payload.
    ///
    /// Returns `None` if the payload is shorter than its masks announce.
    #[must_use]
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < IO_SAMPLE_HEADER_LEN {
            return None;
        }
        let mut cursor = data;
        let sample_count = cursor.get_u8();
        let digital_mask = cursor.get_u16();
        let analog_mask = cursor.get_u8();

        let digital_values = if digital_mask == 0 {
            None
        } else {
            if cursor.remaining() < 2 {
                return None;
            }
            Some(cursor.get_u16())
        };

        let analog_count = analog_mask.count_ones() as usize;
        if cursor.remaining() < analog_count * 2 {
            return None;
        }
        let analog_values = (0..analog_count).map(|_| cursor.get_u16()).collect();

        Some(Self {
            sample_count,
            digital_mask,
            analog_mask,
            digital_values,
            analog_values,
        })
    }

    /// Serializes the sample payload.
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(self.sample_count);
        buf.put_u16(self.digital_mask);
        buf.put_u8(self.analog_mask);
        if self.digital_mask != 0 {
            buf.put_u16(self.digital_values.unwrap_or(0));
        }
        for value in &self.analog_values {
            buf.put_u16(*value);
        }
    }

    /// Number of bytes `write_to` produces.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        let digital = if self.digital_mask == 0 { 0 } else { 2 };
        IO_SAMPLE_HEADER_LEN + digital + self.analog_values.len() * 2
    }

    /// Returns true if the digital line is enabled.
    #[must_use]
    pub const fn has_digital(&self, line: u8) -> bool {
        line < 16 && self.digital_mask & (1 << line) != 0
    }

    /// Returns true if the analog channel is enabled.
    #[must_use]
    pub const fn has_analog(&self, channel: u8) -> bool {
        channel < 8 && self.analog_mask & (1 << channel) != 0
    }

    /// Returns the state of a digital line, if it was sampled.
    #[must_use]
    pub fn digital_value(&self, line: u8) -> Option<IoValue> {
        if !self.has_digital(line) {
            return None;
        }
        let values = self.digital_values?;
        let bit = codec::bit_field16(values, line, 1);
        Some(if bit == 0 { IoValue::Low } else { IoValue::High })
    }

    /// Returns the raw reading of an analog channel, if it was sampled.
    #[must_use]
    pub fn analog_value(&self, channel: u8) -> Option<u16> {
        if !self.has_analog(channel) {
            return None;
        }
        // Readings are packed: index = number of enabled channels below this one.
        let below = self.analog_mask & ((1u8 << channel) - 1);
        self.analog_values.get(below.count_ones() as usize).copied()
    }

    /// Returns the supply voltage reading, if it was sampled.
    #[must_use]
    pub fn supply_voltage(&self) -> Option<u16> {
        self.analog_value(SUPPLY_VOLTAGE_CHANNEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // DIO3 and DIO4 enabled (DIO3 high), AD1 and supply voltage enabled.
    const SAMPLE: [u8; 10] = [
        0x01, 0x00, 0x18, 0x82, 0x00, 0x08, 0x02, 0x25, 0x0B, 0xB8,
    ];

    #[test]
    fn test_parse_sample() {
        let sample = IoSample::parse(&SAMPLE).unwrap();
        assert_eq!(sample.sample_count, 1);
        assert_eq!(sample.digital_mask, 0x0018);
        assert_eq!(sample.analog_mask, 0x82);
        assert_eq!(sample.digital_value(3), Some(IoValue::High));
        assert_eq!(sample.digital_value(4), Some(IoValue::Low));
        assert_eq!(sample.digital_value(0), None);
        assert_eq!(sample.analog_value(1), Some(0x0225));
        assert_eq!(sample.analog_value(0), None);
        assert_eq!(sample.supply_voltage(), Some(0x0BB8));
    }

    #[test]
    fn test_serialize_sample() {
        let sample = IoSample::parse(&SAMPLE).unwrap();
        let mut buf = BytesMut::new();
        sample.write_to(&mut buf);
        assert_eq!(&buf[..], &SAMPLE);
        assert_eq!(sample.encoded_len(), SAMPLE.len());
    }

    #[test]
    fn test_analog_only_sample() {
        let data = [0x01, 0x00, 0x00, 0x01, 0x03, 0xFF];
        let sample = IoSample::parse(&data).unwrap();
        assert_eq!(sample.digital_values, None);
        assert_eq!(sample.analog_value(0), Some(0x03FF));
    }

    #[test]
    fn test_truncated_sample() {
        assert!(IoSample::parse(&[0x01, 0x00]).is_none());
        // Mask announces digital values but none follow.
        assert!(IoSample::parse(&[0x01, 0x00, 0x01, 0x00]).is_none());
        // Two analog channels announced, one present.
        assert!(IoSample::parse(&[0x01, 0x00, 0x00, 0x03, 0x00, 0x01]).is_none());
    }
}

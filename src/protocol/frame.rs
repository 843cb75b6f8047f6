//! API frame encoding and decoding.
//!
//! The wire format is:
//! ```text
//! ┌──────────┬──────────────┬─────────────────┬──────────┐
//! │  0x7E    │  length (BE) │    payload      │ checksum │
//! │  1 byte  │   2 bytes    │  length bytes   │  1 byte  │
//! └──────────┴──────────────┴─────────────────┴──────────┘
//! ```
//!
//! `length` counts the unescaped payload (frame type included) and the
//! checksum is computed over the unescaped payload. In API escaped mode
//! every byte after the delimiter is escaped on the wire.

use std::io::{ErrorKind, Read};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::FrameError;
use crate::protocol::codec::{self, Checksum, ESCAPE, ESCAPE_XOR};

/// Frame start delimiter.
pub const START_DELIMITER: u8 = 0x7E;

/// Maximum frame payload size.
pub const MAX_FRAME_SIZE: usize = 65535;

/// Delimiter, two length bytes and checksum.
pub const ENVELOPE_SIZE: usize = 4;

/// API operating mode of the module (`AP` parameter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OperatingMode {
    /// API mode (`AP=1`).
    #[default]
    Api,
    /// API mode with escaped control bytes (`AP=2`).
    ApiEscaped,
}

impl OperatingMode {
    /// Returns true if bytes after the delimiter are escaped.
    #[must_use]
    pub const fn is_escaped(self) -> bool {
        matches!(self, Self::ApiEscaped)
    }
}

/// Wraps a payload into a complete API frame.
///
/// # Errors
///
/// Returns `FrameError::TooLarge` if the payload exceeds `MAX_FRAME_SIZE`.
pub fn encode_frame(payload: &[u8], mode: OperatingMode) -> Result<Bytes, FrameError> {
    let length = u16::try_from(payload.len()).map_err(|_| FrameError::TooLarge {
        size: payload.len(),
        max: MAX_FRAME_SIZE,
    })?;
    let checksum = Checksum::of(payload);

    let capacity = if mode.is_escaped() {
        1 + (payload.len() + 3) * 2
    } else {
        ENVELOPE_SIZE + payload.len()
    };
    let mut buf = BytesMut::with_capacity(capacity);
    buf.put_u8(START_DELIMITER);

    match mode {
        OperatingMode::Api => {
            buf.put_u16(length);
            buf.put_slice(payload);
            buf.put_u8(checksum);
        }
        OperatingMode::ApiEscaped => {
            codec::escape_into(&length.to_be_bytes(), &mut buf);
            codec::escape_into(payload, &mut buf);
            codec::escape_into(&[checksum], &mut buf);
        }
    }

    Ok(buf.freeze())
}

/// Decodes exactly one frame from a byte stream.
///
/// The stream must already be positioned on a start delimiter: this
/// function does not scan for one. Use [`FrameDecoder`] to resynchronize
/// on a noisy stream.
///
/// # Errors
///
/// - `InvalidDelimiter` if the first byte is not `0x7E`
/// - `Incomplete` if the stream ends (or fails) before the checksum
/// - `Checksum` if the checksum does not match
pub fn decode_frame<R: Read>(mut reader: R, mode: OperatingMode) -> Result<Bytes, FrameError> {
    let mut decoder = FrameDecoder::new(mode);
    let mut byte = [0u8; 1];
    let mut first = true;

    loop {
        match reader.read(&mut byte) {
            Ok(0) => return Err(decoder.incomplete()),
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::debug!("frame read failed: {}", e);
                return Err(decoder.incomplete());
            }
        }

        if first {
            if byte[0] != START_DELIMITER {
                return Err(FrameError::InvalidDelimiter { skipped: 1 });
            }
            first = false;
        }

        decoder.feed(&byte);
        if let Some(payload) = decoder.decode()? {
            return Ok(payload);
        }
    }
}

/// Position of a [`FrameDecoder`] inside the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DecodeState {
    /// Discarding bytes until a start delimiter.
    #[default]
    SeekingDelimiter,
    /// Reading the two length bytes.
    ReadingLength,
    /// Reading `length` payload bytes.
    ReadingPayload,
    /// Waiting for the checksum byte.
    ReadingChecksum,
}

/// Incremental frame decoder that resynchronizes on errors.
///
/// Bytes are fed as they arrive; [`decode`](Self::decode) yields one
/// payload (or one error) at a time. After any error the decoder is back
/// in [`DecodeState::SeekingDelimiter`].
#[derive(Debug)]
pub struct FrameDecoder {
    mode: OperatingMode,
    input: BytesMut,
    state: DecodeState,
    escape_pending: bool,
    length_read: usize,
    length: usize,
    payload: BytesMut,
    checksum: Checksum,
    skipped: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(OperatingMode::Api)
    }
}

impl FrameDecoder {
    /// Creates a new frame decoder.
    #[must_use]
    pub fn new(mode: OperatingMode) -> Self {
        Self {
            mode,
            input: BytesMut::new(),
            state: DecodeState::SeekingDelimiter,
            escape_pending: false,
            length_read: 0,
            length: 0,
            payload: BytesMut::new(),
            checksum: Checksum::new(),
            skipped: 0,
        }
    }

    /// Feeds data into the decoder.
    pub fn feed(&mut self, data: &[u8]) {
        self.input.extend_from_slice(data);
    }

    /// Attempts to decode the next complete frame.
    ///
    /// Returns `Ok(Some(payload))` if a complete frame was decoded,
    /// `Ok(None)` if more data is needed, or an error describing a frame
    /// that was dropped. Calling `decode` again after an error continues
    /// with the remaining input.
    ///
    /// # Errors
    ///
    /// - `InvalidDelimiter` when garbage preceded the next delimiter
    /// - `Checksum` when a complete frame failed validation
    /// - `Incomplete` when, in escaped mode, a new delimiter interrupted a frame
    pub fn decode(&mut self) -> Result<Option<Bytes>, FrameError> {
        while let Some(&raw) = self.input.first() {
            if self.state == DecodeState::SeekingDelimiter {
                self.input.advance(1);
                if raw == START_DELIMITER {
                    self.begin_frame();
                    if self.skipped > 0 {
                        let skipped = std::mem::take(&mut self.skipped);
                        return Err(FrameError::InvalidDelimiter { skipped });
                    }
                } else {
                    self.skipped += 1;
                }
                continue;
            }

            // An unescaped delimiter can only start a new frame in escaped mode.
            if self.mode.is_escaped() && raw == START_DELIMITER {
                let err = self.incomplete();
                self.state = DecodeState::SeekingDelimiter;
                return Err(err);
            }
            self.input.advance(1);

            let byte = if self.mode.is_escaped() {
                if self.escape_pending {
                    self.escape_pending = false;
                    raw ^ ESCAPE_XOR
                } else if raw == ESCAPE {
                    self.escape_pending = true;
                    continue;
                } else {
                    raw
                }
            } else {
                raw
            };

            if let Some(result) = self.push(byte) {
                return result.map(Some);
            }
        }
        Ok(None)
    }

    /// Current position inside the frame being decoded.
    #[must_use]
    pub const fn state(&self) -> DecodeState {
        self.state
    }

    /// Operating mode this decoder expects.
    #[must_use]
    pub const fn mode(&self) -> OperatingMode {
        self.mode
    }

    /// Returns the number of bytes currently buffered and not yet decoded.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.input.len()
    }

    /// Drops buffered input and any partial frame.
    pub fn clear(&mut self) {
        self.input.clear();
        self.payload.clear();
        self.state = DecodeState::SeekingDelimiter;
        self.escape_pending = false;
        self.skipped = 0;
    }

    fn begin_frame(&mut self) {
        self.state = DecodeState::ReadingLength;
        self.escape_pending = false;
        self.length_read = 0;
        self.length = 0;
        self.payload.clear();
        self.checksum = Checksum::new();
    }

    fn push(&mut self, byte: u8) -> Option<Result<Bytes, FrameError>> {
        match self.state {
            DecodeState::SeekingDelimiter => None,
            DecodeState::ReadingLength => {
                self.length = (self.length << 8) | usize::from(byte);
                self.length_read += 1;
                if self.length_read == 2 {
                    self.payload.reserve(self.length);
                    self.state = if self.length == 0 {
                        DecodeState::ReadingChecksum
                    } else {
                        DecodeState::ReadingPayload
                    };
                }
                None
            }
            DecodeState::ReadingPayload => {
                self.payload.put_u8(byte);
                self.checksum.add(byte);
                if self.payload.len() == self.length {
                    self.state = DecodeState::ReadingChecksum;
                }
                None
            }
            DecodeState::ReadingChecksum => {
                self.state = DecodeState::SeekingDelimiter;
                let payload = self.payload.split().freeze();
                if self.checksum.is_valid(byte) {
                    Some(Ok(payload))
                } else {
                    Some(Err(FrameError::Checksum {
                        computed: self.checksum.value(),
                        received: byte,
                    }))
                }
            }
        }
    }

    fn incomplete(&self) -> FrameError {
        let expected = if self.length_read == 2 {
            ENVELOPE_SIZE + self.length
        } else {
            ENVELOPE_SIZE
        };
        let got = match self.state {
            DecodeState::SeekingDelimiter => 0,
            _ => 1 + self.length_read + self.payload.len(),
        };
        FrameError::Incomplete { expected, got }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Transmit request: frame ID 1, destination 0013A20040A1B2C3, 16-bit
    // FFFE, radius 0, options 0, data "ABC".
    const TX_PAYLOAD: [u8; 17] = [
        0x10, 0x01, 0x00, 0x13, 0xA2, 0x00, 0x40, 0xA1, 0xB2, 0xC3, 0xFF, 0xFE, 0x00, 0x00, 0x41,
        0x42, 0x43,
    ];

    const TX_FRAME: [u8; 21] = [
        0x7E, 0x00, 0x11, 0x10, 0x01, 0x00, 0x13, 0xA2, 0x00, 0x40, 0xA1, 0xB2, 0xC3, 0xFF, 0xFE,
        0x00, 0x00, 0x41, 0x42, 0x43, 0x20,
    ];

    #[test]
    fn test_encode_api() {
        let frame = encode_frame(&TX_PAYLOAD, OperatingMode::Api).unwrap();
        assert_eq!(&frame[..], &TX_FRAME);
    }

    #[test]
    fn test_encode_escaped() {
        // Length 0x11 and address byte 0x13 both need escaping.
        let frame = encode_frame(&TX_PAYLOAD, OperatingMode::ApiEscaped).unwrap();
        assert_eq!(
            &frame[..],
            &[
                0x7E, 0x00, 0x7D, 0x31, 0x10, 0x01, 0x00, 0x7D, 0x33, 0xA2, 0x00, 0x40, 0xA1,
                0xB2, 0xC3, 0xFF, 0xFE, 0x00, 0x00, 0x41, 0x42, 0x43, 0x20,
            ]
        );
    }

    #[test]
    fn test_encode_too_large() {
        let payload = vec![0u8; MAX_FRAME_SIZE + 1];
        assert!(matches!(
            encode_frame(&payload, OperatingMode::Api),
            Err(FrameError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_decode_frame_roundtrip() {
        let payloads: [&[u8]; 4] = [
            &TX_PAYLOAD,
            &[0x8A, 0x00],
            &[0x7E, 0x7D, 0x11, 0x13],
            &[],
        ];
        for mode in [OperatingMode::Api, OperatingMode::ApiEscaped] {
            for payload in payloads {
                let frame = encode_frame(payload, mode).unwrap();
                let decoded = decode_frame(&frame[..], mode).unwrap();
                assert_eq!(&decoded[..], payload);
            }
        }
    }

    #[test]
    fn test_decode_max_length() {
        let payload: Vec<u8> = (0..MAX_FRAME_SIZE).map(|i| i as u8).collect();
        for mode in [OperatingMode::Api, OperatingMode::ApiEscaped] {
            let frame = encode_frame(&payload, mode).unwrap();
            let decoded = decode_frame(&frame[..], mode).unwrap();
            assert_eq!(decoded.len(), MAX_FRAME_SIZE);
            assert_eq!(&decoded[..], &payload[..]);
        }
    }

    #[test]
    fn test_decode_frame_single_bit_flip() {
        // Flip every bit of the payload and checksum (bytes 3..).
        for index in 3..TX_FRAME.len() {
            for bit in 0..8 {
                let mut frame = TX_FRAME;
                frame[index] ^= 1 << bit;
                let result = decode_frame(&frame[..], OperatingMode::Api);
                assert!(
                    matches!(result, Err(FrameError::Checksum { .. })),
                    "byte {index} bit {bit}: {result:?}"
                );
            }
        }
    }

    #[test]
    fn test_decode_frame_invalid_delimiter() {
        let mut frame = TX_FRAME;
        frame[0] = 0x7F;
        assert_eq!(
            decode_frame(&frame[..], OperatingMode::Api),
            Err(FrameError::InvalidDelimiter { skipped: 1 })
        );
    }

    #[test]
    fn test_decode_frame_incomplete() {
        let result = decode_frame(&TX_FRAME[..10], OperatingMode::Api);
        assert_eq!(
            result,
            Err(FrameError::Incomplete {
                expected: 21,
                got: 10
            })
        );
        assert!(matches!(
            decode_frame(&[0u8; 0][..], OperatingMode::Api),
            Err(FrameError::Incomplete { got: 0, .. })
        ));
        // Stream ends in the middle of an escape sequence.
        assert!(matches!(
            decode_frame(&[0x7E, 0x00, 0x7D][..], OperatingMode::ApiEscaped),
            Err(FrameError::Incomplete { .. })
        ));
    }

    #[test]
    fn test_decoder_partial_frame() {
        let mut decoder = FrameDecoder::new(OperatingMode::Api);

        decoder.feed(&TX_FRAME[..8]);
        assert_eq!(decoder.decode().unwrap(), None);
        assert_eq!(decoder.state(), DecodeState::ReadingPayload);

        decoder.feed(&TX_FRAME[8..]);
        let payload = decoder.decode().unwrap().unwrap();
        assert_eq!(&payload[..], &TX_PAYLOAD);
        assert_eq!(decoder.state(), DecodeState::SeekingDelimiter);
    }

    #[test]
    fn test_decoder_skips_garbage() {
        let mut decoder = FrameDecoder::new(OperatingMode::Api);
        decoder.feed(&[0x00, 0x42, 0x13]);
        decoder.feed(&TX_FRAME);

        assert_eq!(
            decoder.decode(),
            Err(FrameError::InvalidDelimiter { skipped: 3 })
        );
        let payload = decoder.decode().unwrap().unwrap();
        assert_eq!(&payload[..], &TX_PAYLOAD);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_decoder_checksum_then_valid() {
        let mut bad = TX_FRAME;
        bad[20] = 0x21;
        let mut decoder = FrameDecoder::new(OperatingMode::Api);
        decoder.feed(&bad);
        decoder.feed(&TX_FRAME);

        assert_eq!(
            decoder.decode(),
            Err(FrameError::Checksum {
                computed: 0x20,
                received: 0x21
            })
        );
        assert_eq!(&decoder.decode().unwrap().unwrap()[..], &TX_PAYLOAD);
        assert_eq!(decoder.decode().unwrap(), None);
    }

    #[test]
    fn test_decoder_escaped_interrupted_frame() {
        let good = encode_frame(&[0x8A, 0x02], OperatingMode::ApiEscaped).unwrap();
        let mut decoder = FrameDecoder::new(OperatingMode::ApiEscaped);
        // A frame cut short by the next delimiter.
        decoder.feed(&[0x7E, 0x00, 0x05, 0x10]);
        decoder.feed(&good);

        assert!(matches!(
            decoder.decode(),
            Err(FrameError::Incomplete {
                expected: 9,
                got: 4
            })
        ));
        assert_eq!(&decoder.decode().unwrap().unwrap()[..], &[0x8A, 0x02]);
    }

    #[test]
    fn test_decoder_escaped_byte_by_byte() {
        let frame = encode_frame(&TX_PAYLOAD, OperatingMode::ApiEscaped).unwrap();
        let mut decoder = FrameDecoder::new(OperatingMode::ApiEscaped);
        let mut decoded = None;
        for byte in &frame {
            decoder.feed(&[*byte]);
            if let Some(payload) = decoder.decode().unwrap() {
                decoded = Some(payload);
            }
        }
        assert_eq!(&decoded.unwrap()[..], &TX_PAYLOAD);
    }
}

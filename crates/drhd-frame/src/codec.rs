use bytes::{BufMut, BytesMut};

use crate::command::{CommandFrame, FRAME_LEN};
use crate::error::Result;

/// Encode a command frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────┬─────┬────────┬──────────┬──────────┬─────────────┬─────┐
/// │ Header(2B) │ Cmd │ Action │ Arg1     │ Arg2     │ Tail (4B)   │ CRC │
/// │ 0xA5 0x5B  │ 1B  │ 1B     │ (2B BE)  │ (2B BE)  │ 00 00 00 00 │ 1B  │
/// └────────────┴─────┴────────┴──────────┴──────────┴─────────────┴─────┘
/// ```
pub fn encode_frame(frame: &CommandFrame, dst: &mut BytesMut) {
    dst.reserve(FRAME_LEN);
    dst.put_slice(&frame.encode());
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// Otherwise the frame bytes are consumed from the buffer, even when they
/// fail validation, and any trailing bytes are kept for the next call.
pub fn decode_frame(src: &mut BytesMut) -> Result<Option<CommandFrame>> {
    if src.len() < FRAME_LEN {
        return Ok(None); // Need more data
    }

    let raw = src.split_to(FRAME_LEN);
    CommandFrame::decode(&raw).map(Some)
}

/// Configuration for frame readers and writers.
#[derive(Debug, Clone, Default)]
pub struct FrameConfig {
    /// Read timeout for blocking operations. `None` blocks indefinitely.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{map_port, query_port};
    use crate::error::FrameError;

    #[test]
    fn test_encode_decode_roundtrip() {
        let mut buf = BytesMut::new();
        let frame = query_port(3);

        encode_frame(&frame, &mut buf);
        assert_eq!(buf.len(), FRAME_LEN);

        let decoded = decode_frame(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, frame);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_incomplete_frame() {
        let mut buf = BytesMut::new();
        encode_frame(&query_port(1), &mut buf);
        buf.truncate(FRAME_LEN - 1);

        let result = decode_frame(&mut buf).unwrap();
        assert!(result.is_none());
        assert_eq!(buf.len(), FRAME_LEN - 1);
    }

    #[test]
    fn test_coalesced_frames_keep_remainder() {
        let mut buf = BytesMut::new();
        encode_frame(&query_port(1), &mut buf);
        encode_frame(&map_port(2, 3), &mut buf);
        buf.put_slice(&[0xA5, 0x5B, 0x02]);

        let f1 = decode_frame(&mut buf).unwrap().unwrap();
        assert_eq!(f1, query_port(1));
        let f2 = decode_frame(&mut buf).unwrap().unwrap();
        assert_eq!(f2, map_port(2, 3));

        assert!(decode_frame(&mut buf).unwrap().is_none());
        assert_eq!(buf.as_ref(), &[0xA5, 0x5B, 0x02]);
    }

    #[test]
    fn test_corrupt_frame_is_consumed() {
        let mut buf = BytesMut::new();
        encode_frame(&query_port(1), &mut buf);
        let last = buf.len() - 1;
        buf[last] ^= 0xFF;
        encode_frame(&query_port(2), &mut buf);

        let err = decode_frame(&mut buf).unwrap_err();
        assert!(matches!(err, FrameError::Checksum { .. }));
        assert_eq!(decode_frame(&mut buf).unwrap().unwrap(), query_port(2));
    }

    #[test]
    fn test_default_config_has_no_timeouts() {
        let cfg = FrameConfig::default();
        assert!(cfg.read_timeout.is_none());
        assert!(cfg.write_timeout.is_none());
    }
}

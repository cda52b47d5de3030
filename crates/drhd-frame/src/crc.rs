//! Single-byte frame checksum.

/// Base the byte sum is subtracted from.
pub const CRC_BASE: i32 = 0x100;

/// Compute the checksum of `data` (the 12 bytes preceding the crc byte).
///
/// `0x100` minus the sum of the bytes read as signed integers. A negative
/// result is raised by repeatedly adding `0xFF` and then adding 1 once. The
/// low byte of the result goes on the wire.
///
/// This is not `(0x100 - sum) mod 256`: the two differ whenever more than
/// one `0xFF` step is needed. Devices compute it this way, keep it.
pub fn checksum(data: &[u8]) -> u8 {
    let sum: i32 = data.iter().map(|&b| i32::from(b as i8)).sum();
    let mut crc = CRC_BASE - sum;
    if crc < 0 {
        while crc < 0 {
            crc += 0xFF;
        }
        crc += 1;
    }
    (crc & 0xFF) as u8
}

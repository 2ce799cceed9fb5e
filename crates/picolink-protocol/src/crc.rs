//! CRC-16/Modbus.
//!
//! Reflected polynomial `0xA001`, initial register `0xFFFF`, no final XOR,
//! bits processed LSB first. The result goes on the wire low byte first.

/// Reflected CRC-16/Modbus polynomial.
pub const POLY: u16 = 0xA001;

/// Initial register value. Also the checksum of an empty input.
pub const INIT: u16 = 0xFFFF;

/// Compute the CRC-16/Modbus of `data`.
///
/// # Example
///
/// ```
/// use picolink_protocol::crc::checksum;
///
/// assert_eq!(checksum(b""), 0xFFFF);
/// assert_eq!(checksum(b"123456789"), 0x4B37);
/// ```
pub fn checksum(data: &[u8]) -> u16 {
    data.iter().fold(INIT, |crc, &byte| update(crc, byte))
}

fn update(mut crc: u16, byte: u8) -> u16 {
    crc ^= u16::from(byte);
    for _ in 0..8 {
        let lsb = crc & 0x0001 != 0;
        crc >>= 1;
        if lsb {
            crc ^= POLY;
        }
    }
    crc
}

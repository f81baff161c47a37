//! Board identity

/// Source of the board's factory-programmed unique id
pub trait BoardId {
    /// The 8-byte unique id, most significant byte first
    fn unique_id(&mut self) -> [u8; 8];
}

/// Fold a unique id into a 32-bit serial number
///
/// The bytes are accumulated big-endian into a `u64` and the low 32 bits
/// are kept.
pub fn serial_number(id: &[u8; 8]) -> u32 {
    id.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_number_truncates() {
        let id = [0xde, 0xad, 0xbe, 0xef, 0x01, 0x02, 0x03, 0x04];
        assert_eq!(serial_number(&id), 0x0102_0304);
    }
}

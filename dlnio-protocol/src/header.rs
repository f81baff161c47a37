//! Message header encoding and decoding.
//!
//! Header layout (8 bytes, little-endian):
//! - SIZE (2 bytes): total message length including this header
//! - ID (2 bytes): `command | module << 8`
//! - ECHO (2 bytes): opaque host tag, copied into the response
//! - HANDLE (2 bytes): addressed function block
//!
//! A response header is the same 8 bytes followed by RESULT (2 bytes).

/// Request / event header size in bytes
pub const HEADER_SIZE: usize = 8;

/// Response header size (header + result code)
pub const RESPONSE_HEADER_SIZE: usize = HEADER_SIZE + 2;

/// Largest payload carried by a single message
pub const MAX_PAYLOAD_SIZE: usize = 256;

/// Largest complete message (response header + maximum payload)
pub const MAX_MESSAGE_SIZE: usize = MAX_PAYLOAD_SIZE + RESPONSE_HEADER_SIZE;

/// Errors from reading or writing wire structures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WireError {
    /// Fewer bytes than the structure needs
    Truncated,
    /// Output buffer too small
    BufferTooSmall,
}

/// Message header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Header {
    /// Total message size in bytes, header included
    pub size: u16,
    /// Command id (module in the high byte)
    pub id: u16,
    /// Host-chosen tag echoed back in the response
    pub echo: u16,
    /// Target handle
    pub handle: u16,
}

impl Header {
    /// Decode a header from the first 8 bytes of `buf`
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < HEADER_SIZE {
            return Err(WireError::Truncated);
        }
        Ok(Self {
            size: read_u16(buf, 0),
            id: read_u16(buf, 2),
            echo: read_u16(buf, 4),
            handle: read_u16(buf, 6),
        })
    }

    /// Encode this header into the first 8 bytes of `buf`
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, WireError> {
        if buf.len() < HEADER_SIZE {
            return Err(WireError::BufferTooSmall);
        }
        write_u16(buf, 0, self.size);
        write_u16(buf, 2, self.id);
        write_u16(buf, 4, self.echo);
        write_u16(buf, 6, self.handle);
        Ok(HEADER_SIZE)
    }

    /// Payload length declared by `size`, or `None` if `size` is below
    /// the header length
    pub fn payload_len(&self) -> Option<usize> {
        (self.size as usize).checked_sub(HEADER_SIZE)
    }

    /// Encode a response header: this header with `size` replaced and
    /// `result` appended
    ///
    /// Returns the number of bytes written (always 10).
    pub fn encode_response(
        &self,
        payload_len: usize,
        result: u16,
        buf: &mut [u8],
    ) -> Result<usize, WireError> {
        if buf.len() < RESPONSE_HEADER_SIZE {
            return Err(WireError::BufferTooSmall);
        }
        let header = Header {
            size: (RESPONSE_HEADER_SIZE + payload_len) as u16,
            ..*self
        };
        header.encode(buf)?;
        write_u16(buf, HEADER_SIZE, result);
        Ok(RESPONSE_HEADER_SIZE)
    }
}

/// Read a little-endian u16 at `offset`
pub fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

/// Read a little-endian u32 at `offset`
pub fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

/// Write a little-endian u16 at `offset`
pub fn write_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

/// Write a little-endian u32 at `offset`
pub fn write_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

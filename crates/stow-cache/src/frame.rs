//! On-disk entry framing.
//!
//! ```text
//! [4 bytes: payload length (little-endian u32)]
//! [4 bytes: CRC32 of payload (little-endian u32)]
//! [N bytes: payload]
//! ```

/// Header size: 4 bytes length + 4 bytes CRC.
pub const HEADER_SIZE: usize = 8;

/// Frame `payload` for writing.
pub fn encode(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&crc32fast::hash(payload).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

/// Validate a frame and return its payload.
pub fn decode(frame: &[u8]) -> Result<&[u8], String> {
    if frame.len() < HEADER_SIZE {
        return Err(format!("{} bytes is shorter than the header", frame.len()));
    }
    let length = u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
    let expected_crc = u32::from_le_bytes([frame[4], frame[5], frame[6], frame[7]]);
    let payload = &frame[HEADER_SIZE..];
    if payload.len() != length {
        return Err(format!("length {length} but {} payload bytes", payload.len()));
    }
    let actual_crc = crc32fast::hash(payload);
    if actual_crc != expected_crc {
        return Err(format!("crc {actual_crc:08x}, expected {expected_crc:08x}"));
    }
    Ok(payload)
}

//! Wire framing: `be32(index) || payload`. No length field and no checksum —
//! the transport supplies record boundaries and integrity; this layer only
//! needs to recover the index.

use auralink_foundation::TransportError;

/// Serialize `(index, payload)` into one wire record.
pub fn frame(index: u32, payload: &[u8]) -> Vec<u8> {
    let mut record = Vec::with_capacity(4 + payload.len());
    record.extend_from_slice(&index.to_be_bytes());
    record.extend_from_slice(payload);
    record
}

/// Parse one wire record back into `(index, payload)`. The payload is always
/// copied out of `record`, never aliased, because the transport's receive
/// buffer is typically reused for the next datagram.
pub fn deframe(record: &[u8]) -> Result<(u32, Vec<u8>), TransportError> {
    if record.len() < 4 {
        return Err(TransportError::RecordTooShort { len: record.len() });
    }
    let index = u32::from_be_bytes([record[0], record[1], record[2], record[3]]);
    let payload = record[4..].to_vec();
    Ok((index, payload))
}

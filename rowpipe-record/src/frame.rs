//! Length-prefixed record framing
//!
//! Each record is the bincode encoding of one row's columns behind a
//! fixed `u64` little-endian length prefix. The framing carries no
//! checksums or compression; shard completeness is accounted for by the
//! manifest, not the frames.

use std::io::{self, Read, Write};

use rowpipe_core::{Result, Tensor};

/// Size of the length prefix in bytes
pub const LENGTH_PREFIX_BYTES: usize = 8;

/// Write one record; returns the bytes written including the prefix
pub fn write_record<W: Write>(writer: &mut W, columns: &[Tensor]) -> Result<u64> {
    let payload = bincode::serialize(columns)?;
    writer.write_all(&(payload.len() as u64).to_le_bytes())?;
    writer.write_all(&payload)?;

    Ok((LENGTH_PREFIX_BYTES + payload.len()) as u64)
}

/// Read one record; `None` on a clean end of stream
pub fn read_record<R: Read>(reader: &mut R) -> Result<Option<Vec<Tensor>>> {
    let mut length_bytes = [0u8; LENGTH_PREFIX_BYTES];
    match reader.read_exact(&mut length_bytes) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            // End of stream
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    }

    let length = u64::from_le_bytes(length_bytes) as usize;
    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload)?;

    let columns = bincode::deserialize(&payload)?;
    Ok(Some(columns))
}

/// Decode one record from an in-memory shard image
///
/// Returns the columns and the offset of the next record, or `None`
/// when `offset` sits exactly at the end of the image.
pub fn decode_record(image: &[u8], offset: usize) -> Result<Option<(Vec<Tensor>, usize)>> {
    if offset >= image.len() {
        return Ok(None);
    }
    if offset + LENGTH_PREFIX_BYTES > image.len() {
        return Err(truncated("record length prefix extends past end of shard"));
    }

    let mut length_bytes = [0u8; LENGTH_PREFIX_BYTES];
    length_bytes.copy_from_slice(&image[offset..offset + LENGTH_PREFIX_BYTES]);
    let length = u64::from_le_bytes(length_bytes) as usize;

    let start = offset + LENGTH_PREFIX_BYTES;
    let end = start
        .checked_add(length)
        .ok_or_else(|| truncated("record length overflows the shard image"))?;
    if end > image.len() {
        return Err(truncated("record payload extends past end of shard"));
    }

    let columns = bincode::deserialize(&image[start..end])?;
    Ok(Some((columns, end)))
}

fn truncated(message: &str) -> rowpipe_core::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, message.to_string()).into()
}

//! Length-prefixed frame codec shared by the server and the identity client.
//!
//! Frame: [4-byte length BE] [MessagePack payload]

use std::io::{Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Frames larger than this are rejected before allocation.
pub const MAX_MESSAGE_SIZE: usize = 100 * 1024 * 1024;

/// Read one frame. Returns `Ok(None)` on clean EOF before the length prefix.
pub fn read_message<R: Read>(stream: &mut R) -> std::io::Result<Option<Vec<u8>>> {
    // Read 4-byte length prefix (big-endian)
    let mut len_buf = [0u8; 4];
    match stream.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Message too large: {} bytes", len),
        ));
    }

    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf)?;

    Ok(Some(buf))
}

/// Write one frame. Payloads over `MAX_MESSAGE_SIZE` are refused before any byte is sent.
pub fn write_message<W: Write>(stream: &mut W, data: &[u8]) -> std::io::Result<()> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Message too large: {} bytes", data.len()),
        ));
    }
    let len = data.len() as u32;
    stream.write_all(&len.to_be_bytes())?;
    stream.write_all(data)?;
    stream.flush()?;
    Ok(())
}

/// MessagePack-encode with field names, as every peer on this protocol expects.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, rmp_serde::encode::Error> {
    rmp_serde::to_vec_named(value)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, rmp_serde::decode::Error> {
    rmp_serde::from_slice(bytes)
}

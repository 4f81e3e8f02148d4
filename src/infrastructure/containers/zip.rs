//! ZIP entry listing
//!
//! Reads names from the central directory, located through the end of
//! central directory record at the tail of the file. When no usable central
//! directory exists (truncated archives), falls back to walking local file
//! headers from the front.

use crate::domain::entities::ContainerKind;
use crate::domain::repositories::{Buffer, BufferError, ContainerReader};
use memchr::memmem;
use tracing::trace;

const LOCAL_HEADER_SIG: &[u8] = b"PK\x03\x04";
const CENTRAL_HEADER_SIG: &[u8] = b"PK\x01\x02";
const EOCD_SIG: &[u8] = b"PK\x05\x06";
const LOCAL_HEADER_LEN: usize = 30;
const CENTRAL_HEADER_LEN: usize = 46;
const EOCD_LEN: usize = 22;
/// EOCD record plus the longest possible archive comment
const EOCD_SEARCH_LEN: usize = EOCD_LEN + u16::MAX as usize;
const DATA_DESCRIPTOR_FLAG: u16 = 1 << 3;
const MAX_ENTRIES: usize = 65_536;

#[derive(Debug, Clone, Copy, Default)]
pub struct ZipReader;

impl ZipReader {
    pub fn new() -> Self {
        Self
    }

    fn central_directory(&self, buffer: &dyn Buffer) -> Result<Option<Vec<String>>, BufferError> {
        let tail = buffer.eof_slice(0, EOCD_SEARCH_LEN)?;
        let Some(pos) = memmem::rfind(tail, EOCD_SIG) else {
            return Ok(None);
        };
        let eocd = &tail[pos..];
        if eocd.len() < EOCD_LEN {
            return Ok(None);
        }
        let total = le_u16(eocd, 10) as usize;
        let cd_size = le_u32(eocd, 12) as usize;
        let cd_offset = le_u32(eocd, 16) as u64;
        if cd_offset > buffer.size() {
            return Ok(None);
        }

        let cd = buffer.slice(cd_offset, cd_size)?;
        let mut names = Vec::with_capacity(total.min(MAX_ENTRIES));
        let mut at = 0usize;
        while names.len() < total.min(MAX_ENTRIES) {
            let Some(header) = cd.get(at..at + CENTRAL_HEADER_LEN) else {
                break;
            };
            if &header[..4] != CENTRAL_HEADER_SIG {
                break;
            }
            let name_len = le_u16(header, 28) as usize;
            let extra_len = le_u16(header, 30) as usize;
            let comment_len = le_u16(header, 32) as usize;
            let name_start = at + CENTRAL_HEADER_LEN;
            let Some(name) = cd.get(name_start..name_start + name_len) else {
                break;
            };
            names.push(String::from_utf8_lossy(name).into_owned());
            at = name_start + name_len + extra_len + comment_len;
        }

        if names.is_empty() && total > 0 {
            return Ok(None);
        }
        Ok(Some(names))
    }

    fn local_headers(&self, buffer: &dyn Buffer) -> Result<Vec<String>, BufferError> {
        let mut names = Vec::new();
        let mut offset = 0u64;
        while names.len() < MAX_ENTRIES {
            let header = buffer.slice(offset, LOCAL_HEADER_LEN)?;
            if header.len() < LOCAL_HEADER_LEN || &header[..4] != LOCAL_HEADER_SIG {
                break;
            }
            let flags = le_u16(header, 6);
            let compressed = le_u32(header, 18) as u64;
            let name_len = le_u16(header, 26) as usize;
            let extra_len = le_u16(header, 28) as u64;

            let name_offset = offset + LOCAL_HEADER_LEN as u64;
            let name = buffer.slice(name_offset, name_len)?;
            if name.len() < name_len {
                break;
            }
            names.push(String::from_utf8_lossy(name).into_owned());

            // Sizes live in a trailing descriptor; the walk cannot continue.
            if flags & DATA_DESCRIPTOR_FLAG != 0 && compressed == 0 {
                break;
            }
            offset = name_offset + name_len as u64 + extra_len + compressed;
            if offset >= buffer.size() {
                break;
            }
        }
        Ok(names)
    }
}

impl ContainerReader for ZipReader {
    fn kind(&self) -> ContainerKind {
        ContainerKind::Zip
    }

    fn sniff(&self, buffer: &dyn Buffer) -> bool {
        buffer
            .slice(0, LOCAL_HEADER_SIG.len())
            .is_ok_and(|head| head == LOCAL_HEADER_SIG)
    }

    fn entries(&self, buffer: &dyn Buffer) -> Result<Vec<String>, BufferError> {
        if let Some(names) = self.central_directory(buffer)? {
            return Ok(names);
        }
        trace!("No central directory, walking local headers");
        self.local_headers(buffer)
    }
}

fn le_u16(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

fn le_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

/// Builds a minimal stored (uncompressed) ZIP archive
///
/// Used by tests across the crate to produce container fixtures.
#[cfg(test)]
pub(crate) fn build_stored_zip(entries: &[(&str, &[u8])], with_central_directory: bool) -> Vec<u8> {
    let mut out = Vec::new();
    let mut central = Vec::new();
    for (name, data) in entries {
        let offset = out.len() as u32;
        out.extend_from_slice(LOCAL_HEADER_SIG);
        out.extend_from_slice(&20u16.to_le_bytes()); // version
        out.extend_from_slice(&0u16.to_le_bytes()); // flags
        out.extend_from_slice(&0u16.to_le_bytes()); // stored
        out.extend_from_slice(&[0; 8]); // time, date, crc
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(data);

        central.extend_from_slice(CENTRAL_HEADER_SIG);
        central.extend_from_slice(&[0; 16]); // versions, flags, method, time, date, crc
        central.extend_from_slice(&(data.len() as u32).to_le_bytes());
        central.extend_from_slice(&(data.len() as u32).to_le_bytes());
        central.extend_from_slice(&(name.len() as u16).to_le_bytes());
        central.extend_from_slice(&[0; 12]); // extra, comment, disk, attrs
        central.extend_from_slice(&offset.to_le_bytes());
        central.extend_from_slice(name.as_bytes());
    }
    if with_central_directory {
        let cd_offset = out.len() as u32;
        out.extend_from_slice(&central);
        out.extend_from_slice(EOCD_SIG);
        out.extend_from_slice(&[0; 4]); // disk numbers
        out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        out.extend_from_slice(&(central.len() as u32).to_le_bytes());
        out.extend_from_slice(&cd_offset.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
    }
    out
}

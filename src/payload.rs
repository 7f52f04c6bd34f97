// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Command-specific payload layouts

use crate::error::{Error, Result};
use crate::protocol::*;

fn malformed(what: &'static str, reason: impl Into<String>) -> Error {
    Error::Malformed { what, reason: reason.into() }
}

// ============================================================================
// Filenames
// ============================================================================

/// Strips everything up to the last path separator
pub fn basename(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Null-padded 64-byte slot holding the basename, truncated on a character
/// boundary if it does not fit
pub fn encode_name(name: &str) -> [u8; NAME_LEN] {
    let name = basename(name);
    let mut end = name.len().min(NAME_LEN);
    while !name.is_char_boundary(end) {
        end -= 1;
    }

    let mut slot = [0u8; NAME_LEN];
    slot[..end].copy_from_slice(&name.as_bytes()[..end]);
    slot
}

pub fn decode_name(slot: &[u8]) -> String {
    let end = slot.iter().position(|&b| b == 0).unwrap_or(slot.len());
    let name = String::from_utf8_lossy(&slot[..end]);
    basename(&name).to_string()
}

// ============================================================================
// HANDSHAKE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handshake {
    pub version: u8,
    pub timestamp: u32,
}

impl Handshake {
    pub const LEN: usize = 5;

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::LEN);
        out.push(self.version);
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        out
    }

    pub fn parse(payload: &[u8]) -> Result<Handshake> {
        if payload.len() < Self::LEN {
            return Err(malformed("handshake", format!("{} bytes, need {}", payload.len(), Self::LEN)));
        }
        Ok(Handshake {
            version: payload[0],
            timestamp: u32::from_le_bytes([payload[1], payload[2], payload[3], payload[4]]),
        })
    }
}

// ============================================================================
// FILE_LIST
// ============================================================================

pub fn encode_file_list<S: AsRef<str>>(names: &[S]) -> Result<Vec<u8>> {
    let count = u8::try_from(names.len()).map_err(|_| Error::TooManyFiles(names.len()))?;

    let mut out = Vec::with_capacity(1 + names.len() * NAME_LEN);
    out.push(count);
    for name in names {
        out.extend_from_slice(&encode_name(name.as_ref()));
    }
    Ok(out)
}

pub fn parse_file_list(payload: &[u8]) -> Result<Vec<String>> {
    let Some((&count, slots)) = payload.split_first() else {
        return Err(malformed("file list", "empty payload"));
    };

    let needed = usize::from(count) * NAME_LEN;
    if slots.len() < needed {
        return Err(malformed("file list", format!("{} files need {} name bytes, got {}", count, needed, slots.len())));
    }

    let names: Vec<String> = slots[..needed].chunks(NAME_LEN).map(decode_name).collect();
    if let Some(pos) = names.iter().position(|n| n.is_empty()) {
        return Err(malformed("file list", format!("entry {} has no name", pos + 1)));
    }
    Ok(names)
}

// ============================================================================
// FILE_DATA (info form)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub index: u8,
    pub size: u32,
    pub name: String,
}

impl FileInfo {
    pub const LEN: usize = 1 + 4 + NAME_LEN;

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::LEN);
        out.push(self.index);
        out.extend_from_slice(&self.size.to_le_bytes());
        out.extend_from_slice(&encode_name(&self.name));
        out
    }

    pub fn parse(payload: &[u8]) -> Result<FileInfo> {
        if payload.len() < Self::LEN {
            return Err(malformed("file info", format!("{} bytes, need {}", payload.len(), Self::LEN)));
        }

        let name = decode_name(&payload[5..Self::LEN]);
        if name.is_empty() {
            return Err(malformed("file info", "no filename"));
        }

        Ok(FileInfo {
            index: payload[0],
            size: u32::from_le_bytes([payload[1], payload[2], payload[3], payload[4]]),
            name,
        })
    }
}

// ============================================================================
// FILE_DATA (chunk form)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub index: u16,
    pub data: &'a [u8],
}

impl<'a> Chunk<'a> {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let size = u16::try_from(self.data.len())
            .ok()
            .filter(|&n| usize::from(n) <= MAX_CHUNK_SIZE)
            .ok_or(Error::PayloadTooLarge(self.data.len() + CHUNK_HEADER_LEN))?;

        let mut out = Vec::with_capacity(CHUNK_HEADER_LEN + self.data.len());
        out.extend_from_slice(&self.index.to_le_bytes());
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(self.data);
        Ok(out)
    }

    /// Bytes past the announced chunk size are ignored
    pub fn parse(payload: &'a [u8]) -> Result<Chunk<'a>> {
        if payload.len() < CHUNK_HEADER_LEN {
            return Err(malformed("chunk", format!("{} bytes, need at least {}", payload.len(), CHUNK_HEADER_LEN)));
        }

        let index = u16::from_le_bytes([payload[0], payload[1]]);
        let size = usize::from(u16::from_le_bytes([payload[2], payload[3]]));
        let body = &payload[CHUNK_HEADER_LEN..];
        if size > body.len() {
            return Err(malformed("chunk", format!("chunk {} claims {} bytes, carries {}", index, size, body.len())));
        }
        if size == 0 {
            return Err(malformed("chunk", format!("chunk {} is empty", index)));
        }

        Ok(Chunk { index, data: &body[..size] })
    }
}

// ============================================================================
// Tests
// ============================================================================

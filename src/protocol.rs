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

//! USB CDC transfer protocol constants

use std::fmt;
use std::time::Duration;

/// Frame sentinel, sent little-endian as `55 AA`
pub const MAGIC: u16 = 0xAA55;

/// magic(2) + command(1) + length(2) + checksum(1)
pub const HEADER_LEN: usize = 6;

/// Largest payload the 16-bit length field can describe
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

/// Fixed width of a filename slot in FILE_LIST and file-info payloads
pub const NAME_LEN: usize = 64;

/// Default number of file bytes carried by one chunk frame
pub const CHUNK_SIZE: usize = 512;

/// chunk_index(2) + chunk_size(2)
pub const CHUNK_HEADER_LEN: usize = 4;

/// Largest chunk that still fits a frame once the chunk header is added
pub const MAX_CHUNK_SIZE: usize = MAX_PAYLOAD - CHUNK_HEADER_LEN;

/// Protocol version announced in the handshake
pub const PROTOCOL_VERSION: u8 = 1;

/// Overall budget for a valid handshake to arrive
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-frame ACK wait during active transfer
pub const ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a data sink waits for the peer's next frame
pub const FRAME_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest single read while waiting on the peer
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Command byte of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Initiator announces protocol version and timestamp
    Handshake = 0x01,
    /// Data source announces the files it is about to send
    FileList = 0x02,
    /// File info or one chunk of file content
    FileData = 0x03,
    /// End of a file; redundant with the announced size
    FileEnd = 0x04,
    /// Previous frame accepted
    Ack = 0x05,
    /// Previous frame rejected, the sender should resend
    Nack = 0x06,
    /// Host asks the device to accept a configuration file
    ConfigRequest = 0x07,
}

impl Command {
    pub fn from_byte(byte: u8) -> Option<Command> {
        match byte {
            0x01 => Some(Command::Handshake),
            0x02 => Some(Command::FileList),
            0x03 => Some(Command::FileData),
            0x04 => Some(Command::FileEnd),
            0x05 => Some(Command::Ack),
            0x06 => Some(Command::Nack),
            0x07 => Some(Command::ConfigRequest),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::Handshake => "HANDSHAKE",
            Command::FileList => "FILE_LIST",
            Command::FileData => "FILE_DATA",
            Command::FileEnd => "FILE_END",
            Command::Ack => "ACK",
            Command::Nack => "NACK",
            Command::ConfigRequest => "CONFIG_REQUEST",
        };
        f.write_str(name)
    }
}

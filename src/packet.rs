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

//! Frame codec: `magic(2) command(1) length(2) checksum(1) payload(length)`,
//! all little-endian. The checksum is an XOR-fold of the payload only.

use std::time::{Duration, Instant};
use tracing::debug;
use crate::error::{Error, Result};
use crate::protocol::*;
use crate::serial::Transport;

// ============================================================================
// Checksum
// ============================================================================

pub fn checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(0u8, |acc, &b| acc ^ b)
}

pub fn verify_checksum(payload: &[u8], claimed: u8) -> bool {
    checksum(payload) == claimed
}

// ============================================================================
// Header & Frame
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub magic: u16,
    /// Raw command byte; see [`Header::command`]
    pub command: u8,
    pub length: u16,
    pub checksum: u8,
}

impl Header {
    pub fn parse(bytes: &[u8; HEADER_LEN]) -> Result<Header> {
        let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
        if magic != MAGIC {
            return Err(Error::BadMagic { expected: MAGIC, got: magic });
        }

        Ok(Header {
            magic,
            command: bytes[2],
            length: u16::from_le_bytes([bytes[3], bytes[4]]),
            checksum: bytes[5],
        })
    }

    pub fn command(&self) -> Result<Command> {
        Command::from_byte(self.command).ok_or(Error::UnknownCommand(self.command))
    }
}

/// A complete frame whose checksum has been verified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    pub payload: Vec<u8>,
}

/// Builds a complete frame. Payloads over 65535 bytes cannot be described by
/// the length field.
pub fn encode(command: Command, payload: &[u8]) -> Result<Vec<u8>> {
    let length = u16::try_from(payload.len())
        .map_err(|_| Error::PayloadTooLarge(payload.len()))?;

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&MAGIC.to_le_bytes());
    frame.push(command.as_byte());
    frame.extend_from_slice(&length.to_le_bytes());
    frame.push(checksum(payload));
    frame.extend_from_slice(payload);
    Ok(frame)
}

// ============================================================================
// Reading
// ============================================================================

/// Reads exactly `len` bytes unless `timeout` runs out first
fn read_exact_within(port: &mut dyn Transport, len: usize, timeout: Duration) -> Result<Vec<u8>> {
    let deadline = Instant::now() + timeout;
    let mut buf = vec![0u8; len];
    let mut filled = 0;

    while filled < len {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        match port.read_timeout(&mut buf[filled..], remaining) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) if matches!(e.kind(), std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock) => break,
            Err(e) => return Err(Error::Io(e)),
        }
    }

    if filled < len {
        return Err(Error::ShortRead { expected: len, got: filled });
    }
    Ok(buf)
}

pub fn decode_header(port: &mut dyn Transport, timeout: Duration) -> Result<Header> {
    let bytes = read_exact_within(port, HEADER_LEN, timeout)?;
    let mut raw = [0u8; HEADER_LEN];
    raw.copy_from_slice(&bytes);
    let header = Header::parse(&raw)?;
    debug!("Received header: cmd=0x{:02X} len={} checksum=0x{:02X}",
           header.command, header.length, header.checksum);
    Ok(header)
}

pub fn read_payload(port: &mut dyn Transport, length: u16, timeout: Duration) -> Result<Vec<u8>> {
    read_exact_within(port, usize::from(length), timeout)
}

/// Reads one frame: header, then payload, then checksum, then command. The
/// payload is always drained so an unknown command does not desync the stream.
///
/// Returns silence after `poll` when not one byte has arrived. Once the first
/// byte is in, the rest of the frame gets `timeout`.
pub fn poll_frame(port: &mut dyn Transport, poll: Duration, timeout: Duration) -> Result<Frame> {
    let partial = |got: usize| Error::ShortRead { expected: HEADER_LEN, got };

    let first = match read_exact_within(port, 1, poll) {
        Ok(bytes) => bytes,
        Err(Error::ShortRead { got, .. }) => return Err(partial(got)),
        Err(e) => return Err(e),
    };
    let rest = match read_exact_within(port, HEADER_LEN - 1, timeout) {
        Ok(bytes) => bytes,
        Err(Error::ShortRead { got, .. }) => return Err(partial(got + 1)),
        Err(e) => return Err(e),
    };

    let mut raw = [0u8; HEADER_LEN];
    raw[0] = first[0];
    raw[1..].copy_from_slice(&rest);
    let header = Header::parse(&raw)?;
    debug!("Received header: cmd=0x{:02X} len={} checksum=0x{:02X}",
           header.command, header.length, header.checksum);
    read_body(port, header, timeout)
}

fn read_body(port: &mut dyn Transport, header: Header, timeout: Duration) -> Result<Frame> {
    let payload = read_payload(port, header.length, timeout)?;

    if !verify_checksum(&payload, header.checksum) {
        return Err(Error::ChecksumMismatch {
            claimed: header.checksum,
            computed: checksum(&payload),
        });
    }

    Ok(Frame { command: header.command()?, payload })
}

// ============================================================================
// Writing & Lock-step Replies
// ============================================================================

pub fn write_frame(port: &mut dyn Transport, command: Command, payload: &[u8]) -> Result<()> {
    let frame = encode(command, payload)?;
    port.write_all(&frame)?;
    debug!("Sent: {} ({} byte payload)", command, payload.len());
    Ok(())
}

pub fn send_ack(port: &mut dyn Transport) -> Result<()> {
    write_frame(port, Command::Ack, &[])
}

pub fn send_nack(port: &mut dyn Transport) -> Result<()> {
    write_frame(port, Command::Nack, &[])
}

/// Peer's verdict on the frame we just sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Ack,
    Nack,
}

/// Waits for the ACK or NACK answering the last frame sent. Any payload riding
/// on the reply is read and discarded.
pub fn await_reply(port: &mut dyn Transport, timeout: Duration) -> Result<Reply> {
    let header = decode_header(port, timeout)?;
    if header.length > 0 {
        read_payload(port, header.length, timeout)?;
    }

    match header.command()? {
        Command::Ack => Ok(Reply::Ack),
        Command::Nack => Ok(Reply::Nack),
        other => Err(Error::UnexpectedCommand { expected: "ACK or NACK", got: other }),
    }
}

// ============================================================================
// Tests
// ============================================================================

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

use std::time::Duration;
use thiserror::Error;
use crate::protocol::Command;
use crate::session::Phase;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid magic: expected 0x{expected:04X}, got 0x{got:04X}")]
    BadMagic { expected: u16, got: u16 },

    #[error("short read: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },

    #[error("checksum mismatch: frame claims 0x{claimed:02X}, payload folds to 0x{computed:02X}")]
    ChecksumMismatch { claimed: u8, computed: u8 },

    #[error("unknown command byte 0x{0:02X}")]
    UnknownCommand(u8),

    #[error("unexpected command: expected {expected}, got {got}")]
    UnexpectedCommand { expected: &'static str, got: Command },

    #[error("malformed {what} payload: {reason}")]
    Malformed { what: &'static str, reason: String },

    #[error("chunk sequence mismatch: expected {expected}, got {got}")]
    SequenceMismatch { expected: u16, got: u16 },

    #[error("byte overrun: {name} announced {announced} bytes, chunk would bring it to {would_have}")]
    ByteOverrun { name: String, announced: u32, would_have: u64 },

    #[error("no valid handshake within {0:?}")]
    HandshakeTimeout(Duration),

    #[error("transfer incomplete: {name} announced {announced} bytes, got {received}")]
    TransferIncomplete { name: String, announced: u32, received: u64 },

    #[error("peer rejected {0}")]
    Rejected(String),

    #[error("payload of {0} bytes does not fit a frame")]
    PayloadTooLarge(usize),

    #[error("{name} is {size} bytes, too large to send")]
    FileTooLarge { name: String, size: usize },

    #[error("{0} files do not fit a file list")]
    TooManyFiles(usize),

    #[error("invalid session state: {0}")]
    InvalidState(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cancelled")]
    Cancelled,
}

/// Session settings that cannot drive a session
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("chunk size must be between 1 and {max} bytes, got {got}")]
    ChunkSize { got: usize, max: usize },

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Plan settings the device would refuse
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SettingsError {
    #[error("plan must be between {first} and {last}, got {plan}")]
    PlanOutOfRange { plan: u8, first: u8, last: u8 },

    #[error("min temp {min} is above max temp {max}")]
    TemperatureRange { min: i32, max: i32 },
}

impl Error {
    /// Errors that describe one bad frame rather than a broken session. The
    /// receiving side answers them with NACK and waits for the peer to resend.
    pub fn is_frame_error(&self) -> bool {
        match self {
            Error::BadMagic { .. }
            | Error::ChecksumMismatch { .. }
            | Error::UnknownCommand(_)
            | Error::Malformed { .. } => true,
            Error::ShortRead { got, .. } => *got > 0,
            _ => false,
        }
    }

    /// A read that saw no bytes at all before its deadline.
    pub fn is_silence(&self) -> bool {
        matches!(self, Error::ShortRead { got: 0, .. })
    }
}

/// Terminal error of a session, tagged with the phase it failed in
#[derive(Error, Debug)]
#[error("session failed while {phase}: {error}")]
pub struct SessionError {
    pub phase: Phase,
    #[source]
    pub error: Error,
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_errors() {
        assert!(Error::BadMagic { expected: 0xAA55, got: 0 }.is_frame_error());
        assert!(Error::ChecksumMismatch { claimed: 1, computed: 2 }.is_frame_error());
        assert!(Error::ShortRead { expected: 6, got: 3 }.is_frame_error());
        assert!(!Error::ShortRead { expected: 6, got: 0 }.is_frame_error());
        assert!(Error::ShortRead { expected: 6, got: 0 }.is_silence());
        assert!(!Error::SequenceMismatch { expected: 1, got: 2 }.is_frame_error());
        assert!(!Error::Rejected("chunk 0".into()).is_frame_error());
        assert!(!Error::InvalidState("idle").is_frame_error());
        assert!(!Error::Config(ConfigError::ZeroTimeout("frame timeout")).is_frame_error());
    }

    #[test]
    fn test_session_error_display() {
        let err = SessionError {
            phase: Phase::TransferringFile,
            error: Error::SequenceMismatch { expected: 3, got: 5 },
        };
        assert_eq!(
            err.to_string(),
            "session failed while transferring file: chunk sequence mismatch: expected 3, got 5"
        );
    }

    #[test]
    fn test_config_error_display() {
        assert_eq!(
            ConfigError::ChunkSize { got: 0, max: 1020 }.to_string(),
            "chunk size must be between 1 and 1020 bytes, got 0"
        );
        assert_eq!(
            Error::from(ConfigError::ZeroTimeout("ACK timeout")).to_string(),
            "ACK timeout must be greater than zero"
        );
    }
}

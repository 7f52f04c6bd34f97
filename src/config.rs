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

//! Session settings

use std::fmt;
use std::time::Duration;
use crate::error::ConfigError;
use crate::protocol::*;

/// Which side sends the HANDSHAKE frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Initiator,
    Responder,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Initiator => f.write_str("initiator"),
            Role::Responder => f.write_str("responder"),
        }
    }
}

/// What follows the handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// FILE_LIST exchange, then every listed file (result pull)
    FileList,
    /// One predetermined file, no list (configuration push)
    SingleFile,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub role: Role,
    pub mode: TransferMode,

    /// Overall budget for a valid handshake
    pub handshake_timeout: Duration,

    /// Wait for the ACK/NACK answering a frame we sent
    pub ack_timeout: Duration,

    /// Wait for the peer's next frame while receiving
    pub frame_timeout: Duration,

    /// File bytes per chunk frame
    pub chunk_size: usize,

    /// Consecutive NACKed frames tolerated outside the handshake
    pub max_rejected_frames: u32,

    /// Version announced when this side initiates
    pub protocol_version: u8,

    /// Timestamp announced when this side initiates; the system clock if None
    pub announce_timestamp: Option<u32>,

    /// Longest single read while waiting for the peer. Cancellation is
    /// noticed between reads.
    pub poll_interval: Duration,

    /// Start right after the handshake, for firmware that sends none
    pub skip_handshake: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            role: Role::Responder,
            mode: TransferMode::FileList,
            handshake_timeout: HANDSHAKE_TIMEOUT,
            ack_timeout: ACK_TIMEOUT,
            frame_timeout: FRAME_TIMEOUT,
            chunk_size: CHUNK_SIZE,
            max_rejected_frames: 5,
            protocol_version: PROTOCOL_VERSION,
            announce_timestamp: None,
            poll_interval: POLL_INTERVAL,
            skip_handshake: false,
        }
    }
}

impl SessionConfig {
    pub fn new(role: Role, mode: TransferMode) -> Self {
        Self { role, mode, ..Self::default() }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::ChunkSize { got: self.chunk_size, max: MAX_CHUNK_SIZE });
        }
        for (name, value) in [
            ("handshake timeout", self.handshake_timeout),
            ("ACK timeout", self.ack_timeout),
            ("frame timeout", self.frame_timeout),
            ("poll interval", self.poll_interval),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroTimeout(name));
            }
        }
        Ok(())
    }
}

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

//! Session state machine. One machine serves both directions: the `Role`
//! decides who sends the handshake, the `Endpoint` decides who owns the file
//! bytes, and the `TransferMode` decides whether a file list is exchanged.
//! Every step performs one lock-step frame exchange.

use std::fmt;
use std::io::Write;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use crate::chunk::{Assembler, Splitter};
use crate::config::{Role, SessionConfig, TransferMode};
use crate::error::{ConfigError, Error, SessionError};
use crate::files::{FileDescriptor, FileSink, FileSource};
use crate::packet::{self, Frame, Reply};
use crate::payload;
use crate::protocol::*;
use crate::serial::Transport;

// ============================================================================
// Phases & Results
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingHandshake,
    SendingHandshake,
    HandshakeDone,
    AwaitingFileList,
    SendingFileList,
    TransferringFile,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Phase::AwaitingHandshake => "awaiting handshake",
            Phase::SendingHandshake => "sending handshake",
            Phase::HandshakeDone => "handshake done",
            Phase::AwaitingFileList => "awaiting file list",
            Phase::SendingFileList => "sending file list",
            Phase::TransferringFile => "transferring file",
            Phase::Done => "done",
        };
        f.write_str(text)
    }
}

/// Which side of the data flow this session is
pub enum Endpoint {
    Source(Box<dyn FileSource>),
    Sink(Box<dyn FileSink>),
}

/// Outcome of a session that reached DONE
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub role: Role,
    /// Handshake received from the peer; None when this side initiated
    pub peer: Option<payload::Handshake>,
    /// Files transferred, in transfer order
    pub files: Vec<FileDescriptor>,
    pub bytes_transferred: u64,
}

pub enum Step {
    Next(Box<dyn SessionState>),
    Done(SessionReport),
}

impl Step {
    pub fn phase(&self) -> Phase {
        match self {
            Step::Next(state) => state.phase(),
            Step::Done(_) => Phase::Done,
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Next(state) => write!(f, "Next({:?})", state.phase()),
            Step::Done(report) => write!(f, "Done({:?})", report),
        }
    }
}

// ============================================================================
// States
// ============================================================================

pub struct InitialHandshake;
pub struct HandshakeDone;
pub struct FileList;
pub struct FileInfo;
pub struct TransferChunks;

/// File currently moving through the chunk phase
enum InFlight {
    Idle,
    Sending(Splitter),
    Receiving(Assembler),
}

// ============================================================================
// FSM Structure
// ============================================================================

pub struct SessionFsm<State> {
    state: PhantomData<State>,
    port: Box<dyn Transport>,
    endpoint: Endpoint,
    config: SessionConfig,
    handshake_deadline: Option<Instant>,
    frame_deadline: Option<Instant>,
    peer: Option<payload::Handshake>,
    pending_files: Vec<FileDescriptor>,
    cursor: usize,
    in_flight: InFlight,
    rejected: u32,
    completed: Vec<FileDescriptor>,
    bytes_transferred: u64,
}

// ============================================================================
// Traits
// ============================================================================

/// Read-only view of a session, available in every state
pub trait Inspect {
    /// Files fixed by the file list or the single file info, in order
    fn pending_files(&self) -> &[FileDescriptor];

    fn bytes_transferred(&self) -> u64;
}

pub trait SessionState: Inspect + Send {
    fn step(self: Box<Self>) -> Result<Step, SessionError>;

    fn phase(&self) -> Phase;
}

impl<S> Inspect for SessionFsm<S> {
    fn pending_files(&self) -> &[FileDescriptor] {
        &self.pending_files
    }

    fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred
    }
}

// ============================================================================
// Helpers shared by all states
// ============================================================================

impl<S> SessionFsm<S>
where
    SessionFsm<S>: SessionState + 'static,
{
    fn transition<T>(self) -> Box<SessionFsm<T>> {
        Box::new(SessionFsm {
            state: PhantomData,
            port: self.port,
            endpoint: self.endpoint,
            config: self.config,
            handshake_deadline: self.handshake_deadline,
            frame_deadline: self.frame_deadline,
            peer: self.peer,
            pending_files: self.pending_files,
            cursor: self.cursor,
            in_flight: self.in_flight,
            rejected: self.rejected,
            completed: self.completed,
            bytes_transferred: self.bytes_transferred,
        })
    }

    fn state_name() -> &'static str {
        let type_name = std::any::type_name::<S>();
        type_name.split("::").last().unwrap_or(type_name)
    }

    fn next<T>(self) -> Step
    where
        SessionFsm<T>: SessionState + 'static,
    {
        debug!("{} -> {}", Self::state_name(), SessionFsm::<T>::state_name());
        let mut next = self.transition::<T>();
        next.rejected = 0;
        Step::Next(next)
    }

    fn stay(self) -> Step {
        Step::Next(Box::new(self))
    }

    /// Runs one step body and tags a failure with the phase it happened in
    fn tagged(self: Box<Self>, body: impl FnOnce(Self) -> Result<Step, Error>) -> Result<Step, SessionError> {
        let phase = self.phase();
        body(*self).map_err(|error| {
            warn!("Session failed while {} (in state: {}): {}", phase, Self::state_name(), error);
            SessionError { phase, error }
        })
    }

    /// Waits for the peer's next frame one poll interval at a time. `None`
    /// means nothing has arrived yet. The wait fails once `frame_timeout`
    /// passes without a frame.
    fn receive(&mut self) -> Result<Option<Frame>, Error> {
        let budget = self.config.frame_timeout;
        let deadline = *self.frame_deadline.get_or_insert_with(|| Instant::now() + budget);
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            self.frame_deadline = None;
            return Err(Error::ShortRead { expected: HEADER_LEN, got: 0 });
        }

        match packet::poll_frame(&mut *self.port, remaining.min(self.config.poll_interval), budget) {
            Err(e) if e.is_silence() => Ok(None),
            result => {
                self.frame_deadline = None;
                result.map(Some)
            }
        }
    }

    fn accept(&mut self) -> Result<(), Error> {
        self.rejected = 0;
        packet::send_ack(&mut *self.port)
    }

    /// NACKs a bad frame so the peer can resend it. Fails once the peer has
    /// had its share of consecutive resends.
    fn reject(&mut self, error: Error) -> Result<(), Error> {
        warn!("Rejecting frame: {}", error);
        packet::send_nack(&mut *self.port)?;
        self.rejected += 1;
        if self.rejected > self.config.max_rejected_frames {
            return Err(error);
        }
        Ok(())
    }

    /// NACKs a frame that breaks the session and hands back the error
    fn abort(&mut self, error: Error) -> Error {
        if let Err(e) = packet::send_nack(&mut *self.port) {
            debug!("Could not NACK before aborting: {}", e);
        }
        error
    }

    /// Sends one frame and waits for its verdict. A NACK is not retried here.
    fn exchange(&mut self, command: Command, payload: &[u8], what: impl FnOnce() -> String) -> Result<(), Error> {
        packet::write_frame(&mut *self.port, command, payload)?;
        match packet::await_reply(&mut *self.port, self.config.ack_timeout)? {
            Reply::Ack => Ok(()),
            Reply::Nack => Err(Error::Rejected(what())),
        }
    }

    fn current_file(&self) -> Option<&FileDescriptor> {
        self.pending_files.get(self.cursor)
    }

    /// Records the file in flight as done and moves to the next one
    fn file_complete(mut self) -> Step {
        if let Some(file) = self.current_file().cloned() {
            info!("Completed {} ({} bytes)", file.name, file.size);
            self.completed.push(file);
        }
        self.in_flight = InFlight::Idle;
        self.cursor += 1;

        if self.cursor < self.pending_files.len() {
            debug!("{} files remaining", self.pending_files.len() - self.cursor);
            self.next::<FileInfo>()
        } else {
            self.finish()
        }
    }

    fn finish(self) -> Step {
        info!("Session complete: {} files, {} bytes", self.completed.len(), self.bytes_transferred);
        Step::Done(SessionReport {
            role: self.config.role,
            peer: self.peer,
            files: self.completed,
            bytes_transferred: self.bytes_transferred,
        })
    }
}

fn unix_timestamp() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or_default()
}

// ============================================================================
// State Implementations
// ============================================================================

impl SessionState for SessionFsm<InitialHandshake> {
    fn step(self: Box<Self>) -> Result<Step, SessionError> {
        self.tagged(|mut fsm| {
            let budget = fsm.config.handshake_timeout;
            let deadline = *fsm.handshake_deadline.get_or_insert_with(|| Instant::now() + budget);
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::HandshakeTimeout(budget));
            }

            let role = fsm.config.role;
            match role {
                Role::Responder => fsm.await_handshake(remaining),
                Role::Initiator => fsm.send_handshake(remaining),
            }
        })
    }

    fn phase(&self) -> Phase {
        match self.config.role {
            Role::Responder => Phase::AwaitingHandshake,
            Role::Initiator => Phase::SendingHandshake,
        }
    }
}

impl SessionFsm<InitialHandshake> {
    /// Bad frames are NACKed without limit; only the deadline ends the wait
    fn await_handshake(mut self, remaining: std::time::Duration) -> Result<Step, Error> {
        match packet::poll_frame(&mut *self.port, remaining.min(self.config.poll_interval), remaining) {
            Ok(frame) if frame.command == Command::Handshake => {
                match payload::Handshake::parse(&frame.payload) {
                    Ok(handshake) => {
                        info!("Handshake received (version: {}, timestamp: {})",
                              handshake.version, handshake.timestamp);
                        if handshake.version != PROTOCOL_VERSION {
                            warn!("Peer speaks protocol version {}, expected {}",
                                  handshake.version, PROTOCOL_VERSION);
                        }
                        packet::send_ack(&mut *self.port)?;
                        self.peer = Some(handshake);
                        Ok(self.next::<HandshakeDone>())
                    }
                    Err(e) => {
                        warn!("Rejecting handshake: {}", e);
                        packet::send_nack(&mut *self.port)?;
                        Ok(self.stay())
                    }
                }
            }
            Ok(frame) => {
                warn!("Expected HANDSHAKE, got {}", frame.command);
                packet::send_nack(&mut *self.port)?;
                Ok(self.stay())
            }
            Err(e) if e.is_frame_error() => {
                warn!("Rejecting handshake: {}", e);
                packet::send_nack(&mut *self.port)?;
                Ok(self.stay())
            }
            Err(e) if e.is_silence() => Ok(self.stay()),
            Err(e) => Err(e),
        }
    }

    /// Resends the handshake until it is acknowledged or the deadline passes
    fn send_handshake(mut self, remaining: std::time::Duration) -> Result<Step, Error> {
        let handshake = payload::Handshake {
            version: self.config.protocol_version,
            timestamp: self.config.announce_timestamp.unwrap_or_else(unix_timestamp),
        };
        packet::write_frame(&mut *self.port, Command::Handshake, &handshake.encode())?;

        match packet::await_reply(&mut *self.port, remaining.min(self.config.ack_timeout)) {
            Ok(Reply::Ack) => {
                info!("Handshake acknowledged");
                Ok(self.next::<HandshakeDone>())
            }
            Ok(Reply::Nack) => {
                warn!("Handshake rejected by peer");
                Ok(self.stay())
            }
            Err(e) if e.is_frame_error() || e.is_silence() || matches!(e, Error::UnexpectedCommand { .. }) => {
                debug!("Receiver not ready: {}", e);
                Ok(self.stay())
            }
            Err(e) => Err(e),
        }
    }
}

impl SessionState for SessionFsm<HandshakeDone> {
    fn step(self: Box<Self>) -> Result<Step, SessionError> {
        self.tagged(|mut fsm| {
            let mode = fsm.config.mode;
            if mode == TransferMode::FileList {
                return Ok(fsm.next::<FileList>());
            }

            if let Endpoint::Source(source) = &mut fsm.endpoint {
                let pending = source.list_pending()?;
                if pending.len() != 1 {
                    return Err(Error::Io(std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("single-file transfer needs exactly one file, got {}", pending.len()),
                    )));
                }
                fsm.pending_files = pending;
            }
            Ok(fsm.next::<FileInfo>())
        })
    }

    fn phase(&self) -> Phase {
        Phase::HandshakeDone
    }
}

impl SessionState for SessionFsm<FileList> {
    fn step(self: Box<Self>) -> Result<Step, SessionError> {
        self.tagged(|mut fsm| {
            let listed = match &mut fsm.endpoint {
                Endpoint::Source(source) => Some(source.list_pending()?),
                Endpoint::Sink(_) => None,
            };
            match listed {
                Some(pending) => fsm.send_file_list(pending),
                None => fsm.receive_file_list(),
            }
        })
    }

    fn phase(&self) -> Phase {
        match self.endpoint {
            Endpoint::Source(_) => Phase::SendingFileList,
            Endpoint::Sink(_) => Phase::AwaitingFileList,
        }
    }
}

impl SessionFsm<FileList> {
    fn send_file_list(mut self, pending: Vec<FileDescriptor>) -> Result<Step, Error> {
        let names: Vec<&str> = pending.iter().map(|f| f.name.as_str()).collect();
        let list = payload::encode_file_list(&names)?;
        info!("Sending file list: {} files", pending.len());

        self.exchange(Command::FileList, &list, || "file list".to_string())?;
        self.pending_files = pending;

        if self.pending_files.is_empty() {
            return Ok(self.finish());
        }
        Ok(self.next::<FileInfo>())
    }

    fn receive_file_list(mut self) -> Result<Step, Error> {
        let frame = match self.receive() {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(self.stay()),
            Err(e) if e.is_frame_error() => {
                self.reject(e)?;
                return Ok(self.stay());
            }
            Err(e) => return Err(e),
        };

        if frame.command != Command::FileList {
            return Err(self.abort(Error::UnexpectedCommand { expected: "FILE_LIST", got: frame.command }));
        }

        let names = match payload::parse_file_list(&frame.payload) {
            Ok(names) => names,
            Err(e) => {
                self.reject(e)?;
                return Ok(self.stay());
            }
        };

        self.accept()?;
        info!("File list received: {} files", names.len());
        self.pending_files = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                info!("  [{}] {}", i + 1, name);
                // parse_file_list yields at most 255 names
                FileDescriptor { index: (i + 1) as u8, name, size: 0 }
            })
            .collect();

        if self.pending_files.is_empty() {
            warn!("Peer has no files to send");
            return Ok(self.finish());
        }
        Ok(self.next::<FileInfo>())
    }
}

impl SessionState for SessionFsm<FileInfo> {
    fn step(self: Box<Self>) -> Result<Step, SessionError> {
        self.tagged(|mut fsm| {
            let file = fsm.current_file().cloned();
            let outgoing = match (&mut fsm.endpoint, file) {
                (Endpoint::Source(source), Some(file)) => {
                    let contents = source.read_contents(&file)?;
                    Some((file, contents))
                }
                _ => None,
            };
            match outgoing {
                Some((file, contents)) => fsm.send_file_info(file, contents),
                None => fsm.receive_file_info(),
            }
        })
    }

    fn phase(&self) -> Phase {
        Phase::TransferringFile
    }
}

impl SessionFsm<FileInfo> {
    fn send_file_info(mut self, file: FileDescriptor, contents: Vec<u8>) -> Result<Step, Error> {
        let size = u32::try_from(contents.len())
            .map_err(|_| Error::FileTooLarge { name: file.name.clone(), size: contents.len() })?;
        if size != file.size {
            warn!("{} changed size since it was listed ({} -> {} bytes)", file.name, file.size, size);
        }

        let splitter = Splitter::new(&file.name, contents, self.config.chunk_size)?;
        let info = payload::FileInfo { index: file.index, size, name: file.name.clone() };
        info!("Sending {} (index: {}, {} bytes, {} chunks)",
              file.name, file.index, size, splitter.chunk_count());

        self.exchange(Command::FileData, &info.encode(), || format!("file info for {}", file.name))?;
        self.pending_files[self.cursor].size = size;

        if splitter.is_done() {
            return Ok(self.file_complete());
        }
        self.in_flight = InFlight::Sending(splitter);
        Ok(self.next::<TransferChunks>())
    }

    fn receive_file_info(mut self) -> Result<Step, Error> {
        let frame = match self.receive() {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(self.stay()),
            Err(e) if e.is_frame_error() => {
                self.reject(e)?;
                return Ok(self.stay());
            }
            Err(e) => return Err(e),
        };

        let info = match frame.command {
            Command::FileEnd => {
                debug!("FILE_END between files, nothing to do");
                self.accept()?;
                return Ok(self.stay());
            }
            Command::FileData => match payload::FileInfo::parse(&frame.payload) {
                Ok(info) => info,
                Err(e) => {
                    self.reject(e)?;
                    return Ok(self.stay());
                }
            },
            other => {
                return Err(self.abort(Error::UnexpectedCommand { expected: "FILE_DATA", got: other }));
            }
        };

        let file = FileDescriptor { index: info.index, name: info.name, size: info.size };
        match self.pending_files.get_mut(self.cursor) {
            Some(listed) => {
                if listed.name != file.name {
                    warn!("Expected {}, peer is sending {}", listed.name, file.name);
                }
                *listed = file.clone();
            }
            None => self.pending_files.push(file.clone()),
        }

        self.accept()?;
        info!("Receiving {} (index: {}, {} bytes)", file.name, file.index, file.size);

        let assembler = Assembler::new(file);
        if assembler.is_complete() {
            self.commit(assembler)?;
            return Ok(self.file_complete());
        }
        self.in_flight = InFlight::Receiving(assembler);
        Ok(self.next::<TransferChunks>())
    }
}

impl<S> SessionFsm<S>
where
    SessionFsm<S>: SessionState + 'static,
{
    /// Hands a fully assembled file to the sink
    fn commit(&mut self, assembler: Assembler) -> Result<(), Error> {
        let (file, contents) = assembler.finish()?;
        if let Endpoint::Sink(sink) = &mut self.endpoint {
            let mut writer = sink.open_for_write(&file.name)?;
            writer.write_all(&contents)?;
            writer.flush()?;
        }
        debug!("Stored {} ({} bytes)", file.name, contents.len());
        Ok(())
    }
}

impl SessionState for SessionFsm<TransferChunks> {
    fn step(self: Box<Self>) -> Result<Step, SessionError> {
        self.tagged(|mut fsm| match std::mem::replace(&mut fsm.in_flight, InFlight::Idle) {
            InFlight::Sending(splitter) => fsm.send_chunk(splitter),
            InFlight::Receiving(assembler) => fsm.receive_chunk(assembler),
            InFlight::Idle => Err(Error::InvalidState("chunk phase entered with no file in flight")),
        })
    }

    fn phase(&self) -> Phase {
        Phase::TransferringFile
    }
}

impl SessionFsm<TransferChunks> {
    fn send_chunk(mut self, mut splitter: Splitter) -> Result<Step, Error> {
        let name = self.current_file().map(|f| f.name.clone()).unwrap_or_default();

        if let Some(chunk) = splitter.current() {
            let index = chunk.index;
            let len = chunk.data.len() as u64;
            self.exchange(Command::FileData, &chunk.encode()?, || format!("chunk {} of {}", index, name))?;
            self.bytes_transferred += len;
            splitter.advance();
            debug!("Chunk {} acknowledged ({}/{} bytes)", index, splitter.bytes_sent(), splitter.size());
        }

        if splitter.is_done() {
            return Ok(self.file_complete());
        }
        self.in_flight = InFlight::Sending(splitter);
        Ok(self.stay())
    }

    fn receive_chunk(mut self, mut assembler: Assembler) -> Result<Step, Error> {
        let frame = match self.receive() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                self.in_flight = InFlight::Receiving(assembler);
                return Ok(self.stay());
            }
            Err(e) if e.is_frame_error() => {
                self.in_flight = InFlight::Receiving(assembler);
                self.reject(e)?;
                return Ok(self.stay());
            }
            Err(e) => return Err(e),
        };

        match frame.command {
            Command::FileData => {}
            Command::FileEnd => {
                let file = assembler.file();
                return Err(self.abort(Error::TransferIncomplete {
                    name: file.name.clone(),
                    announced: file.size,
                    received: assembler.bytes_received(),
                }));
            }
            other => {
                return Err(self.abort(Error::UnexpectedCommand { expected: "FILE_DATA", got: other }));
            }
        }

        let chunk = match payload::Chunk::parse(&frame.payload) {
            Ok(chunk) => chunk,
            Err(e) => {
                self.in_flight = InFlight::Receiving(assembler);
                self.reject(e)?;
                return Ok(self.stay());
            }
        };

        if let Err(e) = assembler.push(chunk) {
            return Err(self.abort(e));
        }
        self.bytes_transferred += chunk.data.len() as u64;
        debug!("Chunk {} accepted ({}/{} bytes), expecting chunk {}",
               chunk.index, assembler.bytes_received(), assembler.file().size, assembler.expected_index());

        if assembler.is_complete() {
            if let Err(e) = self.commit(assembler) {
                return Err(self.abort(e));
            }
            self.accept()?;
            return Ok(self.file_complete());
        }

        self.accept()?;
        self.in_flight = InFlight::Receiving(assembler);
        Ok(self.stay())
    }
}

// ============================================================================
// Constructor & Runner
// ============================================================================

impl SessionFsm<InitialHandshake> {
    /// Checks `config` and returns the first state. With `skip_handshake` the
    /// session starts right after the handshake.
    pub fn new(port: Box<dyn Transport>, endpoint: Endpoint, config: SessionConfig)
        -> Result<Box<dyn SessionState>, ConfigError> {
        config.validate()?;
        let skip_handshake = config.skip_handshake;

        let fsm = SessionFsm {
            state: PhantomData::<InitialHandshake>,
            port,
            endpoint,
            config,
            handshake_deadline: None,
            frame_deadline: None,
            peer: None,
            pending_files: Vec::new(),
            cursor: 0,
            in_flight: InFlight::Idle,
            rejected: 0,
            completed: Vec::new(),
            bytes_transferred: 0,
        };

        if skip_handshake {
            info!("Skipping handshake");
            return Ok(fsm.transition::<HandshakeDone>());
        }
        Ok(Box::new(fsm))
    }
}

/// Drives a session to DONE or FAILED. `cancel` is checked between frame
/// exchanges. The transport is dropped on every exit path.
pub fn run(mut state: Box<dyn SessionState>, cancel: &AtomicBool) -> Result<SessionReport, SessionError> {
    loop {
        if cancel.load(Ordering::SeqCst) {
            let phase = state.phase();
            warn!("Session cancelled while {} ({} files listed, {} bytes moved)",
                  phase, state.pending_files().len(), state.bytes_transferred());
            return Err(SessionError { phase, error: Error::Cancelled });
        }

        let step = state.step()?;
        debug!("Now {}", step.phase());
        match step {
            Step::Next(next) => state = next,
            Step::Done(report) => return Ok(report),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

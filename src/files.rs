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

//! File collaborators of the session. The engine only moves byte buffers;
//! where they come from and where they end up is decided by these traits.

use std::io::Write;

/// A file taking part in a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// 1..N in a push, list position (from 1) in a pull
    pub index: u8,
    /// Basename, at most 64 bytes on the wire
    pub name: String,
    pub size: u32,
}

/// Supplies the files a data source sends
pub trait FileSource: Send {
    fn list_pending(&mut self) -> std::io::Result<Vec<FileDescriptor>>;

    fn read_contents(&mut self, file: &FileDescriptor) -> std::io::Result<Vec<u8>>;
}

/// Stores the files a data sink receives. Only ever handed complete files.
pub trait FileSink: Send {
    fn open_for_write(&mut self, name: &str) -> std::io::Result<Box<dyn Write + '_>>;
}

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

use std::fs::File;
use std::io::{Error, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use crate::files::{FileDescriptor, FileSink, FileSource};
use crate::payload::basename;

// ============================================================================
// Filesystem Source
// ============================================================================

/// Sends files straight from disk
pub struct PathSource {
    files: Vec<(u8, PathBuf)>,
}

impl PathSource {
    pub fn new(files: Vec<(u8, PathBuf)>) -> Self {
        PathSource { files }
    }

    /// Indexes the files 1..N in the order given
    pub fn numbered(paths: Vec<PathBuf>) -> std::io::Result<Self> {
        let files = paths
            .into_iter()
            .enumerate()
            .map(|(i, p)| {
                u8::try_from(i + 1)
                    .map(|index| (index, p))
                    .map_err(|_| Error::new(ErrorKind::InvalidInput, "at most 255 files per session"))
            })
            .collect::<std::io::Result<Vec<_>>>()?;
        Ok(PathSource { files })
    }

    fn path_for(&self, file: &FileDescriptor) -> std::io::Result<&Path> {
        self.files
            .iter()
            .find(|(index, _)| *index == file.index)
            .map(|(_, path)| path.as_path())
            .ok_or_else(|| Error::new(ErrorKind::NotFound, format!("no file with index {}", file.index)))
    }
}

impl FileSource for PathSource {
    fn list_pending(&mut self) -> std::io::Result<Vec<FileDescriptor>> {
        self.files
            .iter()
            .map(|(index, path)| {
                let meta = std::fs::metadata(path)
                    .map_err(|e| Error::new(e.kind(), format!("{}: {}", path.display(), e)))?;
                let size = u32::try_from(meta.len()).map_err(|_| {
                    Error::new(ErrorKind::InvalidInput, format!("{} is larger than 4 GiB", path.display()))
                })?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .ok_or_else(|| Error::new(ErrorKind::InvalidInput, format!("{} has no file name", path.display())))?;
                Ok(FileDescriptor { index: *index, name, size })
            })
            .collect()
    }

    fn read_contents(&mut self, file: &FileDescriptor) -> std::io::Result<Vec<u8>> {
        let path = self.path_for(file)?;
        debug!("Reading {}", path.display());
        std::fs::read(path)
    }
}

// ============================================================================
// In-memory Source
// ============================================================================

/// Sends buffers built by the caller, e.g. a generated settings file
pub struct MemorySource {
    files: Vec<(FileDescriptor, Vec<u8>)>,
}

impl MemorySource {
    pub fn new() -> Self {
        MemorySource { files: Vec::new() }
    }

    pub fn with_file(mut self, index: u8, name: &str, contents: Vec<u8>) -> std::io::Result<Self> {
        let size = u32::try_from(contents.len())
            .map_err(|_| Error::new(ErrorKind::InvalidInput, format!("{} is larger than 4 GiB", name)))?;
        self.files.push((FileDescriptor { index, name: name.to_string(), size }, contents));
        Ok(self)
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSource for MemorySource {
    fn list_pending(&mut self) -> std::io::Result<Vec<FileDescriptor>> {
        Ok(self.files.iter().map(|(desc, _)| desc.clone()).collect())
    }

    fn read_contents(&mut self, file: &FileDescriptor) -> std::io::Result<Vec<u8>> {
        self.files
            .iter()
            .find(|(desc, _)| desc.index == file.index && desc.name == file.name)
            .map(|(_, contents)| contents.clone())
            .ok_or_else(|| Error::new(ErrorKind::NotFound, format!("no buffer for {}", file.name)))
    }
}

// ============================================================================
// Directory Sink
// ============================================================================

/// Writes each received file into one directory
pub struct DirSink {
    dir: PathBuf,
}

impl DirSink {
    /// Creates the directory if it does not exist yet
    pub fn create(dir: PathBuf) -> std::io::Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(DirSink { dir })
    }

    pub fn path_for(&self, name: &str) -> std::io::Result<PathBuf> {
        let name = basename(name);
        if name.is_empty() || name == "." || name == ".." || name.contains('\0') {
            return Err(Error::new(ErrorKind::InvalidInput, format!("refusing to store {:?}", name)));
        }
        Ok(self.dir.join(name))
    }
}

impl FileSink for DirSink {
    fn open_for_write(&mut self, name: &str) -> std::io::Result<Box<dyn Write + '_>> {
        let path = self.path_for(name)?;
        debug!("Creating {}", path.display());
        Ok(Box::new(File::create(path)?))
    }
}

// ============================================================================
// Tests
// ============================================================================

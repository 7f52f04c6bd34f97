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

use crate::error::{ConfigError, Error, Result};
use crate::files::FileDescriptor;
use crate::payload::Chunk;
use crate::protocol::MAX_CHUNK_SIZE;

/// Most bytes an `Assembler` reserves up front; the announced size is
/// peer-controlled
const PREALLOC_LIMIT: usize = 64 * 1024;

// ============================================================================
// Splitter (data source)
// ============================================================================

/// Slices an outgoing file into chunks numbered 0..N-1
pub struct Splitter {
    contents: Vec<u8>,
    chunk_size: usize,
    next: usize,
}

impl Splitter {
    pub fn new(name: &str, contents: Vec<u8>, chunk_size: usize) -> Result<Splitter> {
        if chunk_size == 0 {
            return Err(ConfigError::ChunkSize { got: chunk_size, max: MAX_CHUNK_SIZE }.into());
        }
        let chunks = contents.len().div_ceil(chunk_size);
        if chunks > usize::from(u16::MAX) + 1 {
            return Err(Error::FileTooLarge { name: name.to_string(), size: contents.len() });
        }
        Ok(Splitter { contents, chunk_size, next: 0 })
    }

    pub fn chunk_count(&self) -> usize {
        self.contents.len().div_ceil(self.chunk_size)
    }

    pub fn size(&self) -> usize {
        self.contents.len()
    }

    /// Chunk the peer has not acknowledged yet
    pub fn current(&self) -> Option<Chunk<'_>> {
        self.chunk(self.next)
    }

    /// Moves past the current chunk once the peer has acknowledged it
    pub fn advance(&mut self) {
        if self.next < self.chunk_count() {
            self.next += 1;
        }
    }

    pub fn is_done(&self) -> bool {
        self.next >= self.chunk_count()
    }

    /// Bytes covered by acknowledged chunks
    pub fn bytes_sent(&self) -> usize {
        (self.next * self.chunk_size).min(self.contents.len())
    }

    pub fn chunk(&self, index: usize) -> Option<Chunk<'_>> {
        let start = index.checked_mul(self.chunk_size)?;
        if start >= self.contents.len() {
            return None;
        }
        let end = (start + self.chunk_size).min(self.contents.len());
        // new() bounds the chunk count to the u16 range
        let index = u16::try_from(index).ok()?;
        Some(Chunk { index, data: &self.contents[start..end] })
    }
}

// ============================================================================
// Assembler (data sink)
// ============================================================================

/// Accumulates chunks of one incoming file, strictly in order
pub struct Assembler {
    file: FileDescriptor,
    buffer: Vec<u8>,
    expected_index: u16,
}

impl Assembler {
    pub fn new(file: FileDescriptor) -> Assembler {
        let capacity = (file.size as usize).min(PREALLOC_LIMIT);
        Assembler { file, buffer: Vec::with_capacity(capacity), expected_index: 0 }
    }

    pub fn file(&self) -> &FileDescriptor {
        &self.file
    }

    pub fn expected_index(&self) -> u16 {
        self.expected_index
    }

    pub fn bytes_received(&self) -> u64 {
        self.buffer.len() as u64
    }

    pub fn is_complete(&self) -> bool {
        self.bytes_received() == u64::from(self.file.size)
    }

    /// Appends one chunk. Out-of-order chunks and chunks that would run past
    /// the announced size are refused and leave the buffer untouched.
    pub fn push(&mut self, chunk: Chunk<'_>) -> Result<()> {
        if chunk.index != self.expected_index || self.is_complete() {
            return Err(Error::SequenceMismatch { expected: self.expected_index, got: chunk.index });
        }

        let would_have = self.bytes_received() + chunk.data.len() as u64;
        if would_have > u64::from(self.file.size) {
            return Err(Error::ByteOverrun {
                name: self.file.name.clone(),
                announced: self.file.size,
                would_have,
            });
        }

        self.buffer.extend_from_slice(chunk.data);
        self.expected_index = self.expected_index.wrapping_add(1);
        Ok(())
    }

    /// The assembled file, only once every announced byte has arrived
    pub fn finish(self) -> Result<(FileDescriptor, Vec<u8>)> {
        if !self.is_complete() {
            return Err(Error::TransferIncomplete {
                name: self.file.name.clone(),
                announced: self.file.size,
                received: self.bytes_received(),
            });
        }
        Ok((self.file, self.buffer))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn descriptor(size: u32) -> FileDescriptor {
        FileDescriptor { index: 1, name: "result.csv".to_string(), size }
    }

    fn collect(splitter: &Splitter) -> Vec<Vec<u8>> {
        (0..splitter.chunk_count())
            .map(|i| splitter.chunk(i).unwrap().data.to_vec())
            .collect()
    }

    #[test]
    fn test_split_1000_bytes() {
        let contents = pattern(1000);
        let splitter = Splitter::new("f", contents.clone(), 512).unwrap();
        let chunks = collect(&splitter);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 512);
        assert_eq!(chunks[1].len(), 488);
        assert_eq!(chunks.concat(), contents);
    }

    #[test]
    fn test_split_is_total() {
        for (size, chunk_size) in [(0, 512), (1, 512), (511, 512), (512, 512), (513, 512), (2048, 512), (100, 7)] {
            let contents = pattern(size);
            let splitter = Splitter::new("f", contents.clone(), chunk_size).unwrap();
            let chunks = collect(&splitter);

            assert_eq!(chunks.len(), size.div_ceil(chunk_size), "size {}", size);
            assert_eq!(chunks.concat(), contents, "size {}", size);
            if let Some(last) = chunks.last() {
                let expected = if size % chunk_size == 0 { chunk_size } else { size % chunk_size };
                assert_eq!(last.len(), expected, "size {}", size);
            }
            assert!(splitter.chunk(chunks.len()).is_none());
        }
    }

    #[test]
    fn test_split_numbering_and_advance() {
        let mut splitter = Splitter::new("f", pattern(1200), 512).unwrap();
        let mut seen = Vec::new();
        while let Some(chunk) = splitter.current() {
            seen.push(chunk.index);
            splitter.advance();
        }
        assert_eq!(seen, vec![0, 1, 2]);
        assert!(splitter.is_done());
        assert_eq!(splitter.bytes_sent(), 1200);
    }

    #[test]
    fn test_split_too_many_chunks() {
        let err = Splitter::new("huge.bin", vec![0; 65537], 1).err().unwrap();
        assert!(matches!(err, Error::FileTooLarge { size: 65537, .. }));
        assert!(Splitter::new("big.bin", vec![0; 65536], 1).is_ok());
    }

    #[test]
    fn test_split_zero_chunk_size() {
        let err = Splitter::new("f", pattern(10), 0).err().unwrap();
        assert!(matches!(err, Error::Config(ConfigError::ChunkSize { got: 0, .. })));
    }

    #[test]
    fn test_assemble_caps_preallocation() {
        let assembler = Assembler::new(descriptor(u32::MAX));
        assert!(assembler.buffer.capacity() <= PREALLOC_LIMIT);
        assert_eq!(assembler.bytes_received(), 0);

        let small = Assembler::new(descriptor(1000));
        assert!(small.buffer.capacity() >= 1000);
    }

    #[test]
    fn test_assemble_1000_bytes() {
        let contents = pattern(1000);
        let splitter = Splitter::new("f", contents.clone(), 512).unwrap();
        let mut assembler = Assembler::new(descriptor(1000));

        assembler.push(splitter.chunk(0).unwrap()).unwrap();
        assert!(!assembler.is_complete());
        assembler.push(splitter.chunk(1).unwrap()).unwrap();
        assert!(assembler.is_complete());

        let (file, buffer) = assembler.finish().unwrap();
        assert_eq!(file.name, "result.csv");
        assert_eq!(buffer, contents);
    }

    #[test]
    fn test_assemble_expects_next_index() {
        let data = [1u8; 10];
        let mut assembler = Assembler::new(descriptor(30));
        assembler.push(Chunk { index: 0, data: &data }).unwrap();
        assert_eq!(assembler.expected_index(), 1);
        assembler.push(Chunk { index: 1, data: &data }).unwrap();
        assert_eq!(assembler.expected_index(), 2);
    }

    #[test]
    fn test_assemble_sequence_mismatch() {
        let data = [1u8; 10];
        for wrong in [1u16, 2, 5, u16::MAX] {
            let mut assembler = Assembler::new(descriptor(30));
            match assembler.push(Chunk { index: wrong, data: &data }) {
                Err(Error::SequenceMismatch { expected: 0, got }) => assert_eq!(got, wrong),
                other => panic!("expected SequenceMismatch, got {:?}", other),
            }
            assert_eq!(assembler.bytes_received(), 0);
        }

        let mut assembler = Assembler::new(descriptor(30));
        assembler.push(Chunk { index: 0, data: &data }).unwrap();
        assert!(matches!(
            assembler.push(Chunk { index: 0, data: &data }),
            Err(Error::SequenceMismatch { expected: 1, got: 0 })
        ));
    }

    #[test]
    fn test_assemble_overrun() {
        let data = [1u8; 10];
        let mut assembler = Assembler::new(descriptor(15));
        assembler.push(Chunk { index: 0, data: &data }).unwrap();
        match assembler.push(Chunk { index: 1, data: &data }) {
            Err(Error::ByteOverrun { announced: 15, would_have: 20, .. }) => {}
            other => panic!("expected ByteOverrun, got {:?}", other),
        }
        assert_eq!(assembler.bytes_received(), 10);
    }

    #[test]
    fn test_assemble_incomplete() {
        let data = [1u8; 10];
        let mut assembler = Assembler::new(descriptor(15));
        assembler.push(Chunk { index: 0, data: &data }).unwrap();
        assert!(matches!(
            assembler.finish(),
            Err(Error::TransferIncomplete { announced: 15, received: 10, .. })
        ));
    }

    #[test]
    fn test_assemble_empty_file() {
        let assembler = Assembler::new(descriptor(0));
        assert!(assembler.is_complete());
        let (_, buffer) = assembler.finish().unwrap();
        assert!(buffer.is_empty());
    }
}

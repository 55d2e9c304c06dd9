//! Chunked Source Reader
//!
//! Reads a layout source from any `Read` implementation in fixed-size chunks,
//! reusing one buffer for the whole parse, and hashes every byte as it passes.

use crate::core::hash::{ContentHash, ContentHasher};
use std::io::{self, Read};

/// Chunk size for reads
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Smallest accepted chunk size; anything lower is clamped
pub const MIN_CHUNK_SIZE: usize = 16;

/// Chunked reader that keeps a running content hash
pub struct ChunkReader<R: Read> {
    reader: R,
    chunk: Vec<u8>,
    hasher: ContentHasher,
    eof: bool,
}

impl<R: Read> ChunkReader<R> {
    /// Create a new chunk reader
    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, DEFAULT_CHUNK_SIZE)
    }

    /// Create a new chunk reader with the given chunk size
    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        ChunkReader {
            reader,
            chunk: vec![0u8; chunk_size.max(MIN_CHUNK_SIZE)],
            hasher: ContentHasher::new(),
            eof: false,
        }
    }

    /// Read the next chunk, or `None` once the source is exhausted
    pub fn next_chunk(&mut self) -> io::Result<Option<&[u8]>> {
        if self.eof {
            return Ok(None);
        }

        let read = loop {
            match self.reader.read(&mut self.chunk) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };

        if read == 0 {
            self.eof = true;
            return Ok(None);
        }

        let data = &self.chunk[..read];
        self.hasher.update(data);
        Ok(Some(data))
    }

    /// Check if the source has been read to the end
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Total bytes consumed so far
    pub fn bytes_read(&self) -> u64 {
        self.hasher.len()
    }

    /// Configured chunk size
    pub fn chunk_size(&self) -> usize {
        self.chunk.len()
    }

    /// The content hash, available only once the source is exhausted
    pub fn content_hash(&self) -> Option<ContentHash> {
        if self.eof {
            Some(self.hasher.clone().finish())
        } else {
            None
        }
    }
}

/// Read an entire source in chunks, returning its bytes and content hash
pub fn read_all_hashed<R: Read>(reader: R, chunk_size: usize) -> io::Result<(Vec<u8>, ContentHash)> {
    let mut chunks = ChunkReader::with_chunk_size(reader, chunk_size);
    let mut bytes = Vec::new();
    while let Some(chunk) = chunks.next_chunk()? {
        bytes.extend_from_slice(chunk);
    }
    let hash = chunks.hasher.finish();
    Ok((bytes, hash))
}

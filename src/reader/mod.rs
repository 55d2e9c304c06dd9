//! Layout Source Reading
//!
//! - ChunkReader: fixed-size chunk reads with a running content hash
//! - Events: structural token types for pull parsing

pub mod buffered;
pub mod events;

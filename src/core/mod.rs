//! Core markup parsing primitives
//!
//! This module contains the fundamental building blocks for layout parsing:
//! - Scanner: SIMD-accelerated delimiter detection using memchr
//! - Tokenizer: chunked pull tokenizer producing structural tokens
//! - Entities: entity decoding with Cow (zero-copy when possible)
//! - Attributes: start tag attribute parsing
//! - Hash: SHA-256 content hash used as the cache key

pub mod attributes;
pub mod entities;
pub mod hash;
pub mod scanner;
pub mod tokenizer;

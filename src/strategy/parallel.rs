//! Parallel Parsing
//!
//! Uses Rayon to tokenize and build independent documents concurrently.
//! No cache is consulted; see [`Inflater::parse_all`](crate::Inflater::parse_all)
//! for the cached form.

use crate::core::hash::ContentHash;
use crate::error::ParseError;
use crate::tree::{parse_markup, Node};
use rayon::prelude::*;

/// Parse every document, keeping input order in the results
pub fn parse_parallel(documents: &[&[u8]], chunk_size: usize) -> Vec<Result<(Node, ContentHash), ParseError>> {
    documents
        .par_iter()
        .map(|doc| parse_markup(*doc, chunk_size))
        .collect()
}

/// Parse every document and map each tree; stops at the first failure
pub fn parse_map<F, T>(documents: &[&[u8]], chunk_size: usize, mapper: F) -> Result<Vec<T>, ParseError>
where
    F: Fn(Node, ContentHash) -> T + Sync + Send,
    T: Send,
{
    documents
        .par_iter()
        .map(|doc| parse_markup(*doc, chunk_size).map(|(node, hash)| mapper(node, hash)))
        .collect()
}

//! Parsing Strategies
//!
//! - Sequential: [`crate::tree::parse_markup`], one document per call
//! - Parallel: many independent documents on the rayon pool

pub mod parallel;

pub use parallel::{parse_map, parse_parallel};

//! Cancellation
//!
//! Parses and renders take a [`CancellationToken`] and check it between
//! coarse steps: before the cache lookup, before tokenizing, and before each
//! node is rendered. A running cache computation is never interrupted.

use crate::error::{ParseError, RenderError};
pub use tokio_util::sync::CancellationToken;

/// Checkpoint helpers for the two pipeline halves
pub trait CancellationTokenExt {
    /// `Err(ParseError::Cancelled)` once the token has fired
    fn check_parse(&self) -> Result<(), ParseError>;

    /// `Err(RenderError::Cancelled)` once the token has fired
    fn check_render(&self) -> Result<(), RenderError>;
}

impl CancellationTokenExt for CancellationToken {
    fn check_parse(&self) -> Result<(), ParseError> {
        if self.is_cancelled() {
            return Err(ParseError::Cancelled);
        }
        Ok(())
    }

    fn check_render(&self) -> Result<(), RenderError> {
        if self.is_cancelled() {
            return Err(RenderError::Cancelled);
        }
        Ok(())
    }
}

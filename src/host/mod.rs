//! Headless Host
//!
//! A platform-free element set: [`Widget`] stores properties and children in
//! memory, [`standard_catalog`] registers the common widget types, and
//! [`register_standard_appliers`] covers their attributes. Enough to run the
//! whole pipeline in tests, tools, or a server that only needs the tree.

pub mod appliers;
pub mod catalog;
pub mod widget;

pub use appliers::register_standard_appliers;
pub use catalog::standard_catalog;
pub use widget::{Profile, Widget};

use crate::attrs::AttributeEngine;
use crate::factory::ElementFactory;
use std::sync::Arc;

/// Factory resolving the standard catalog with the default search prefixes
pub fn standard_factory() -> ElementFactory {
    ElementFactory::new(Arc::new(standard_catalog()))
}

/// Engine with the standard appliers registered
pub fn standard_engine() -> AttributeEngine {
    let mut engine = AttributeEngine::new();
    register_standard_appliers(&mut engine);
    engine
}

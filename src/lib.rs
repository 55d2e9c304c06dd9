//! RustyLayout - runtime layout inflation
//!
//! Turns a markup (or JSON) description of a UI tree into live elements:
//! - Tokenizer: chunked streaming scan, SHA-256 content hash in the same pass
//! - Tree builder: token stream to an immutable [`Node`] tree
//! - Cache: hot LRU tier plus permanent tier, one build per content hash
//! - Element factory: type name to constructor, positive and negative caching
//! - Attribute engine: typed appliers run in dependency order
//! - Renderer: depth-first element construction on the UI thread
//!
//! [`Inflater`] wires these together; [`host`] supplies a headless widget set.
//!
//! ```
//! use rustylayout::Inflater;
//!
//! let inflater = Inflater::new();
//! let node = inflater.parse(r#"<LinearLayout><TextView text="hi"/></LinearLayout>"#).unwrap();
//! let output = inflater.render(&node).unwrap();
//! assert_eq!(output.root().child_count(), 1);
//! ```

pub mod attrs;
pub mod cache;
pub mod cancel;
pub mod config;
pub mod core;
pub mod element;
pub mod error;
pub mod factory;
pub mod host;
pub mod inflater;
pub mod log;
pub mod persist;
pub mod reader;
pub mod render;
pub mod strategy;
pub mod tree;

pub use attrs::{ApplyContext, ApplyReport, AttributeEngine, Value, ValueKind};
pub use cache::LayoutCache;
pub use cancel::CancellationToken;
pub use config::InflaterConfig;
pub use crate::core::hash::ContentHash;
pub use element::{BuildContext, Element, ResourceId, ResourceProvider};
pub use error::{
    AttributeError, CacheError, ConfigError, FactoryError, ParseError, PersistError, RenderError, RestoreError,
};
pub use factory::{ElementFactory, TypeCatalog, TypeDescriptor, TypeResolver};
pub use inflater::{Inflater, InflaterBuilder, InflaterStats, Source, SourceFormat};
pub use log::LogSink;
pub use persist::StateRepository;
pub use reader::events::Token;
pub use render::{NodePath, RenderOutput, Renderer};
pub use tree::{Attributes, Node};

// ============================================================================
// Allocator Configuration
// ============================================================================

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

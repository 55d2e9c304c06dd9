//! Error Types
//!
//! One enum per pipeline stage. Parse and factory errors are `Clone` so a
//! cached outcome can be handed to every caller that asked for it.

use crate::attrs::ValueKind;
use crate::core::hash::ContentHash;
use crate::render::NodePath;
use std::sync::Arc;
use thiserror::Error;

/// Boxed error used as the cause of a failed element construction
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while turning source bytes into a node tree
#[derive(Error, Debug, Clone)]
pub enum ParseError {
    /// Structural error reported by the tokenizer
    #[error("malformed markup at line {line}, column {column}: {message}")]
    MalformedMarkup {
        message: String,
        line: usize,
        column: usize,
    },

    /// The token stream did not produce exactly one root element
    #[error("document has no single root element")]
    ParseFailed,

    /// JSON source that does not match the node tree shape
    #[error("invalid JSON layout: {0}")]
    InvalidJson(String),

    /// Reading the source failed
    #[error("failed to read layout source: {0}")]
    Io(#[source] Arc<std::io::Error>),

    /// The permanent cache tier could not be read or written
    #[error(transparent)]
    CacheUnavailable(#[from] CacheError),

    #[error("parse cancelled")]
    Cancelled,

    /// The caller computing this hash panicked before producing a result
    #[error("layout computation for {0} was abandoned")]
    ComputationAbandoned(ContentHash),
}

impl ParseError {
    pub fn malformed(message: impl Into<String>, line: usize, column: usize) -> Self {
        ParseError::MalformedMarkup {
            message: message.into(),
            line,
            column,
        }
    }
}

impl From<std::io::Error> for ParseError {
    fn from(e: std::io::Error) -> Self {
        ParseError::Io(Arc::new(e))
    }
}

/// Failure of a storage-backed cache tier
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("permanent cache tier unavailable: {reason}")]
    Unavailable { reason: String },
}

impl CacheError {
    pub fn unavailable(reason: impl std::fmt::Display) -> Self {
        CacheError::Unavailable {
            reason: reason.to_string(),
        }
    }
}

/// Errors from resolving or invoking an element constructor
#[derive(Error, Debug, Clone)]
pub enum FactoryError {
    /// The name resolves to no constructible type
    #[error("type not found: {0}")]
    TypeNotFound(String),

    /// The type exists but offers no accepted constructor shape
    #[error("type {0} has no usable constructor")]
    NoUsableConstructor(String),

    /// The constructor ran and failed
    #[error("construction of {type_name} failed: {cause}")]
    ConstructionFailed {
        type_name: String,
        #[source]
        cause: Arc<dyn std::error::Error + Send + Sync>,
    },
}

impl FactoryError {
    /// Type name the error refers to
    pub fn type_name(&self) -> &str {
        match self {
            FactoryError::TypeNotFound(name) | FactoryError::NoUsableConstructor(name) => name,
            FactoryError::ConstructionFailed { type_name, .. } => type_name,
        }
    }
}

/// Per-attribute failures reported by the attribute engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttributeError {
    /// No applier is registered under this name
    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),

    /// The value does not convert to the kind the applier expects
    #[error("attribute {name} expects {expected}, found {found:?}")]
    TypeMismatch {
        name: String,
        expected: ValueKind,
        found: String,
    },

    /// The applier exists but the element has no such property
    #[error("attribute {name} does not apply to {element}")]
    NotApplicable { name: String, element: String },

    /// Background work started by a deferred applier failed
    #[error("deferred attribute {name} failed: {reason}")]
    DeferredFailed { name: String, reason: String },
}

impl AttributeError {
    /// Name of the attribute that failed
    pub fn attribute(&self) -> &str {
        match self {
            AttributeError::UnknownAttribute(name)
            | AttributeError::TypeMismatch { name, .. }
            | AttributeError::NotApplicable { name, .. }
            | AttributeError::DeferredFailed { name, .. } => name,
        }
    }
}

/// Rejection of a property write by an element
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    /// The element has no property of this name
    #[error("{element} has no property {name}")]
    Unsupported { element: String, name: String },

    /// The property exists but refuses this value
    #[error("{element}.{name} rejects value: {reason}")]
    Rejected {
        element: String,
        name: String,
        reason: String,
    },
}

/// Refusal to adopt a child element
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContainmentError {
    #[error("{parent} cannot hold children")]
    NotAContainer { parent: String },

    #[error("{parent} refused {child}: {reason}")]
    Refused {
        parent: String,
        child: String,
        reason: String,
    },
}

/// Errors raised while building the live element tree
#[derive(Error, Debug, Clone)]
pub enum RenderError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Element construction failed; the enclosing subtree is not rendered
    #[error("cannot construct element at {path}: {source}")]
    Factory { path: NodePath, source: FactoryError },

    /// Attribute failure with fail-fast application enabled
    #[error("attribute failure at {path}: {source}")]
    Attribute { path: NodePath, source: AttributeError },

    /// A container refused a rendered child
    #[error("containment failed at {path}: {source}")]
    Containment {
        path: NodePath,
        source: ContainmentError,
    },

    #[error("render cancelled")]
    Cancelled,

    /// Elements may only be built on the thread that owns the UI
    #[error("render called off the UI thread")]
    WrongThread,
}

/// Errors from a persistence repository
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("state storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("persisted state is not valid tree JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors loading an [`InflaterConfig`](crate::config::InflaterConfig)
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    /// The configured permanent cache directory cannot be used
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Errors restoring persisted state or parsing its replacement
#[derive(Error, Debug)]
pub enum RestoreError {
    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

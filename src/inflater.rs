//! Inflater
//!
//! The public entry point. Owns one cache, one element factory and one
//! attribute engine, and exposes:
//! - `parse`: source bytes to a shared node tree, through the cache
//! - `render`: node tree to live elements, on the bound UI thread
//! - `inflate`: both
//! - cache teardown and introspection
//!
//! Parsing may run on any thread. Rendering binds the first thread that
//! renders (or the one that calls [`Inflater::bind_ui_thread`]) and refuses
//! every other.

use crate::attrs::AttributeEngine;
use crate::cache::{CacheStatsSnapshot, DirectoryTier, LayoutCache, MemoryTier, PermanentTier};
use crate::cancel::{CancellationToken, CancellationTokenExt};
use crate::config::InflaterConfig;
use crate::core::hash::ContentHash;
use crate::element::{BuildContext, IdRegistry, NoResources, ResourceProvider};
use crate::error::{CacheError, ConfigError, ParseError, RenderError, RestoreError};
use crate::factory::{ElementFactory, TypeResolver};
use crate::host;
use crate::log::{LogSink, NoopSink};
use crate::persist::StateRepository;
use crate::reader::buffered::read_all_hashed;
use crate::render::{RenderOutput, Renderer};
use crate::tree::json::{parse_json, to_json, to_xml};
use crate::tree::{parse_markup, Node};
use rayon::prelude::*;
use std::borrow::Cow;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};

/// Where layout bytes come from
pub enum Source<'a> {
    Bytes(Cow<'a, [u8]>),
    Path(PathBuf),
    Reader(Box<dyn Read + Send + 'a>),
}

impl<'a> Source<'a> {
    pub fn bytes(bytes: impl Into<Cow<'a, [u8]>>) -> Self {
        Source::Bytes(bytes.into())
    }

    pub fn path(path: impl Into<PathBuf>) -> Self {
        Source::Path(path.into())
    }

    pub fn reader(reader: impl Read + Send + 'a) -> Self {
        Source::Reader(Box::new(reader))
    }
}

impl<'a> From<&'a [u8]> for Source<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Source::Bytes(Cow::Borrowed(bytes))
    }
}

/// Markup or JSON text
impl<'a> From<&'a str> for Source<'a> {
    fn from(text: &'a str) -> Self {
        Source::Bytes(Cow::Borrowed(text.as_bytes()))
    }
}

impl From<Vec<u8>> for Source<'static> {
    fn from(bytes: Vec<u8>) -> Self {
        Source::Bytes(Cow::Owned(bytes))
    }
}

impl<'a> From<&'a Path> for Source<'a> {
    fn from(path: &'a Path) -> Self {
        Source::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for Source<'static> {
    fn from(path: PathBuf) -> Self {
        Source::Path(path)
    }
}

impl fmt::Debug for Source<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Bytes(bytes) => write!(f, "Source::Bytes({} bytes)", bytes.len()),
            Source::Path(path) => write!(f, "Source::Path({})", path.display()),
            Source::Reader(_) => f.write_str("Source::Reader"),
        }
    }
}

/// Encoding of a source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SourceFormat {
    Xml,
    Json,
    /// JSON when the first non-whitespace byte is `{`, else XML
    #[default]
    Auto,
}

impl SourceFormat {
    /// Resolve `Auto` against the content
    pub fn detect(bytes: &[u8]) -> SourceFormat {
        match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => SourceFormat::Json,
            _ => SourceFormat::Xml,
        }
    }
}

/// Pipeline counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InflaterStats {
    /// Markup documents actually tokenized
    pub tokenizer_runs: u64,
    /// JSON documents actually decoded
    pub json_loads: u64,
    pub cache: CacheStatsSnapshot,
}

/// Layout parser and renderer
pub struct Inflater {
    config: InflaterConfig,
    cache: LayoutCache,
    factory: ElementFactory,
    engine: AttributeEngine,
    build: BuildContext,
    log: Arc<dyn LogSink>,
    ui_thread: OnceLock<ThreadId>,
    tokenizer_runs: AtomicU64,
    json_loads: AtomicU64,
}

impl Inflater {
    /// In-memory inflater over the standard widget set
    pub fn new() -> Self {
        InflaterBuilder::new().assemble(Box::new(MemoryTier::new()))
    }

    pub fn builder() -> InflaterBuilder {
        InflaterBuilder::new()
    }

    /// Inflater over the standard widget set, configured by `config`
    pub fn from_config(config: InflaterConfig) -> Result<Self, ConfigError> {
        InflaterBuilder::new().config(config).build()
    }

    pub fn config(&self) -> &InflaterConfig {
        &self.config
    }

    pub fn cache(&self) -> &LayoutCache {
        &self.cache
    }

    pub fn factory(&self) -> &ElementFactory {
        &self.factory
    }

    pub fn engine(&self) -> &AttributeEngine {
        &self.engine
    }

    /// Register or replace appliers after construction
    pub fn engine_mut(&mut self) -> &mut AttributeEngine {
        &mut self.engine
    }

    /// Context handed to constructors and appliers by [`render`](Self::render)
    pub fn build_context(&self) -> &BuildContext {
        &self.build
    }

    /// Parse a source through the cache, detecting its format
    pub fn parse<'a>(&self, source: impl Into<Source<'a>>) -> Result<Arc<Node>, ParseError> {
        self.parse_with(source.into(), SourceFormat::Auto, None)
    }

    /// Parse a source through the cache.
    ///
    /// The whole source is read and hashed first; a cached tree for that hash
    /// is returned without tokenizing. Otherwise exactly one caller per hash
    /// builds the tree while concurrent callers wait for it. Nothing is cached
    /// on failure.
    pub fn parse_with(
        &self,
        source: Source<'_>,
        format: SourceFormat,
        cancel: Option<&CancellationToken>,
    ) -> Result<Arc<Node>, ParseError> {
        let (bytes, hash) = self.read_source(source)?;
        let format = match format {
            SourceFormat::Auto => SourceFormat::detect(&bytes),
            explicit => explicit,
        };

        if let Some(cancel) = cancel {
            cancel.check_parse()?;
        }

        let result = self
            .cache
            .get_or_compute_with(hash, cancel, || self.build_tree(&bytes, format, hash));

        if let Err(err) = &result {
            self.log.warn(&format!("layout {} failed to parse", hash), Some(err));
        }
        result
    }

    /// Parse independent sources on the rayon pool; results keep input order
    pub fn parse_all<'a>(&self, sources: Vec<Source<'a>>) -> Vec<Result<Arc<Node>, ParseError>> {
        sources
            .into_par_iter()
            .map(|source| self.parse_with(source, SourceFormat::Auto, None))
            .collect()
    }

    /// Claim the calling thread as the UI thread
    pub fn bind_ui_thread(&self) -> Result<(), RenderError> {
        self.check_ui_thread()
    }

    /// Whether the calling thread may render
    pub fn is_ui_thread(&self) -> bool {
        self.ui_thread
            .get()
            .map_or(true, |bound| *bound == thread::current().id())
    }

    /// Render a tree with the inflater's own build context
    pub fn render(&self, node: &Node) -> Result<RenderOutput, RenderError> {
        self.render_with(node, &self.build, None)
    }

    /// Render a tree with a caller-supplied context and cancellation token
    pub fn render_with(
        &self,
        node: &Node,
        ctx: &BuildContext,
        cancel: Option<&CancellationToken>,
    ) -> Result<RenderOutput, RenderError> {
        self.check_ui_thread()?;
        Renderer::new(&self.factory, &self.engine, self.log.as_ref()).render(node, ctx, cancel)
    }

    /// Parse then render
    pub fn inflate<'a>(&self, source: impl Into<Source<'a>>) -> Result<RenderOutput, RenderError> {
        let node = self.parse(source)?;
        self.render(&node)
    }

    /// Load the persisted tree if the repository has one, otherwise parse
    /// `source` and persist the result
    pub fn restore_or_parse<'a>(
        &self,
        repository: &dyn StateRepository,
        source: impl Into<Source<'a>>,
    ) -> Result<Arc<Node>, RestoreError> {
        if repository.has_state() {
            if let Some(node) = repository.load()? {
                self.log.debug("restored persisted layout state");
                return Ok(Arc::new(node));
            }
        }

        let node = self.parse(source)?;
        repository.save(&node)?;
        Ok(node)
    }

    /// Empty both cache tiers
    pub fn clear_cache(&self) -> Result<(), CacheError> {
        self.cache.clear()
    }

    /// Entries in the hot tier
    pub fn cache_size(&self) -> usize {
        self.cache.size()
    }

    pub fn cache_max_size(&self) -> usize {
        self.cache.max_size()
    }

    /// Every tree in the permanent tier
    pub fn cached_nodes(&self) -> Result<Vec<Arc<Node>>, CacheError> {
        self.cache.get_all()
    }

    pub fn stats(&self) -> InflaterStats {
        InflaterStats {
            tokenizer_runs: self.tokenizer_runs.load(Ordering::Relaxed),
            json_loads: self.json_loads.load(Ordering::Relaxed),
            cache: self.cache.stats(),
        }
    }

    /// Pretty JSON form of a tree
    pub fn to_json(&self, node: &Node) -> serde_json::Result<String> {
        to_json(node)
    }

    /// Markup form of a tree
    pub fn to_xml(&self, node: &Node) -> String {
        to_xml(node)
    }

    fn check_ui_thread(&self) -> Result<(), RenderError> {
        let current = thread::current().id();
        if *self.ui_thread.get_or_init(|| current) != current {
            return Err(RenderError::WrongThread);
        }
        Ok(())
    }

    fn read_source<'a>(&self, source: Source<'a>) -> Result<(Cow<'a, [u8]>, ContentHash), ParseError> {
        match source {
            Source::Bytes(bytes) => {
                let hash = ContentHash::of(&bytes);
                Ok((bytes, hash))
            }
            Source::Path(path) => {
                let file = File::open(&path).map_err(|e| {
                    self.log
                        .error(&format!("cannot open layout {}", path.display()), Some(&e));
                    e
                })?;
                let (bytes, hash) = read_all_hashed(file, self.config.chunk_size)?;
                Ok((Cow::Owned(bytes), hash))
            }
            Source::Reader(reader) => {
                let (bytes, hash) = read_all_hashed(reader, self.config.chunk_size)?;
                Ok((Cow::Owned(bytes), hash))
            }
        }
    }

    fn build_tree(&self, bytes: &[u8], format: SourceFormat, hash: ContentHash) -> Result<Node, ParseError> {
        if format == SourceFormat::Json {
            self.json_loads.fetch_add(1, Ordering::Relaxed);
            let node = parse_json(bytes)?;
            self.log.debug(&format!("decoded JSON layout {}", hash));
            return Ok(node);
        }

        self.tokenizer_runs.fetch_add(1, Ordering::Relaxed);
        let (node, _) = parse_markup(bytes, self.config.chunk_size)?;
        self.log.debug(&format!(
            "tokenized layout {} ({} bytes, {} nodes)",
            hash,
            bytes.len(),
            node.subtree_len()
        ));
        Ok(node)
    }
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Inflater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inflater")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .field("factory", &self.factory)
            .field("engine", &self.engine)
            .field("ui_thread", &self.ui_thread.get())
            .finish()
    }
}

/// Assembles an [`Inflater`]; anything not supplied uses the standard
/// headless widget set and a no-op log
pub struct InflaterBuilder {
    config: InflaterConfig,
    resolver: Option<Arc<dyn TypeResolver>>,
    engine: Option<AttributeEngine>,
    resources: Arc<dyn ResourceProvider>,
    ids: Option<Arc<IdRegistry>>,
    log: Arc<dyn LogSink>,
    permanent: Option<Box<dyn PermanentTier>>,
}

impl InflaterBuilder {
    pub fn new() -> Self {
        InflaterBuilder {
            config: InflaterConfig::default(),
            resolver: None,
            engine: None,
            resources: Arc::new(NoResources),
            ids: None,
            log: Arc::new(NoopSink),
            permanent: None,
        }
    }

    pub fn config(mut self, config: InflaterConfig) -> Self {
        self.config = config;
        self
    }

    /// Type lookup for names without a registered builder
    pub fn resolver(mut self, resolver: Arc<dyn TypeResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Attribute engine; its fail-fast flag is taken from the config
    pub fn engine(mut self, engine: AttributeEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn resources(mut self, resources: Arc<dyn ResourceProvider>) -> Self {
        self.resources = resources;
        self
    }

    /// Share generated `@+id/` ids with other inflaters
    pub fn ids(mut self, ids: Arc<IdRegistry>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn log(mut self, log: Arc<dyn LogSink>) -> Self {
        self.log = log;
        self
    }

    /// Permanent cache tier; overrides `cache_dir`
    pub fn permanent_tier(mut self, tier: Box<dyn PermanentTier>) -> Self {
        self.permanent = Some(tier);
        self
    }

    /// Validate the config, open the cache directory if one is configured,
    /// and assemble
    pub fn build(mut self) -> Result<Inflater, ConfigError> {
        self.config.validate()?;
        let permanent: Box<dyn PermanentTier> = match (self.permanent.take(), &self.config.cache_dir) {
            (Some(tier), _) => tier,
            (None, Some(dir)) => Box::new(DirectoryTier::open(dir)?),
            (None, None) => Box::new(MemoryTier::new()),
        };
        Ok(self.assemble(permanent))
    }

    fn assemble(self, permanent: Box<dyn PermanentTier>) -> Inflater {
        let config = self.config;
        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(host::standard_catalog()));
        let mut engine = self.engine.unwrap_or_else(host::standard_engine);
        engine.set_fail_fast(config.fail_fast);

        let mut build = BuildContext::new(self.resources, config.density);
        if let Some(ids) = self.ids {
            build = build.with_ids(ids);
        }

        self.log.info(&format!(
            "inflater ready: hot capacity {}, chunk size {}",
            config.hot_capacity, config.chunk_size
        ));

        Inflater {
            cache: LayoutCache::with_permanent(config.hot_capacity, permanent),
            factory: ElementFactory::with_prefixes(resolver, config.search_prefixes.clone()),
            engine,
            build,
            log: self.log,
            ui_thread: OnceLock::new(),
            tokenizer_runs: AtomicU64::new(0),
            json_loads: AtomicU64::new(0),
            config,
        }
    }
}

impl Default for InflaterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//! Elements and Their Construction Context
//!
//! An [`Element`] is a live UI object built from a node. The pipeline only
//! needs a narrow capability set from it: named property writes, and child
//! adoption when it is a container. Elements are not `Send`; they live on the
//! UI thread that rendered them.
//!
//! [`ResourceProvider`] is the host's symbolic resource lookup. It answers
//! [`ResourceId::NOT_FOUND`] instead of failing.

use crate::attrs::Value;
use crate::error::{ContainmentError, PropertyError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

/// Platform resource identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(pub i32);

impl ResourceId {
    /// Sentinel for an unresolvable reference
    pub const NOT_FOUND: ResourceId = ResourceId(0);

    pub fn is_found(self) -> bool {
        self != Self::NOT_FOUND
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Symbolic resource lookup supplied by the host
pub trait ResourceProvider: Send + Sync {
    /// Map `@kind/name` to an id, or [`ResourceId::NOT_FOUND`]
    fn resolve(&self, kind: &str, name: &str) -> ResourceId;
}

/// Provider that knows no resources
#[derive(Debug, Default, Clone, Copy)]
pub struct NoResources;

impl ResourceProvider for NoResources {
    fn resolve(&self, _kind: &str, _name: &str) -> ResourceId {
        ResourceId::NOT_FOUND
    }
}

/// In-memory provider keyed by (kind, name)
#[derive(Debug, Default, Clone)]
pub struct MapResources {
    entries: HashMap<(String, String), ResourceId>,
}

impl MapResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: impl Into<String>, name: impl Into<String>, id: ResourceId) {
        self.entries.insert((kind.into(), name.into()), id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, N: Into<String>> FromIterator<(K, N, ResourceId)> for MapResources {
    fn from_iter<I: IntoIterator<Item = (K, N, ResourceId)>>(iter: I) -> Self {
        let mut resources = MapResources::new();
        for (kind, name, id) in iter {
            resources.insert(kind, name, id);
        }
        resources
    }
}

impl ResourceProvider for MapResources {
    fn resolve(&self, kind: &str, name: &str) -> ResourceId {
        self.entries
            .get(&(kind.to_string(), name.to_string()))
            .copied()
            .unwrap_or(ResourceId::NOT_FOUND)
    }
}

/// First id handed out for `@+id/` declarations the provider does not know
pub const GENERATED_ID_BASE: i32 = 0x0100_0000;

/// Ids generated for `@+id/name` declarations, stable per name
#[derive(Debug)]
pub struct IdRegistry {
    ids: Mutex<HashMap<String, ResourceId>>,
    next: AtomicI32,
}

impl Default for IdRegistry {
    fn default() -> Self {
        IdRegistry {
            ids: Mutex::new(HashMap::new()),
            next: AtomicI32::new(GENERATED_ID_BASE),
        }
    }
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<ResourceId> {
        self.ids.lock().get(name).copied()
    }

    /// Id for `name`, generating one on first use
    pub fn get_or_generate(&self, name: &str) -> ResourceId {
        *self
            .ids
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| ResourceId(self.next.fetch_add(1, Ordering::Relaxed)))
    }

    pub fn len(&self) -> usize {
        self.ids.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything a constructor or applier may consult
#[derive(Clone)]
pub struct BuildContext {
    resources: Arc<dyn ResourceProvider>,
    ids: Arc<IdRegistry>,
    density: f32,
}

impl BuildContext {
    pub fn new(resources: Arc<dyn ResourceProvider>, density: f32) -> Self {
        BuildContext {
            resources,
            ids: Arc::new(IdRegistry::new()),
            density,
        }
    }

    /// Share an id registry across contexts (and renders)
    pub fn with_ids(mut self, ids: Arc<IdRegistry>) -> Self {
        self.ids = ids;
        self
    }

    pub fn resources(&self) -> &dyn ResourceProvider {
        self.resources.as_ref()
    }

    pub fn ids(&self) -> &IdRegistry {
        &self.ids
    }

    /// Pixels per dp
    pub fn density(&self) -> f32 {
        self.density
    }

    /// Resolve `@kind/name`. Ids unknown to the provider fall back to the
    /// generated registry; `create` (the `@+id/` form) generates one.
    pub fn resolve(&self, kind: &str, name: &str, create: bool) -> ResourceId {
        let id = self.resources.resolve(kind, name);
        if id.is_found() || kind != "id" {
            return id;
        }
        if create {
            self.ids.get_or_generate(name)
        } else {
            self.ids.get(name).unwrap_or(ResourceId::NOT_FOUND)
        }
    }
}

impl Default for BuildContext {
    fn default() -> Self {
        Self::new(Arc::new(NoResources), 1.0)
    }
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("density", &self.density)
            .field("generated_ids", &self.ids.len())
            .finish()
    }
}

/// A live UI object
pub trait Element: Any + fmt::Debug {
    /// Type name the element was constructed under
    fn type_name(&self) -> &str;

    fn set_property(&mut self, name: &str, value: Value) -> Result<(), PropertyError>;

    fn property(&self, name: &str) -> Option<&Value>;

    /// Whether [`append_child`](Self::append_child) can succeed
    fn is_container(&self) -> bool {
        false
    }

    fn append_child(&mut self, _child: Box<dyn Element>) -> Result<(), ContainmentError> {
        Err(ContainmentError::NotAContainer {
            parent: self.type_name().to_string(),
        })
    }

    fn child_count(&self) -> usize {
        0
    }

    fn child(&self, _index: usize) -> Option<&dyn Element> {
        None
    }

    fn child_mut(&mut self, _index: usize) -> Option<&mut dyn Element> {
        None
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Follow child indices down from `element`
pub fn descendant<'a>(element: &'a dyn Element, path: &[usize]) -> Option<&'a dyn Element> {
    let mut current = element;
    for &index in path {
        current = current.child(index)?;
    }
    Some(current)
}

/// Mutable form of [`descendant`]
pub fn descendant_mut<'a>(element: &'a mut dyn Element, path: &[usize]) -> Option<&'a mut dyn Element> {
    let mut current = element;
    for &index in path {
        current = current.child_mut(index)?;
    }
    Some(current)
}

/// Elements in the subtree, including `element`
pub fn subtree_len(element: &dyn Element) -> usize {
    1 + (0..element.child_count())
        .filter_map(|i| element.child(i))
        .map(subtree_len)
        .sum::<usize>()
}

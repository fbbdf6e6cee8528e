use std::fmt;
use std::num::NonZeroUsize;

use lru::LruCache;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use tracing::debug;

use crate::error::{DriverError, Result};
use crate::ui::node::{NodePath, UiNode};
use crate::ui::snapshot::Snapshot;

pub const DEFAULT_CAPACITY: usize = 2048;

/// Opaque element id handed to the automation client.
///
/// A content hash of (generation, path): interning the same node of the same
/// snapshot twice yields the same handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementHandle(String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        ElementHandle(id.into())
    }

    fn for_node(path: &NodePath, generation: u64) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(generation.to_be_bytes());
        hasher.update(path.to_string().as_bytes());
        ElementHandle(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What is needed to find the element again in a later snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub path: NodePath,
    pub generation: u64,
    pub tag: String,
    pub focusable: bool,
}

/// Bounded handle -> entry map with least-recently-used eviction.
///
/// Entries never expire on their own; freshness is checked when a handle is
/// resolved against the current snapshot.
pub struct ElementCache {
    entries: LruCache<ElementHandle, CacheEntry>,
}

impl ElementCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        ElementCache {
            entries: LruCache::new(capacity),
        }
    }

    /// Handle for `node` as seen in snapshot `generation`. Refreshes recency
    /// when the handle already exists.
    pub fn intern(&mut self, node: &UiNode, generation: u64) -> ElementHandle {
        let handle = ElementHandle::for_node(&node.path, generation);
        if self.entries.get(&handle).is_some() {
            return handle;
        }

        let entry = CacheEntry {
            path: node.path.clone(),
            generation,
            tag: node.tag.clone(),
            focusable: node.is_focusable(),
        };
        if let Some((evicted, old)) = self.entries.push(handle.clone(), entry) {
            debug!(handle = %evicted, path = %old.path, "evicted element handle");
        }
        handle
    }

    /// Re-locate the element behind `handle` in `snapshot`.
    pub fn resolve_handle<'s>(
        &mut self,
        handle: &ElementHandle,
        snapshot: &'s Snapshot,
    ) -> Result<&'s UiNode> {
        let entry = self
            .entries
            .get(handle)
            .cloned()
            .ok_or_else(|| DriverError::NoSuchElement {
                selector: format!("element id {}", handle),
            })?;

        let node = snapshot
            .find(&entry.path)
            .ok_or_else(|| DriverError::StaleElementReference {
                handle: handle.to_string(),
                reason: format!("{} is no longer on screen", entry.path),
            })?;

        if node.tag != entry.tag {
            return Err(DriverError::StaleElementReference {
                handle: handle.to_string(),
                reason: format!("{} is now a <{}>", entry.path, node.tag),
            });
        }
        if entry.focusable && !node.is_focusable() {
            return Err(DriverError::StaleElementReference {
                handle: handle.to_string(),
                reason: format!("{} is no longer focusable", entry.path),
            });
        }
        Ok(node)
    }

    /// Entry without touching recency.
    pub fn peek(&self, handle: &ElementHandle) -> Option<&CacheEntry> {
        self.entries.peek(handle)
    }

    pub fn contains(&self, handle: &ElementHandle) -> bool {
        self.entries.contains(handle)
    }

    /// Drop everything; called when the UI changed out of band.
    pub fn clear(&mut self) {
        debug!(len = self.entries.len(), "clearing element cache");
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}

impl Default for ElementCache {
    fn default() -> Self {
        ElementCache::new(DEFAULT_CAPACITY)
    }
}

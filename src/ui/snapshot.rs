use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use crate::ecp::xml::{attributes, tag_name};
use crate::error::{DriverError, Result};
use crate::ui::node::{Bounds, NodePath, UiNode};

/// Produces the raw UI description a snapshot is parsed from.
pub trait SnapshotSource {
    fn fetch_ui_source(&self) -> Result<String>;

    /// Changes whenever something may have altered the UI since the last
    /// fetch. Sources that cannot tell always report the same value.
    fn revision(&self) -> u64 {
        0
    }
}

/// One immutable capture of the on-screen UI tree.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub generation: u64,
    pub captured_at: SystemTime,
    pub root: UiNode,
    /// The document the tree was parsed from (page source)
    pub source: String,
}

impl Snapshot {
    /// Parse an app-ui document. Children keep declaration order.
    pub fn parse(generation: u64, source: String) -> Result<Snapshot> {
        let root = parse_tree(&source)?;
        Ok(Snapshot {
            generation,
            captured_at: SystemTime::now(),
            root,
            source,
        })
    }

    /// Walk `path` step by step from the root.
    pub fn find(&self, path: &NodePath) -> Option<&UiNode> {
        let (first, rest) = path.steps().split_first()?;
        if first.tag != self.root.tag || first.position != 1 {
            return None;
        }
        let mut node = &self.root;
        for step in rest {
            node = node.children.iter().find(|c| {
                c.path.steps().last().map(|s| s == step).unwrap_or(false)
            })?;
        }
        Some(node)
    }

    /// Deepest node on the `focused="true"` chain.
    pub fn focused(&self) -> Option<&UiNode> {
        let mut current = if self.root.is_focused() {
            Some(&self.root)
        } else {
            self.root.descendants().into_iter().find(|n| n.is_focused())
        }?;

        while let Some(child) = current
            .descendants()
            .into_iter()
            .find(|n| n.is_focused())
        {
            current = child;
        }
        Some(current)
    }

    /// Nearest node at or above `path` that can take focus. Labels and
    /// posters inside a button resolve to the button.
    pub fn focus_owner(&self, path: &NodePath) -> Option<&UiNode> {
        let mut current = Some(path.clone());
        while let Some(p) = current {
            let node = self.find(&p)?;
            if node.is_focusable() {
                return Some(node);
            }
            current = p.parent();
        }
        None
    }

    /// Every node, document order.
    pub fn nodes(&self) -> Vec<&UiNode> {
        self.root.self_and_descendants()
    }
}

/// Session-scoped capture state: the generation counter and latest snapshot.
#[derive(Debug, Default)]
pub struct Snapshotter {
    generation: u64,
    latest: Option<Arc<Snapshot>>,
    /// Source revision observed just before `latest` was fetched
    latest_revision: u64,
}

impl Snapshotter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch and parse the current UI. The generation advances on every
    /// successful capture, whether or not the content changed.
    pub fn capture(&mut self, source: &dyn SnapshotSource) -> Result<Arc<Snapshot>> {
        let revision = source.revision();
        let raw = source.fetch_ui_source()?;
        let snapshot = Arc::new(Snapshot::parse(self.generation + 1, raw)?);
        self.generation = snapshot.generation;
        debug!(generation = snapshot.generation, "captured ui snapshot");
        self.latest = Some(Arc::clone(&snapshot));
        self.latest_revision = revision;
        Ok(snapshot)
    }

    /// The latest snapshot while the source reports no change since it was
    /// taken, otherwise a fresh capture.
    pub fn current(&mut self, source: &dyn SnapshotSource) -> Result<Arc<Snapshot>> {
        match &self.latest {
            Some(latest) if self.latest_revision == source.revision() => {
                debug!(generation = latest.generation, "reusing ui snapshot");
                Ok(Arc::clone(latest))
            }
            _ => self.capture(source),
        }
    }

    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.latest.clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Forget everything; used at session teardown.
    pub fn reset(&mut self) {
        self.generation = 0;
        self.latest = None;
        self.latest_revision = 0;
    }
}

// ============================================================================
// Tree parsing
// ============================================================================

/// An element whose end tag has not been seen yet.
struct OpenNode {
    node: UiNode,
    tag_counts: HashMap<String, usize>,
}

fn parse_tree(source: &str) -> Result<UiNode> {
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<OpenNode> = Vec::new();
    let mut root: Option<UiNode> = None;
    let mut order = 0usize;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let node = new_node(&e, &mut stack, &root, &mut order)?;
                stack.push(OpenNode {
                    node,
                    tag_counts: HashMap::new(),
                });
            }
            Event::Empty(e) => {
                let node = new_node(&e, &mut stack, &root, &mut order)?;
                attach(node, &mut stack, &mut root);
            }
            Event::End(_) => {
                let open = stack
                    .pop()
                    .ok_or_else(|| DriverError::protocol("app-ui", "unbalanced end tag"))?;
                attach(open.node, &mut stack, &mut root);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(DriverError::protocol("app-ui", "document ended inside an element"));
    }
    root.ok_or_else(|| DriverError::protocol("app-ui", "document has no root element"))
}

fn new_node(
    e: &BytesStart<'_>,
    stack: &mut [OpenNode],
    root: &Option<UiNode>,
    order: &mut usize,
) -> Result<UiNode> {
    let tag = tag_name(e);
    let path = match stack.last_mut() {
        Some(parent) => {
            let count = parent.tag_counts.entry(tag.clone()).or_insert(0);
            *count += 1;
            parent.node.path.child(&tag, *count)
        }
        None if root.is_some() => {
            return Err(DriverError::protocol("app-ui", "more than one root element"));
        }
        None => NodePath::root(&tag),
    };

    let attributes = attributes(e)?;
    let bounds = attributes.get("bounds").and_then(|b| Bounds::parse(b));
    let node = UiNode {
        tag,
        path,
        order: *order,
        attributes,
        bounds,
        children: Vec::new(),
    };
    *order += 1;
    Ok(node)
}

fn attach(node: UiNode, stack: &mut [OpenNode], root: &mut Option<UiNode>) {
    match stack.last_mut() {
        Some(parent) => parent.node.children.push(node),
        None => *root = Some(node),
    }
}

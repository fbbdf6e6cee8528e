use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::ecp::xml::parse_bool;

/// Screen rectangle as reported in the `bounds="{x, y, w, h}"` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Parse `{12, 40, 300, 80}`. Anything else is treated as "no bounds".
    pub fn parse(raw: &str) -> Option<Bounds> {
        let inner = raw.trim().strip_prefix('{')?.strip_suffix('}')?;
        let values: Vec<f64> = inner
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .ok()?;
        match values.as_slice() {
            [x, y, w, h] => Some(Bounds::new(*x, *y, *w, *h)),
            _ => None,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// One step of a structural path: tag name plus 1-based position among
/// siblings with the same tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathStep {
    pub tag: String,
    pub position: usize,
}

/// Identity of a node within a snapshot, e.g. `/app-ui[1]/screen[1]/Button[2]`.
///
/// Unique within one snapshot by construction. Renders as an XPath the
/// locator resolver accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodePath(Vec<PathStep>);

impl NodePath {
    pub fn root(tag: &str) -> Self {
        NodePath(vec![PathStep {
            tag: tag.to_string(),
            position: 1,
        }])
    }

    pub fn child(&self, tag: &str, position: usize) -> Self {
        let mut steps = self.0.clone();
        steps.push(PathStep {
            tag: tag.to_string(),
            position,
        });
        NodePath(steps)
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn parent(&self) -> Option<NodePath> {
        if self.0.len() <= 1 {
            return None;
        }
        Some(NodePath(self.0[..self.0.len() - 1].to_vec()))
    }

    /// Number of leading steps shared with `other`.
    pub fn common_prefix_len(&self, other: &NodePath) -> usize {
        self.0
            .iter()
            .zip(other.0.iter())
            .take_while(|(a, b)| a == b)
            .count()
    }

    pub fn is_ancestor_of(&self, other: &NodePath) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }

    /// Parse the rendered form back. Only the canonical `/tag[n]` shape.
    pub fn parse(raw: &str) -> Option<NodePath> {
        let mut steps = Vec::new();
        for segment in raw.strip_prefix('/')?.split('/') {
            let (tag, rest) = segment.split_once('[')?;
            let position = rest.strip_suffix(']')?.parse::<usize>().ok()?;
            if tag.is_empty() || position == 0 {
                return None;
            }
            steps.push(PathStep {
                tag: tag.to_string(),
                position,
            });
        }
        Some(NodePath(steps))
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.0 {
            write!(f, "/{}[{}]", step.tag, step.position)?;
        }
        Ok(())
    }
}

impl Serialize for NodePath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// A node of the on-screen UI tree. Immutable once its snapshot is captured.
#[derive(Debug, Clone)]
pub struct UiNode {
    pub tag: String,
    pub path: NodePath,
    /// Pre-order index within the snapshot (document order)
    pub order: usize,
    pub attributes: BTreeMap<String, String>,
    pub bounds: Option<Bounds>,
    pub children: Vec<UiNode>,
}

impl UiNode {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    fn flag(&self, name: &str) -> Option<bool> {
        self.attribute(name).and_then(parse_bool)
    }

    pub fn is_focused(&self) -> bool {
        self.flag("focused").unwrap_or(false)
    }

    pub fn is_focusable(&self) -> bool {
        self.flag("focusable").unwrap_or(false)
    }

    /// Nodes are visible unless they say otherwise.
    pub fn is_visible(&self) -> bool {
        self.flag("visible").unwrap_or(true)
    }

    pub fn text(&self) -> Option<&str> {
        self.attribute("text")
    }

    /// Own `text`, or the texts of all descendants joined by spaces.
    pub fn visible_text(&self) -> String {
        if let Some(text) = self.text() {
            return text.to_string();
        }
        self.descendants()
            .into_iter()
            .filter_map(UiNode::text)
            .filter(|t| !t.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// All descendants in document order, excluding `self`.
    pub fn descendants(&self) -> Vec<&UiNode> {
        let mut out = Vec::new();
        let mut stack: Vec<&UiNode> = self.children.iter().rev().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// `self` followed by all descendants in document order.
    pub fn self_and_descendants(&self) -> Vec<&UiNode> {
        let mut out = vec![self];
        out.extend(self.descendants());
        out
    }
}

//! Arena-backed syntax tree consumed by the rule engine.
//!
//! Nodes are addressed by stable `NodeId` indices into an arena rather than
//! by references, so removing or replacing a node invalidates its id
//! explicitly. A rule that edits a node another rule already rewrote in the
//! same pass gets a `StaleNodeError` back, which callers log and ignore.

use std::ops::Range;

use thiserror::Error;
use tracing::debug;

/// Opaque node type tag. The engine never interprets the string; parsers
/// define their own kinds as constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyntaxKind(pub &'static str);

impl std::fmt::Display for SyntaxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// Stable index of a node within one `SyntaxTree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Returned when a mutation targets a node that an earlier edit in the same
/// pass already removed or replaced. Expected under the edit-now policy;
/// never fatal.
#[derive(Debug, Error)]
#[error("node was invalidated by an earlier edit in this pass")]
pub struct StaleNodeError;

struct NodeData {
    kind: SyntaxKind,
    start: usize,
    end: usize,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    alive: bool,
}

/// A tree of typed nodes over a mutable text buffer.
///
/// Invariants: sibling ranges never overlap and are non-decreasing in
/// document order; a parent's range contains all of its children's ranges;
/// the root always spans the whole text.
pub struct SyntaxTree {
    text: String,
    nodes: Vec<NodeData>,
    /// Ranges rewritten this pass, kept in current-text coordinates.
    edits: Vec<Range<usize>>,
}

impl SyntaxTree {
    /// Create a tree whose root spans the whole text.
    pub fn new(text: impl Into<String>, root_kind: SyntaxKind) -> Self {
        let text = text.into();
        let root = NodeData {
            kind: root_kind,
            start: 0,
            end: text.len(),
            parent: None,
            children: Vec::new(),
            alive: true,
        };
        Self {
            text,
            nodes: vec![root],
            edits: Vec::new(),
        }
    }

    /// Append a child node under `parent`. Used by parsers while building
    /// the tree; children must be pushed in document order.
    pub fn push_node(&mut self, parent: NodeId, kind: SyntaxKind, start: usize, end: usize) -> NodeId {
        debug_assert!(start <= end && end <= self.text.len());
        debug_assert!(self.nodes[parent.index()].start <= start);
        debug_assert!(end <= self.nodes[parent.index()].end);
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            kind,
            start,
            end,
            parent: Some(parent),
            children: Vec::new(),
            alive: true,
        });
        self.nodes[parent.index()].children.push(id);
        id
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn is_root(&self, node: NodeId) -> bool {
        node.index() == 0
    }

    pub fn is_alive(&self, node: NodeId) -> bool {
        self.nodes[node.index()].alive
    }

    pub fn kind(&self, node: NodeId) -> SyntaxKind {
        self.nodes[node.index()].kind
    }

    pub fn text_range(&self, node: NodeId) -> Range<usize> {
        let data = &self.nodes[node.index()];
        data.start..data.end
    }

    /// Text currently covered by `node`. Meaningful only for live nodes.
    pub fn node_text(&self, node: NodeId) -> &str {
        &self.text[self.text_range(node)]
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.index()].parent
    }

    /// Live children of `node`, in document order.
    pub fn children(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[node.index()]
            .children
            .iter()
            .copied()
            .filter(|c| self.nodes[c.index()].alive)
    }

    pub fn prev_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let mut prev = None;
        for child in self.children(parent) {
            if child == node {
                return prev;
            }
            prev = Some(child);
        }
        None
    }

    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let mut found = false;
        for child in self.children(parent) {
            if found {
                return Some(child);
            }
            found = child == node;
        }
        None
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// Number of edits applied to this tree so far.
    pub fn edit_count(&self) -> usize {
        self.edits.len()
    }

    /// Whether `offset` falls inside a range rewritten earlier in this pass.
    /// A pure deletion is treated as occupying its collapse point.
    pub fn was_rewritten(&self, offset: usize) -> bool {
        self.edits
            .iter()
            .any(|r| (r.contains(&offset)) || (r.is_empty() && offset == r.start))
    }

    /// Delete `node` and the text it covers. The node and its descendants
    /// become stale; offsets of surviving nodes are shifted.
    pub fn remove(&mut self, node: NodeId) -> Result<(), StaleNodeError> {
        self.check_live(node)?;
        let range = self.text_range(node);
        self.kill(node);
        self.splice(range.clone(), "");
        self.edits.push(range.start..range.start);
        Ok(())
    }

    /// Replace the text covered by `node` with `replacement`. The node and
    /// its descendants become stale; a later pass re-derives their structure.
    pub fn replace_with_text(&mut self, node: NodeId, replacement: &str) -> Result<(), StaleNodeError> {
        self.check_live(node)?;
        let range = self.text_range(node);
        self.kill(node);
        self.splice(range.clone(), replacement);
        self.edits.push(range.start..range.start + replacement.len());
        Ok(())
    }

    /// Insert `text` immediately before `node`. No node becomes stale.
    pub fn insert_before(&mut self, node: NodeId, text: &str) -> Result<(), StaleNodeError> {
        self.check_live(node)?;
        let at = self.text_range(node).start;
        self.splice(at..at, text);
        self.edits.push(at..at + text.len());
        Ok(())
    }

    /// Insert `text` immediately after `node`.
    pub fn insert_after(&mut self, node: NodeId, text: &str) -> Result<(), StaleNodeError> {
        self.check_live(node)?;
        let at = self.text_range(node).end;
        self.splice(at..at, text);
        self.edits.push(at..at + text.len());
        Ok(())
    }

    fn check_live(&self, node: NodeId) -> Result<(), StaleNodeError> {
        if self.nodes[node.index()].alive {
            Ok(())
        } else {
            debug!(node = node.0, "ignoring edit to stale node");
            Err(StaleNodeError)
        }
    }

    fn kill(&mut self, node: NodeId) {
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let data = &mut self.nodes[id.index()];
            data.alive = false;
            stack.extend(data.children.iter().copied());
        }
    }

    /// Rewrite `at` with `replacement` and shift every surviving range.
    fn splice(&mut self, at: Range<usize>, replacement: &str) {
        let delta = replacement.len() as isize - at.len() as isize;
        self.text.replace_range(at.clone(), replacement);
        let insertion = at.is_empty();
        for data in self.nodes.iter_mut().filter(|n| n.alive) {
            let (start, end) = shifted(data.start, data.end, &at, delta, insertion);
            data.start = start;
            data.end = end;
        }
        for edit in &mut self.edits {
            let (start, end) = shifted(edit.start, edit.end, &at, delta, insertion);
            *edit = start..end;
        }
        // The root covers whatever the text currently is, including text
        // appended past the last parsed node.
        let len = self.text.len();
        self.nodes[0].start = 0;
        self.nodes[0].end = len;
    }
}

fn shifted(start: usize, end: usize, at: &Range<usize>, delta: isize, insertion: bool) -> (usize, usize) {
    let add = |v: usize| (v as isize + delta) as usize;
    if insertion {
        let p = at.start;
        let new_start = if start >= p { add(start) } else { start };
        let new_end = if end > p || (end == p && start >= p) {
            add(end)
        } else {
            end
        };
        (new_start, new_end)
    } else if start >= at.end {
        (add(start), add(end))
    } else if start <= at.start && end >= at.end {
        // A range spanning the edit keeps its start and resizes.
        (start, add(end))
    } else {
        (start, end)
    }
}

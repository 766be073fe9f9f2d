use crate::engine::RuleCtx;
use crate::tree::{NodeId, SyntaxKind, SyntaxTree};

/// Traversal directive returned from a rule's visit callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep walking into this node's children.
    Continue,
    /// Skip this node's subtree but keep walking the rest of the tree.
    SkipChildren,
    /// End this rule's traversal of the whole tree.
    Stop,
}

/// Contract implemented by every lint rule.
///
/// A rule is stateless across runs: anything it needs while visiting one
/// file lives in locals of a single `visit` call. Violations are reported
/// through [`RuleCtx::emit`], which synchronously returns the engine's
/// autocorrect decision; a rule may mutate the tree only after observing
/// [`AutocorrectDecision::Allowed`](crate::models::AutocorrectDecision).
pub trait Rule: Send + Sync {
    /// Stable identifier, e.g. `"no-empty-body"`. Used for configuration,
    /// deduplication, and ordering.
    fn id(&self) -> &'static str;

    /// One-line human description.
    fn description(&self) -> &'static str;

    /// Ids of rules whose traversal must complete before this rule runs.
    fn runs_after(&self) -> &'static [&'static str] {
        &[]
    }

    /// Experimental rules are not enabled by default.
    fn experimental(&self) -> bool {
        false
    }

    /// Version in which the rule was introduced. Informational only.
    fn since(&self) -> &'static str {
        "0.1.0"
    }

    /// Node kinds this rule wants to visit. `None` visits every node.
    fn interests(&self) -> Option<&'static [SyntaxKind]> {
        None
    }

    /// Called on each interesting node in depth-first pre-order.
    fn visit(&self, tree: &mut SyntaxTree, node: NodeId, ctx: &mut RuleCtx) -> Flow;

    /// Called after a node's subtree has been visited (post-order).
    fn leave(&self, _tree: &mut SyntaxTree, _node: NodeId, _ctx: &mut RuleCtx) {}
}

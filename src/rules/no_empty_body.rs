//! `no-empty-body`: empty `{}` bodies are unnecessary.

use crate::engine::RuleCtx;
use crate::parser::BLOCK;
use crate::rules::base::{Flow, Rule};
use crate::tree::{NodeId, SyntaxKind, SyntaxTree};

/// Flags a block whose braces enclose only whitespace and removes it. Any
/// whitespace left dangling at the end of the line is picked up by
/// `trailing-whitespace`, which declares that it runs after this rule.
pub struct NoEmptyBodyRule;

impl Rule for NoEmptyBodyRule {
    fn id(&self) -> &'static str {
        "no-empty-body"
    }

    fn description(&self) -> &'static str {
        "Empty declaration bodies should be removed"
    }

    fn interests(&self) -> Option<&'static [SyntaxKind]> {
        Some(&[BLOCK])
    }

    fn visit(&self, tree: &mut SyntaxTree, node: NodeId, ctx: &mut RuleCtx) -> Flow {
        let body = tree.node_text(node);
        let interior = &body[1..body.len() - 1];
        if !interior.trim().is_empty() {
            return Flow::Continue;
        }
        let offset = tree.text_range(node).start;
        ctx.emit(tree, offset, "Unnecessary empty block \"{}\"", true)
            .if_allowed(|| {
                let _ = tree.remove(node);
            });
        // Nothing inside an empty block to descend into.
        Flow::SkipChildren
    }
}

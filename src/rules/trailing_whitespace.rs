//! `trailing-whitespace`: lines should not end in spaces or tabs.

use crate::engine::RuleCtx;
use crate::parser::STATEMENT;
use crate::rules::base::{Flow, Rule};
use crate::tree::{NodeId, SyntaxKind, SyntaxTree};

/// Strips whitespace from line ends. Runs after `no-empty-body` because
/// removing an empty block frequently strands whitespace at the end of
/// the line it sat on, and cleaning up in the same pass avoids an extra
/// stabilization round.
pub struct TrailingWhitespaceRule;

impl Rule for TrailingWhitespaceRule {
    fn id(&self) -> &'static str {
        "trailing-whitespace"
    }

    fn description(&self) -> &'static str {
        "Lines should not have trailing whitespace"
    }

    fn runs_after(&self) -> &'static [&'static str] {
        &["no-empty-body"]
    }

    fn interests(&self) -> Option<&'static [SyntaxKind]> {
        Some(&[STATEMENT])
    }

    fn visit(&self, tree: &mut SyntaxTree, node: NodeId, ctx: &mut RuleCtx) -> Flow {
        let line = tree.node_text(node).to_string();
        let trimmed = line.trim_end();
        if trimmed.len() == line.len() {
            return Flow::SkipChildren;
        }
        let offset = tree.text_range(node).start + trimmed.len();
        ctx.emit(tree, offset, "Trailing whitespace", true)
            .if_allowed(|| {
                let _ = tree.replace_with_text(node, trimmed);
            });
        Flow::SkipChildren
    }
}

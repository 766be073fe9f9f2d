//! `final-newline`: files should end with a newline.

use crate::engine::RuleCtx;
use crate::parser::ROOT;
use crate::rules::base::{Flow, Rule};
use crate::tree::{NodeId, SyntaxKind, SyntaxTree};

/// Appends a newline to files that lack one. Runs after
/// `trailing-whitespace` so the newline lands after the cleaned-up last
/// line rather than after whitespace about to be stripped.
pub struct FinalNewlineRule;

impl Rule for FinalNewlineRule {
    fn id(&self) -> &'static str {
        "final-newline"
    }

    fn description(&self) -> &'static str {
        "Files should end with a newline"
    }

    fn runs_after(&self) -> &'static [&'static str] {
        &["trailing-whitespace"]
    }

    fn interests(&self) -> Option<&'static [SyntaxKind]> {
        Some(&[ROOT])
    }

    fn visit(&self, tree: &mut SyntaxTree, node: NodeId, ctx: &mut RuleCtx) -> Flow {
        if !tree.is_root(node) {
            return Flow::Continue;
        }
        let text = tree.text();
        if text.is_empty() || text.ends_with('\n') {
            return Flow::Stop;
        }
        let offset = text.len();
        ctx.emit(tree, offset, "File does not end with a newline", true)
            .if_allowed(|| {
                let _ = tree.insert_after(node, "\n");
            });
        Flow::Stop
    }
}

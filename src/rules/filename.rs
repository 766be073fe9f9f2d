//! `filename`: file names should be kebab-case.

use std::path::Path;

use crate::engine::RuleCtx;
use crate::parser::ROOT;
use crate::rules::base::{Flow, Rule};
use crate::tree::{NodeId, SyntaxKind, SyntaxTree};

/// A file-level check: the file's stem should be lowercase kebab-case.
/// Never fixable (the engine does not rename files), and once the root has
/// been checked there is nothing below it to visit, so traversal stops.
pub struct FilenameRule;

impl Rule for FilenameRule {
    fn id(&self) -> &'static str {
        "filename"
    }

    fn description(&self) -> &'static str {
        "File names should be kebab-case"
    }

    fn interests(&self) -> Option<&'static [SyntaxKind]> {
        Some(&[ROOT])
    }

    fn visit(&self, tree: &mut SyntaxTree, node: NodeId, ctx: &mut RuleCtx) -> Flow {
        if !tree.is_root(node) {
            return Flow::Continue;
        }
        let stem = Path::new(ctx.file_path())
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        // Hidden files and anonymous buffers are not checked.
        if !stem.is_empty() && !stem.starts_with('.') && !is_kebab_case(stem) {
            let message = format!("File name '{stem}' should be kebab-case");
            ctx.emit(tree, 0, message, false);
        }
        Flow::Stop
    }
}

fn is_kebab_case(stem: &str) -> bool {
    let mut chars = stem.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => return false,
    }
    !stem.ends_with('-')
        && !stem.contains("--")
        && stem
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

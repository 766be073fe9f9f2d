//! `max-line-length`: lines should not exceed the configured limit.

use crate::engine::RuleCtx;
use crate::parser::STATEMENT;
use crate::rules::base::{Flow, Rule};
use crate::tree::{NodeId, SyntaxKind, SyntaxTree};

pub const DEFAULT_LIMIT: usize = 100;

/// Flags lines longer than the limit (`limit` rule option, default 100
/// characters). The fix wraps the line at the last space before the limit;
/// a long remainder is wrapped again on the next stabilization pass. Lines
/// with no usable break point are reported as not fixable.
pub struct MaxLineLengthRule;

impl Rule for MaxLineLengthRule {
    fn id(&self) -> &'static str {
        "max-line-length"
    }

    fn description(&self) -> &'static str {
        "Lines should not exceed the configured maximum length"
    }

    fn interests(&self) -> Option<&'static [SyntaxKind]> {
        Some(&[STATEMENT])
    }

    fn visit(&self, tree: &mut SyntaxTree, node: NodeId, ctx: &mut RuleCtx) -> Flow {
        let limit = ctx
            .option("limit")
            .and_then(toml::Value::as_integer)
            .map_or(DEFAULT_LIMIT, |v| v as usize);

        let line = tree.node_text(node).to_string();
        if line.chars().count() <= limit {
            return Flow::SkipChildren;
        }

        let start = tree.text_range(node).start;
        // Byte offset of the first character past the limit.
        let excess = line
            .char_indices()
            .nth(limit)
            .map_or(line.len(), |(i, _)| i);
        let wrap_at = break_point(&line, excess);

        let message = format!(
            "Line is {} characters long (limit {limit})",
            line.chars().count()
        );
        ctx.emit(tree, start + excess, message, wrap_at.is_some())
            .if_allowed(|| {
                if let Some(at) = wrap_at {
                    let wrapped = format!("{}\n{}", &line[..at], &line[at + 1..]);
                    let _ = tree.replace_with_text(node, &wrapped);
                }
            });
        Flow::SkipChildren
    }
}

/// Last space at or before `excess` that leaves text on both sides.
fn break_point(line: &str, excess: usize) -> Option<usize> {
    line[..excess]
        .char_indices()
        .filter(|(i, c)| *c == ' ' && *i > 0 && *i + 1 < line.len())
        .map(|(i, _)| i)
        .next_back()
        .filter(|at| !line[..*at].trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn break_point_prefers_last_space_before_limit() {
        let line = "alpha beta gamma";
        assert_eq!(break_point(line, 12), Some(10));
        assert_eq!(break_point(line, 8), Some(5));
    }

    #[test]
    fn no_break_point_without_spaces() {
        assert_eq!(break_point("abcdefghij", 5), None);
    }

    #[test]
    fn leading_spaces_are_not_break_points() {
        assert_eq!(break_point("    abcdef", 6), None);
    }
}

//! The parser seam consumed by the engine, plus a small reference parser.
//!
//! The engine never parses anything itself: it is handed a [`Parse`]
//! implementor and calls it once per stabilization pass to re-derive the
//! tree from the current text. Any language frontend can sit behind the
//! trait; the [`LineParser`] here implements a deliberately small
//! line-oriented grammar that is enough for the standard rules, the CLI,
//! and the test suite.

use crate::tree::{NodeId, SyntaxKind, SyntaxTree};

pub const ROOT: SyntaxKind = SyntaxKind("root");
pub const STATEMENT: SyntaxKind = SyntaxKind("statement");
pub const BLOCK: SyntaxKind = SyntaxKind("block");

/// External parser contract: derive a tree from text. Must be pure; the
/// stabilization loop calls it repeatedly on rewritten text.
pub trait Parse: Send + Sync {
    fn parse(&self, text: &str) -> SyntaxTree;
}

/// Reference grammar: every non-blank line is a `statement` node, and
/// balanced `{...}` pairs within a single line become nested `block`
/// nodes. Braces left unbalanced on their line produce no node.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineParser;

impl Parse for LineParser {
    fn parse(&self, text: &str) -> SyntaxTree {
        let mut tree = SyntaxTree::new(text, ROOT);
        let root = tree.root();
        let mut offset = 0;
        for line in text.split_inclusive('\n') {
            let content = line.trim_end_matches(|c| c == '\n' || c == '\r');
            if !content.trim().is_empty() {
                let stmt = tree.push_node(root, STATEMENT, offset, offset + content.len());
                add_blocks(&mut tree, stmt, offset, content);
            }
            offset += line.len();
        }
        tree
    }
}

/// Add a `block` node for each balanced top-level brace pair in `content`,
/// recursing into each pair's interior for nested blocks.
fn add_blocks(tree: &mut SyntaxTree, parent: NodeId, base: usize, content: &str) {
    let mut depth = 0usize;
    let mut open = 0usize;
    for (i, ch) in content.char_indices() {
        match ch {
            '{' => {
                if depth == 0 {
                    open = i;
                }
                depth += 1;
            }
            '}' => match depth {
                0 => {}
                1 => {
                    depth = 0;
                    let block = tree.push_node(parent, BLOCK, base + open, base + i + 1);
                    add_blocks(tree, block, base + open + 1, &content[open + 1..i]);
                }
                _ => depth -= 1,
            },
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds_of_children(tree: &SyntaxTree, node: NodeId) -> Vec<&'static str> {
        tree.children(node).map(|c| tree.kind(c).0).collect()
    }

    #[test]
    fn statements_per_line() {
        let tree = LineParser.parse("one\ntwo\n\nthree");
        let root = tree.root();
        let stmts: Vec<_> = tree.children(root).collect();
        assert_eq!(stmts.len(), 3);
        assert_eq!(tree.node_text(stmts[0]), "one");
        assert_eq!(tree.node_text(stmts[1]), "two");
        assert_eq!(tree.node_text(stmts[2]), "three");
        assert_eq!(tree.text_range(root), 0..14);
    }

    #[test]
    fn blocks_nest_within_a_statement() {
        let tree = LineParser.parse("fn f() { g() { } }\n");
        let stmt = tree.children(tree.root()).next().unwrap();
        assert_eq!(kinds_of_children(&tree, stmt), vec!["block"]);
        let outer = tree.children(stmt).next().unwrap();
        assert_eq!(tree.node_text(outer), "{ g() { } }");
        let inner = tree.children(outer).next().unwrap();
        assert_eq!(tree.node_text(inner), "{ }");
    }

    #[test]
    fn sibling_blocks() {
        let tree = LineParser.parse("a {} b {}\n");
        let stmt = tree.children(tree.root()).next().unwrap();
        let blocks: Vec<_> = tree.children(stmt).collect();
        assert_eq!(blocks.len(), 2);
        assert_eq!(tree.text_range(blocks[0]), 2..4);
        assert_eq!(tree.text_range(blocks[1]), 7..9);
    }

    #[test]
    fn unbalanced_braces_produce_no_block() {
        let tree = LineParser.parse("open {\nclose }\n");
        for stmt in tree.children(tree.root()).collect::<Vec<_>>() {
            assert_eq!(tree.children(stmt).count(), 0);
        }
    }

    #[test]
    fn crlf_lines_exclude_the_carriage_return() {
        let tree = LineParser.parse("one\r\ntwo\r\n");
        let stmts: Vec<_> = tree.children(tree.root()).collect();
        assert_eq!(tree.node_text(stmts[0]), "one");
        assert_eq!(tree.node_text(stmts[1]), "two");
    }
}

//! `lint-disable-line` comment directives.
//!
//! A line containing `lint-disable-line` suppresses violations reported on
//! that line. With no arguments every rule is suppressed; otherwise only
//! the listed rule ids are:
//!
//! - `... // lint-disable-line` - suppress all violations on this line
//! - `... // lint-disable-line max-line-length` - suppress one rule
//! - `... // lint-disable-line max-line-length, final-newline` - several
//!
//! Suppression is resolved at emit time, so a suppressed violation is
//! neither reported nor auto-fixed.

use std::collections::HashSet;

use crate::location::LineIndex;

const MARKER: &str = "lint-disable-line";

#[derive(Debug, Clone)]
struct Directive {
    /// 1-based line number.
    line: usize,
    /// Rule ids to suppress; empty means suppress all.
    rule_ids: HashSet<String>,
}

/// All directives of one text, plus the line index needed to map a
/// violation offset back to its line. Rebuilt per pass since edits move
/// lines around.
pub struct SuppressionIndex {
    directives: Vec<Directive>,
    line_index: LineIndex,
}

impl SuppressionIndex {
    pub fn new(source: &str) -> Self {
        let mut directives = Vec::new();
        for (line_idx, line) in source.lines().enumerate() {
            if let Some(rule_ids) = parse_line(line) {
                directives.push(Directive {
                    line: line_idx + 1,
                    rule_ids,
                });
            }
        }
        Self {
            directives,
            line_index: LineIndex::new(source),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    pub fn is_suppressed(&self, offset: usize, rule_id: &str) -> bool {
        if self.directives.is_empty() {
            return false;
        }
        let line = self.line_index.line_of(offset);
        self.directives.iter().any(|directive| {
            directive.line == line
                && (directive.rule_ids.is_empty() || directive.rule_ids.contains(rule_id))
        })
    }
}

fn parse_line(line: &str) -> Option<HashSet<String>> {
    let start = line.find(MARKER)?;
    let rest = &line[start + MARKER.len()..];
    let rule_ids: HashSet<String> = rest
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    Some(rule_ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_directive_suppresses_all_rules_on_its_line() {
        let text = "short\nlong line // lint-disable-line\nshort\n";
        let index = SuppressionIndex::new(text);
        let second_line_offset = text.find("long").unwrap();
        assert!(index.is_suppressed(second_line_offset, "max-line-length"));
        assert!(index.is_suppressed(second_line_offset, "anything"));
        assert!(!index.is_suppressed(0, "max-line-length"));
    }

    #[test]
    fn named_directive_suppresses_only_listed_rules() {
        let text = "x // lint-disable-line max-line-length, final-newline\n";
        let index = SuppressionIndex::new(text);
        assert!(index.is_suppressed(0, "max-line-length"));
        assert!(index.is_suppressed(0, "final-newline"));
        assert!(!index.is_suppressed(0, "no-empty-body"));
    }

    #[test]
    fn no_directives() {
        let index = SuppressionIndex::new("plain text\n");
        assert!(index.is_empty());
        assert!(!index.is_suppressed(0, "max-line-length"));
    }
}

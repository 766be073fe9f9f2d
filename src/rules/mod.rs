//! Standard ruleset.
//!
//! Each rule is a pluggable unit implementing [`base::Rule`]; the engine
//! knows nothing about any individual rule. Third-party rules implement
//! the same trait and are registered alongside these.

pub mod base;

pub mod filename;
pub mod final_newline;
pub mod max_line_length;
pub mod no_empty_body;
pub mod trailing_whitespace;

use std::sync::Arc;

use base::Rule;

/// All standard rules, in registration order.
pub fn standard_rules() -> Vec<Arc<dyn Rule>> {
    vec![
        Arc::new(filename::FilenameRule),
        Arc::new(final_newline::FinalNewlineRule),
        Arc::new(max_line_length::MaxLineLengthRule),
        Arc::new(no_empty_body::NoEmptyBodyRule),
        Arc::new(trailing_whitespace::TrailingWhitespaceRule),
    ]
}

/// Ids of all standard rules.
pub fn standard_rule_ids() -> Vec<&'static str> {
    standard_rules().iter().map(|r| r.id()).collect()
}

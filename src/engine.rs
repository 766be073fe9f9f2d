//! Traversal engine, emit/autocorrect protocol, and stabilization loop.
//!
//! For one file the engine runs every enabled rule, in resolved order, over
//! a depth-first pre-order walk of the tree. Rules report violations through
//! [`RuleCtx::emit`], which immediately answers with the engine's
//! autocorrect decision; authorized fixes are applied to the tree right
//! away (first writer wins). After a pass that edited anything the text is
//! re-parsed and the rules run again, until a pass performs zero edits or
//! the pass cap is hit.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::models::{AutocorrectDecision, Violation};
use crate::parser::Parse;
use crate::rules::base::{Flow, Rule};
use crate::suppress::SuppressionIndex;
use crate::tree::{NodeId, SyntaxTree};

/// Passes the stabilization loop may run before giving up on convergence.
pub const DEFAULT_MAX_PASSES: usize = 10;

/// Cooperative cancellation flag, checked at each rule boundary so a
/// cancelled run never leaves a rule's edits half-applied.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Global autocorrect switch for this run.
    pub autocorrect: bool,
    /// Stabilization pass cap.
    pub max_passes: usize,
    /// Per-rule options, keyed by rule id.
    pub rule_options: HashMap<String, toml::Table>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            autocorrect: false,
            max_passes: DEFAULT_MAX_PASSES,
            rule_options: HashMap::new(),
        }
    }
}

/// Result of processing one file.
#[derive(Debug)]
pub struct FileOutcome {
    /// The (possibly rewritten) source text.
    pub text: String,
    /// Violations still present after the final pass, ordered by offset.
    pub violations: Vec<Violation>,
    /// Violations that were auto-fixed, across all passes.
    pub corrected: Vec<Violation>,
    pub passes: usize,
    /// False when the pass cap was hit before reaching a fixed point.
    pub converged: bool,
    pub cancelled: bool,
}

/// Per-rule context handed to visit callbacks; owns the emit protocol.
pub struct RuleCtx<'a> {
    rule_id: &'static str,
    file_path: &'a str,
    autocorrect: bool,
    options: Option<&'a toml::Table>,
    suppressions: &'a SuppressionIndex,
    violations: &'a mut Vec<Violation>,
}

impl RuleCtx<'_> {
    /// Record a violation at `offset` and return the engine's ruling on
    /// whether the rule may fix it now. The rule must apply its edit only
    /// on [`AutocorrectDecision::Allowed`].
    pub fn emit(
        &mut self,
        tree: &SyntaxTree,
        offset: usize,
        message: impl Into<String>,
        can_autocorrect: bool,
    ) -> AutocorrectDecision {
        if self.suppressions.is_suppressed(offset, self.rule_id) {
            debug!(rule = self.rule_id, offset, "violation suppressed by directive");
            return AutocorrectDecision::Denied;
        }
        let decision = if !self.autocorrect {
            AutocorrectDecision::NoAutocorrect
        } else if !can_autocorrect {
            AutocorrectDecision::Denied
        } else if tree.was_rewritten(offset) {
            debug!(
                rule = self.rule_id,
                offset, "fix denied: offset already rewritten this pass"
            );
            AutocorrectDecision::Denied
        } else {
            AutocorrectDecision::Allowed
        };
        self.violations.push(Violation {
            rule_id: self.rule_id.to_string(),
            offset,
            message: message.into(),
            can_autocorrect,
            fixed: decision.is_allowed(),
        });
        decision
    }

    /// Path of the file being processed, for file-level rules.
    pub fn file_path(&self) -> &str {
        self.file_path
    }

    /// Look up a rule-specific option from the run configuration.
    pub fn option(&self, key: &str) -> Option<&toml::Value> {
        self.options.and_then(|table| table.get(key))
    }
}

struct PassReport {
    violations: Vec<Violation>,
    cancelled: bool,
}

/// Drives the resolved rule order over one file at a time. Engines are
/// cheap to share: all state is per-call.
pub struct Engine {
    order: Vec<Arc<dyn Rule>>,
    options: EngineOptions,
}

impl Engine {
    pub fn new(order: Vec<Arc<dyn Rule>>, options: EngineOptions) -> Self {
        Self { order, options }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Process one file to its fixed point (or the pass cap).
    pub fn run(
        &self,
        parser: &dyn Parse,
        source: &str,
        file_path: &str,
        cancel: &CancelToken,
    ) -> FileOutcome {
        let mut text = source.to_string();
        let mut corrected: Vec<Violation> = Vec::new();
        let mut remaining: Vec<Violation> = Vec::new();
        let mut passes = 0;
        let mut converged = true;
        let mut cancelled = false;

        loop {
            passes += 1;
            let mut tree = parser.parse(&text);
            let report = self.single_pass(&mut tree, file_path, cancel);
            let edits = tree.edit_count();
            text = tree.into_text();

            remaining = report
                .violations
                .iter()
                .filter(|v| !v.fixed)
                .cloned()
                .collect();
            corrected.extend(report.violations.into_iter().filter(|v| v.fixed));

            if report.cancelled {
                cancelled = true;
                converged = false;
                break;
            }
            if edits == 0 {
                break;
            }
            if passes >= self.options.max_passes.max(1) {
                converged = false;
                warn!(
                    file = file_path,
                    passes, "autocorrection did not converge within the pass cap"
                );
                break;
            }
        }

        remaining.sort_by(|a, b| (a.offset, &a.rule_id).cmp(&(b.offset, &b.rule_id)));
        corrected.sort_by(|a, b| (a.offset, &a.rule_id).cmp(&(b.offset, &b.rule_id)));

        FileOutcome {
            text,
            violations: remaining,
            corrected,
            passes,
            converged,
            cancelled,
        }
    }

    /// One full traversal of every rule, in order, over one tree.
    fn single_pass(
        &self,
        tree: &mut SyntaxTree,
        file_path: &str,
        cancel: &CancelToken,
    ) -> PassReport {
        let suppressions = SuppressionIndex::new(tree.text());
        let mut violations = Vec::new();
        let mut cancelled = false;

        for rule in &self.order {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let root = tree.root();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                let mut ctx = RuleCtx {
                    rule_id: rule.id(),
                    file_path,
                    autocorrect: self.options.autocorrect,
                    options: self.options.rule_options.get(rule.id()),
                    suppressions: &suppressions,
                    violations: &mut violations,
                };
                walk(rule.as_ref(), tree, root, &mut ctx);
            }));
            if let Err(payload) = outcome {
                let message = format!(
                    "rule raised an internal fault: {}",
                    panic_message(payload.as_ref())
                );
                warn!(rule = rule.id(), fault = %message, "rule fault isolated");
                violations.push(Violation {
                    rule_id: rule.id().to_string(),
                    offset: 0,
                    message,
                    can_autocorrect: false,
                    fixed: false,
                });
            }
        }

        PassReport {
            violations,
            cancelled,
        }
    }
}

/// Depth-first pre-order walk of one rule over the tree. Children are
/// snapshotted before descending since a visit may remove them.
fn walk(rule: &dyn Rule, tree: &mut SyntaxTree, node: NodeId, ctx: &mut RuleCtx) -> Flow {
    if !tree.is_alive(node) {
        return Flow::Continue;
    }
    let interested = rule
        .interests()
        .map_or(true, |kinds| kinds.contains(&tree.kind(node)));
    if interested {
        match rule.visit(tree, node, ctx) {
            Flow::Stop => return Flow::Stop,
            Flow::SkipChildren => return Flow::Continue,
            Flow::Continue => {}
        }
    }
    // The rule may have removed its own node; its subtree is gone with it.
    if tree.is_alive(node) {
        let children: Vec<NodeId> = tree.children(node).collect();
        for child in children {
            if walk(rule, tree, child, ctx) == Flow::Stop {
                return Flow::Stop;
            }
        }
        if interested {
            rule.leave(tree, node, ctx);
        }
    }
    Flow::Continue
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

//! Rule registry and execution-order resolution.
//!
//! The registry is built once, is immutable afterwards, and is shared
//! read-only by every file worker. Resolving a selection produces a total
//! order over the enabled rules: a topological sort of the declared
//! "runs after" edges with ties broken by ascending rule id, so repeated
//! runs (and repeated processes) always execute rules identically.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use globset::Glob;
use thiserror::Error;
use tracing::warn;

use crate::rules::base::Rule;

/// Configuration errors are reported once per run; the engine degrades to a
/// deterministic fallback instead of aborting.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown rule id '{0}'")]
    UnknownRule(String),
    #[error("invalid rule pattern '{0}'")]
    InvalidPattern(String),
    #[error("dependency cycle among enabled rules: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),
}

/// Which rules to enable for a run, by id or glob pattern.
#[derive(Debug, Clone, Default)]
pub struct RuleSelection {
    /// Patterns of rules to enable. Empty, or containing `all`, means every
    /// standard rule.
    pub enable: Vec<String>,
    /// Patterns of rules to disable; takes precedence over `enable`.
    pub disable: Vec<String>,
    /// Also enable rules marked experimental.
    pub include_experimental: bool,
}

enum Matcher {
    All,
    Exact(String),
    Glob(globset::GlobMatcher),
}

impl Matcher {
    fn matches(&self, id: &str) -> bool {
        match self {
            Matcher::All => true,
            Matcher::Exact(exact) => exact == id,
            Matcher::Glob(glob) => glob.is_match(id),
        }
    }
}

fn compile_matchers(
    patterns: &[String],
    known_ids: &BTreeSet<&str>,
    errors: &mut Vec<ConfigError>,
) -> Vec<Matcher> {
    let mut matchers = Vec::new();
    for pattern in patterns {
        if pattern.eq_ignore_ascii_case("all") {
            matchers.push(Matcher::All);
        } else if pattern.chars().any(|c| matches!(c, '*' | '?' | '[')) {
            match Glob::new(pattern) {
                Ok(glob) => matchers.push(Matcher::Glob(glob.compile_matcher())),
                Err(_) => errors.push(ConfigError::InvalidPattern(pattern.clone())),
            }
        } else if known_ids.contains(pattern.as_str()) {
            matchers.push(Matcher::Exact(pattern.clone()));
        } else {
            errors.push(ConfigError::UnknownRule(pattern.clone()));
        }
    }
    matchers
}

/// The deterministic total order of enabled rules for one run, plus any
/// configuration errors encountered while computing it.
pub struct ResolvedRules {
    pub order: Vec<Arc<dyn Rule>>,
    pub errors: Vec<ConfigError>,
}

impl ResolvedRules {
    pub fn ids(&self) -> Vec<&'static str> {
        self.order.iter().map(|r| r.id()).collect()
    }
}

/// Immutable set of candidate rules, deduplicated by id.
pub struct RuleRegistry {
    rules: Vec<Arc<dyn Rule>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Registry preloaded with the standard ruleset.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for rule in crate::rules::standard_rules() {
            registry.register(rule);
        }
        registry
    }

    /// Add a rule. A second registration under an already-known id is
    /// dropped with a warning; the first registration wins.
    pub fn register(&mut self, rule: Arc<dyn Rule>) {
        if self.rules.iter().any(|r| r.id() == rule.id()) {
            warn!(rule = rule.id(), "duplicate rule registration ignored");
            return;
        }
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[Arc<dyn Rule>] {
        &self.rules
    }

    /// Compute the execution order for `selection`.
    pub fn resolve(&self, selection: &RuleSelection) -> ResolvedRules {
        let mut errors = Vec::new();
        let known_ids: BTreeSet<&str> = self.rules.iter().map(|r| r.id()).collect();
        let enable = compile_matchers(&selection.enable, &known_ids, &mut errors);
        let disable = compile_matchers(&selection.disable, &known_ids, &mut errors);

        let by_id: HashMap<&str, &Arc<dyn Rule>> =
            self.rules.iter().map(|r| (r.id(), r)).collect();

        let mut enabled: BTreeSet<&str> = BTreeSet::new();
        for rule in &self.rules {
            let id = rule.id();
            if disable.iter().any(|m| m.matches(id)) {
                continue;
            }
            let named = enable
                .iter()
                .any(|m| matches!(m, Matcher::Exact(e) if e == id));
            let selected = if enable.is_empty() {
                true
            } else {
                enable.iter().any(|m| m.matches(id))
            };
            if selected && (!rule.experimental() || selection.include_experimental || named) {
                enabled.insert(id);
            }
        }

        let order = match topo_sort(&enabled, &by_id) {
            Ok(ids) => ids,
            Err(cycle) => {
                warn!(?cycle, "dependency cycle; falling back to id ordering");
                errors.push(ConfigError::DependencyCycle(cycle));
                enabled.iter().map(|id| id.to_string()).collect()
            }
        };

        ResolvedRules {
            order: order
                .iter()
                .map(|id| Arc::clone(by_id[id.as_str()]))
                .collect(),
            errors,
        }
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Kahn's algorithm over the "runs after" edges restricted to the enabled
/// subset. The ready set is kept ordered by id for a stable tie-break.
fn topo_sort(
    enabled: &BTreeSet<&str>,
    by_id: &HashMap<&str, &Arc<dyn Rule>>,
) -> Result<Vec<String>, Vec<String>> {
    let mut in_degree: BTreeMap<&str, usize> = enabled.iter().map(|id| (*id, 0)).collect();
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for id in enabled {
        for dep in by_id[id].runs_after() {
            // An edge to a disabled or unknown rule imposes no constraint.
            if enabled.contains(dep) {
                *in_degree.get_mut(id).unwrap() += 1;
                dependents.entry(dep).or_default().push(id);
            }
        }
    }

    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut order = Vec::with_capacity(enabled.len());
    while let Some(id) = ready.iter().next().copied() {
        ready.remove(id);
        order.push(id.to_string());
        for dependent in dependents.get(id).into_iter().flatten() {
            let degree = in_degree.get_mut(dependent).unwrap();
            *degree -= 1;
            if *degree == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() == enabled.len() {
        Ok(order)
    } else {
        let stuck: Vec<String> = in_degree
            .iter()
            .filter(|(id, _)| !order.iter().any(|o| o == *id))
            .map(|(id, _)| id.to_string())
            .collect();
        Err(stuck)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RuleCtx;
    use crate::rules::base::Flow;
    use crate::tree::{NodeId, SyntaxTree};

    struct Stub {
        id: &'static str,
        after: &'static [&'static str],
        experimental: bool,
    }

    impl Stub {
        fn new(id: &'static str, after: &'static [&'static str]) -> Arc<dyn Rule> {
            Arc::new(Self {
                id,
                after,
                experimental: false,
            })
        }

        fn new_experimental(id: &'static str) -> Arc<dyn Rule> {
            Arc::new(Self {
                id,
                after: &[],
                experimental: true,
            })
        }
    }

    impl Rule for Stub {
        fn id(&self) -> &'static str {
            self.id
        }

        fn description(&self) -> &'static str {
            "stub"
        }

        fn runs_after(&self) -> &'static [&'static str] {
            self.after
        }

        fn experimental(&self) -> bool {
            self.experimental
        }

        fn visit(&self, _tree: &mut SyntaxTree, _node: NodeId, _ctx: &mut RuleCtx) -> Flow {
            Flow::Continue
        }
    }

    fn registry(rules: Vec<Arc<dyn Rule>>) -> RuleRegistry {
        let mut registry = RuleRegistry::new();
        for rule in rules {
            registry.register(rule);
        }
        registry
    }

    #[test]
    fn orders_by_id_without_dependencies() {
        let registry = registry(vec![
            Stub::new("zeta", &[]),
            Stub::new("alpha", &[]),
            Stub::new("mid", &[]),
        ]);
        let resolved = registry.resolve(&RuleSelection::default());
        assert_eq!(resolved.ids(), vec!["alpha", "mid", "zeta"]);
        assert!(resolved.errors.is_empty());
    }

    #[test]
    fn runs_after_orders_dependency_first() {
        let registry = registry(vec![
            Stub::new("aaa", &["zzz"]),
            Stub::new("zzz", &[]),
            Stub::new("mmm", &[]),
        ]);
        let resolved = registry.resolve(&RuleSelection::default());
        let ids = resolved.ids();
        let pos = |id: &str| ids.iter().position(|x| *x == id).unwrap();
        assert!(pos("zzz") < pos("aaa"));
        // Independent rules still come out in id order around the edge.
        assert_eq!(ids, vec!["mmm", "zzz", "aaa"]);
    }

    #[test]
    fn edge_to_disabled_rule_is_ignored() {
        let registry = registry(vec![Stub::new("bbb", &["aaa"]), Stub::new("aaa", &[])]);
        let selection = RuleSelection {
            disable: vec!["aaa".into()],
            ..Default::default()
        };
        let resolved = registry.resolve(&selection);
        assert_eq!(resolved.ids(), vec!["bbb"]);
        assert!(resolved.errors.is_empty());
    }

    #[test]
    fn cycle_reports_error_and_falls_back_to_id_order() {
        let registry = registry(vec![
            Stub::new("one", &["two"]),
            Stub::new("two", &["one"]),
            Stub::new("three", &[]),
        ]);
        let resolved = registry.resolve(&RuleSelection::default());
        assert_eq!(resolved.ids(), vec!["one", "three", "two"]);
        assert!(matches!(
            resolved.errors.as_slice(),
            [ConfigError::DependencyCycle(_)]
        ));
    }

    #[test]
    fn unknown_rule_id_is_a_config_error() {
        let registry = registry(vec![Stub::new("real", &[])]);
        let selection = RuleSelection {
            enable: vec!["imaginary".into()],
            ..Default::default()
        };
        let resolved = registry.resolve(&selection);
        assert!(resolved.order.is_empty());
        assert_eq!(
            resolved.errors,
            vec![ConfigError::UnknownRule("imaginary".into())]
        );
    }

    #[test]
    fn glob_patterns_select_rules() {
        let registry = registry(vec![
            Stub::new("no-empty-body", &[]),
            Stub::new("no-tabs", &[]),
            Stub::new("filename", &[]),
        ]);
        let selection = RuleSelection {
            enable: vec!["no-*".into()],
            ..Default::default()
        };
        let resolved = registry.resolve(&selection);
        assert_eq!(resolved.ids(), vec!["no-empty-body", "no-tabs"]);
    }

    #[test]
    fn experimental_rules_need_opt_in() {
        let registry = registry(vec![Stub::new("stable", &[]), Stub::new_experimental("beta")]);
        assert_eq!(
            registry.resolve(&RuleSelection::default()).ids(),
            vec!["stable"]
        );

        let opted_in = RuleSelection {
            include_experimental: true,
            ..Default::default()
        };
        assert_eq!(registry.resolve(&opted_in).ids(), vec!["beta", "stable"]);

        // Naming an experimental rule explicitly enables it.
        let named = RuleSelection {
            enable: vec!["beta".into()],
            ..Default::default()
        };
        assert_eq!(registry.resolve(&named).ids(), vec!["beta"]);
    }

    #[test]
    fn duplicate_registration_keeps_first() {
        let mut registry = RuleRegistry::new();
        registry.register(Stub::new("dup", &[]));
        registry.register(Stub::new("dup", &["other"]));
        assert_eq!(registry.rules().len(), 1);
        assert!(registry.rules()[0].runs_after().is_empty());
    }
}

use serde::Serialize;

/// A reported instance of a rule's check failing at a specific offset.
#[derive(Debug, Clone, Serialize)]
pub struct Violation {
    pub rule_id: String,
    /// Byte offset into the text of the pass that produced the violation.
    pub offset: usize,
    pub message: String,
    pub can_autocorrect: bool,
    /// Whether the emitting rule was authorized to fix this violation.
    pub fixed: bool,
}

/// The engine's per-violation ruling on whether the emitting rule may
/// mutate the tree this pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutocorrectDecision {
    /// Autocorrection is on and this violation may be fixed now.
    Allowed,
    /// This particular violation may not be fixed: it is not fixable, it
    /// is suppressed, or a conflicting edit already rewrote its offset.
    Denied,
    /// Autocorrection is globally off for this run.
    NoAutocorrect,
}

impl AutocorrectDecision {
    /// Run `fix` only when the decision authorizes an edit.
    pub fn if_allowed<T>(self, fix: impl FnOnce() -> T) -> Option<T> {
        match self {
            AutocorrectDecision::Allowed => Some(fix()),
            AutocorrectDecision::Denied | AutocorrectDecision::NoAutocorrect => None,
        }
    }

    pub fn is_allowed(self) -> bool {
        self == AutocorrectDecision::Allowed
    }
}

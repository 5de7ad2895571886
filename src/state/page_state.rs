/// Page state definitions
///
/// Every admitted page is recorded with exactly one of these outcomes.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the outcome of fetching a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageState {
    /// Page was fetched with a success status and processed
    Processed,

    /// Page returned an HTTP error status (404 or similar)
    DeadLink,

    /// Page could not be reached (connection refused, DNS failure, TLS error,
    /// timeout, redirect loop)
    Unreachable,
}

impl PageState {
    /// Returns true if this represents a successful fetch
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Processed)
    }

    /// Returns true if the page counts as a broken URL
    pub fn is_broken(&self) -> bool {
        matches!(self, Self::DeadLink | Self::Unreachable)
    }

    /// Converts the page state to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::DeadLink => "dead_link",
            Self::Unreachable => "unreachable",
        }
    }

    /// Parses a page state from a database string representation
    ///
    /// Returns None if the string doesn't match any known state.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "processed" => Some(Self::Processed),
            "dead_link" => Some(Self::DeadLink),
            "unreachable" => Some(Self::Unreachable),
            _ => None,
        }
    }

    /// Returns all possible page states
    pub fn all_states() -> Vec<Self> {
        vec![Self::Processed, Self::DeadLink, Self::Unreachable]
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_success() {
        assert!(PageState::Processed.is_success());
        assert!(!PageState::DeadLink.is_success());
        assert!(!PageState::Unreachable.is_success());
    }

    #[test]
    fn test_is_broken() {
        assert!(PageState::DeadLink.is_broken());
        assert!(PageState::Unreachable.is_broken());
        assert!(!PageState::Processed.is_broken());
    }

    #[test]
    fn test_roundtrip_db_string() {
        for state in PageState::all_states() {
            let db_str = state.to_db_string();
            let parsed = PageState::from_db_string(db_str);
            assert_eq!(Some(state), parsed, "Failed roundtrip for {:?}", state);
        }
        assert_eq!(PageState::from_db_string("invalid"), None);
    }

    #[test]
    fn test_serde_matches_db_string() {
        for state in PageState::all_states() {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{}\"", state.to_db_string()));
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", PageState::Processed), "processed");
        assert_eq!(format!("{}", PageState::DeadLink), "dead_link");
    }
}

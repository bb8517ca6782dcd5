//! Record types persisted to the key-value store
//!
//! Domains are stored wholesale (the base set is seeded into the stored list
//! on first run), so their archive flag lives inline. The base protocol set is
//! immutable, so archived/deleted state for protocols lives in id overlays
//! owned by the library, not on the record.

use serde::{Deserialize, Serialize};

/// Filter value meaning "browse all domains at once".
pub const FILTER_ALL: &str = "All";

/// A life-area category grouping protocols (e.g., "Trading", "Parenting")
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Domain {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub archived: bool,
}

/// A named, multi-step behavioral script belonging to one domain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Protocol {
    pub id: String,
    pub domain_id: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    /// Free text, newline-structured steps.
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Per-protocol completion counter, mutated only by Mark Complete
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionStat {
    #[serde(default)]
    pub count: u64,
    /// RFC 3339 timestamp of the most recent completion.
    #[serde(default)]
    pub last_completed: Option<String>,
}

/// Selection and display state
///
/// Invariant: non-null selections always reference a currently live record.
/// The library re-validates and corrects this on every load and mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewState {
    #[serde(default)]
    pub selected_domain_id: Option<String>,
    #[serde(default)]
    pub selected_protocol_id: Option<String>,
    /// Either [`FILTER_ALL`] or the id of the domain being browsed. When
    /// domain-scoped it is kept equal to `selected_domain_id`.
    #[serde(default)]
    pub category_filter: String,
    #[serde(default)]
    pub wide_mode: bool,
    #[serde(default)]
    pub body_collapsed: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            selected_domain_id: None,
            selected_protocol_id: None,
            category_filter: String::new(),
            wide_mode: false,
            body_collapsed: false,
        }
    }
}

impl ViewState {
    pub fn filter_is_all(&self) -> bool {
        self.category_filter == FILTER_ALL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_state_tolerates_missing_fields() {
        // Older revisions persisted partial state objects; every field must
        // fall back independently.
        let state: ViewState = serde_json::from_str("{}").expect("parse empty object");
        assert_eq!(state.selected_domain_id, None);
        assert!(!state.wide_mode);
        assert!(!state.filter_is_all());
    }

    #[test]
    fn test_protocol_optional_fields_default() {
        let raw = r#"{"id":"prot_x","domain_id":"dom_y","title":"X","body":"1. breathe"}"#;
        let p: Protocol = serde_json::from_str(raw).expect("parse protocol");
        assert_eq!(p.summary, "");
        assert!(p.tags.is_empty());
    }

    #[test]
    fn test_completion_stat_default() {
        let stat = CompletionStat::default();
        assert_eq!(stat.count, 0);
        assert_eq!(stat.last_completed, None);
    }
}

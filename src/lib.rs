//! Rewire - a personal library of nervous-system regulation protocols
//!
//! Browse, complete, and manage step-by-step self-regulation scripts grouped
//! by life domain, persisted locally with a manual JSON backup.
//!
//! # Record Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | `Domain` | Life-area category grouping protocols |
//! | `Protocol` | Multi-step behavioral script with free-text body |
//! | `CompletionStat` | Per-protocol completion counter |
//! | `ViewState` | Selection, category filter, display prefs |
//!
//! # Quick Start
//!
//! ```no_run
//! use rewire::{Config, Library, Store};
//!
//! let store = Store::open_at("rewire.db").unwrap();
//! let mut library = Library::load(&store, &Config::default()).unwrap();
//!
//! // Add a protocol under the selected domain and complete it
//! library.select_domain("dom_self").unwrap();
//! let id = library.add_protocol("Box Breathing", "", "1. Inhale 4\n2. Hold 4\n3. Exhale 4", "breath").unwrap();
//! let (_, stat) = library.mark_complete(Some(&id)).unwrap();
//! println!("completed {} times", stat.count);
//! ```

pub mod backup;
pub mod config;
pub mod dataset;
pub mod library;
pub mod model;
pub mod schema;
pub mod store;

pub use backup::{export_blob, import_blob, BackupError};
pub use config::Config;
pub use library::{parse_tags, Library, LibraryError, PickScope, RANDOM_RETRY_CAP};
pub use model::{CompletionStat, Domain, Protocol, ViewState, FILTER_ALL};
pub use store::{Store, StoreError, KEY_PREFIX};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify core constants are re-exported from crate root
        let _ = RANDOM_RETRY_CAP;
        assert!(KEY_PREFIX.ends_with('_'));
        assert_eq!(FILTER_ALL, "All");
    }
}

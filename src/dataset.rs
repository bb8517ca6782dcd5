//! Base dataset: bundled default domains and protocols
//!
//! The base set ships compiled in. A `protocols.json` file can replace it via
//! config; if that file is configured but missing or malformed the load is a
//! terminal error for the invocation — the library must never silently come
//! up empty when a dataset was asked for.

use crate::model::{Domain, Protocol};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A base dataset: domains plus the protocols that reference them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub domains: Vec<Domain>,
    #[serde(default)]
    pub protocols: Vec<Protocol>,
}

/// Error loading an external dataset file
#[derive(Debug)]
pub enum DatasetError {
    Io(String, std::io::Error),
    Parse(String, serde_json::Error),
}

impl std::fmt::Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetError::Io(path, e) => write!(f, "Cannot read dataset {}: {}", path, e),
            DatasetError::Parse(path, e) => write!(f, "Invalid dataset JSON in {}: {}", path, e),
        }
    }
}

impl std::error::Error for DatasetError {}

/// Load a dataset from an external `protocols.json` file
pub fn load<P: AsRef<Path>>(path: P) -> Result<Dataset, DatasetError> {
    let display = path.as_ref().display().to_string();
    let raw = std::fs::read_to_string(path.as_ref())
        .map_err(|e| DatasetError::Io(display.clone(), e))?;
    serde_json::from_str(&raw).map_err(|e| DatasetError::Parse(display, e))
}

fn domain(id: &str, name: &str) -> Domain {
    Domain {
        id: id.to_string(),
        name: name.to_string(),
        archived: false,
    }
}

/// The compiled-in default dataset
pub fn builtin() -> Dataset {
    Dataset {
        domains: vec![
            domain("dom_trading", "Trading"),
            domain("dom_parenting", "Parenting"),
            domain("dom_partner", "Partner"),
            domain("dom_self", "Self"),
        ],
        protocols: vec![
            Protocol {
                id: "prot_trading_loss_reset".to_string(),
                domain_id: "dom_trading".to_string(),
                title: "Post-Loss Reset".to_string(),
                summary: "Move from sting to neutral to empowered after a loss.".to_string(),
                body: "\
1. Name the loss
   - Say out loud: \"I took a loss of X%. That is data, not a verdict.\"
   - Place a hand gently on your chest or forearm.

2. Nervous system reset breath (3 rounds)
   - Inhale for 4 counts.
   - Hold for 2 counts.
   - Exhale slowly for 6 counts.
   - Pause for 2 counts.

3. Extract the signal
   - Ask: \"What did this trade teach me about my process?\"
   - Write 1-2 bullet lessons, no self-attack.

4. Recommit to the system
   - Say: \"My job is to execute my plan. This loss is the cost of staying in the game.\"
   - Visualize your next A+ setup being executed calmly.

5. Close the ritual
   - Stand, shake out your hands, roll your shoulders.
   - Mark this protocol as complete."
                    .to_string(),
                tags: vec!["breath".to_string(), "reset".to_string()],
            },
            Protocol {
                id: "prot_trading_win_ground".to_string(),
                domain_id: "dom_trading".to_string(),
                title: "Post-Win Grounding".to_string(),
                summary: "Anchor a win without chasing or inflating risk.".to_string(),
                body: "\
1. Acknowledge the win
   - Say: \"I executed my plan. The market rewarded my discipline.\"

2. Slow victory breath (3 rounds)
   - Inhale for 4 counts.
   - Exhale for 6 counts.
   - On each exhale, imagine excess hype draining off.

3. Capture the pattern
   - Note: entry, context, risk, exit.
   - Write 1 line: \"I want more trades that feel like THIS.\"

4. Protect tomorrow
   - Confirm your daily max trades / max gain rules.
   - If hit, close the platform after logging.

5. Close
   - Stretch, hydrate, and mark this protocol as complete."
                    .to_string(),
                tags: vec!["breath".to_string(), "grounding".to_string()],
            },
            Protocol {
                id: "prot_parenting_overwhelm_reset".to_string(),
                domain_id: "dom_parenting".to_string(),
                title: "Parent Overwhelm Reset".to_string(),
                summary: "Shift from tight and triggered to present and grounded.".to_string(),
                body: "\
1. Physically pause
   - Put the phone down. Step out of the room if needed.

2. Name your state, no judgment
   - \"I feel tight / angry / flooded / brittle.\"

3. 4-7-8 breathing (3 rounds)
   - Inhale for 4, hold for 7, exhale for 8.

4. Choose your anchor question
   - \"What does Future Me wish I did right now?\"
   - \"What keeps the relationship intact?\"

5. Return with one simple ask
   - Pick ONE clear boundary or request.
   - Use a calm, low tone. Stop after you have said it once.

6. Mark complete
   - Recognize: \"I chose regulation over reaction.\""
                    .to_string(),
                tags: vec!["breath".to_string(), "pause".to_string()],
            },
        ],
    }
}

/// Short affirmations shown by `rewire mantra`
const MANTRAS: &[&str] = &[
    "I respond with intention, not reflex.",
    "Each breath is a reset button.",
    "Data, not drama. Lesson, not verdict.",
    "My nervous system learns safety through repetition.",
    "Slow is smooth. Smooth is fast.",
    "I can pause without losing momentum.",
    "My discipline compounds more than any single trade.",
];

/// Pick one mantra uniformly at random
pub fn pick_mantra() -> &'static str {
    let idx = rand::thread_rng().gen_range(0..MANTRAS.len());
    MANTRAS[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_dataset_is_consistent() {
        let ds = builtin();
        assert!(!ds.domains.is_empty());
        for p in &ds.protocols {
            assert!(
                ds.domains.iter().any(|d| d.id == p.domain_id),
                "protocol {} references unknown domain {}",
                p.id,
                p.domain_id
            );
            assert!(!p.body.trim().is_empty());
        }
    }

    #[test]
    fn test_builtin_ids_unique() {
        let ds = builtin();
        let mut ids: Vec<&str> = ds.protocols.iter().map(|p| p.id.as_str()).collect();
        ids.extend(ds.domains.iter().map(|d| d.id.as_str()));
        let before = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(before, ids.len());
    }

    #[test]
    fn test_load_missing_file_errors() {
        let err = load("/nonexistent/protocols.json").expect_err("missing file must error");
        assert!(matches!(err, DatasetError::Io(_, _)));
    }

    #[test]
    fn test_load_malformed_file_errors() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let path = dir.path().join("protocols.json");
        std::fs::write(&path, "not json").expect("write");
        let err = load(&path).expect_err("malformed file must error");
        assert!(matches!(err, DatasetError::Parse(_, _)));
    }

    #[test]
    fn test_pick_mantra_returns_known_entry() {
        let m = pick_mantra();
        assert!(MANTRAS.contains(&m));
    }
}

//! Property-based test generators using proptest.
//!
//! Intent sequences drive the engine the way a user would: creating notes,
//! retitling and deleting them, and flapping connectivity in between.

use notesync_protocol::MAX_TITLE_CHARS;
use proptest::prelude::*;

/// Strategy for titles that pass validation.
pub fn title_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z0-9][A-Za-z0-9 .,!?-]{0,39}").expect("Invalid regex")
}

/// Strategy for titles that fail validation: blank, or one char too long.
pub fn invalid_title_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::string::string_regex("[ \t\n]{0,8}").expect("Invalid regex"),
        Just("x".repeat(MAX_TITLE_CHARS + 1)),
    ]
}

/// One user intent.
///
/// `slot` picks among the notes created so far, modulo their count, so every
/// generated sequence is meaningful whatever the shrinker removes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteIntent {
    /// Create and submit a note.
    Create {
        /// Title of the new note.
        title: String,
    },
    /// Retitle an earlier note.
    Edit {
        /// Which earlier note.
        slot: usize,
        /// New title.
        title: String,
    },
    /// Delete an earlier note.
    Delete {
        /// Which earlier note.
        slot: usize,
    },
    /// Change whether the remote is reachable.
    SetOnline(bool),
    /// Push everything pending.
    Flush,
}

impl NoteIntent {
    /// Resolves `slot` against `count` created notes.
    pub fn resolve(slot: usize, count: usize) -> Option<usize> {
        (count > 0).then(|| slot % count)
    }
}

/// Strategy for a single intent.
pub fn intent_strategy() -> impl Strategy<Value = NoteIntent> {
    prop_oneof![
        4 => title_strategy().prop_map(|title| NoteIntent::Create { title }),
        3 => (any::<usize>(), title_strategy())
            .prop_map(|(slot, title)| NoteIntent::Edit { slot, title }),
        2 => any::<usize>().prop_map(|slot| NoteIntent::Delete { slot }),
        1 => any::<bool>().prop_map(NoteIntent::SetOnline),
        1 => Just(NoteIntent::Flush),
    ]
}

/// Strategy for a sequence of intents.
pub fn intent_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<NoteIntent>> {
    prop::collection::vec(intent_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 128,
            max_shrink_iters: 500,
        }
    }
}

impl PropTestConfig {
    /// Configuration for tests that spin up a runtime per case.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notesync_protocol::validate_title;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn generated_titles_validate(title in title_strategy()) {
            prop_assert!(validate_title(&title).is_ok());
        }

        #[test]
        fn invalid_titles_are_rejected(title in invalid_title_strategy()) {
            prop_assert!(validate_title(&title).is_err());
        }

        #[test]
        fn sequences_respect_bounds(ops in intent_sequence_strategy(1, 20)) {
            prop_assert!(!ops.is_empty());
            prop_assert!(ops.len() < 20);
        }
    }

    #[test]
    fn resolve_wraps_slots() {
        assert_eq!(NoteIntent::resolve(7, 0), None);
        assert_eq!(NoteIntent::resolve(7, 3), Some(1));
    }
}

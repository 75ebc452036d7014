use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::ExerciseId;

//
// ─── PER-EXERCISE PAYLOADS ─────────────────────────────────────────────────────
//

/// The answer payload one exercise player emits, keyed the way that player
/// addresses its own content.
///
/// Shapes per kind:
/// - single-select: question index → selected option index
/// - fill-blank: question index → blank index → typed string
/// - ordering: question index → slot id → placed item id
/// - multi-slot-select: question index → sub-slot index → selected string
/// - labeled-region: region id → assigned label id
///
/// The engine never inspects player UI state; this payload is the whole
/// contract, delivered through the collection callback on every edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ExerciseAnswers {
    SingleSelect {
        selected: BTreeMap<usize, usize>,
    },
    FillBlank {
        entries: BTreeMap<usize, BTreeMap<usize, String>>,
    },
    Ordering {
        placements: BTreeMap<usize, BTreeMap<String, String>>,
    },
    MultiSlotSelect {
        selections: BTreeMap<usize, BTreeMap<usize, String>>,
    },
    LabeledRegion {
        assignments: BTreeMap<String, String>,
    },
}

//
// ─── ANSWER MAP ────────────────────────────────────────────────────────────────
//

/// In-memory answers for a whole attempt: exercise id → payload.
///
/// Inserts are last-write-wins, which is also the persistence semantic for
/// `draft_answers`: a periodic, at-most-once-per-interval overwrite with no
/// versioning or merging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerMap {
    entries: BTreeMap<ExerciseId, ExerciseAnswers>,
}

impl AnswerMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the payload for one exercise (last write wins).
    pub fn insert(&mut self, exercise_id: ExerciseId, answers: ExerciseAnswers) {
        self.entries.insert(exercise_id, answers);
    }

    #[must_use]
    pub fn get(&self, exercise_id: ExerciseId) -> Option<&ExerciseAnswers> {
        self.entries.get(&exercise_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ExerciseId, &ExerciseAnswers)> {
        self.entries.iter().map(|(id, answers)| (*id, answers))
    }

    /// Serialize to the JSON wire form stored in `draft_answers`.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse the persisted `draft_answers` wire form.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` for malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::ExerciseId;

//
// ─── EXERCISE KIND ─────────────────────────────────────────────────────────────
//

/// Closed set of exercise types the engine can grade.
///
/// Adding a type means adding a variant here, a content variant on
/// [`ExerciseContent`], and one comparator in the grading module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExerciseKind {
    SingleSelect,
    FillBlank,
    Ordering,
    MultiSlotSelect,
    LabeledRegion,
}

impl ExerciseKind {
    /// Stable string form, persisted in audit rows and used as the content
    /// JSON tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ExerciseKind::SingleSelect => "single-select",
            ExerciseKind::FillBlank => "fill-blank",
            ExerciseKind::Ordering => "ordering",
            ExerciseKind::MultiSlotSelect => "multi-slot-select",
            ExerciseKind::LabeledRegion => "labeled-region",
        }
    }

    /// Parse the stable string form back into a kind.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "single-select" => Some(ExerciseKind::SingleSelect),
            "fill-blank" => Some(ExerciseKind::FillBlank),
            "ordering" => Some(ExerciseKind::Ordering),
            "multi-slot-select" => Some(ExerciseKind::MultiSlotSelect),
            "labeled-region" => Some(ExerciseKind::LabeledRegion),
            _ => None,
        }
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── PER-TYPE CONTENT ──────────────────────────────────────────────────────────
//

/// One single-select question: a prompt, its options, and the correct index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleSelectQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_option: usize,
}

/// A single blank inside a fill-blank question.
///
/// `accepted_answers` is a comma-separated list; any entry, trimmed, counts
/// as correct. Matching is case-insensitive unless `case_sensitive` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blank {
    pub accepted_answers: String,
    #[serde(default)]
    pub case_sensitive: bool,
}

/// One fill-blank question with one gradable unit per blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillBlankQuestion {
    pub prompt: String,
    pub blanks: Vec<Blank>,
}

/// A draggable item in an ordering question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderingItem {
    pub id: String,
    pub text: String,
}

/// One ordering question: ordered slots, placeable items, and the canonical
/// correct item sequence.
///
/// Correctness compares the *displayed text* of the placed sequence against
/// the text of the correct sequence, so two items with identical text are
/// interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderingQuestion {
    pub prompt: String,
    pub slots: Vec<String>,
    pub items: Vec<OrderingItem>,
    pub correct_order: Vec<String>,
}

impl OrderingQuestion {
    /// Display text for an item id, if the item exists.
    #[must_use]
    pub fn item_text(&self, item_id: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|item| item.id == item_id)
            .map(|item| item.text.as_str())
    }
}

/// A sub-slot of a multi-slot question: its choices and the correct string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotChoice {
    pub choices: Vec<String>,
    pub correct: String,
}

/// One multi-slot question with one gradable unit per sub-slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiSlotQuestion {
    pub prompt: String,
    pub slots: Vec<SlotChoice>,
}

/// A region on the image that must receive a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: String,
    pub correct_label: String,
}

/// A placeable label; distractors can never be graded correct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionLabel {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub distractor: bool,
}

/// Regions and the label pool for a labeled-region exercise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledRegionLayout {
    pub regions: Vec<Region>,
    pub labels: Vec<RegionLabel>,
}

impl LabeledRegionLayout {
    /// Looks up a label definition by id.
    #[must_use]
    pub fn label(&self, label_id: &str) -> Option<&RegionLabel> {
        self.labels.iter().find(|label| label.id == label_id)
    }
}

//
// ─── CONTENT UNION ─────────────────────────────────────────────────────────────
//

/// Type-specific exercise content, one variant per [`ExerciseKind`].
///
/// Serialized as tagged JSON; this is the shape stored in the exercises
/// table and handed to grading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ExerciseContent {
    SingleSelect { questions: Vec<SingleSelectQuestion> },
    FillBlank { questions: Vec<FillBlankQuestion> },
    Ordering { questions: Vec<OrderingQuestion> },
    MultiSlotSelect { questions: Vec<MultiSlotQuestion> },
    LabeledRegion { layout: LabeledRegionLayout },
}

impl ExerciseContent {
    #[must_use]
    pub fn kind(&self) -> ExerciseKind {
        match self {
            ExerciseContent::SingleSelect { .. } => ExerciseKind::SingleSelect,
            ExerciseContent::FillBlank { .. } => ExerciseKind::FillBlank,
            ExerciseContent::Ordering { .. } => ExerciseKind::Ordering,
            ExerciseContent::MultiSlotSelect { .. } => ExerciseKind::MultiSlotSelect,
            ExerciseContent::LabeledRegion { .. } => ExerciseKind::LabeledRegion,
        }
    }

    /// Number of independently scored sub-items this content defines.
    ///
    /// The total is fixed by the content alone, never by how much of it a
    /// user answered: one per single-select question, one per blank, one per
    /// ordering question, one per sub-slot, one per region.
    #[must_use]
    pub fn gradable_units(&self) -> usize {
        match self {
            ExerciseContent::SingleSelect { questions } => questions.len(),
            ExerciseContent::FillBlank { questions } => {
                questions.iter().map(|q| q.blanks.len()).sum()
            }
            ExerciseContent::Ordering { questions } => questions.len(),
            ExerciseContent::MultiSlotSelect { questions } => {
                questions.iter().map(|q| q.slots.len()).sum()
            }
            ExerciseContent::LabeledRegion { layout } => layout.regions.len(),
        }
    }
}

//
// ─── EXERCISE ──────────────────────────────────────────────────────────────────
//

/// One exercise in a session: id, display title, and typed content.
///
/// Read-only input to grading; rendering and interaction belong to the
/// per-type player components outside this engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Exercise {
    id: ExerciseId,
    title: String,
    content: ExerciseContent,
}

impl Exercise {
    #[must_use]
    pub fn new(id: ExerciseId, title: impl Into<String>, content: ExerciseContent) -> Self {
        Self {
            id,
            title: title.into(),
            content,
        }
    }

    #[must_use]
    pub fn id(&self) -> ExerciseId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn content(&self) -> &ExerciseContent {
        &self.content
    }

    #[must_use]
    pub fn kind(&self) -> ExerciseKind {
        self.content.kind()
    }

    #[must_use]
    pub fn gradable_units(&self) -> usize {
        self.content.gradable_units()
    }
}

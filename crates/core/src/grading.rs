use serde_json::json;

use crate::model::{
    AnswerMap, Exercise, ExerciseAnswers, ExerciseContent, ExerciseId, ExerciseKind,
    FillBlankQuestion, LabeledRegionLayout, MultiSlotQuestion, OrderingQuestion,
    SingleSelectQuestion,
};

/// Stride for composite audit indexes on multi-part questions:
/// `question_index * STRIDE + sub_index`. Sub-item counts per question must
/// stay below this bound for the flat audit list to be collision-free.
pub const SUB_ITEM_STRIDE: usize = 100;

//
// ─── AUDIT ROWS ────────────────────────────────────────────────────────────────
//

/// One graded sub-item, destined for the append-only audit trail.
///
/// `question_index` is composite (`q * 100 + sub`) for multi-part units so
/// the flat list stays addressable; single-unit questions use the bare
/// question index and labeled regions use their enumeration index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionAttempt {
    pub exercise_id: ExerciseId,
    pub exercise_kind: ExerciseKind,
    pub question_index: usize,
    pub selected_answer: Option<String>,
    pub correct_answer: String,
    pub is_correct: bool,
}

/// Result of grading a full attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradingOutcome {
    pub score: u8,
    pub passed: bool,
    pub total_correct: usize,
    pub total_questions: usize,
    pub question_attempts: Vec<QuestionAttempt>,
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// Pure grading over (ordered exercises, collected answers).
///
/// No I/O and no state beyond the configured passing score: identical inputs
/// always produce identical output. Unanswered sub-items are graded
/// incorrect, never omitted, so `total_questions` is fixed by the exercise
/// definitions alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradingEngine {
    passing_score: u8,
}

impl GradingEngine {
    #[must_use]
    pub fn new(passing_score: u8) -> Self {
        Self { passing_score }
    }

    #[must_use]
    pub fn passing_score(&self) -> u8 {
        self.passing_score
    }

    /// Grade every exercise against the collected answers.
    ///
    /// `score = round(100 * correct / total)`, defined as 0 for an empty
    /// exercise set; `passed = score >= passing_score`.
    #[must_use]
    pub fn grade(&self, exercises: &[Exercise], answers: &AnswerMap) -> GradingOutcome {
        let mut question_attempts = Vec::new();

        for exercise in exercises {
            let collected = answers.get(exercise.id());
            grade_exercise(exercise, collected, &mut question_attempts);
        }

        let total_questions = question_attempts.len();
        let total_correct = question_attempts.iter().filter(|qa| qa.is_correct).count();
        let score = percentage(total_correct, total_questions);

        GradingOutcome {
            score,
            passed: score >= self.passing_score,
            total_correct,
            total_questions,
            question_attempts,
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn percentage(correct: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    (100.0 * correct as f64 / total as f64).round() as u8
}

//
// ─── COMPARATORS ───────────────────────────────────────────────────────────────
//

fn grade_exercise(
    exercise: &Exercise,
    collected: Option<&ExerciseAnswers>,
    out: &mut Vec<QuestionAttempt>,
) {
    match exercise.content() {
        ExerciseContent::SingleSelect { questions } => {
            let selected = match collected {
                Some(ExerciseAnswers::SingleSelect { selected }) => Some(selected),
                _ => None,
            };
            for (qi, question) in questions.iter().enumerate() {
                out.push(grade_single_select(
                    exercise.id(),
                    qi,
                    question,
                    selected.and_then(|map| map.get(&qi)).copied(),
                ));
            }
        }
        ExerciseContent::FillBlank { questions } => {
            let entries = match collected {
                Some(ExerciseAnswers::FillBlank { entries }) => Some(entries),
                _ => None,
            };
            for (qi, question) in questions.iter().enumerate() {
                let given = entries.and_then(|map| map.get(&qi));
                grade_fill_blank(exercise.id(), qi, question, given, out);
            }
        }
        ExerciseContent::Ordering { questions } => {
            let placements = match collected {
                Some(ExerciseAnswers::Ordering { placements }) => Some(placements),
                _ => None,
            };
            for (qi, question) in questions.iter().enumerate() {
                out.push(grade_ordering(
                    exercise.id(),
                    qi,
                    question,
                    placements.and_then(|map| map.get(&qi)),
                ));
            }
        }
        ExerciseContent::MultiSlotSelect { questions } => {
            let selections = match collected {
                Some(ExerciseAnswers::MultiSlotSelect { selections }) => Some(selections),
                _ => None,
            };
            for (qi, question) in questions.iter().enumerate() {
                let given = selections.and_then(|map| map.get(&qi));
                grade_multi_slot(exercise.id(), qi, question, given, out);
            }
        }
        ExerciseContent::LabeledRegion { layout } => {
            let assignments = match collected {
                Some(ExerciseAnswers::LabeledRegion { assignments }) => Some(assignments),
                _ => None,
            };
            grade_labeled_region(exercise.id(), layout, assignments, out);
        }
    }
}

fn grade_single_select(
    exercise_id: ExerciseId,
    question_index: usize,
    question: &SingleSelectQuestion,
    selected: Option<usize>,
) -> QuestionAttempt {
    let option_text = |index: usize| {
        question
            .options
            .get(index)
            .cloned()
            .unwrap_or_else(|| index.to_string())
    };

    QuestionAttempt {
        exercise_id,
        exercise_kind: ExerciseKind::SingleSelect,
        question_index,
        selected_answer: selected.map(option_text),
        correct_answer: option_text(question.correct_option),
        is_correct: selected == Some(question.correct_option),
    }
}

fn blank_matches(accepted_answers: &str, case_sensitive: bool, given: &str) -> bool {
    accepted_answers.split(',').map(str::trim).any(|candidate| {
        if case_sensitive {
            candidate == given
        } else {
            candidate.to_lowercase() == given.to_lowercase()
        }
    })
}

fn grade_fill_blank(
    exercise_id: ExerciseId,
    question_index: usize,
    question: &FillBlankQuestion,
    given: Option<&std::collections::BTreeMap<usize, String>>,
    out: &mut Vec<QuestionAttempt>,
) {
    for (bi, blank) in question.blanks.iter().enumerate() {
        debug_assert!(bi < SUB_ITEM_STRIDE, "blank index exceeds composite stride");
        let typed = given
            .and_then(|map| map.get(&bi))
            .map(|text| text.trim().to_string());
        let is_correct = typed
            .as_deref()
            .is_some_and(|text| blank_matches(&blank.accepted_answers, blank.case_sensitive, text));

        out.push(QuestionAttempt {
            exercise_id,
            exercise_kind: ExerciseKind::FillBlank,
            question_index: question_index * SUB_ITEM_STRIDE + bi,
            selected_answer: typed,
            correct_answer: blank.accepted_answers.clone(),
            is_correct,
        });
    }
}

fn grade_ordering(
    exercise_id: ExerciseId,
    question_index: usize,
    question: &OrderingQuestion,
    placements: Option<&std::collections::BTreeMap<String, String>>,
) -> QuestionAttempt {
    // Comparison is by displayed text, not item id: two items with the same
    // text are interchangeable.
    let placed_texts: Vec<Option<&str>> = question
        .slots
        .iter()
        .map(|slot_id| {
            placements
                .and_then(|map| map.get(slot_id))
                .and_then(|item_id| question.item_text(item_id))
        })
        .collect();
    let correct_texts: Vec<Option<&str>> = question
        .correct_order
        .iter()
        .map(|item_id| question.item_text(item_id))
        .collect();

    let answered = placements.is_some_and(|map| !map.is_empty());
    let is_correct = placed_texts == correct_texts;

    QuestionAttempt {
        exercise_id,
        exercise_kind: ExerciseKind::Ordering,
        question_index,
        selected_answer: answered.then(|| json!(placed_texts).to_string()),
        correct_answer: json!(correct_texts).to_string(),
        is_correct,
    }
}

fn grade_multi_slot(
    exercise_id: ExerciseId,
    question_index: usize,
    question: &MultiSlotQuestion,
    given: Option<&std::collections::BTreeMap<usize, String>>,
    out: &mut Vec<QuestionAttempt>,
) {
    for (si, slot) in question.slots.iter().enumerate() {
        debug_assert!(si < SUB_ITEM_STRIDE, "sub-slot index exceeds composite stride");
        let selected = given
            .and_then(|map| map.get(&si))
            .map(|text| text.trim().to_string());
        let is_correct = selected.as_deref() == Some(slot.correct.as_str());

        out.push(QuestionAttempt {
            exercise_id,
            exercise_kind: ExerciseKind::MultiSlotSelect,
            question_index: question_index * SUB_ITEM_STRIDE + si,
            selected_answer: selected,
            correct_answer: slot.correct.clone(),
            is_correct,
        });
    }
}

fn grade_labeled_region(
    exercise_id: ExerciseId,
    layout: &LabeledRegionLayout,
    assignments: Option<&std::collections::BTreeMap<String, String>>,
    out: &mut Vec<QuestionAttempt>,
) {
    let label_text = |label_id: &str| {
        layout
            .label(label_id)
            .map_or_else(|| label_id.to_string(), |label| label.text.clone())
    };

    for (ri, region) in layout.regions.iter().enumerate() {
        let assigned = assignments.and_then(|map| map.get(&region.id));
        // A distractor label can never be correct, even when a region is
        // (mis)authored to point at one.
        let is_correct = assigned.is_some_and(|label_id| {
            label_id == &region.correct_label
                && layout.label(label_id).is_some_and(|label| !label.distractor)
        });

        out.push(QuestionAttempt {
            exercise_id,
            exercise_kind: ExerciseKind::LabeledRegion,
            question_index: ri,
            selected_answer: assigned.map(|label_id| label_text(label_id)),
            correct_answer: label_text(&region.correct_label),
            is_correct,
        });
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Blank, OrderingItem, Region, RegionLabel, SlotChoice};
    use std::collections::BTreeMap;

    fn fill_blank_exercise(id: u64) -> Exercise {
        Exercise::new(
            ExerciseId::new(id),
            "Geography",
            ExerciseContent::FillBlank {
                questions: vec![FillBlankQuestion {
                    prompt: "The capital is ___ on a ___".into(),
                    blanks: vec![
                        Blank {
                            accepted_answers: "Paris".into(),
                            case_sensitive: false,
                        },
                        Blank {
                            accepted_answers: "river".into(),
                            case_sensitive: false,
                        },
                    ],
                }],
            },
        )
    }

    fn ordering_exercise(id: u64) -> Exercise {
        Exercise::new(
            ExerciseId::new(id),
            "Steps",
            ExerciseContent::Ordering {
                questions: vec![OrderingQuestion {
                    prompt: "Put the steps in order".into(),
                    slots: vec!["z1".into(), "z2".into()],
                    items: vec![
                        OrderingItem {
                            id: "a".into(),
                            text: "first".into(),
                        },
                        OrderingItem {
                            id: "b".into(),
                            text: "second".into(),
                        },
                    ],
                    correct_order: vec!["a".into(), "b".into()],
                }],
            },
        )
    }

    fn fill_blank_answers(values: &[(usize, &str)]) -> ExerciseAnswers {
        let mut blanks = BTreeMap::new();
        for (index, value) in values {
            blanks.insert(*index, (*value).to_string());
        }
        let mut entries = BTreeMap::new();
        entries.insert(0, blanks);
        ExerciseAnswers::FillBlank { entries }
    }

    #[test]
    fn fill_blank_grades_per_blank_with_case_flag() {
        // passing_score=70, blanks ["Paris","river"] case-insensitive,
        // answers {"0":{"0":"paris","1":"amazon"}} → 2 rows, score 50, failed.
        let exercises = vec![fill_blank_exercise(1)];
        let mut answers = AnswerMap::new();
        answers.insert(
            ExerciseId::new(1),
            fill_blank_answers(&[(0, "paris"), (1, "amazon")]),
        );

        let outcome = GradingEngine::new(70).grade(&exercises, &answers);

        assert_eq!(outcome.question_attempts.len(), 2);
        assert!(outcome.question_attempts[0].is_correct);
        assert!(!outcome.question_attempts[1].is_correct);
        assert_eq!(outcome.total_correct, 1);
        assert_eq!(outcome.total_questions, 2);
        assert_eq!(outcome.score, 50);
        assert!(!outcome.passed);
    }

    #[test]
    fn fill_blank_case_sensitive_rejects_wrong_case() {
        let exercise = Exercise::new(
            ExerciseId::new(1),
            "Symbols",
            ExerciseContent::FillBlank {
                questions: vec![FillBlankQuestion {
                    prompt: "Chemical symbol for iron: ___".into(),
                    blanks: vec![Blank {
                        accepted_answers: "Fe".into(),
                        case_sensitive: true,
                    }],
                }],
            },
        );
        let mut answers = AnswerMap::new();
        answers.insert(ExerciseId::new(1), fill_blank_answers(&[(0, "fe")]));

        let outcome = GradingEngine::new(50).grade(&[exercise], &answers);
        assert!(!outcome.question_attempts[0].is_correct);
    }

    #[test]
    fn fill_blank_accepts_any_comma_separated_candidate_trimmed() {
        let exercise = Exercise::new(
            ExerciseId::new(1),
            "Numbers",
            ExerciseContent::FillBlank {
                questions: vec![FillBlankQuestion {
                    prompt: "Four is ___".into(),
                    blanks: vec![Blank {
                        accepted_answers: "4, four , IV".into(),
                        case_sensitive: false,
                    }],
                }],
            },
        );
        let mut answers = AnswerMap::new();
        answers.insert(ExerciseId::new(1), fill_blank_answers(&[(0, "  Four ")]));

        let outcome = GradingEngine::new(50).grade(&[exercise], &answers);
        assert!(outcome.question_attempts[0].is_correct);
        assert_eq!(
            outcome.question_attempts[0].selected_answer.as_deref(),
            Some("Four")
        );
    }

    #[test]
    fn ordering_compares_displayed_text_sequences() {
        // Slots [z1,z2], correct [a,b]; placing {z1:b, z2:a} derives
        // ["second","first"] vs ["first","second"] → incorrect.
        let exercises = vec![ordering_exercise(1)];
        let mut placements = BTreeMap::new();
        let mut slots = BTreeMap::new();
        slots.insert("z1".to_string(), "b".to_string());
        slots.insert("z2".to_string(), "a".to_string());
        placements.insert(0, slots);
        let mut answers = AnswerMap::new();
        answers.insert(ExerciseId::new(1), ExerciseAnswers::Ordering { placements });

        let outcome = GradingEngine::new(50).grade(&exercises, &answers);
        assert_eq!(outcome.question_attempts.len(), 1);
        assert!(!outcome.question_attempts[0].is_correct);
        assert_eq!(
            outcome.question_attempts[0].selected_answer.as_deref(),
            Some(r#"["second","first"]"#)
        );
        assert_eq!(
            outcome.question_attempts[0].correct_answer,
            r#"["first","second"]"#
        );
    }

    #[test]
    fn duplicate_text_items_are_interchangeable() {
        // Two items share the text "step"; either id in either slot matches
        // the canonical sequence because comparison is by displayed text.
        let exercise = Exercise::new(
            ExerciseId::new(1),
            "Steps",
            ExerciseContent::Ordering {
                questions: vec![OrderingQuestion {
                    prompt: "Order".into(),
                    slots: vec!["z1".into(), "z2".into()],
                    items: vec![
                        OrderingItem {
                            id: "a".into(),
                            text: "step".into(),
                        },
                        OrderingItem {
                            id: "b".into(),
                            text: "step".into(),
                        },
                    ],
                    correct_order: vec!["a".into(), "b".into()],
                }],
            },
        );
        let mut slots = BTreeMap::new();
        slots.insert("z1".to_string(), "b".to_string());
        slots.insert("z2".to_string(), "a".to_string());
        let mut placements = BTreeMap::new();
        placements.insert(0, slots);
        let mut answers = AnswerMap::new();
        answers.insert(ExerciseId::new(1), ExerciseAnswers::Ordering { placements });

        let outcome = GradingEngine::new(50).grade(&[exercise], &answers);
        assert!(outcome.question_attempts[0].is_correct);
    }

    #[test]
    fn unplaced_ordering_slots_grade_incorrect() {
        let exercises = vec![ordering_exercise(1)];
        let outcome = GradingEngine::new(50).grade(&exercises, &AnswerMap::new());
        assert_eq!(outcome.question_attempts.len(), 1);
        assert!(!outcome.question_attempts[0].is_correct);
        assert!(outcome.question_attempts[0].selected_answer.is_none());
    }

    #[test]
    fn distractor_labels_are_never_correct() {
        // Region h1 expects L1; assigning distractor L2 is incorrect even
        // though a placement was made.
        let exercise = Exercise::new(
            ExerciseId::new(1),
            "Anatomy",
            ExerciseContent::LabeledRegion {
                layout: LabeledRegionLayout {
                    regions: vec![Region {
                        id: "h1".into(),
                        correct_label: "L1".into(),
                    }],
                    labels: vec![
                        RegionLabel {
                            id: "L1".into(),
                            text: "aorta".into(),
                            distractor: false,
                        },
                        RegionLabel {
                            id: "L2".into(),
                            text: "femur".into(),
                            distractor: true,
                        },
                    ],
                },
            },
        );
        let mut assignments = BTreeMap::new();
        assignments.insert("h1".to_string(), "L2".to_string());
        let mut answers = AnswerMap::new();
        answers.insert(
            ExerciseId::new(1),
            ExerciseAnswers::LabeledRegion { assignments },
        );

        let outcome = GradingEngine::new(50).grade(&[exercise], &answers);
        assert_eq!(outcome.question_attempts.len(), 1);
        assert!(!outcome.question_attempts[0].is_correct);
        assert_eq!(
            outcome.question_attempts[0].selected_answer.as_deref(),
            Some("femur")
        );
        assert_eq!(outcome.question_attempts[0].correct_answer, "aorta");
    }

    #[test]
    fn correct_label_on_its_region_passes() {
        let exercise = Exercise::new(
            ExerciseId::new(1),
            "Anatomy",
            ExerciseContent::LabeledRegion {
                layout: LabeledRegionLayout {
                    regions: vec![
                        Region {
                            id: "h1".into(),
                            correct_label: "L1".into(),
                        },
                        Region {
                            id: "h2".into(),
                            correct_label: "L3".into(),
                        },
                    ],
                    labels: vec![
                        RegionLabel {
                            id: "L1".into(),
                            text: "aorta".into(),
                            distractor: false,
                        },
                        RegionLabel {
                            id: "L3".into(),
                            text: "vena cava".into(),
                            distractor: false,
                        },
                    ],
                },
            },
        );
        let mut assignments = BTreeMap::new();
        assignments.insert("h1".to_string(), "L1".to_string());
        // L3 placed on the wrong region: tied-to-exact-region fails for h2.
        assignments.insert("h2".to_string(), "L1".to_string());
        let mut answers = AnswerMap::new();
        answers.insert(
            ExerciseId::new(1),
            ExerciseAnswers::LabeledRegion { assignments },
        );

        let outcome = GradingEngine::new(50).grade(&[exercise], &answers);
        assert_eq!(outcome.total_questions, 2);
        assert_eq!(outcome.total_correct, 1);
        assert!(outcome.question_attempts[0].is_correct);
        assert!(!outcome.question_attempts[1].is_correct);
    }

    #[test]
    fn multi_slot_uses_composite_indexes() {
        let exercise = Exercise::new(
            ExerciseId::new(1),
            "Grammar",
            ExerciseContent::MultiSlotSelect {
                questions: vec![
                    MultiSlotQuestion {
                        prompt: "Pick both".into(),
                        slots: vec![
                            SlotChoice {
                                choices: vec!["is".into(), "are".into()],
                                correct: "is".into(),
                            },
                            SlotChoice {
                                choices: vec!["was".into(), "were".into()],
                                correct: "were".into(),
                            },
                        ],
                    },
                    MultiSlotQuestion {
                        prompt: "Pick one".into(),
                        slots: vec![SlotChoice {
                            choices: vec!["a".into(), "an".into()],
                            correct: "an".into(),
                        }],
                    },
                ],
            },
        );
        let mut q0 = BTreeMap::new();
        q0.insert(0, "is".to_string());
        q0.insert(1, " were ".to_string());
        let mut selections = BTreeMap::new();
        selections.insert(0, q0);
        let mut answers = AnswerMap::new();
        answers.insert(
            ExerciseId::new(1),
            ExerciseAnswers::MultiSlotSelect { selections },
        );

        let outcome = GradingEngine::new(50).grade(&[exercise], &answers);
        let indexes: Vec<usize> = outcome
            .question_attempts
            .iter()
            .map(|qa| qa.question_index)
            .collect();
        assert_eq!(indexes, vec![0, 1, 100]);
        // Trimmed " were " matches; the unanswered second question does not.
        assert_eq!(outcome.total_correct, 2);
        assert_eq!(outcome.total_questions, 3);
    }

    #[test]
    fn single_select_records_option_text() {
        let exercise = Exercise::new(
            ExerciseId::new(1),
            "Math",
            ExerciseContent::SingleSelect {
                questions: vec![SingleSelectQuestion {
                    prompt: "2 + 2?".into(),
                    options: vec!["3".into(), "4".into(), "5".into()],
                    correct_option: 1,
                }],
            },
        );
        let mut selected = BTreeMap::new();
        selected.insert(0, 2);
        let mut answers = AnswerMap::new();
        answers.insert(
            ExerciseId::new(1),
            ExerciseAnswers::SingleSelect { selected },
        );

        let outcome = GradingEngine::new(50).grade(&[exercise], &answers);
        assert!(!outcome.question_attempts[0].is_correct);
        assert_eq!(
            outcome.question_attempts[0].selected_answer.as_deref(),
            Some("5")
        );
        assert_eq!(outcome.question_attempts[0].correct_answer, "4");
    }

    #[test]
    fn total_questions_is_independent_of_answered_count() {
        // 2 fill-blank questions x 3 blanks = 6 gradable sub-items, with
        // nothing answered at all.
        let blanks = |n: usize| {
            (0..n)
                .map(|i| Blank {
                    accepted_answers: format!("answer{i}"),
                    case_sensitive: false,
                })
                .collect::<Vec<_>>()
        };
        let exercise = Exercise::new(
            ExerciseId::new(1),
            "Blanks",
            ExerciseContent::FillBlank {
                questions: vec![
                    FillBlankQuestion {
                        prompt: "q0".into(),
                        blanks: blanks(3),
                    },
                    FillBlankQuestion {
                        prompt: "q1".into(),
                        blanks: blanks(3),
                    },
                ],
            },
        );

        let outcome = GradingEngine::new(50).grade(&[exercise], &AnswerMap::new());
        assert_eq!(outcome.total_questions, 6);
        assert_eq!(outcome.total_correct, 0);
        assert_eq!(outcome.question_attempts.len(), 6);
        assert_eq!(outcome.score, 0);
        let indexes: Vec<usize> = outcome
            .question_attempts
            .iter()
            .map(|qa| qa.question_index)
            .collect();
        assert_eq!(indexes, vec![0, 1, 2, 100, 101, 102]);
    }

    #[test]
    fn grading_is_deterministic() {
        let exercises = vec![fill_blank_exercise(1), ordering_exercise(2)];
        let mut answers = AnswerMap::new();
        answers.insert(
            ExerciseId::new(1),
            fill_blank_answers(&[(0, "PARIS"), (1, "River")]),
        );

        let engine = GradingEngine::new(70);
        let first = engine.grade(&exercises, &answers);
        let second = engine.grade(&exercises, &answers);
        assert_eq!(first, second);
        assert_eq!(first.score, 67);
        assert!(!first.passed);
    }

    #[test]
    fn empty_exercise_set_scores_zero() {
        let outcome = GradingEngine::new(70).grade(&[], &AnswerMap::new());
        assert_eq!(outcome.total_questions, 0);
        assert_eq!(outcome.score, 0);
        assert!(!outcome.passed);
        assert!(outcome.question_attempts.is_empty());
    }

    #[test]
    fn mismatched_payload_kind_reads_as_unanswered() {
        // A payload stored under the wrong variant must not panic or count
        // as an answer.
        let exercises = vec![fill_blank_exercise(1)];
        let mut selected = BTreeMap::new();
        selected.insert(0, 0);
        let mut answers = AnswerMap::new();
        answers.insert(
            ExerciseId::new(1),
            ExerciseAnswers::SingleSelect { selected },
        );

        let outcome = GradingEngine::new(50).grade(&exercises, &answers);
        assert_eq!(outcome.total_questions, 2);
        assert_eq!(outcome.total_correct, 0);
        assert!(outcome.question_attempts[0].selected_answer.is_none());
    }

    #[test]
    fn passing_is_inclusive_of_threshold() {
        let exercises = vec![fill_blank_exercise(1)];
        let mut answers = AnswerMap::new();
        answers.insert(
            ExerciseId::new(1),
            fill_blank_answers(&[(0, "paris"), (1, "amazon")]),
        );

        let outcome = GradingEngine::new(50).grade(&exercises, &answers);
        assert_eq!(outcome.score, 50);
        assert!(outcome.passed);
    }
}

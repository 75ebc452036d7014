use assess_core::model::{AnswerMap, ExerciseAnswers, ExerciseId};

/// In-memory answer collection for one attempt.
///
/// Exercise players are the only writers: each invokes [`record`] on every
/// user-visible edit, not just on navigation. The collector is read by the
/// autosave tick (snapshot) and by grading at submit time. On resume, each
/// player is seeded with its own slice of the persisted draft via
/// [`initial_answers`].
///
/// [`record`]: AnswerCollector::record
/// [`initial_answers`]: AnswerCollector::initial_answers
#[derive(Debug, Clone, Default)]
pub struct AnswerCollector {
    answers: AnswerMap,
}

impl AnswerCollector {
    /// Empty collector for a fresh attempt.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the collector from a persisted draft on resume.
    #[must_use]
    pub fn from_draft(draft: AnswerMap) -> Self {
        Self { answers: draft }
    }

    /// Record a player's current payload for its exercise (last write wins).
    pub fn record(&mut self, exercise_id: ExerciseId, answers: ExerciseAnswers) {
        self.answers.insert(exercise_id, answers);
    }

    /// The slice handed to one exercise player as its initial state.
    #[must_use]
    pub fn initial_answers(&self, exercise_id: ExerciseId) -> Option<&ExerciseAnswers> {
        self.answers.get(exercise_id)
    }

    /// Current full snapshot, as pushed by autosave and read by grading.
    #[must_use]
    pub fn snapshot(&self) -> &AnswerMap {
        &self.answers
    }

    /// Number of exercises with any collected payload.
    #[must_use]
    pub fn answered_exercises(&self) -> usize {
        self.answers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn single_select(option: usize) -> ExerciseAnswers {
        let mut selected = BTreeMap::new();
        selected.insert(0, option);
        ExerciseAnswers::SingleSelect { selected }
    }

    #[test]
    fn record_overwrites_previous_payload() {
        let mut collector = AnswerCollector::new();
        let id = ExerciseId::new(1);
        collector.record(id, single_select(0));
        collector.record(id, single_select(2));

        assert_eq!(collector.answered_exercises(), 1);
        assert_eq!(collector.initial_answers(id), Some(&single_select(2)));
    }

    #[test]
    fn draft_seeds_per_exercise_slices() {
        let mut draft = AnswerMap::new();
        draft.insert(ExerciseId::new(1), single_select(1));
        let collector = AnswerCollector::from_draft(draft);

        assert_eq!(
            collector.initial_answers(ExerciseId::new(1)),
            Some(&single_select(1))
        );
        assert_eq!(collector.initial_answers(ExerciseId::new(2)), None);
    }
}

mod answers;
mod attempt;
mod exercise;
mod ids;
mod session;

pub use answers::{AnswerMap, ExerciseAnswers};
pub use attempt::{AttemptStateError, AttemptStatus, TestAttempt};
pub use exercise::{
    Blank, Exercise, ExerciseContent, ExerciseKind, FillBlankQuestion, LabeledRegionLayout,
    MultiSlotQuestion, OrderingItem, OrderingQuestion, Region, RegionLabel, SingleSelectQuestion,
    SlotChoice,
};
pub use ids::{AttemptId, ExerciseId, ParseIdError, SessionId, UserId};
pub use session::{SessionValidationError, TestSession};

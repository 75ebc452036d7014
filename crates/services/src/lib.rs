#![forbid(unsafe_code)]

pub mod attempts;
pub mod error;

pub use assess_core::Clock;
pub use attempts as attempt;

pub use error::AttemptError;

pub use attempts::{
    ActiveAttempt, AnswerCollector, AttemptLoopService, AttemptManager, CountdownController,
    FinalizedResult, LoadOutcome, PlayerView, StartOutcome, TickOutcome,
};

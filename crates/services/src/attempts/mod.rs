mod autosave;
mod collector;
mod countdown;
mod manager;
mod player;
mod view;
mod workflow;

// Public API of the attempt subsystem.
pub use crate::error::AttemptError;
pub use autosave::{AutosavePolicy, DEFAULT_AUTOSAVE_INTERVAL_SECONDS};
pub use collector::AnswerCollector;
pub use countdown::{CountdownController, CountdownTick};
pub use manager::{AttemptManager, StartOutcome};
pub use player::{ActiveAttempt, FinalizedResult};
pub use view::{ActiveView, AttemptListItem, PlayerView, ResultsView};
pub use workflow::{AttemptLoopService, LoadOutcome, TickOutcome};

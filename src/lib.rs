//! Workout session player.
//!
//! Drives a training plan through its exercises, series and work/rest
//! intervals, tracks active time, and hands a one-time summary of the session
//! to an external logging endpoint.

pub mod db;
pub mod error;
pub mod models;
pub mod player;
pub mod storage;
pub mod submit;
pub mod types;
pub mod utils;

pub use error::{PlayerError, SubmitError};
pub use models::{ExerciseKind, Plan, PlanExercise, SaveState, SessionSummary, SummaryStatus};
pub use player::{Action, Clock, ManualClock, Phase, SessionPlayer, Step, SystemClock, Ticker};
pub use submit::{HttpSubmitter, Submitter, SummaryOutbox};

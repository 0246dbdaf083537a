//! The session player: a workout state machine plus the timer that drives it.
//!
//! - `machine.rs`: `SessionPlayer`, the idle/work/rest/done state machine
//! - `phase.rs`: the `Phase` tagged union
//! - `clock.rs`: injected wall clock for elapsed-time accounting
//! - `ticker.rs`: owned, cancellable one-second tick source

pub mod clock;
pub mod machine;
pub mod phase;
pub mod ticker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use machine::{Action, SessionPlayer, Step};
pub use phase::Phase;
pub use ticker::Ticker;

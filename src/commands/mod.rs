pub mod config;
pub mod history;
pub mod plan;
pub mod play;

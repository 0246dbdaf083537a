use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tempo", version, about = "Terminal workout player")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Emit machine-readable JSON instead of colorful text.
    #[arg(global = true, long)]
    pub json: bool,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Play a workout plan
    #[command(visible_alias = "p")]
    Play(PlayArgs),

    /// Inspect workout plans
    #[command(subcommand)]
    Plan(PlanCmd),

    /// Local log of finished sessions
    #[command(subcommand, visible_alias = "l")]
    Log(LogCmd),

    /// View or edit tempo config
    #[command(subcommand)]
    Config(ConfigCmd),
}

//
// Commands
//

#[derive(Args)]
pub struct PlayArgs {
    /// Plan JSON file or http(s) URL
    pub plan: String,

    /// User id sent with the session summary (defaults to `user.id`)
    #[arg(short, long)]
    pub user: Option<String>,

    /// Start the first exercise right away
    #[arg(short, long)]
    pub start: bool,
}

#[derive(Subcommand)]
pub enum PlanCmd {
    /// Show a plan in detail
    #[command(visible_alias = "s")]
    Show {
        /// Plan JSON file or http(s) URL
        plan: String,
    },
}

#[derive(Subcommand)]
pub enum LogCmd {
    /// List recorded sessions
    #[command(visible_alias = "l")]
    List,

    /// Resubmit session summaries that failed or were never sent
    #[command(visible_alias = "r")]
    Retry {
        /// Also resubmit sessions still marked as saving (may duplicate)
        #[arg(long)]
        include_saving: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Show all config keys
    List,

    /// Get the value of a key
    Get { key: String },

    /// Set or override a key
    Set { key: String, val: String },

    /// Remove a key
    Unset { key: String },
}

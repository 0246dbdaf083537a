use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use env_logger::Env;
use tempo::{db::open, types::Config};

mod cli;
mod commands;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config_path = Config::default_path()?;
    let cfg = Config::load(&config_path)?;

    match cli.cmd {
        Commands::Config(cmd) => commands::config::handle(cmd, &config_path).await?,
        Commands::Plan(cmd) => commands::plan::handle(cmd, cli.json).await?,
        Commands::Play(args) => {
            let pool = open(&cfg.db_path()).await?;
            commands::play::handle(args, &cfg, &pool, cli.json).await?
        }
        Commands::Log(cmd) => {
            let pool = open(&cfg.db_path()).await?;
            commands::history::handle(cmd, &cfg, &pool, cli.json).await?
        }
    }

    Ok(())
}

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use log::info;
use serde::Serialize;
use sqlx::SqlitePool;
use tempo::{HttpSubmitter, SaveState, SummaryOutbox, storage, types::Config};

use crate::cli::LogCmd;

#[derive(Serialize)]
struct RowJson {
    idx: usize,
    id: String,
    user_id: String,
    plan: String,
    status: String,
    save_state: String,
    error: Option<String>,
    finished_at: i64,
}

pub async fn handle(cmd: LogCmd, cfg: &Config, pool: &SqlitePool, json: bool) -> Result<()> {
    match cmd {
        LogCmd::List => {
            let rows = storage::list_summaries(pool).await?;

            if json {
                let out: Vec<RowJson> = rows
                    .into_iter()
                    .enumerate()
                    .map(|(i, r)| RowJson {
                        idx: i + 1,
                        id: r.id,
                        user_id: r.user_id,
                        plan: r.plan_title,
                        status: r.status,
                        save_state: r.save_state.as_str().to_string(),
                        error: r.save_state.error_message().map(str::to_string),
                        finished_at: r.finished_at,
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&out)?);
                return Ok(());
            }

            if rows.is_empty() {
                println!("{}", "  (no sessions recorded)".dimmed());
                return Ok(());
            }

            println!("{}", "Sessions:".cyan().bold());
            for (i, r) in rows.iter().enumerate() {
                let when = DateTime::<Utc>::from_timestamp_millis(r.finished_at)
                    .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "?".to_string());
                let state = match &r.save_state {
                    SaveState::Saved => "saved".green(),
                    SaveState::Error(_) => "not saved".red(),
                    other => other.as_str().yellow(),
                };
                let title = if r.plan_title.is_empty() { "(untitled)" } else { r.plan_title.as_str() };

                println!(
                    "{} • {} {} ({}) {} {}",
                    format!("{:>2}", i + 1).yellow(),
                    when.dimmed(),
                    title.bold(),
                    r.status,
                    "|".blue(),
                    state
                );
                if let Some(err) = r.save_state.error_message() {
                    println!("     {}", err.dimmed());
                }
            }
        }

        LogCmd::Retry { include_saving } => {
            let pending = storage::unsaved_summaries(pool, include_saving).await?;
            if pending.is_empty() {
                println!("{} every session is already saved", "info:".blue().bold());
                return Ok(());
            }

            let submitter = HttpSubmitter::new(cfg.endpoint());
            let (mut saved, mut failed) = (0, 0);
            for summary in pending {
                let id = summary.session_id;
                let outbox = SummaryOutbox::new(submitter.clone());
                outbox.stage(summary);

                let state = outbox.flush().await;
                storage::set_save_state(pool, id, &state).await?;
                match state {
                    SaveState::Saved => saved += 1,
                    other => {
                        failed += 1;
                        println!("{} session {}: {}", "error:".red().bold(), id, other);
                    }
                }
            }

            info!("retry finished: {} saved, {} failed", saved, failed);
            println!(
                "{} {} saved, {} still pending",
                "ok:".green().bold(),
                saved,
                failed
            );
        }
    }

    Ok(())
}

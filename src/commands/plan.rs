use anyhow::Result;
use colored::Colorize;
use itertools::Itertools;
use tempo::{ExerciseKind, Plan, storage, utils::format_duration};

use crate::cli::PlanCmd;

pub async fn handle(cmd: PlanCmd, json: bool) -> Result<()> {
    match cmd {
        PlanCmd::Show { plan } => {
            let plan = storage::load_plan(&plan).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&plan.to_wire())?);
                return Ok(());
            }

            print_plan(&plan);
            if let Err(e) = plan.validate() {
                println!("\n{} this plan cannot be played: {}", "warning:".yellow().bold(), e);
            }
        }
    }

    Ok(())
}

pub fn print_plan(plan: &Plan) {
    let title = if plan.title.is_empty() { "(untitled plan)" } else { plan.title.as_str() };
    println!("{} {}", "Plan:".cyan().bold(), title.bold());

    let meta = [
        plan.subtitle.as_str(),
        plan.date.as_str(),
        plan.training_type.as_str(),
        plan.equipment.as_str(),
    ]
    .into_iter()
    .filter(|s| !s.trim().is_empty())
    .join(" · ");
    if !meta.is_empty() {
        println!("{}", meta.dimmed());
    }

    let timed = chrono::Duration::seconds(plan.timed_secs() as i64);
    println!(
        "{} ~{} min estimated, {} of timed work and rest",
        "info:".blue().bold(),
        plan.estimated_minutes,
        format_duration(timed)
    );

    if plan.exercises.is_empty() {
        println!("{}", "  (no exercises)".dimmed());
        return;
    }

    println!("\n{}", "Exercises:".cyan().bold());
    let idx_w = plan.exercises.len().to_string().len();
    for (i, ex) in plan.exercises.iter().enumerate() {
        let idx = format!("{:>width$}", i + 1, width = idx_w).yellow();
        let kind = match ex.kind {
            ExerciseKind::Duration => "time".green(),
            ExerciseKind::Repetition => "reps".magenta(),
        };
        let rest = if ex.rest_secs > 0 {
            format!(", rest {}s", ex.rest_secs)
        } else {
            String::new()
        };

        println!("{} • {} [{}] — {}{}", idx, ex.name.bold(), kind, ex.target(), rest.dimmed());
        if !ex.notes.trim().is_empty() {
            println!("{}   {}", " ".repeat(idx_w), ex.notes.dimmed());
        }
    }
}

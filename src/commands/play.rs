use std::sync::Arc;

use anyhow::Result;
use colored::{ColoredString, Colorize};
use log::{debug, info, warn};
use sqlx::SqlitePool;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tempo::{
    Action, ExerciseKind, HttpSubmitter, Phase, SaveState, SessionPlayer, SessionSummary, Step,
    SummaryOutbox, SystemClock, Ticker, storage,
    types::{Config, resolve_exercise},
    utils::{bar_width, format_countdown, format_duration, progress_bar},
};

use crate::cli::PlayArgs;

type Outbox = Arc<SummaryOutbox<HttpSubmitter>>;

/// A line typed by the user while a session plays.
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Act(Action),
    JumpTo(String),
    List,
    Retry,
    Help,
    Quit,
    Unknown(String),
}

pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    let (cmd, rest) = match line.split_once(char::is_whitespace) {
        Some((c, r)) => (c, r.trim()),
        None => (line, ""),
    };

    match cmd.to_ascii_lowercase().as_str() {
        "" | "p" | "pause" | "start" => Input::Act(Action::Toggle),
        "d" | "done" => Input::Act(Action::MarkDone),
        "s" | "skip" => Input::Act(Action::Skip),
        "r" | "restart" => Input::Act(Action::Restart),
        "f" | "finish" => Input::Act(Action::FinishNow),
        "j" | "jump" if !rest.is_empty() => Input::JumpTo(rest.to_string()),
        "l" | "list" => Input::List,
        "t" | "retry" => Input::Retry,
        "h" | "help" | "?" => Input::Help,
        "q" | "quit" | "exit" => Input::Quit,
        _ => Input::Unknown(line.to_string()),
    }
}

pub async fn handle(args: PlayArgs, cfg: &Config, pool: &SqlitePool, json: bool) -> Result<()> {
    let plan = storage::load_plan(&args.plan).await?;

    let player = match SessionPlayer::new(plan, SystemClock) {
        Ok(p) => p,
        Err(e) => {
            println!("{} cannot start session: {}", "error:".red().bold(), e);
            return Ok(());
        }
    };
    let mut player = player.with_user_id(args.user.unwrap_or_else(|| cfg.user_id()));

    let outbox: Outbox = Arc::new(SummaryOutbox::new(HttpSubmitter::new(cfg.endpoint())));
    let (saved_tx, mut saved_rx) = mpsc::unbounded_channel::<SaveState>();
    let mut ticker = Ticker::new(cfg.tick_period());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    crate::commands::plan::print_plan(player.plan());
    print_help();
    if args.start {
        player.apply(Action::Toggle);
    }
    render(&player);

    loop {
        ticker.sync(player.wants_ticks());

        tokio::select! {
            _ = ticker.tick() => {
                let step = player.tick();
                on_step(&player, step, &outbox, &saved_tx, pool, json).await?;
            }

            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("stdin closed");
                    break;
                };

                match parse_input(&line) {
                    Input::Act(action) => {
                        let step = player.apply(action);
                        if step == Step::Ignored {
                            println!("{} not available right now", "warning:".yellow().bold());
                        }
                        on_step(&player, step, &outbox, &saved_tx, pool, json).await?;
                    }
                    Input::JumpTo(target) => match resolve_exercise(player.plan(), &target) {
                        Some(i) => {
                            let step = player.apply(Action::Jump(i));
                            on_step(&player, step, &outbox, &saved_tx, pool, json).await?;
                        }
                        None => println!(
                            "{} no exercise matches `{}` — use `l` to list them",
                            "warning:".yellow().bold(),
                            target
                        ),
                    },
                    Input::List => print_progress_list(&player),
                    Input::Retry => match outbox.save_state() {
                        SaveState::Error(_) => {
                            println!("{} retrying…", "info:".blue().bold());
                            spawn_flush(&outbox, &saved_tx);
                        }
                        other => println!("{} nothing to retry ({})", "info:".blue().bold(), other),
                    },
                    Input::Help => print_help(),
                    Input::Quit => break,
                    Input::Unknown(s) => println!(
                        "{} unknown command `{}` — `h` for help",
                        "warning:".yellow().bold(),
                        s
                    ),
                }
            }

            Some(state) = saved_rx.recv() => {
                mark_saved_locally(pool, &player, &state).await;
                match &state {
                    SaveState::Saved => {
                        println!("{} session saved", "ok:".green().bold());
                        break;
                    }
                    SaveState::Error(msg) => println!(
                        "{} could not save session: {} — `t` to retry, `q` to keep it for `tempo log retry`",
                        "error:".red().bold(),
                        msg
                    ),
                    _ => {}
                }
            }
        }
    }

    // Let an in-flight submission land before the runtime goes away.
    if outbox.save_state() == SaveState::Saving {
        if let Some(state) = saved_rx.recv().await {
            mark_saved_locally(pool, &player, &state).await;
        }
    }

    if !player.is_done() {
        println!(
            "{} session left unfinished; nothing was logged",
            "warning:".yellow().bold()
        );
    }

    Ok(())
}

async fn on_step(
    player: &SessionPlayer,
    step: Step,
    outbox: &Outbox,
    saved_tx: &mpsc::UnboundedSender<SaveState>,
    pool: &SqlitePool,
    json: bool,
) -> Result<()> {
    match step {
        Step::Ignored => {}
        Step::Changed => render(player),
        Step::Finished(summary) => {
            render(player);
            print_summary(&summary, json)?;

            if outbox.stage(summary.clone()) {
                info!("session {} finished, submitting summary", summary.session_id);
                spawn_flush(outbox, saved_tx);

                if let Err(e) = storage::record_summary(pool, &summary, &SaveState::Saving).await {
                    warn!("session {} not recorded locally: {:#}", summary.session_id, e);
                    println!(
                        "{} could not record session locally: {:#}",
                        "error:".red().bold(),
                        e
                    );
                }
            }
        }
    }
    Ok(())
}

/// A failed local write never stops the player; the submission result stands.
async fn mark_saved_locally(pool: &SqlitePool, player: &SessionPlayer, state: &SaveState) {
    if let Err(e) = storage::set_save_state(pool, player.session_id(), state).await {
        warn!("session {} save state not recorded: {:#}", player.session_id(), e);
        println!(
            "{} could not record save state ({}) locally: {:#}",
            "error:".red().bold(),
            state,
            e
        );
    }
}

/// Submission runs off the input/tick loop; the result comes back on `saved_tx`.
fn spawn_flush(outbox: &Outbox, saved_tx: &mpsc::UnboundedSender<SaveState>) {
    let outbox = Arc::clone(outbox);
    let tx = saved_tx.clone();
    tokio::spawn(async move {
        let state = outbox.flush().await;
        let _ = tx.send(state);
    });
}

fn phase_label(phase: Phase) -> ColoredString {
    match phase {
        Phase::Idle => "READY".yellow().bold(),
        Phase::Work { .. } => "WORK".green().bold(),
        Phase::Rest { .. } => "REST".blue().bold(),
        Phase::Done => "DONE".cyan().bold(),
    }
}

fn render(player: &SessionPlayer) {
    let total = player.plan().exercises.len();
    let bar = progress_bar(player.progress_percent(), bar_width());

    let Some(ex) = player.current_exercise() else {
        println!(
            "{} {} {}%",
            phase_label(player.phase()),
            bar,
            player.progress_percent()
        );
        return;
    };

    let clock = match (player.phase(), ex.kind) {
        (Phase::Idle, ExerciseKind::Repetition) => {
            format!("{} — `d` when done", ex.reps.as_deref().unwrap_or("reps"))
        }
        (phase, _) => format_countdown(phase.seconds_left()),
    };
    let state = if player.is_running() { "▶".green() } else { "⏸".dimmed() };

    println!(
        "[{}/{}] {} series {}/{} {} {} {} {} {}%",
        player.current_index() + 1,
        total,
        ex.name.bold(),
        player.series(),
        ex.series,
        phase_label(player.phase()),
        clock,
        state,
        bar,
        player.progress_percent()
    );

    if matches!(player.phase(), Phase::Rest { .. }) {
        if let Some(next) = player.next_exercise() {
            if player.completed_series()[player.current_index()] >= ex.series {
                println!("      {} {}", "next:".dimmed(), next.name.dimmed());
            }
        }
    }
}

fn print_progress_list(player: &SessionPlayer) {
    println!("{}", "Exercises:".cyan().bold());
    for (i, ex) in player.plan().exercises.iter().enumerate() {
        let done = player.completed_series()[i];
        let marker = if player.is_exercise_complete(i) {
            "✓".green()
        } else if i == player.current_index() {
            "›".yellow()
        } else {
            " ".normal()
        };
        println!(
            " {} {} • {} — {}/{} series",
            marker,
            format!("{}", i + 1).yellow(),
            ex.name.bold(),
            done,
            ex.series
        );
    }
}

fn print_summary(summary: &SessionSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    let m = &summary.metrics;
    println!(
        "{} session {} — {}/{} exercises in {} (estimated {} min)",
        "ok:".green().bold(),
        m.status,
        m.completed_exercises,
        m.total_exercises,
        format_duration(chrono::Duration::seconds(m.active_secs as i64)),
        m.estimated_minutes
    );
    Ok(())
}

fn print_help() {
    println!(
        "{} {}",
        "keys:".dimmed(),
        "[enter]/p start·pause  d done  s skip  r restart  j <n|name> jump  l list  f finish  t retry  q quit"
            .dimmed()
    );
}

use anyhow::{Context, Result, anyhow};
use log::debug;
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{Plan, SaveState, SessionSummary};

/// Loads a plan from an `http(s)://` URL or a local JSON file.
pub async fn load_plan(source: &str) -> Result<Plan> {
    let value: Value = if source.starts_with("http://") || source.starts_with("https://") {
        debug!("fetching plan from {}", source);
        reqwest::get(source)
            .await
            .with_context(|| format!("Failed to fetch plan from {}", source))?
            .error_for_status()?
            .json()
            .await
            .with_context(|| format!("Plan at {} is not valid JSON", source))?
    } else {
        let content = tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("Could not read plan file: `{}`", source))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Plan file `{}` is not valid JSON", source))?
    };

    Plan::from_value(value).map_err(|e| anyhow!("Invalid plan `{}`: {}", source, e))
}

/// One row of the local summary log.
#[derive(Debug, Clone)]
pub struct SummaryRow {
    pub id: String,
    pub user_id: String,
    pub plan_title: String,
    pub status: String,
    pub save_state: SaveState,
    pub finished_at: i64,
}

/// Inserts the summary, or updates the save state of an already recorded one.
pub async fn record_summary(pool: &SqlitePool, summary: &SessionSummary, state: &SaveState) -> Result<()> {
    let payload = serde_json::to_string(summary)?;
    let title = summary
        .plan
        .get("titulo")
        .and_then(Value::as_str)
        .unwrap_or_default();

    sqlx::query(
        r#"
        INSERT INTO session_summaries
        (id, user_id, plan_title, status, payload, save_state, last_error, finished_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(id) DO UPDATE SET
            save_state = excluded.save_state,
            last_error = excluded.last_error
        "#,
    )
    .bind(summary.session_id.to_string())
    .bind(&summary.user_id)
    .bind(title)
    .bind(summary.metrics.status.to_string())
    .bind(payload)
    .bind(state.as_str())
    .bind(state.error_message())
    .bind(summary.finished_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn set_save_state(pool: &SqlitePool, id: Uuid, state: &SaveState) -> Result<()> {
    sqlx::query("UPDATE session_summaries SET save_state = ?, last_error = ? WHERE id = ?")
        .bind(state.as_str())
        .bind(state.error_message())
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

/// Most recent first.
pub async fn list_summaries(pool: &SqlitePool) -> Result<Vec<SummaryRow>> {
    let rows = sqlx::query(
        r#"
        SELECT id, user_id, plan_title, status, save_state, last_error, finished_at
        FROM   session_summaries
        ORDER  BY finished_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| SummaryRow {
            id: r.get("id"),
            user_id: r.get("user_id"),
            plan_title: r.get("plan_title"),
            status: r.get("status"),
            save_state: SaveState::from_parts(&r.get::<String, _>("save_state"), r.get("last_error")),
            finished_at: r.get("finished_at"),
        })
        .collect())
}

/// Recorded summaries that were never submitted or whose submission failed,
/// oldest first. Rows still marked `saving` may already have been delivered
/// and are only included on request.
pub async fn unsaved_summaries(
    pool: &SqlitePool,
    include_saving: bool,
) -> Result<Vec<SessionSummary>> {
    let rows = sqlx::query_as::<_, (String, String)>(
        r#"
        SELECT id, payload
        FROM   session_summaries
        WHERE  save_state IN ('idle', 'error')
           OR  (?1 AND save_state = 'saving')
        ORDER  BY finished_at
        "#,
    )
    .bind(include_saving)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(id, payload)| {
            let mut summary: SessionSummary = serde_json::from_str(&payload)
                .with_context(|| format!("Corrupt summary payload for session {}", id))?;
            summary.session_id = Uuid::parse_str(&id)?;
            Ok(summary)
        })
        .collect()
}

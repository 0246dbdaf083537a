use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Display;
use uuid::Uuid;

use crate::error::PlayerError;

/// How a single exercise is paced.
/// `time` exercises count down a work interval, `reps` exercises wait for the
/// athlete to confirm each series by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExerciseKind {
    #[serde(rename = "time")]
    Duration,
    #[serde(rename = "reps")]
    Repetition,
}

impl Display for ExerciseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Duration => "time",
            Self::Repetition => "reps",
        };

        write!(f, "{}", s)
    }
}

/// One entry of a training plan, exactly as the recommendation service sends it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanExercise {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "tipo")]
    pub kind: ExerciseKind,
    pub series: u32,
    #[serde(rename = "repeticiones", default)]
    pub reps: Option<String>,
    #[serde(rename = "duracion_seg", default)]
    pub work_secs: Option<u32>,
    #[serde(rename = "descanso_seg", default)]
    pub rest_secs: u32,
    #[serde(rename = "notas", default)]
    pub notes: String,
}

impl PlanExercise {
    /// Work interval length; zero for repetition exercises.
    pub fn work_secs(&self) -> u32 {
        match self.kind {
            ExerciseKind::Duration => self.work_secs.unwrap_or(0),
            ExerciseKind::Repetition => 0,
        }
    }

    /// Short human description of the target, e.g. `3 × 8-10` or `2 × 45s`.
    pub fn target(&self) -> String {
        match self.kind {
            ExerciseKind::Duration => format!("{} × {}s", self.series, self.work_secs()),
            ExerciseKind::Repetition => match self.reps.as_deref() {
                Some(r) if !r.trim().is_empty() => format!("{} × {}", self.series, r),
                _ => format!("{} series", self.series),
            },
        }
    }
}

/// A workout plan. Immutable for the lifetime of a session.
///
/// The raw JSON the plan was parsed from is kept alongside the typed view so
/// the summary can echo the plan back without dropping unknown fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(rename = "titulo", default)]
    pub title: String,
    #[serde(rename = "subtitulo", default)]
    pub subtitle: String,
    #[serde(rename = "fecha", default)]
    pub date: String,
    #[serde(rename = "equipamiento", default)]
    pub equipment: String,
    #[serde(rename = "tipoEntrenamiento", default)]
    pub training_type: String,
    #[serde(rename = "duracion_estimada_min", default)]
    pub estimated_minutes: f64,
    #[serde(rename = "ejercicios", default)]
    pub exercises: Vec<PlanExercise>,

    #[serde(skip)]
    raw: Value,
}

impl Plan {
    pub fn from_value(value: Value) -> Result<Self, PlayerError> {
        let mut plan: Plan = serde_json::from_value(value.clone())?;
        plan.raw = value;
        Ok(plan)
    }

    pub fn from_json(s: &str) -> Result<Self, PlayerError> {
        let value: Value = serde_json::from_str(s)?;
        Self::from_value(value)
    }

    /// The plan as it arrived, or the typed view re-serialised when it was
    /// built in code.
    pub fn to_wire(&self) -> Value {
        if self.raw.is_null() {
            serde_json::to_value(self).unwrap_or(Value::Null)
        } else {
            self.raw.clone()
        }
    }

    /// Rejects plans the player cannot run.
    pub fn validate(&self) -> Result<(), PlayerError> {
        if self.exercises.is_empty() {
            return Err(PlayerError::EmptyPlan);
        }

        for (index, ex) in self.exercises.iter().enumerate() {
            let invalid = |reason: &str| PlayerError::InvalidExercise {
                index,
                name: ex.name.clone(),
                reason: reason.to_string(),
            };

            if ex.series == 0 {
                return Err(invalid("series must be at least 1"));
            }
            if ex.kind == ExerciseKind::Duration && ex.work_secs.unwrap_or(0) == 0 {
                return Err(invalid("timed exercise needs duracion_seg >= 1"));
            }
        }

        Ok(())
    }

    /// Sum of every work and rest interval, in seconds. Repetition series
    /// contribute only their rest.
    pub fn timed_secs(&self) -> u64 {
        self.exercises
            .iter()
            .map(|e| (e.series as u64) * (e.work_secs() as u64 + e.rest_secs as u64))
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStatus {
    Completed,
    Partial,
}

impl Display for SummaryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Completed => "completed",
            Self::Partial => "partial",
        };

        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetrics {
    #[serde(rename = "duracion_estimada_min")]
    pub estimated_minutes: f64,
    #[serde(rename = "duracion_real_seg")]
    pub active_secs: u64,
    #[serde(rename = "total_ejercicios")]
    pub total_exercises: usize,
    #[serde(rename = "completados")]
    pub completed_exercises: usize,
    pub status: SummaryStatus,
}

/// Record of a finished (or abandoned) session, handed to the logging endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    #[serde(skip)]
    pub session_id: Uuid,
    pub user_id: String,
    pub plan: Value,
    pub metrics: SessionMetrics,
    pub series_completed: Vec<u32>,
    /// Epoch milliseconds.
    pub started_at: Option<i64>,
    /// Epoch milliseconds.
    pub finished_at: i64,
}

/// Progress of the summary submission for one session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SaveState {
    #[default]
    Idle,
    Saving,
    Saved,
    Error(String),
}

impl SaveState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Saving => "saving",
            Self::Saved => "saved",
            Self::Error(_) => "error",
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(msg) => Some(msg),
            _ => None,
        }
    }

    /// Rebuilds a state from its stored column pair.
    pub fn from_parts(state: &str, error: Option<String>) -> Self {
        match state {
            "saving" => Self::Saving,
            "saved" => Self::Saved,
            "error" => Self::Error(error.unwrap_or_default()),
            _ => Self::Idle,
        }
    }
}

impl Display for SaveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error(msg) => write!(f, "error ({})", msg),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = r#"{
        "titulo": "Full body",
        "subtitulo": "Day A",
        "fecha": "2024-05-01",
        "equipamiento": "none",
        "tipoEntrenamiento": "hiit",
        "duracion_estimada_min": 20,
        "extra": {"source": "coach"},
        "ejercicios": [
            {"nombre": "Plank", "tipo": "time", "series": 2, "repeticiones": null,
             "duracion_seg": 30, "descanso_seg": 15, "notas": ""},
            {"nombre": "Push-up", "tipo": "reps", "series": 3, "repeticiones": "8-10",
             "duracion_seg": null, "descanso_seg": 60, "notas": "slow"}
        ]
    }"#;

    #[test]
    fn parses_wire_plan() {
        let plan = Plan::from_json(PLAN).unwrap();
        assert_eq!(plan.title, "Full body");
        assert_eq!(plan.training_type, "hiit");
        assert_eq!(plan.exercises.len(), 2);
        assert_eq!(plan.exercises[0].kind, ExerciseKind::Duration);
        assert_eq!(plan.exercises[1].reps.as_deref(), Some("8-10"));
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn wire_plan_keeps_unknown_fields() {
        let plan = Plan::from_json(PLAN).unwrap();
        assert_eq!(plan.to_wire()["extra"]["source"], "coach");
    }

    #[test]
    fn empty_plan_is_rejected() {
        let plan = Plan::from_json(r#"{"titulo": "x", "ejercicios": []}"#).unwrap();
        assert!(matches!(plan.validate(), Err(PlayerError::EmptyPlan)));

        let plan = Plan::from_json(r#"{"titulo": "x"}"#).unwrap();
        assert!(matches!(plan.validate(), Err(PlayerError::EmptyPlan)));
    }

    #[test]
    fn timed_exercise_without_duration_is_rejected() {
        let plan = Plan::from_json(
            r#"{"ejercicios": [{"nombre": "Wall sit", "tipo": "time", "series": 1}]}"#,
        )
        .unwrap();
        match plan.validate() {
            Err(PlayerError::InvalidExercise { index, name, .. }) => {
                assert_eq!(index, 0);
                assert_eq!(name, "Wall sit");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn summary_uses_wire_names() {
        let summary = SessionSummary {
            session_id: Uuid::new_v4(),
            user_id: "u1".into(),
            plan: Value::Null,
            metrics: SessionMetrics {
                estimated_minutes: 20.0,
                active_secs: 61,
                total_exercises: 2,
                completed_exercises: 1,
                status: SummaryStatus::Partial,
            },
            series_completed: vec![2, 1],
            started_at: None,
            finished_at: 1_700_000_000_000,
        };

        let v = serde_json::to_value(&summary).unwrap();
        assert_eq!(v["userId"], "u1");
        assert_eq!(v["metrics"]["duracion_real_seg"], 61);
        assert_eq!(v["metrics"]["completados"], 1);
        assert_eq!(v["metrics"]["status"], "partial");
        assert_eq!(v["seriesCompleted"], serde_json::json!([2, 1]));
        assert!(v["startedAt"].is_null());
        assert!(v.get("sessionId").is_none());
    }

    #[test]
    fn save_state_round_trips_through_columns() {
        let s = SaveState::Error("timeout".into());
        let back = SaveState::from_parts(s.as_str(), s.error_message().map(str::to_string));
        assert_eq!(back, s);
        assert_eq!(SaveState::from_parts("saved", None), SaveState::Saved);
    }
}

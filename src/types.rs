use once_cell::sync::Lazy;
use std::{
    collections::{BTreeMap, HashSet},
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use strsim::jaro_winkler;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::Plan;

pub const USER_ID_KEY: &str = "user.id";
pub const ENDPOINT_KEY: &str = "log.endpoint";
pub const DB_PATH_KEY: &str = "db.path";
pub const TICK_MS_KEY: &str = "tick.ms";

const DEFAULT_DB_PATH: &str = "./tempo.db";
const DEFAULT_USER_ID: &str = "local";

pub static KNOWN_KEYS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| HashSet::from([USER_ID_KEY, ENDPOINT_KEY, DB_PATH_KEY, TICK_MS_KEY]));

/// Flat key/value settings stored as TOML.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Config {
    pub map: BTreeMap<String, String>,
}

impl Config {
    /// `<config dir>/tempo/config`
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|d| d.join("tempo").join("config"))
            .context("Could not determine config directory")
    }

    /// A missing file is an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        let content = toml::to_string(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    pub fn user_id(&self) -> String {
        self.map
            .get(USER_ID_KEY)
            .cloned()
            .unwrap_or_else(|| DEFAULT_USER_ID.to_string())
    }

    pub fn endpoint(&self) -> Option<String> {
        self.map.get(ENDPOINT_KEY).cloned()
    }

    pub fn db_path(&self) -> String {
        self.map
            .get(DB_PATH_KEY)
            .cloned()
            .unwrap_or_else(|| DEFAULT_DB_PATH.to_string())
    }

    /// Falls back to one second when unset or unparsable.
    pub fn tick_period(&self) -> Duration {
        let ms = self
            .map
            .get(TICK_MS_KEY)
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&ms| ms > 0)
            .unwrap_or(1000);
        Duration::from_millis(ms)
    }
}

/// Resolves a jump target typed by the user: a 1-based index or an exercise
/// name. Returns the 0-based index.
pub fn resolve_exercise(plan: &Plan, input: &str) -> Option<usize> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(n) = input.parse::<usize>() {
        return n
            .checked_sub(1)
            .filter(|&i| i < plan.exercises.len());
    }

    let names: Vec<&str> = plan.exercises.iter().map(|e| e.name.as_str()).collect();
    best_exercise_match(input, &names)
}

/// Exact (case-insensitive) name first, then the closest name if similarity
/// is ≥ 0.80 *and* clearly better than the runner-up.
pub fn best_exercise_match(input: &str, names: &[&str]) -> Option<usize> {
    let inp = input.to_lowercase();
    if let Some(i) = names.iter().position(|n| n.to_lowercase() == inp) {
        return Some(i);
    }

    let mut scores: Vec<(usize, f64)> = names
        .iter()
        .enumerate()
        .map(|(i, n)| (i, jaro_winkler(&inp, &n.to_lowercase())))
        .collect();

    // Highest score first.
    scores.sort_by(|a, b| b.1.total_cmp(&a.1));

    let (best, best_score) = *scores.first()?;
    let second_score = scores.get(1).map(|(_, s)| *s).unwrap_or(0.0);

    const MIN_SCORE: f64 = 0.80;
    const GAP: f64 = 0.02;

    if best_score >= MIN_SCORE && best_score - second_score >= GAP {
        Some(best)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> Plan {
        Plan::from_json(
            r#"{"ejercicios": [
                {"nombre": "Jumping Jacks", "tipo": "time", "series": 1, "duracion_seg": 30},
                {"nombre": "Push-up", "tipo": "reps", "series": 3},
                {"nombre": "Plank", "tipo": "time", "series": 2, "duracion_seg": 45}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn resolves_one_based_index() {
        let plan = plan();
        assert_eq!(resolve_exercise(&plan, "1"), Some(0));
        assert_eq!(resolve_exercise(&plan, "3"), Some(2));
        assert_eq!(resolve_exercise(&plan, "0"), None);
        assert_eq!(resolve_exercise(&plan, "4"), None);
    }

    #[test]
    fn resolves_names_loosely() {
        let plan = plan();
        assert_eq!(resolve_exercise(&plan, "plank"), Some(2));
        assert_eq!(resolve_exercise(&plan, "pushup"), Some(1));
        assert_eq!(resolve_exercise(&plan, "burpee"), None);
        assert_eq!(resolve_exercise(&plan, "  "), None);
    }

    #[test]
    fn config_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config");

        let mut cfg = Config::load(&path).unwrap();
        assert!(cfg.map.is_empty());
        assert_eq!(cfg.user_id(), "local");
        assert_eq!(cfg.db_path(), "./tempo.db");
        assert_eq!(cfg.tick_period(), Duration::from_secs(1));

        cfg.map.insert(USER_ID_KEY.into(), "u-42".into());
        cfg.map.insert(ENDPOINT_KEY.into(), "http://localhost:4000/log".into());
        cfg.map.insert(TICK_MS_KEY.into(), "250".into());
        cfg.save(&path).unwrap();

        let back = Config::load(&path).unwrap();
        assert_eq!(back.user_id(), "u-42");
        assert_eq!(back.endpoint().as_deref(), Some("http://localhost:4000/log"));
        assert_eq!(back.tick_period(), Duration::from_millis(250));
    }

    #[test]
    fn bad_tick_value_falls_back() {
        let mut cfg = Config::default();
        cfg.map.insert(TICK_MS_KEY.into(), "fast".into());
        assert_eq!(cfg.tick_period(), Duration::from_secs(1));
    }
}

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use tracing::info;

use crate::error::Result;
use crate::stats::UserStats;
use crate::types::GameSettings;

pub const STATS_FILE: &str = "quiz_stats.json";

/// Everything that survives a restart: the ledger and the player's settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredState {
    pub stats: UserStats,
    pub settings: GameSettings,
}

/// JSON-file persistence for the stats blob.
#[derive(Debug, Clone)]
pub struct StatsStore {
    path: PathBuf,
}

impl StatsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A missing file is a fresh install, not an error.
    pub fn load(&self) -> Result<StoredState> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "no stats file yet, starting fresh");
            return Ok(StoredState::default());
        }
        let file = File::open(&self.path)?;
        Ok(serde_json::from_reader(file)?)
    }

    pub fn save(&self, state: &StoredState) -> Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;
        serde_json::to_writer_pretty(file, state)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::StatsTracker;
    use crate::types::{AnswerRecord, Category, Difficulty, GameSummary};
    use std::path::Path;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("quiz_minigame_{}_{}.json", name, std::process::id()))
    }

    fn summary() -> GameSummary {
        GameSummary {
            score: 25,
            correct_answers: 2,
            total_questions: 3,
            duration_secs: 21.5,
            category: Category::Coaching,
            difficulty: Difficulty::Medium,
            answers: Vec::<AnswerRecord>::new(),
        }
    }

    #[test]
    fn missing_file_loads_defaults() {
        let store = StatsStore::new(temp_path("missing"));
        let state = store.load().unwrap();
        assert_eq!(state.stats.total_games_played, 0);
        assert_eq!(state.settings, GameSettings::default());
    }

    #[test]
    fn stored_state_roundtrips() {
        let path = temp_path("roundtrip");
        let store = StatsStore::new(&path);

        let mut state = StoredState::default();
        state.stats.record_game(&summary(), chrono::Utc::now());
        state.settings.difficulty = Difficulty::Hard;
        store.save(&state).unwrap();

        let loaded = StatsStore::new(&path).load().unwrap();
        assert_eq!(loaded.stats.total_games_played, 1);
        assert_eq!(loaded.stats.best_score, 25);
        assert_eq!(loaded.stats.recent_games.len(), 1);
        assert_eq!(
            loaded.stats.category_stats[&Category::Coaching].games_played,
            1
        );
        assert_eq!(loaded.settings.difficulty, Difficulty::Hard);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn tracker_persists_each_recorded_game() {
        let path = temp_path("tracker");
        std::fs::remove_file(&path).ok();

        let mut tracker = StatsTracker::load(StatsStore::new(&path));
        tracker.apply(&summary()).unwrap();
        assert!(Path::new(&path).exists());

        let reloaded = StatsTracker::load(StatsStore::new(&path));
        assert_eq!(reloaded.stats().total_games_played, 1);
        assert_eq!(reloaded.stats().total_points, 25);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn failed_save_surfaces_but_keeps_the_memory_update() {
        // a directory that does not exist makes the save fail
        let path = std::env::temp_dir()
            .join("quiz_minigame_no_such_dir")
            .join("stats.json");
        let mut tracker = StatsTracker::load(StatsStore::new(path));

        let result = tracker.apply(&summary());
        assert!(result.is_err());
        // the ledger kept the game even though the write failed
        assert_eq!(tracker.stats().total_games_played, 1);
        assert_eq!(tracker.stats().best_score, 25);
    }
}

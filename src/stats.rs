use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::achievements::{self, AchievementDef};
use crate::error::Result;
use crate::storage::{StatsStore, StoredState};
use crate::types::{Category, Difficulty, GameSettings, GameSummary};

pub const RECENT_GAMES_CAP: usize = 20;

const XP_PER_CORRECT: u32 = 10;
const PERFECT_GAME_XP_BONUS: u32 = 50;

/// One finished game as kept in the recent-games history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    pub score: u32,
    pub correct_answers: u32,
    pub total_questions: u32,
    pub category: Category,
    pub difficulty: Difficulty,
    pub duration_secs: f64,
    pub xp_gained: u32,
    pub played_at: DateTime<Utc>,
}

impl GameRecord {
    pub fn is_perfect(&self) -> bool {
        self.total_questions > 0 && self.correct_answers == self.total_questions
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryStats {
    pub games_played: u32,
    pub total_score: u32,
    pub best_score: u32,
    pub correct_answers: u32,
    pub total_questions: u32,
}

impl CategoryStats {
    pub fn accuracy(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        self.correct_answers as f64 / self.total_questions as f64 * 100.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnlockedAchievement {
    pub id: String,
    pub unlocked_at: DateTime<Utc>,
}

/// Level position derived from total XP. Level 1 spans 100 XP and every
/// level's span grows by 100, so the cumulative thresholds run
/// 100, 300, 600, 1000, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelProgress {
    pub level: u32,
    pub xp_into_level: u32,
    pub xp_to_next: u32,
    pub level_span: u32,
}

/// Recomputed from total XP alone on every read, never tracked
/// incrementally, so the stored ledger cannot drift from the curve.
pub fn level_progress(experience_points: u32) -> LevelProgress {
    let mut level = 1;
    let mut span = 100;
    let mut remaining = experience_points;
    while remaining >= span {
        remaining -= span;
        level += 1;
        span += 100;
    }
    LevelProgress {
        level,
        xp_into_level: remaining,
        xp_to_next: span - remaining,
        level_span: span,
    }
}

/// What one recorded game changed, for the result screen.
#[derive(Debug, Clone, Default)]
pub struct GameOutcome {
    pub xp_gained: u32,
    pub new_best: bool,
    pub leveled_up_to: Option<u32>,
    pub unlocked: Vec<&'static AchievementDef>,
}

/// Cross-game aggregate for one player. Counters only; accuracy, average
/// and level are derived on read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserStats {
    pub total_games_played: u32,
    pub best_score: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_points: u32,
    pub total_correct_answers: u32,
    pub total_questions_answered: u32,
    pub experience_points: u32,
    pub category_stats: HashMap<Category, CategoryStats>,
    pub achievements: Vec<UnlockedAchievement>,
    pub recent_games: Vec<GameRecord>,
    #[serde(skip)]
    new_best: bool,
}

impl UserStats {
    pub fn accuracy(&self) -> f64 {
        if self.total_questions_answered == 0 {
            return 0.0;
        }
        self.total_correct_answers as f64 / self.total_questions_answered as f64 * 100.0
    }

    pub fn average_score(&self) -> f64 {
        if self.total_games_played == 0 {
            return 0.0;
        }
        self.total_points as f64 / self.total_games_played as f64
    }

    pub fn level(&self) -> u32 {
        level_progress(self.experience_points).level
    }

    pub fn level_progress(&self) -> LevelProgress {
        level_progress(self.experience_points)
    }

    pub fn has_achievement(&self, id: &str) -> bool {
        self.achievements.iter().any(|a| a.id == id)
    }

    /// Read-once celebration flag, set when a game beats the best score.
    pub fn take_new_best(&mut self) -> bool {
        std::mem::take(&mut self.new_best)
    }

    /// Folds one finished game into the ledger and evaluates achievements
    /// against the updated state.
    pub fn record_game(&mut self, summary: &GameSummary, now: DateTime<Utc>) -> GameOutcome {
        let old_level = self.level();

        self.total_games_played += 1;
        self.total_points += summary.score;
        self.total_correct_answers += summary.correct_answers;
        self.total_questions_answered += summary.total_questions;

        let new_best = summary.score > self.best_score;
        if new_best {
            self.best_score = summary.score;
            self.new_best = true;
        }

        // the streak counts perfect sessions, not correct answers in a row
        let perfect = summary.is_perfect();
        if perfect {
            self.current_streak += 1;
            self.longest_streak = self.longest_streak.max(self.current_streak);
        } else {
            self.current_streak = 0;
        }

        let mut xp = summary.correct_answers * XP_PER_CORRECT;
        if perfect {
            xp += PERFECT_GAME_XP_BONUS;
        }
        let xp_gained = (xp as f64 * summary.difficulty.xp_multiplier()).floor() as u32;
        self.experience_points += xp_gained;

        let level = self.level();
        let leveled_up_to = (level > old_level).then_some(level);
        if let Some(level) = leveled_up_to {
            info!(level, "level up");
        }

        let category = self.category_stats.entry(summary.category).or_default();
        category.games_played += 1;
        category.total_score += summary.score;
        category.correct_answers += summary.correct_answers;
        category.total_questions += summary.total_questions;
        category.best_score = category.best_score.max(summary.score);

        self.recent_games.insert(
            0,
            GameRecord {
                score: summary.score,
                correct_answers: summary.correct_answers,
                total_questions: summary.total_questions,
                category: summary.category,
                difficulty: summary.difficulty,
                duration_secs: summary.duration_secs,
                xp_gained,
                played_at: now,
            },
        );
        self.recent_games.truncate(RECENT_GAMES_CAP);

        let unlocked = self.check_achievements(now);

        GameOutcome {
            xp_gained,
            new_best,
            leveled_up_to,
            unlocked,
        }
    }

    /// Runs every registered predicate against the updated ledger and the
    /// just-recorded game. Unlocks are permanent: an id already in the set
    /// is skipped and its timestamp never changes.
    fn check_achievements(&mut self, now: DateTime<Utc>) -> Vec<&'static AchievementDef> {
        let latest = match self.recent_games.first() {
            Some(record) => record.clone(),
            None => return Vec::new(),
        };
        let mut newly_unlocked = Vec::new();
        for def in achievements::ALL {
            if self.has_achievement(def.id) {
                continue;
            }
            if (def.predicate)(self, &latest) {
                info!(id = def.id, "achievement unlocked");
                self.achievements.push(UnlockedAchievement {
                    id: def.id.to_string(),
                    unlocked_at: now,
                });
                newly_unlocked.push(def);
            }
        }
        newly_unlocked
    }
}

/// Ledger plus its durable copy. Every mutation saves before returning; a
/// failed save surfaces as an error but the in-memory update stands, so at
/// worst the latest game is lost on the next start.
pub struct StatsTracker {
    stats: UserStats,
    settings: GameSettings,
    store: StatsStore,
}

impl StatsTracker {
    /// Loads the persisted ledger, starting fresh when there is none or it
    /// cannot be read.
    pub fn load(store: StatsStore) -> Self {
        let state = match store.load() {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "failed to load stats, starting fresh");
                StoredState::default()
            }
        };
        Self {
            stats: state.stats,
            settings: state.settings,
            store,
        }
    }

    pub fn stats(&self) -> &UserStats {
        &self.stats
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn take_new_best(&mut self) -> bool {
        self.stats.take_new_best()
    }

    pub fn apply(&mut self, summary: &GameSummary) -> Result<GameOutcome> {
        let outcome = self.stats.record_game(summary, Utc::now());
        self.save()?;
        Ok(outcome)
    }

    pub fn update_settings(&mut self, settings: GameSettings) -> Result<()> {
        self.settings = settings;
        self.save()
    }

    pub fn reset(&mut self) -> Result<()> {
        self.stats = UserStats::default();
        self.save()
    }

    fn save(&self) -> Result<()> {
        self.store.save(&StoredState {
            stats: self.stats.clone(),
            settings: self.settings.clone(),
        })
    }
}

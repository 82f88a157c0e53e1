use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_TIME_LIMIT_SECS: u32 = 15;
pub const DEFAULT_QUESTION_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    General,
    Coaching,
    Wellness,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::General, Category::Coaching, Category::Wellness];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Coaching => "coaching",
            Category::Wellness => "wellness",
        }
    }

    /// Lenient parse for user input and backend payloads; unknown strings
    /// are handled by the caller (usually falling back to General).
    pub fn parse(s: &str) -> Option<Category> {
        match s.trim().to_lowercase().as_str() {
            "g" | "gen" | "general" => Some(Category::General),
            "c" | "coach" | "coaching" => Some(Category::Coaching),
            "w" | "well" | "wellness" => Some(Category::Wellness),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn parse(s: &str) -> Option<Difficulty> {
        match s.trim().to_lowercase().as_str() {
            "e" | "easy" => Some(Difficulty::Easy),
            "m" | "med" | "medium" => Some(Difficulty::Medium),
            "h" | "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    pub fn base_points(&self) -> u32 {
        match self {
            Difficulty::Easy => 10,
            Difficulty::Medium => 15,
            Difficulty::Hard => 20,
        }
    }

    pub fn xp_multiplier(&self) -> f64 {
        match self {
            Difficulty::Easy => 1.0,
            Difficulty::Medium => 1.5,
            Difficulty::Hard => 2.0,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One quiz item in canonical form. Remote payloads are normalized into this
/// shape before anything downstream sees them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_option: usize,
    pub category: Category,
    pub difficulty: Difficulty,
    pub explanation: Option<String>,
    pub time_limit_secs: u32,
    pub base_points: u32,
}

impl Question {
    pub fn is_valid(&self) -> bool {
        self.options.len() >= 2 && self.correct_option < self.options.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub category: Category,
    pub difficulty: Difficulty,
    pub question_count: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            category: Category::General,
            difficulty: Difficulty::Medium,
            question_count: DEFAULT_QUESTION_COUNT,
        }
    }
}

/// Outcome of one answered (or timed-out) question. Appended to the session
/// log once and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: String,
    /// None means the countdown expired before any option was picked.
    pub selected: Option<usize>,
    pub is_correct: bool,
    pub points_awarded: u32,
    pub time_to_answer_secs: f64,
    pub answered_at: DateTime<Utc>,
}

/// What a finished session hands to the stats ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSummary {
    pub score: u32,
    pub correct_answers: u32,
    pub total_questions: u32,
    pub duration_secs: f64,
    pub category: Category,
    pub difficulty: Difficulty,
    pub answers: Vec<AnswerRecord>,
}

impl GameSummary {
    pub fn is_perfect(&self) -> bool {
        self.total_questions > 0 && self.correct_answers == self.total_questions
    }
}

/// Display metadata for one category, served by the backend with a bundled
/// fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub id: Category,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    pub sound_enabled: bool,
    pub haptic_enabled: bool,
    pub animations_enabled: bool,
    pub difficulty: Difficulty,
    pub time_per_question: u32,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            haptic_enabled: true,
            animations_enabled: true,
            difficulty: Difficulty::Medium,
            time_per_question: DEFAULT_TIME_LIMIT_SECS,
        }
    }
}

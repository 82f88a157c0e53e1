use crate::stats::{GameRecord, UserStats};

/// One achievement: display metadata plus the unlock predicate. Predicates
/// see the already-updated ledger and the game that was just recorded;
/// per-game checks (perfect_score, speed_demon) look only at that latest
/// game, never back through history.
pub struct AchievementDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub predicate: fn(&UserStats, &GameRecord) -> bool,
}

impl std::fmt::Debug for AchievementDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AchievementDef")
            .field("id", &self.id)
            .finish()
    }
}

fn first_game(stats: &UserStats, _latest: &GameRecord) -> bool {
    stats.total_games_played >= 1
}

fn perfect_score(_stats: &UserStats, latest: &GameRecord) -> bool {
    latest.is_perfect()
}

fn speed_demon(_stats: &UserStats, latest: &GameRecord) -> bool {
    latest.correct_answers >= 5 && latest.duration_secs <= 30.0
}

fn streak_5(stats: &UserStats, _latest: &GameRecord) -> bool {
    stats.longest_streak >= 5
}

fn streak_10(stats: &UserStats, _latest: &GameRecord) -> bool {
    stats.longest_streak >= 10
}

fn level_5(stats: &UserStats, _latest: &GameRecord) -> bool {
    stats.level() >= 5
}

fn level_10(stats: &UserStats, _latest: &GameRecord) -> bool {
    stats.level() >= 10
}

fn games_10(stats: &UserStats, _latest: &GameRecord) -> bool {
    stats.total_games_played >= 10
}

fn games_50(stats: &UserStats, _latest: &GameRecord) -> bool {
    stats.total_games_played >= 50
}

fn high_score_500(stats: &UserStats, _latest: &GameRecord) -> bool {
    stats.best_score >= 500
}

pub static ALL: &[AchievementDef] = &[
    AchievementDef {
        id: "first_game",
        name: "First Game",
        description: "Finish your first game",
        icon: "🎮",
        predicate: first_game,
    },
    AchievementDef {
        id: "perfect_score",
        name: "Flawless",
        description: "Answer every question in a game correctly",
        icon: "🏆",
        predicate: perfect_score,
    },
    AchievementDef {
        id: "speed_demon",
        name: "Lightning",
        description: "Answer 5 questions correctly in under 30 seconds",
        icon: "⚡",
        predicate: speed_demon,
    },
    AchievementDef {
        id: "streak_5",
        name: "Streak x5",
        description: "String together 5 perfect games",
        icon: "🔥",
        predicate: streak_5,
    },
    AchievementDef {
        id: "streak_10",
        name: "Streak x10",
        description: "String together 10 perfect games",
        icon: "🔥🔥",
        predicate: streak_10,
    },
    AchievementDef {
        id: "level_5",
        name: "Seasoned Rookie",
        description: "Reach level 5",
        icon: "⭐",
        predicate: level_5,
    },
    AchievementDef {
        id: "level_10",
        name: "Expert",
        description: "Reach level 10",
        icon: "🌟",
        predicate: level_10,
    },
    AchievementDef {
        id: "games_10",
        name: "Persistent",
        description: "Finish 10 games",
        icon: "💪",
        predicate: games_10,
    },
    AchievementDef {
        id: "games_50",
        name: "Dedicated",
        description: "Finish 50 games",
        icon: "🎯",
        predicate: games_50,
    },
    AchievementDef {
        id: "high_score_500",
        name: "High Scorer",
        description: "Score more than 500 points in a single game",
        icon: "🚀",
        predicate: high_score_500,
    },
];

pub fn find(id: &str) -> Option<&'static AchievementDef> {
    ALL.iter().find(|def| def.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, Difficulty};
    use chrono::Utc;

    fn record(score: u32, correct: u32, total: u32, duration_secs: f64) -> GameRecord {
        GameRecord {
            score,
            correct_answers: correct,
            total_questions: total,
            category: Category::General,
            difficulty: Difficulty::Easy,
            duration_secs,
            xp_gained: 0,
            played_at: Utc::now(),
        }
    }

    #[test]
    fn ids_are_unique() {
        for (i, def) in ALL.iter().enumerate() {
            assert!(
                ALL.iter().skip(i + 1).all(|other| other.id != def.id),
                "duplicate id {}",
                def.id
            );
        }
    }

    #[test]
    fn per_game_predicates_only_see_the_latest_game() {
        let stats = UserStats::default();
        assert!(perfect_score(&stats, &record(20, 2, 2, 10.0)));
        assert!(!perfect_score(&stats, &record(10, 1, 2, 10.0)));
        // an empty game is not perfect
        assert!(!perfect_score(&stats, &record(0, 0, 0, 0.0)));
    }

    #[test]
    fn speed_demon_needs_both_volume_and_pace() {
        let stats = UserStats::default();
        assert!(speed_demon(&stats, &record(50, 5, 5, 30.0)));
        assert!(!speed_demon(&stats, &record(50, 5, 5, 30.1)));
        assert!(!speed_demon(&stats, &record(40, 4, 5, 10.0)));
    }

    #[test]
    fn ledger_predicates_read_the_updated_totals() {
        let mut stats = UserStats::default();
        let latest = record(10, 1, 2, 10.0);
        assert!(!games_10(&stats, &latest));
        stats.total_games_played = 10;
        assert!(games_10(&stats, &latest));

        stats.best_score = 499;
        assert!(!high_score_500(&stats, &latest));
        stats.best_score = 500;
        assert!(high_score_500(&stats, &latest));

        stats.experience_points = 1000; // level 5 starts at 1000 cumulative XP
        assert!(level_5(&stats, &latest));
    }

    #[test]
    fn find_resolves_known_ids() {
        assert_eq!(find("first_game").unwrap().name, "First Game");
        assert!(find("nope").is_none());
    }
}

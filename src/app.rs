use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};
use tokio::runtime::Runtime;
use tracing::{debug, warn};

use crate::api::{ApiClient, LeaderboardEntry};
use crate::error::QuizError;
use crate::game::QuizGame;
use crate::score::Evaluation;
use crate::session::SessionState;
use crate::stats::{GameOutcome, StatsTracker};
use crate::types::{Category, CategoryInfo, Difficulty, GameConfig, GameSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Start,
    Playing,
    Results,
}

/// CLI overrides for the initial game configuration; anything not given
/// falls back to the stored settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartupOptions {
    pub category: Option<Category>,
    pub difficulty: Option<Difficulty>,
    pub question_count: Option<usize>,
}

struct Feedback {
    eval: Evaluation,
    selected: Option<usize>,
    /// Text of the right option, kept because the view has already moved on
    /// to the next question by the time this renders.
    correct_text: Option<String>,
}

pub struct App {
    game: QuizGame,
    tracker: StatsTracker,
    api: Option<ApiClient>,
    catalog: Vec<CategoryInfo>,
    screen: Screen,
    config: GameConfig,
    feedback: Option<Feedback>,
    outcome: Option<GameOutcome>,
    last_summary: Option<GameSummary>,
    leaderboard: Vec<LeaderboardEntry>,
    celebrate: bool,
    status: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        game: QuizGame,
        tracker: StatsTracker,
        api: Option<ApiClient>,
        catalog: Vec<CategoryInfo>,
        options: StartupOptions,
    ) -> Self {
        let config = GameConfig {
            category: options.category.unwrap_or_default(),
            difficulty: options
                .difficulty
                .unwrap_or(tracker.settings().difficulty),
            question_count: options
                .question_count
                .unwrap_or(GameConfig::default().question_count),
        };
        Self {
            game,
            tracker,
            api,
            catalog,
            screen: Screen::Start,
            config,
            feedback: None,
            outcome: None,
            last_summary: None,
            leaderboard: Vec::new(),
            celebrate: false,
            status: None,
            should_quit: false,
        }
    }

    pub fn handle_key(&mut self, rt: &Runtime, key: KeyEvent) {
        match self.screen {
            Screen::Start => match key.code {
                KeyCode::Enter => self.start_game(rt),
                KeyCode::Char('c') => {
                    self.config.category = next_category(self.config.category);
                }
                KeyCode::Char('d') => {
                    self.config.difficulty = next_difficulty(self.config.difficulty);
                    let mut settings = self.tracker.settings().clone();
                    settings.difficulty = self.config.difficulty;
                    if let Err(e) = self.tracker.update_settings(settings) {
                        warn!(error = %e, "failed to save settings");
                    }
                }
                KeyCode::Char('+') => {
                    self.config.question_count = (self.config.question_count + 1).min(20);
                }
                KeyCode::Char('-') => {
                    self.config.question_count = self.config.question_count.saturating_sub(1).max(1);
                }
                KeyCode::Char('R') => {
                    if let Err(e) = self.tracker.reset() {
                        warn!(error = %e, "failed to reset stats");
                    }
                    self.status = Some("Statistics reset".to_string());
                }
                KeyCode::Esc => self.should_quit = true,
                _ => {}
            },
            Screen::Playing => match key.code {
                KeyCode::Char(c @ '1'..='9') => {
                    let index = (c as usize) - ('1' as usize);
                    self.submit(rt, index);
                }
                KeyCode::Esc => {
                    self.game.abandon();
                    self.feedback = None;
                    self.screen = Screen::Start;
                }
                _ => {}
            },
            Screen::Results => match key.code {
                KeyCode::Enter => self.start_game(rt),
                KeyCode::Char('m') => self.screen = Screen::Start,
                KeyCode::Esc | KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            },
        }
    }

    /// Called from the host tick: fires the countdown when it has expired.
    pub fn tick(&mut self, rt: &Runtime) {
        if self.screen != Screen::Playing {
            return;
        }
        let current = self.game.view().question;
        match rt.block_on(self.game.poll_timeout(Utc::now())) {
            Ok(Some(eval)) => {
                let correct_text =
                    current.and_then(|q| q.options.get(eval.correct_option).cloned());
                self.feedback = Some(Feedback {
                    eval,
                    selected: None,
                    correct_text,
                });
                self.maybe_finish(rt);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "countdown handling failed"),
        }
    }

    fn start_game(&mut self, rt: &Runtime) {
        self.status = None;
        self.feedback = None;
        self.outcome = None;
        self.last_summary = None;
        self.leaderboard = Vec::new();
        self.celebrate = false;
        match rt.block_on(self.game.start(self.config)) {
            Ok(()) => self.screen = Screen::Playing,
            Err(QuizError::NoQuestionsAvailable) => {
                self.status = Some(
                    "No questions could be loaded. Press Enter to try again.".to_string(),
                );
                self.screen = Screen::Start;
            }
            Err(e) => {
                warn!(error = %e, "failed to start game");
                self.status = Some(format!("Could not start the game: {e}"));
                self.screen = Screen::Start;
            }
        }
    }

    fn submit(&mut self, rt: &Runtime, index: usize) {
        let current = self.game.view().question;
        let in_range = current
            .as_ref()
            .map(|q| index < q.options.len())
            .unwrap_or(false);
        if !in_range {
            return;
        }
        match rt.block_on(self.game.submit_answer(Some(index))) {
            Ok(eval) => {
                let correct_text =
                    current.and_then(|q| q.options.get(eval.correct_option).cloned());
                self.feedback = Some(Feedback {
                    eval,
                    selected: Some(index),
                    correct_text,
                });
                self.maybe_finish(rt);
            }
            // the countdown beat the keypress; the timeout already counted
            Err(QuizError::AlreadyAnswered(i)) => debug!(index = i, "late answer ignored"),
            Err(e) => warn!(error = %e, "failed to submit answer"),
        }
    }

    fn maybe_finish(&mut self, rt: &Runtime) {
        if self.game.view().state != SessionState::Finished {
            return;
        }
        match self.game.summary() {
            Ok(summary) => {
                match self.tracker.apply(&summary) {
                    Ok(outcome) => self.outcome = Some(outcome),
                    Err(e) => {
                        warn!(error = %e, "stats could not be persisted");
                        self.status = Some("Stats could not be saved to disk".to_string());
                    }
                }
                self.celebrate = self.tracker.take_new_best();
                if let Some(api) = &self.api {
                    self.leaderboard =
                        rt.block_on(api.fetch_leaderboard(Some(summary.category), "weekly"));
                }
                self.last_summary = Some(summary);
                self.screen = Screen::Results;
            }
            Err(e) => warn!(error = %e, "finished game without a summary"),
        }
    }

    pub fn render(&self, f: &mut Frame) {
        match self.screen {
            Screen::Start => self.render_start(f),
            Screen::Playing => self.render_playing(f),
            Screen::Results => self.render_results(f),
        }
    }

    fn render_start(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(5), // title + config
                Constraint::Length(3), // level gauge
                Constraint::Min(8),    // stats + achievements
                Constraint::Length(3), // help / status
            ])
            .split(f.area());

        let mut title_lines = vec![
            Line::from(Span::styled(
                "Quiz Minigame",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(format!(
                "category: {} | difficulty: {} | questions: {}",
                self.config.category, self.config.difficulty, self.config.question_count
            )),
        ];
        if let Some(info) = self
            .catalog
            .iter()
            .find(|info| info.id == self.config.category)
        {
            title_lines.push(Line::from(format!(
                "{} {} - {}",
                info.icon, info.name, info.description
            )));
        }
        let title = Paragraph::new(title_lines)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(title, chunks[0]);

        let progress = self.tracker.stats().level_progress();
        let gauge = Gauge::default()
            .block(
                Block::default()
                    .title(format!("Level {}", progress.level))
                    .borders(Borders::ALL),
            )
            .gauge_style(Style::default().fg(Color::Magenta))
            .ratio(progress.xp_into_level as f64 / progress.level_span as f64)
            .label(format!(
                "{} / {} XP",
                progress.xp_into_level, progress.level_span
            ));
        f.render_widget(gauge, chunks[1]);

        self.render_ledger(f, chunks[2]);

        let help = match &self.status {
            Some(status) => Line::from(Span::styled(
                status.as_str(),
                Style::default().fg(Color::Yellow),
            )),
            None => Line::from(
                "Enter to play | c category | d difficulty | +/- questions | R reset | ESC quit",
            ),
        };
        f.render_widget(
            Paragraph::new(help).block(Block::default().borders(Borders::ALL)),
            chunks[3],
        );
    }

    fn render_ledger(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let stats = self.tracker.stats();
        let mut lines = vec![
            Line::from(format!("Games played: {}", stats.total_games_played)),
            Line::from(format!("Best score: {}", stats.best_score)),
            Line::from(format!(
                "Streak: {} (longest {})",
                stats.current_streak, stats.longest_streak
            )),
            Line::from(format!("Accuracy: {:.1}%", stats.accuracy())),
            Line::from(format!("Average score: {:.1}", stats.average_score())),
            Line::from(format!("Total XP: {}", stats.experience_points)),
        ];
        for (category, cat_stats) in &stats.category_stats {
            lines.push(Line::from(format!(
                "  {}: {} games, best {}, {:.0}%",
                category,
                cat_stats.games_played,
                cat_stats.best_score,
                cat_stats.accuracy()
            )));
        }
        f.render_widget(
            Paragraph::new(lines).block(Block::default().title("Stats").borders(Borders::ALL)),
            chunks[0],
        );

        let mut lines = vec![Line::from(format!(
            "{} of {} unlocked",
            stats.achievements.len(),
            crate::achievements::ALL.len()
        ))];
        for unlocked in &stats.achievements {
            if let Some(def) = crate::achievements::find(&unlocked.id) {
                lines.push(Line::from(format!("{} {}", def.icon, def.name)));
            }
        }
        f.render_widget(
            Paragraph::new(lines)
                .block(Block::default().title("Achievements").borders(Borders::ALL)),
            chunks[1],
        );
    }

    fn render_playing(&self, f: &mut Frame) {
        let view = self.game.view();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // header
                Constraint::Length(3), // countdown
                Constraint::Min(6),    // question + options
                Constraint::Length(5), // feedback for the previous answer
            ])
            .split(f.area());

        let header = Paragraph::new(Line::from(format!(
            "Question {} of {} | Score: {}",
            view.question_number, view.total_questions, view.score
        )))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);
        f.render_widget(header, chunks[0]);

        if let Some(question) = &view.question {
            let remaining = view.secs_remaining(Utc::now());
            let limit = question.time_limit_secs as f64;
            let ratio = if limit > 0.0 {
                (remaining / limit).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let color = if remaining < 5.0 {
                Color::Red
            } else {
                Color::Green
            };
            let gauge = Gauge::default()
                .block(Block::default().title("Time").borders(Borders::ALL))
                .gauge_style(Style::default().fg(color))
                .ratio(ratio)
                .label(format!("{remaining:.0}s"));
            f.render_widget(gauge, chunks[1]);

            let mut lines = vec![
                Line::from(Span::styled(
                    question.prompt.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
            ];
            for (i, option) in question.options.iter().enumerate() {
                lines.push(Line::from(format!("  {}. {}", i + 1, option)));
            }
            f.render_widget(
                Paragraph::new(lines).block(
                    Block::default()
                        .title(format!("+{} points", question.base_points))
                        .borders(Borders::ALL),
                ),
                chunks[2],
            );
        }

        self.render_feedback(f, chunks[3]);
    }

    fn render_feedback(&self, f: &mut Frame, area: Rect) {
        let lines = match &self.feedback {
            Some(feedback) if feedback.eval.is_correct => {
                let bonus = if feedback.eval.time_bonus {
                    " (speed bonus!)"
                } else {
                    ""
                };
                vec![Line::from(Span::styled(
                    format!("Correct! +{} points{}", feedback.eval.points_awarded, bonus),
                    Style::default().fg(Color::Green),
                ))]
            }
            Some(feedback) => {
                let verdict = match (feedback.selected, &feedback.correct_text) {
                    (Some(_), Some(text)) => format!("Wrong, the answer was: {text}"),
                    (None, Some(text)) => format!("Time is up, the answer was: {text}"),
                    (Some(_), None) => "Wrong answer".to_string(),
                    (None, None) => "Time is up".to_string(),
                };
                let mut lines = vec![Line::from(Span::styled(
                    verdict,
                    Style::default().fg(Color::Red),
                ))];
                if let Some(explanation) = &feedback.eval.explanation {
                    lines.push(Line::from(explanation.clone()));
                }
                lines
            }
            None => vec![Line::from("Press 1-9 to answer | ESC to abandon")],
        };
        f.render_widget(
            Paragraph::new(lines).block(Block::default().borders(Borders::ALL)),
            area,
        );
    }

    fn render_results(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(10), // headline numbers
                Constraint::Min(6),     // per-question review
                Constraint::Length(3),  // help
            ])
            .split(f.area());

        let mut lines = Vec::new();
        if let Some(summary) = &self.last_summary {
            if self.celebrate {
                lines.push(Line::from(Span::styled(
                    "🎉 New best score!",
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )));
            }
            lines.push(Line::from(format!(
                "Score: {} | Correct: {} of {} | Time: {:.0}s",
                summary.score,
                summary.correct_answers,
                summary.total_questions,
                summary.duration_secs
            )));
        }
        if let Some(outcome) = &self.outcome {
            lines.push(Line::from(format!("XP gained: {}", outcome.xp_gained)));
            if let Some(level) = outcome.leveled_up_to {
                lines.push(Line::from(Span::styled(
                    format!("Level up! You are now level {level}"),
                    Style::default().fg(Color::Magenta),
                )));
            }
            for def in &outcome.unlocked {
                lines.push(Line::from(format!(
                    "Achievement unlocked: {} {}",
                    def.icon, def.name
                )));
            }
        }
        if !self.leaderboard.is_empty() {
            lines.push(Line::from("Weekly top:"));
            for (i, entry) in self.leaderboard.iter().take(3).enumerate() {
                lines.push(Line::from(format!(
                    "{}. {} ({})",
                    i + 1,
                    entry.username,
                    entry.score
                )));
            }
        }
        if let Some(status) = &self.status {
            lines.push(Line::from(Span::styled(
                status.as_str(),
                Style::default().fg(Color::Yellow),
            )));
        }
        f.render_widget(
            Paragraph::new(lines)
                .block(Block::default().title("Results").borders(Borders::ALL))
                .alignment(Alignment::Center),
            chunks[0],
        );

        let mut lines = Vec::new();
        if let Some(summary) = &self.last_summary {
            for (i, answer) in summary.answers.iter().enumerate() {
                let (mark, color) = if answer.is_correct {
                    ("✓", Color::Green)
                } else {
                    ("✗", Color::Red)
                };
                let selected = match answer.selected {
                    Some(index) => format!("option {}", index + 1),
                    None => "no answer".to_string(),
                };
                lines.push(Line::from(vec![
                    Span::styled(format!("{mark} "), Style::default().fg(color)),
                    Span::raw(format!(
                        "Q{}: {} (+{}, {:.1}s)",
                        i + 1,
                        selected,
                        answer.points_awarded,
                        answer.time_to_answer_secs
                    )),
                ]));
            }
        }
        f.render_widget(
            Paragraph::new(lines).block(Block::default().title("Answers").borders(Borders::ALL)),
            chunks[1],
        );

        f.render_widget(
            Paragraph::new(Line::from("Enter to play again | m menu | ESC quit"))
                .block(Block::default().borders(Borders::ALL)),
            chunks[2],
        );
    }
}

fn next_category(current: Category) -> Category {
    let all = Category::ALL;
    let index = all.iter().position(|c| *c == current).unwrap_or(0);
    all[(index + 1) % all.len()]
}

fn next_difficulty(current: Difficulty) -> Difficulty {
    let all = Difficulty::ALL;
    let index = all.iter().position(|d| *d == current).unwrap_or(0);
    all[(index + 1) % all.len()]
}

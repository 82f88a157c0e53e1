use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::error::{QuizError, Result};
use crate::questions::QuestionSource;
use crate::score::Evaluation;
use crate::session::{QuizSession, SessionState};
use crate::types::{AnswerRecord, GameConfig, GameSummary, Question};

/// The countdown armed for the question currently on screen. Re-armed on
/// every advance and cleared when the session leaves the question, so a
/// pending expiry for question N can never hit question N+1.
#[derive(Debug, Clone, Copy)]
struct ArmedCountdown {
    index: usize,
    presented_at: DateTime<Utc>,
    deadline: DateTime<Utc>,
}

/// Read-only view handed to presentation code after every mutation.
#[derive(Debug, Clone)]
pub struct GameView {
    pub state: SessionState,
    pub question: Option<Question>,
    pub question_number: usize,
    pub total_questions: usize,
    pub score: u32,
    pub deadline: Option<DateTime<Utc>>,
    pub last_answer: Option<AnswerRecord>,
}

impl GameView {
    pub fn secs_remaining(&self, now: DateTime<Utc>) -> f64 {
        match self.deadline {
            Some(deadline) => ((deadline - now).num_milliseconds() as f64 / 1000.0).max(0.0),
            None => 0.0,
        }
    }
}

/// Drives one session end to end: fetches questions, serializes answer and
/// timeout submissions against the same question, owns the per-question
/// countdown, and reports the finished summary to the backend (best effort).
///
/// All mutations go through `&mut self`, which keeps `start`, answers and
/// expiries on a single logical timeline; the host invokes `poll_timeout`
/// from its timer facility.
pub struct QuizGame {
    source: QuestionSource,
    api: Option<ApiClient>,
    session: QuizSession,
    armed: Option<ArmedCountdown>,
}

impl QuizGame {
    pub fn new(source: QuestionSource, api: Option<ApiClient>) -> Self {
        Self {
            source,
            api,
            session: QuizSession::new(GameConfig::default()),
            armed: None,
        }
    }

    /// Fetches questions and presents the first one. Valid from a fresh
    /// driver or after a finished/abandoned game; a failed start leaves the
    /// driver ready for another attempt.
    pub async fn start(&mut self, config: GameConfig) -> Result<()> {
        if self.session.state() == SessionState::AwaitingAnswer {
            return Err(QuizError::InvalidTransition(
                "start is not valid during an active session",
            ));
        }
        let mut session = QuizSession::new(config);
        let questions = self.source.fetch(&config).await;
        session.begin(questions)?;
        self.session = session;
        self.arm_current();
        Ok(())
    }

    /// Drops an in-flight game, countdown included.
    pub fn abandon(&mut self) {
        self.session = QuizSession::new(*self.session.config());
        self.armed = None;
    }

    /// Submits the tapped option for the current question. Elapsed time is
    /// measured from when the question was presented.
    pub async fn submit_answer(&mut self, selected: Option<usize>) -> Result<Evaluation> {
        let now = Utc::now();
        let elapsed = match self.armed {
            Some(armed) => ((now - armed.presented_at).num_milliseconds() as f64 / 1000.0).max(0.0),
            None => 0.0,
        };
        let eval = self.session.submit_answer(selected, elapsed)?;
        self.after_submission().await;
        Ok(eval)
    }

    /// Fires the countdown if it has expired. The host calls this from its
    /// timer facility; expiries are swallowed when the question was already
    /// answered, so re-renders cannot double-submit.
    pub async fn poll_timeout(&mut self, now: DateTime<Utc>) -> Result<Option<Evaluation>> {
        let armed = match self.armed {
            Some(armed) if now >= armed.deadline => armed,
            _ => return Ok(None),
        };
        // stale expiry for a question the session has moved past
        if self.session.state() != SessionState::AwaitingAnswer
            || armed.index != self.session.current_index()
        {
            self.armed = None;
            return Ok(None);
        }
        debug!(index = armed.index, "countdown expired");
        let eval = self.session.timeout()?;
        self.after_submission().await;
        Ok(Some(eval))
    }

    pub fn summary(&self) -> Result<GameSummary> {
        self.session.summary()
    }

    pub fn view(&self) -> GameView {
        GameView {
            state: self.session.state(),
            question: self.session.current_question().cloned(),
            question_number: self.session.current_index() + 1,
            total_questions: self.session.question_count(),
            score: self.session.score(),
            deadline: self.armed.map(|a| a.deadline),
            last_answer: self.session.answer_log().last().cloned(),
        }
    }

    async fn after_submission(&mut self) {
        match self.session.state() {
            SessionState::AwaitingAnswer => self.arm_current(),
            SessionState::Finished => {
                self.armed = None;
                self.report_finished().await;
            }
            SessionState::NotStarted => self.armed = None,
        }
    }

    fn arm_current(&mut self) {
        let limit = self
            .session
            .current_question()
            .map(|q| q.time_limit_secs as i64)
            .unwrap_or_default();
        let now = Utc::now();
        self.armed = Some(ArmedCountdown {
            index: self.session.current_index(),
            presented_at: now,
            deadline: now + Duration::seconds(limit),
        });
    }

    /// Best-effort stats upload, spawned so the result screen never waits on
    /// the network.
    async fn report_finished(&mut self) {
        let api = match &self.api {
            Some(api) => api.clone(),
            None => return,
        };
        match self.session.summary() {
            Ok(summary) => {
                tokio::spawn(async move { api.submit_stats(&summary).await });
            }
            Err(e) => warn!(error = %e, "finished session without a summary"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{RawQuestion, RemoteQuestions};
    use crate::types::{Category, Difficulty};
    use async_trait::async_trait;

    struct CannedRemote(Vec<serde_json::Value>);

    #[async_trait]
    impl RemoteQuestions for CannedRemote {
        async fn fetch_questions(
            &self,
            _category: Category,
            _difficulty: Difficulty,
            _count: usize,
        ) -> Result<Vec<RawQuestion>> {
            Ok(self
                .0
                .iter()
                .cloned()
                .map(|v| serde_json::from_value(v).unwrap())
                .collect())
        }
    }

    fn two_known_questions() -> Box<CannedRemote> {
        Box::new(CannedRemote(vec![
            serde_json::json!({
                "id": "k1",
                "question": "First?",
                "options": ["right", "wrong"],
                "correctAnswer": 0,
                "category": "general",
                "difficulty": "easy"
            }),
            serde_json::json!({
                "id": "k2",
                "question": "Second?",
                "options": ["right", "wrong"],
                "correctAnswer": 0,
                "category": "general",
                "difficulty": "easy"
            }),
        ]))
    }

    #[tokio::test]
    async fn start_presents_the_first_question_and_arms_the_countdown() {
        let mut game = QuizGame::new(QuestionSource::new(two_known_questions()), None);
        game.start(GameConfig {
            category: Category::General,
            difficulty: Difficulty::Easy,
            question_count: 2,
        })
        .await
        .unwrap();

        let view = game.view();
        assert_eq!(view.state, SessionState::AwaitingAnswer);
        assert_eq!(view.question_number, 1);
        assert_eq!(view.total_questions, 2);
        assert_eq!(view.question.as_ref().unwrap().id, "k1");
        assert!(view.deadline.is_some());
        assert!(view.secs_remaining(Utc::now()) > 10.0);
    }

    #[tokio::test]
    async fn start_during_an_active_session_is_rejected() {
        let mut game = QuizGame::new(QuestionSource::new(two_known_questions()), None);
        let config = GameConfig {
            category: Category::General,
            difficulty: Difficulty::Easy,
            question_count: 2,
        };
        game.start(config).await.unwrap();
        assert!(matches!(
            game.start(config).await,
            Err(QuizError::InvalidTransition(_))
        ));
    }

    /// Distinct time limits, so the two questions' deadlines cannot coincide.
    fn staggered_questions() -> Box<CannedRemote> {
        Box::new(CannedRemote(vec![
            serde_json::json!({
                "id": "k1",
                "question": "First?",
                "options": ["right", "wrong"],
                "correctAnswer": 0,
                "timeLimit": 15
            }),
            serde_json::json!({
                "id": "k2",
                "question": "Second?",
                "options": ["right", "wrong"],
                "correctAnswer": 0,
                "timeLimit": 120
            }),
        ]))
    }

    #[tokio::test]
    async fn answering_rearms_the_countdown_for_the_next_question() {
        let mut game = QuizGame::new(QuestionSource::new(staggered_questions()), None);
        game.start(GameConfig {
            category: Category::General,
            difficulty: Difficulty::Easy,
            question_count: 2,
        })
        .await
        .unwrap();

        let first_deadline = game.view().deadline.unwrap();
        game.submit_answer(Some(0)).await.unwrap();
        let view = game.view();
        assert_eq!(view.question_number, 2);
        assert!(view.deadline.unwrap() > first_deadline);

        // past question 1's deadline but far from question 2's: had the old
        // countdown survived the answer, this would fire
        let probe = first_deadline + Duration::seconds(1);
        let fired = game.poll_timeout(probe).await.unwrap();
        assert!(fired.is_none());
        assert_eq!(game.view().question_number, 2);
    }

    #[tokio::test]
    async fn expired_countdown_submits_a_timeout_exactly_once() {
        let mut game = QuizGame::new(QuestionSource::new(staggered_questions()), None);
        game.start(GameConfig {
            category: Category::General,
            difficulty: Difficulty::Easy,
            question_count: 2,
        })
        .await
        .unwrap();

        let past_deadline = game.view().deadline.unwrap() + Duration::seconds(1);
        let eval = game.poll_timeout(past_deadline).await.unwrap().unwrap();
        assert!(!eval.is_correct);
        assert_eq!(game.view().question_number, 2);

        // same instant again: question 2's much longer countdown is still live
        let again = game.poll_timeout(past_deadline).await.unwrap();
        assert!(again.is_none());
        assert_eq!(game.view().last_answer.as_ref().unwrap().question_id, "k1");
    }

    #[tokio::test]
    async fn full_game_reaches_finished_with_the_expected_score() {
        let mut game = QuizGame::new(QuestionSource::new(two_known_questions()), None);
        game.start(GameConfig {
            category: Category::General,
            difficulty: Difficulty::Easy,
            question_count: 2,
        })
        .await
        .unwrap();

        // answered immediately, so the speed bonus applies: floor(10 * 1.5)
        game.submit_answer(Some(0)).await.unwrap();
        game.submit_answer(Some(1)).await.unwrap();

        let view = game.view();
        assert_eq!(view.state, SessionState::Finished);
        assert!(view.deadline.is_none());
        let summary = game.summary().unwrap();
        assert_eq!(summary.score, 15);
        assert_eq!(summary.correct_answers, 1);
        assert_eq!(summary.total_questions, 2);

        // folding the finished game into a fresh ledger
        let mut stats = crate::stats::UserStats::default();
        let outcome = stats.record_game(&summary, Utc::now());
        assert_eq!(stats.total_games_played, 1);
        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.experience_points, 10);
        assert_eq!(outcome.xp_gained, 10);
    }
}

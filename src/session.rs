use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{QuizError, Result};
use crate::score::{self, Evaluation};
use crate::types::{AnswerRecord, GameConfig, GameSummary, Question};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    AwaitingAnswer,
    Finished,
}

/// One quiz playthrough. The session owns all mutable game state and moves
/// strictly forward: NotStarted -> AwaitingAnswer (once per question, with an
/// advancing index) -> Finished. Calls that do not fit the current state are
/// errors, not no-ops; they indicate a host integration bug.
///
/// Invariants held between calls: `answer_log.len() == current_index` until
/// the session is finished, `answer_log.len() == questions.len()` once it is,
/// and `score` is always the sum of the logged points.
#[derive(Debug)]
pub struct QuizSession {
    config: GameConfig,
    questions: Vec<Question>,
    current_index: usize,
    score: u32,
    answer_log: Vec<AnswerRecord>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    state: SessionState,
}

impl QuizSession {
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            questions: Vec::new(),
            current_index: 0,
            score: 0,
            answer_log: Vec::new(),
            started_at: None,
            ended_at: None,
            state: SessionState::NotStarted,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn answer_log(&self) -> &[AnswerRecord] {
        &self.answer_log
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.state {
            SessionState::AwaitingAnswer => self.questions.get(self.current_index),
            _ => None,
        }
    }

    /// Accepts the fetched question set and presents the first question.
    /// An empty set leaves the session in NotStarted so the caller can retry
    /// with a fresh fetch.
    pub fn begin(&mut self, questions: Vec<Question>) -> Result<()> {
        if self.state != SessionState::NotStarted {
            return Err(QuizError::InvalidTransition(
                "begin is only valid before the session starts",
            ));
        }
        if questions.is_empty() {
            return Err(QuizError::NoQuestionsAvailable);
        }
        info!(
            count = questions.len(),
            category = %self.config.category,
            difficulty = %self.config.difficulty,
            "session started"
        );
        self.questions = questions;
        self.started_at = Some(Utc::now());
        self.state = SessionState::AwaitingAnswer;
        Ok(())
    }

    /// Scores the current question, appends the record and advances. A second
    /// submission for the same question is rejected: a countdown expiry and a
    /// late tap can race, and only the first may count.
    pub fn submit_answer(
        &mut self,
        selected: Option<usize>,
        time_to_answer_secs: f64,
    ) -> Result<Evaluation> {
        if self.state != SessionState::AwaitingAnswer {
            return Err(QuizError::InvalidTransition(
                "submit_answer requires an active question",
            ));
        }
        if self.answer_log.len() > self.current_index {
            return Err(QuizError::AlreadyAnswered(self.current_index));
        }

        let question = &self.questions[self.current_index];
        let eval = score::evaluate(question, selected, time_to_answer_secs);
        debug!(
            index = self.current_index,
            correct = eval.is_correct,
            points = eval.points_awarded,
            "answer recorded"
        );

        self.answer_log.push(AnswerRecord {
            question_id: question.id.clone(),
            selected,
            is_correct: eval.is_correct,
            points_awarded: eval.points_awarded,
            time_to_answer_secs,
            answered_at: Utc::now(),
        });
        self.score += eval.points_awarded;

        if self.answer_log.len() == self.questions.len() {
            self.ended_at = Some(Utc::now());
            self.state = SessionState::Finished;
            info!(score = self.score, "session finished");
        } else {
            self.current_index += 1;
        }
        Ok(eval)
    }

    /// Auto-submission for an expired countdown: incorrect, with the full
    /// time limit as the elapsed time. The double-submission guard in
    /// `submit_answer` makes this fire at most once per question.
    pub fn timeout(&mut self) -> Result<Evaluation> {
        let limit = match self.current_question() {
            Some(q) => q.time_limit_secs as f64,
            None => {
                return Err(QuizError::InvalidTransition(
                    "timeout requires an active question",
                ))
            }
        };
        self.submit_answer(None, limit)
    }

    pub fn summary(&self) -> Result<GameSummary> {
        if self.state != SessionState::Finished {
            return Err(QuizError::InvalidTransition(
                "summary is only valid once the session is finished",
            ));
        }
        let correct_answers = self.answer_log.iter().filter(|a| a.is_correct).count() as u32;
        let duration_secs = match (self.started_at, self.ended_at) {
            (Some(started), Some(ended)) => (ended - started).num_milliseconds() as f64 / 1000.0,
            _ => 0.0,
        };
        Ok(GameSummary {
            score: self.score,
            correct_answers,
            total_questions: self.questions.len() as u32,
            duration_secs,
            category: self.config.category,
            difficulty: self.config.difficulty,
            answers: self.answer_log.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, Difficulty};

    fn questions(n: usize) -> Vec<Question> {
        (0..n)
            .map(|i| Question {
                id: format!("q{i}"),
                prompt: format!("prompt {i}"),
                options: vec!["a".to_string(), "b".to_string()],
                correct_option: 0,
                category: Category::General,
                difficulty: Difficulty::Easy,
                explanation: None,
                time_limit_secs: 15,
                base_points: 10,
            })
            .collect()
    }

    fn started(n: usize) -> QuizSession {
        let mut session = QuizSession::new(GameConfig::default());
        session.begin(questions(n)).unwrap();
        session
    }

    #[test]
    fn begin_with_no_questions_stays_not_started() {
        let mut session = QuizSession::new(GameConfig::default());
        assert!(matches!(
            session.begin(Vec::new()),
            Err(QuizError::NoQuestionsAvailable)
        ));
        assert_eq!(session.state(), SessionState::NotStarted);
        // the caller may retry
        session.begin(questions(1)).unwrap();
        assert_eq!(session.state(), SessionState::AwaitingAnswer);
    }

    #[test]
    fn submit_before_begin_is_an_error() {
        let mut session = QuizSession::new(GameConfig::default());
        assert!(matches!(
            session.submit_answer(Some(0), 1.0),
            Err(QuizError::InvalidTransition(_))
        ));
    }

    #[test]
    fn answer_log_tracks_current_index_until_finished() {
        let mut session = started(3);
        for expected in 0..3 {
            assert_eq!(session.current_index(), expected);
            assert_eq!(session.answer_log().len(), expected);
            session.submit_answer(Some(0), 6.0).unwrap();
        }
        assert_eq!(session.state(), SessionState::Finished);
        assert_eq!(session.answer_log().len(), 3);
    }

    #[test]
    fn score_is_the_sum_of_logged_points() {
        let mut session = started(3);
        session.submit_answer(Some(0), 2.0).unwrap(); // 15 with bonus
        session.submit_answer(Some(1), 6.0).unwrap(); // 0
        session.submit_answer(Some(0), 6.0).unwrap(); // 10
        let logged: u32 = session
            .answer_log()
            .iter()
            .map(|a| a.points_awarded)
            .sum();
        assert_eq!(session.score(), logged);
        assert_eq!(session.score(), 25);
    }

    #[test]
    fn double_submission_is_rejected() {
        let mut session = started(1);
        session.submit_answer(Some(0), 1.0).unwrap();
        // the session is finished now, so the guard trips on the state first
        assert!(session.submit_answer(Some(0), 1.0).is_err());

        let mut session = started(2);
        session.submit_answer(Some(0), 1.0).unwrap();
        // index advanced, answering again is fine
        session.submit_answer(Some(1), 1.0).unwrap();
        assert_eq!(session.state(), SessionState::Finished);
    }

    #[test]
    fn timeout_records_an_incorrect_answer_with_the_full_limit() {
        let mut session = started(1);
        let eval = session.timeout().unwrap();
        assert!(!eval.is_correct);
        let record = &session.answer_log()[0];
        assert_eq!(record.selected, None);
        assert_eq!(record.time_to_answer_secs, 15.0);
        assert_eq!(record.points_awarded, 0);
    }

    #[test]
    fn summary_requires_a_finished_session() {
        let mut session = started(2);
        assert!(session.summary().is_err());
        session.submit_answer(Some(0), 1.0).unwrap();
        session.submit_answer(None, 15.0).unwrap();
        let summary = session.summary().unwrap();
        assert_eq!(summary.total_questions, 2);
        assert_eq!(summary.correct_answers, 1);
        assert_eq!(summary.score, 15);
        assert_eq!(summary.answers.len(), 2);
    }
}

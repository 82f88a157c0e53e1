use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::{RawQuestion, RemoteQuestions};
use crate::bank;
use crate::types::{Category, Difficulty, GameConfig, Question, DEFAULT_TIME_LIMIT_SECS};

/// Resolves the question set for one game: remote first, bundled bank as the
/// fallback. Selection order is a uniform shuffle driven by an owned RNG so
/// tests can pin the seed.
pub struct QuestionSource {
    remote: Option<Box<dyn RemoteQuestions>>,
    rng: StdRng,
}

impl QuestionSource {
    pub fn new(remote: Box<dyn RemoteQuestions>) -> Self {
        Self {
            remote: Some(remote),
            rng: StdRng::from_entropy(),
        }
    }

    /// Local-bank-only source, for hosts running without a backend.
    pub fn offline() -> Self {
        Self {
            remote: None,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Never errors: any remote failure degrades to the bundled bank. The
    /// result may be shorter than `config.question_count`, and is empty only
    /// when even the relaxed local lookup has nothing.
    pub async fn fetch(&mut self, config: &GameConfig) -> Vec<Question> {
        if let Some(remote) = &self.remote {
            match remote
                .fetch_questions(config.category, config.difficulty, config.question_count)
                .await
            {
                Ok(raw) if !raw.is_empty() => {
                    let mut questions = normalize(raw);
                    if questions.is_empty() {
                        warn!("remote sent no usable questions, using local bank");
                    } else {
                        questions.truncate(config.question_count);
                        debug!(count = questions.len(), "using remote questions");
                        return questions;
                    }
                }
                Ok(_) => warn!("remote sent an empty question list, using local bank"),
                Err(e) => warn!(error = %e, "question fetch failed, using local bank"),
            }
        }
        self.local(config)
    }

    /// Bundled-bank lookup. The difficulty filter is relaxed to the whole
    /// category when it leaves fewer questions than requested.
    pub fn local(&mut self, config: &GameConfig) -> Vec<Question> {
        let all = bank::local_questions(config.category);
        let mut matching: Vec<Question> = all
            .iter()
            .filter(|q| q.difficulty == config.difficulty)
            .cloned()
            .collect();
        if matching.len() < config.question_count {
            debug!(
                category = %config.category,
                difficulty = %config.difficulty,
                strict_matches = matching.len(),
                "relaxing difficulty filter"
            );
            matching = all;
        }
        matching.shuffle(&mut self.rng);
        matching.truncate(config.question_count);
        matching
    }
}

fn normalize(raw: Vec<RawQuestion>) -> Vec<Question> {
    raw.into_iter().filter_map(normalize_one).collect()
}

/// Fills the gaps a lenient backend leaves: generated id, default time
/// limit, difficulty-derived points. Items that still break the Question
/// invariants are dropped rather than crashing a game later.
fn normalize_one(raw: RawQuestion) -> Option<Question> {
    let difficulty = raw
        .difficulty
        .as_deref()
        .and_then(Difficulty::parse)
        .unwrap_or_default();
    let question = Question {
        id: question_id(raw.id),
        prompt: raw.question,
        options: raw.options,
        correct_option: raw.correct_answer,
        category: raw
            .category
            .as_deref()
            .and_then(Category::parse)
            .unwrap_or_default(),
        difficulty,
        explanation: raw.explanation.filter(|e| !e.is_empty()),
        time_limit_secs: raw.time_limit.unwrap_or(DEFAULT_TIME_LIMIT_SECS),
        base_points: raw.points.unwrap_or_else(|| difficulty.base_points()),
    };
    if question.is_valid() {
        Some(question)
    } else {
        warn!(id = %question.id, "dropping question with inconsistent options");
        None
    }
}

fn question_id(id: Option<serde_json::Value>) -> String {
    match id {
        Some(serde_json::Value::String(s)) if !s.is_empty() => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => Uuid::new_v4().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{QuizError, Result};
    use async_trait::async_trait;

    struct FailingRemote;

    #[async_trait]
    impl RemoteQuestions for FailingRemote {
        async fn fetch_questions(
            &self,
            _category: Category,
            _difficulty: Difficulty,
            _count: usize,
        ) -> Result<Vec<RawQuestion>> {
            Err(QuizError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "no route to backend",
            )))
        }
    }

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

    fn config(category: Category, difficulty: Difficulty, count: usize) -> GameConfig {
        GameConfig {
            category,
            difficulty,
            question_count: count,
        }
    }

    #[tokio::test]
    async fn remote_failure_falls_back_to_local_bank() {
        let mut source = QuestionSource::new(Box::new(FailingRemote)).with_seed(7);
        let questions = source
            .fetch(&config(Category::General, Difficulty::Easy, 3))
            .await;
        assert_eq!(questions.len(), 3);
        assert!(questions.iter().all(|q| q.id.starts_with("general-")));
        assert!(questions.iter().all(|q| q.difficulty == Difficulty::Easy));
    }

    #[tokio::test]
    async fn remote_questions_are_normalized() {
        let payload = vec![serde_json::json!({
            "text": "From the backend?",
            "answers": ["no", "yes"],
            "correct": 1,
            "category": "coaching",
            "difficulty": "hard"
        })];
        let mut source = QuestionSource::new(Box::new(CannedRemote(payload)));
        let questions = source
            .fetch(&config(Category::Coaching, Difficulty::Hard, 1))
            .await;
        assert_eq!(questions.len(), 1);
        let q = &questions[0];
        assert_eq!(q.prompt, "From the backend?");
        assert_eq!(q.correct_option, 1);
        assert_eq!(q.category, Category::Coaching);
        assert_eq!(q.base_points, 20);
        assert_eq!(q.time_limit_secs, DEFAULT_TIME_LIMIT_SECS);
        assert!(!q.id.is_empty());
    }

    #[tokio::test]
    async fn invalid_remote_items_are_dropped() {
        let payload = vec![
            // correct index out of range
            serde_json::json!({
                "question": "Broken?",
                "options": ["a", "b"],
                "correctAnswer": 5
            }),
            // too few options
            serde_json::json!({
                "question": "Also broken?",
                "options": ["only one"]
            }),
        ];
        let mut source = QuestionSource::new(Box::new(CannedRemote(payload))).with_seed(1);
        let questions = source
            .fetch(&config(Category::General, Difficulty::Easy, 2))
            .await;
        // both dropped, so the local bank fills in
        assert!(questions.iter().all(|q| q.id.starts_with("general-")));
    }

    #[test]
    fn local_lookup_relaxes_difficulty_when_short() {
        // The wellness bank has no hard questions at all.
        let mut source = QuestionSource::offline().with_seed(3);
        let questions = source.local(&config(Category::Wellness, Difficulty::Hard, 2));
        assert_eq!(questions.len(), 2);
    }

    #[test]
    fn local_lookup_caps_at_available_questions() {
        let mut source = QuestionSource::offline().with_seed(3);
        let questions = source.local(&config(Category::Coaching, Difficulty::Medium, 50));
        assert_eq!(questions.len(), 3);
    }

    #[test]
    fn seeded_shuffles_are_reproducible() {
        let cfg = config(Category::General, Difficulty::Easy, 3);
        let first: Vec<String> = QuestionSource::offline()
            .with_seed(42)
            .local(&cfg)
            .into_iter()
            .map(|q| q.id)
            .collect();
        let second: Vec<String> = QuestionSource::offline()
            .with_seed(42)
            .local(&cfg)
            .into_iter()
            .map(|q| q.id)
            .collect();
        assert_eq!(first, second);
    }
}

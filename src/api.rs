use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use crate::bank;
use crate::error::Result;
use crate::types::{Category, CategoryInfo, Difficulty, GameSummary};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// One question as the backend serves it. Field names vary between
/// deployments (`question`/`text`, `options`/`answers`,
/// `correctAnswer`/`correct`), hence the aliases; everything else is
/// optional and filled in during normalization.
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuestion {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(alias = "text")]
    pub question: String,
    #[serde(default, alias = "answers")]
    pub options: Vec<String>,
    #[serde(default, rename = "correctAnswer", alias = "correct")]
    pub correct_answer: usize,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default, rename = "timeLimit")]
    pub time_limit: Option<u32>,
    #[serde(default)]
    pub points: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardEntry {
    pub username: String,
    pub score: u32,
    #[serde(default)]
    pub rank: Option<u32>,
}

/// Seam for the remote question lookup, so the session driver can be tested
/// against a mock backend.
#[async_trait]
pub trait RemoteQuestions: Send + Sync {
    async fn fetch_questions(
        &self,
        category: Category,
        difficulty: Difficulty,
        count: usize,
    ) -> Result<Vec<RawQuestion>>;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("QUIZ_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Best effort: a finished game must never block on the network, so
    /// failures are logged and swallowed.
    pub async fn submit_stats(&self, summary: &GameSummary) {
        match self
            .http
            .post(self.url("/minigame/stats"))
            .json(summary)
            .send()
            .await
        {
            Ok(response) if !response.status().is_success() => {
                warn!(status = %response.status(), "stats upload rejected");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "stats upload failed"),
        }
    }

    /// Falls back to the bundled catalog when the backend does not answer.
    pub async fn fetch_categories(&self) -> Vec<CategoryInfo> {
        #[derive(Deserialize)]
        struct CategoriesResponse {
            #[serde(default)]
            categories: Vec<CategoryInfo>,
        }

        let result = async {
            let response = self
                .http
                .get(self.url("/minigame/categories"))
                .send()
                .await?
                .error_for_status()?;
            response.json::<CategoriesResponse>().await
        }
        .await;

        match result {
            Ok(body) if !body.categories.is_empty() => body.categories,
            Ok(_) => bank::default_categories(),
            Err(e) => {
                warn!(error = %e, "category fetch failed, using bundled catalog");
                bank::default_categories()
            }
        }
    }

    /// Empty on failure; the leaderboard is decoration, not state.
    pub async fn fetch_leaderboard(
        &self,
        category: Option<Category>,
        period: &str,
    ) -> Vec<LeaderboardEntry> {
        #[derive(Deserialize)]
        struct LeaderboardResponse {
            #[serde(default)]
            leaderboard: Vec<LeaderboardEntry>,
        }

        let category = category.map(|c| c.as_str()).unwrap_or("all");
        let result = async {
            let response = self
                .http
                .get(self.url("/minigame/leaderboard"))
                .query(&[("category", category), ("period", period)])
                .send()
                .await?
                .error_for_status()?;
            response.json::<LeaderboardResponse>().await
        }
        .await;

        match result {
            Ok(body) => body.leaderboard,
            Err(e) => {
                warn!(error = %e, "leaderboard fetch failed");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl RemoteQuestions for ApiClient {
    async fn fetch_questions(
        &self,
        category: Category,
        difficulty: Difficulty,
        count: usize,
    ) -> Result<Vec<RawQuestion>> {
        #[derive(Deserialize)]
        struct QuestionsResponse {
            #[serde(default)]
            questions: Vec<serde_json::Value>,
        }

        let count = count.to_string();
        let response = self
            .http
            .get(self.url("/minigame/questions"))
            .query(&[
                ("category", category.as_str()),
                ("difficulty", difficulty.as_str()),
                ("count", count.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: QuestionsResponse = response.json().await?;
        let mut questions = Vec::with_capacity(body.questions.len());
        for value in body.questions {
            match serde_json::from_value::<RawQuestion>(value) {
                Ok(q) => questions.push(q),
                Err(e) => warn!(error = %e, "skipping malformed question payload"),
            }
        }
        Ok(questions)
    }
}

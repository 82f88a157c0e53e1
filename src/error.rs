use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuizError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize/deserialize data: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("No questions available for the requested category and difficulty")]
    NoQuestionsAvailable,

    #[error("Invalid session transition: {0}")]
    InvalidTransition(&'static str),

    #[error("Question {0} already has a recorded answer")]
    AlreadyAnswered(usize),
}

pub type Result<T> = std::result::Result<T, QuizError>;

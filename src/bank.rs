use crate::types::{Category, CategoryInfo, Difficulty, Question, DEFAULT_TIME_LIMIT_SECS};

// (id, prompt, options, correct option index, difficulty, explanation)
type BankEntry = (
    &'static str,
    &'static str,
    &'static [&'static str],
    usize,
    Difficulty,
    &'static str,
);

pub const GENERAL_QUESTIONS: &[BankEntry] = &[
    (
        "general-01",
        "What is the capital of France?",
        &["London", "Berlin", "Paris", "Madrid"],
        2,
        Difficulty::Easy,
        "Paris is the capital and most populous city of France.",
    ),
    (
        "general-02",
        "In which year did humans first land on the Moon?",
        &["1967", "1969", "1971", "1973"],
        1,
        Difficulty::Medium,
        "Neil Armstrong and Buzz Aldrin landed on the Moon on July 20, 1969.",
    ),
    (
        "general-03",
        "Which is the largest planet in the solar system?",
        &["Saturn", "Jupiter", "Uranus", "Neptune"],
        1,
        Difficulty::Easy,
        "Jupiter is the largest planet, with a diameter of roughly 142,984 km.",
    ),
    (
        "general-04",
        "Who wrote 'One Hundred Years of Solitude'?",
        &[
            "Mario Vargas Llosa",
            "Gabriel Garcia Marquez",
            "Pablo Neruda",
            "Jorge Luis Borges",
        ],
        1,
        Difficulty::Medium,
        "Gabriel Garcia Marquez published this masterpiece of magical realism in 1967.",
    ),
    (
        "general-05",
        "What is the chemical formula of water?",
        &["CO2", "H2O", "O2", "NaCl"],
        1,
        Difficulty::Easy,
        "Water is made of two hydrogen atoms and one oxygen atom (H2O).",
    ),
];

pub const COACHING_QUESTIONS: &[BankEntry] = &[
    (
        "coaching-01",
        "What is the first rule of effective coaching?",
        &[
            "Giving advice",
            "Active listening",
            "Solving problems",
            "Judging the client",
        ],
        1,
        Difficulty::Medium,
        "Active listening is essential to understand what the client actually needs.",
    ),
    (
        "coaching-02",
        "What does SMART stand for in goal setting?",
        &[
            "Smart",
            "Specific, Measurable, Achievable, Relevant, Time-bound",
            "Simple",
            "Systematic",
        ],
        1,
        Difficulty::Hard,
        "SMART is an acronym for well-defined, reachable goals.",
    ),
    (
        "coaching-03",
        "What is the main benefit of asking powerful questions?",
        &[
            "Showing expertise",
            "Prompting reflection",
            "Speeding up the process",
            "Steering the conversation",
        ],
        1,
        Difficulty::Medium,
        "Powerful questions help clients reflect and find their own answers.",
    ),
];

pub const WELLNESS_QUESTIONS: &[BankEntry] = &[
    (
        "wellness-01",
        "How many minutes of weekly exercise does the WHO recommend?",
        &["75 minutes", "150 minutes", "200 minutes", "300 minutes"],
        1,
        Difficulty::Medium,
        "The WHO recommends at least 150 minutes of moderate activity per week.",
    ),
    (
        "wellness-02",
        "What percentage of the adult human body is water?",
        &["50%", "60%", "70%", "80%"],
        1,
        Difficulty::Easy,
        "Roughly 60% of the adult human body is water.",
    ),
];

/// Bundled questions for one category, used whenever the backend is
/// unreachable or comes back empty.
pub fn local_questions(category: Category) -> Vec<Question> {
    let entries = match category {
        Category::General => GENERAL_QUESTIONS,
        Category::Coaching => COACHING_QUESTIONS,
        Category::Wellness => WELLNESS_QUESTIONS,
    };
    entries.iter().map(|e| build(category, e)).collect()
}

fn build(category: Category, entry: &BankEntry) -> Question {
    let &(id, prompt, options, correct_option, difficulty, explanation) = entry;
    Question {
        id: id.to_string(),
        prompt: prompt.to_string(),
        options: options.iter().map(|s| s.to_string()).collect(),
        correct_option,
        category,
        difficulty,
        explanation: Some(explanation.to_string()),
        time_limit_secs: DEFAULT_TIME_LIMIT_SECS,
        base_points: difficulty.base_points(),
    }
}

/// Category catalog shown when the backend does not serve one.
pub fn default_categories() -> Vec<CategoryInfo> {
    vec![
        CategoryInfo {
            id: Category::General,
            name: "General Knowledge".to_string(),
            description: "A bit of everything".to_string(),
            icon: "🧠".to_string(),
            color: "#6366f1".to_string(),
        },
        CategoryInfo {
            id: Category::Coaching,
            name: "Coaching".to_string(),
            description: "Coaching concepts and techniques".to_string(),
            icon: "🎯".to_string(),
            color: "#8b5cf6".to_string(),
        },
        CategoryInfo {
            id: Category::Wellness,
            name: "Wellness".to_string(),
            description: "Health and personal wellbeing".to_string(),
            icon: "💪".to_string(),
            color: "#10b981".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_bank_entry_is_valid() {
        for category in Category::ALL {
            for question in local_questions(category) {
                assert!(question.is_valid(), "invalid bank entry {}", question.id);
                assert_eq!(question.category, category);
                assert_eq!(question.base_points, question.difficulty.base_points());
            }
        }
    }
}

use crate::types::Question;

/// Answers strictly faster than this earn the speed bonus. Exactly 5.0
/// seconds does not qualify.
pub const SPEED_BONUS_WINDOW_SECS: f64 = 5.0;

const SPEED_BONUS_FACTOR: f64 = 1.5;

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub is_correct: bool,
    pub points_awarded: u32,
    pub correct_option: usize,
    pub explanation: Option<String>,
    pub time_bonus: bool,
}

/// Scores a single answer. Pure: no clock reads, no I/O.
///
/// `selected == None` means the countdown expired, which always counts as
/// incorrect. Correct answers earn the question's base points, multiplied by
/// 1.5 and floored when inside the bonus window.
pub fn evaluate(question: &Question, selected: Option<usize>, time_to_answer_secs: f64) -> Evaluation {
    let is_correct = selected == Some(question.correct_option);
    let time_bonus = is_correct && time_to_answer_secs < SPEED_BONUS_WINDOW_SECS;

    let points_awarded = if !is_correct {
        0
    } else if time_bonus {
        (question.base_points as f64 * SPEED_BONUS_FACTOR).floor() as u32
    } else {
        question.base_points
    };

    Evaluation {
        is_correct,
        points_awarded,
        correct_option: question.correct_option,
        explanation: question.explanation.clone(),
        time_bonus,
    }
}

// src/models/quiz.rs

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use uuid::Uuid;
use validator::Validate;

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 10;

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: Uuid,

    /// The text content of the question.
    pub question_text: String,

    /// List of options (e.g., ["Option A", "Option B"]).
    /// Stored as a JSON array in the database.
    pub options: Json<Vec<String>>,

    /// Must equal one of `options`.
    pub correct_answer: String,

    /// Explanation or analysis of the correct answer.
    pub explanation: Option<String>,

    /// Topic used to group mistakes into weak points.
    pub topic: Option<String>,

    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Quiz {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Answers are compared after trimming surrounding whitespace.
    pub fn is_correct(&self, answer: &str) -> bool {
        answer.trim() == self.correct_answer.trim()
    }
}

/// Represents the 'quiz_quiz_sets' join table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizQuizSet {
    pub quiz_id: Uuid,
    pub quiz_set_id: Uuid,
    pub order_index: i32,
}

/// DTO for sending question to client (excludes answer and explanation).
#[derive(Debug, Clone, Serialize)]
pub struct QuizPublicDto {
    pub id: Uuid,
    pub question_text: String,
    pub options: Vec<String>,
    pub topic: Option<String>,
}

impl From<Quiz> for QuizPublicDto {
    fn from(quiz: Quiz) -> Self {
        Self {
            id: quiz.id,
            question_text: quiz.question_text,
            options: quiz.options.0,
            topic: quiz.topic,
        }
    }
}

/// What a caller gets back for a single quiz: editors see the answer.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum QuizView {
    Full(Quiz),
    Public(QuizPublicDto),
}

/// DTO for creating a new quiz.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 2000))]
    pub question_text: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(length(min = 1, max = 500))]
    pub correct_answer: String,
    #[validate(length(max = 2000))]
    pub explanation: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub topic: Option<String>,
}

/// DTO for updating a quiz. Fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateQuizRequest {
    #[validate(length(min = 1, max = 2000))]
    pub question_text: Option<String>,
    #[validate(custom(function = validate_options))]
    pub options: Option<Vec<String>>,
    #[validate(length(min = 1, max = 500))]
    pub correct_answer: Option<String>,
    #[validate(length(max = 2000))]
    pub explanation: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub topic: Option<String>,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() < MIN_OPTIONS || options.len() > MAX_OPTIONS {
        return Err(validator::ValidationError::new("options_count_out_of_range"));
    }
    let mut seen = HashSet::new();
    for opt in options {
        let trimmed = opt.trim();
        if trimmed.is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_blank"));
        }
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
        if !seen.insert(trimmed) {
            return Err(validator::ValidationError::new("duplicate_option"));
        }
    }
    Ok(())
}

/// Checks that the correct answer is one of the options.
pub fn answer_in_options(options: &[String], correct_answer: &str) -> bool {
    let answer = correct_answer.trim();
    options.iter().any(|o| o.trim() == answer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(options: &[&str], answer: &str) -> CreateQuizRequest {
        CreateQuizRequest {
            question_text: "Which keyword declares an immutable binding?".to_string(),
            options: options.iter().map(|s| s.to_string()).collect(),
            correct_answer: answer.to_string(),
            explanation: None,
            topic: Some("Rust".to_string()),
        }
    }

    #[test]
    fn accepts_well_formed_options() {
        assert!(request(&["let", "mut", "static"], "let").validate().is_ok());
    }

    #[test]
    fn rejects_single_option() {
        assert!(request(&["let"], "let").validate().is_err());
    }

    #[test]
    fn rejects_duplicate_after_trim() {
        assert!(request(&["let", " let "], "let").validate().is_err());
    }

    #[test]
    fn rejects_blank_option() {
        assert!(request(&["let", "  "], "let").validate().is_err());
    }

    #[test]
    fn answer_must_match_an_option() {
        let options = vec!["let".to_string(), "mut".to_string()];
        assert!(answer_in_options(&options, " let"));
        assert!(!answer_in_options(&options, "const"));
    }
}

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

/// One of the four option letters. Always stored uppercase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum AnswerChoice {
    A,
    B,
    C,
    D,
}

impl FromStr for AnswerChoice {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(AnswerChoice::A),
            "B" => Ok(AnswerChoice::B),
            "C" => Ok(AnswerChoice::C),
            "D" => Ok(AnswerChoice::D),
            _ => Err(AppError::ValidationError(format!(
                "'{}' is not a valid option, expected one of A, B, C, D",
                s
            ))),
        }
    }
}

impl fmt::Display for AnswerChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            AnswerChoice::A => "A",
            AnswerChoice::B => "B",
            AnswerChoice::C => "C",
            AnswerChoice::D => "D",
        };
        f.write_str(letter)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuestionOptions {
    pub a: String,
    pub b: String,
    pub c: String,
    pub d: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Question {
    pub id: String,
    pub exam_id: String,
    pub question_text: String,
    pub options: QuestionOptions,
    pub correct_answer: AnswerChoice,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub question_order: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Question {
    pub fn new(
        exam_id: &str,
        question_text: &str,
        options: QuestionOptions,
        correct_answer: AnswerChoice,
        question_order: i32,
    ) -> Self {
        Question {
            id: Uuid::new_v4().to_string(),
            exam_id: exam_id.to_string(),
            question_text: question_text.to_string(),
            options,
            correct_answer,
            section: None,
            category: None,
            difficulty: None,
            explanation: None,
            question_order,
            created_at: Some(Utc::now()),
        }
    }

    pub fn is_correct(&self, selected: AnswerChoice) -> bool {
        self.correct_answer == selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_choice_parsing_is_case_insensitive() {
        assert_eq!("a".parse::<AnswerChoice>().unwrap(), AnswerChoice::A);
        assert_eq!(" D ".parse::<AnswerChoice>().unwrap(), AnswerChoice::D);
        assert_eq!("c".parse::<AnswerChoice>().unwrap().to_string(), "C");
    }

    #[test]
    fn answer_choice_rejects_unknown_letters() {
        assert!(matches!(
            "E".parse::<AnswerChoice>(),
            Err(AppError::ValidationError(_))
        ));
        assert!("".parse::<AnswerChoice>().is_err());
        assert!("AB".parse::<AnswerChoice>().is_err());
    }

    #[test]
    fn answer_choice_serializes_uppercase() {
        let json = serde_json::to_string(&AnswerChoice::B).expect("should serialize");
        assert_eq!(json, "\"B\"");
    }
}

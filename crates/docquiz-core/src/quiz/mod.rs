//! Quiz structures and the client-side steps applied between generations.

mod history;
mod shuffle;

pub use history::{QuestionHistory, question_fingerprint};
pub use shuffle::{shuffle_answers, shuffle_question};

use serde::{Deserialize, Serialize};

/// A multiple-choice question as returned by the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options`.
    pub correct_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl QuizQuestion {
    pub fn correct_option(&self) -> Option<&str> {
        self.options.get(self.correct_index).map(String::as_str)
    }
}

/// A generated quiz.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    #[serde(default)]
    pub title: String,
    pub questions: Vec<QuizQuestion>,
}

impl Quiz {
    /// Parse the generator's JSON response.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Questions whose `correct_index` points outside their options.
    pub fn invalid_questions(&self) -> Vec<usize> {
        self.questions
            .iter()
            .enumerate()
            .filter(|(_, q)| q.correct_option().is_none())
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
pub(crate) fn question(text: &str, options: &[&str], correct_index: usize) -> QuizQuestion {
    QuizQuestion {
        question: text.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        correct_index,
        explanation: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_generator_output() {
        let quiz = Quiz::from_json(
            r#"{"title":"Cells","questions":[
                {"question":"Powerhouse of the cell?","options":["Nucleus","Mitochondria"],"correct_index":1}
            ]}"#,
        )
        .unwrap();

        assert_eq!(quiz.questions.len(), 1);
        assert_eq!(quiz.questions[0].correct_option(), Some("Mitochondria"));
        assert!(quiz.invalid_questions().is_empty());
    }

    #[test]
    fn flags_out_of_range_answers() {
        let quiz = Quiz {
            title: String::new(),
            questions: vec![question("a?", &["x", "y"], 1), question("b?", &["x"], 3)],
        };
        assert_eq!(quiz.invalid_questions(), vec![1]);
    }

    #[test]
    fn rejects_malformed_json() {
        let err = Quiz::from_json("{not json").unwrap_err();
        assert!(matches!(err, crate::DocquizError::Quiz(_)), "got {err:?}");
        assert_eq!(err.kind(), crate::ErrorKind::Generic);
        assert!(!err.kind().is_retryable());
    }
}

//! Duplicate avoidance across quiz regenerations.

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::pdf::normalize_text;

use super::Quiz;

/// Case-, accent-composition- and punctuation-insensitive key for a question.
pub fn question_fingerprint(question: &str) -> String {
    normalize_text(question)
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Questions already shown for one document.
#[derive(Debug, Default, Clone)]
pub struct QuestionHistory {
    seen: HashSet<String>,
    recent: VecDeque<String>,
}

impl QuestionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn contains(&self, question: &str) -> bool {
        self.seen.contains(&question_fingerprint(question))
    }

    /// Drop questions seen in earlier rounds or repeated within `quiz`, then
    /// remember the survivors. Returns how many were dropped.
    pub fn retain_new(&mut self, quiz: &mut Quiz) -> usize {
        let before = quiz.questions.len();
        quiz.questions.retain(|q| {
            let key = question_fingerprint(&q.question);
            if key.is_empty() || !self.seen.insert(key) {
                return false;
            }
            self.recent.push_back(q.question.clone());
            true
        });
        let dropped = before - quiz.questions.len();
        if dropped > 0 {
            debug!("Dropped {} repeated questions", dropped);
        }
        dropped
    }

    /// Most recent question texts, newest first, for the next prompt.
    pub fn avoid_list(&self, limit: usize) -> Vec<String> {
        self.recent.iter().rev().take(limit).cloned().collect()
    }

    pub fn clear(&mut self) {
        self.seen.clear();
        self.recent.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::question;
    use pretty_assertions::assert_eq;

    fn quiz(texts: &[&str]) -> Quiz {
        Quiz {
            title: String::new(),
            questions: texts.iter().map(|t| question(t, &["a", "b"], 0)).collect(),
        }
    }

    #[test]
    fn fingerprint_ignores_case_and_punctuation() {
        assert_eq!(
            question_fingerprint("What is  DNA?"),
            question_fingerprint("what is dna")
        );
        assert_eq!(
            question_fingerprint("Ca\u{301}c te\u{301}  ba\u{300}o?"),
            question_fingerprint("các té bào")
        );
    }

    #[test]
    fn drops_repeats_across_rounds() {
        let mut history = QuestionHistory::new();

        let mut first = quiz(&["What is DNA?", "Define osmosis."]);
        assert_eq!(history.retain_new(&mut first), 0);

        let mut second = quiz(&["what is dna", "What is RNA?", "What is RNA?"]);
        assert_eq!(history.retain_new(&mut second), 2);
        assert_eq!(second.questions.len(), 1);
        assert_eq!(second.questions[0].question, "What is RNA?");
        assert_eq!(history.len(), 3);
        assert!(history.contains("DEFINE OSMOSIS"));
    }

    #[test]
    fn avoid_list_is_newest_first() {
        let mut history = QuestionHistory::new();
        history.retain_new(&mut quiz(&["One?", "Two?", "Three?"]));

        assert_eq!(history.avoid_list(2), vec!["Three?".to_string(), "Two?".to_string()]);

        history.clear();
        assert!(history.is_empty());
        assert!(history.avoid_list(5).is_empty());
    }
}

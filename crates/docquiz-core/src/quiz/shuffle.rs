//! Answer shuffling.

use rand::Rng;
use rand::seq::SliceRandom;

use super::{Quiz, QuizQuestion};

/// Permute one question's options, keeping `correct_index` on the same text.
pub fn shuffle_question<R: Rng + ?Sized>(question: &mut QuizQuestion, rng: &mut R) {
    let mut order: Vec<usize> = (0..question.options.len()).collect();
    order.shuffle(rng);

    let mut taken: Vec<Option<String>> = question.options.drain(..).map(Some).collect();
    question.options = order
        .iter()
        .filter_map(|&old| taken[old].take())
        .collect();

    if let Some(new_index) = order.iter().position(|&old| old == question.correct_index) {
        question.correct_index = new_index;
    }
}

/// Shuffle the options of every question in `quiz`.
pub fn shuffle_answers<R: Rng + ?Sized>(quiz: &mut Quiz, rng: &mut R) {
    for question in &mut quiz.questions {
        shuffle_question(question, rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::question;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn correct_answer_survives_shuffle() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let mut q = question("Capital of France?", &["Berlin", "Paris", "Rome", "Madrid"], 1);
            shuffle_question(&mut q, &mut rng);

            assert_eq!(q.correct_option(), Some("Paris"));
            let mut sorted = q.options.clone();
            sorted.sort();
            assert_eq!(sorted, vec!["Berlin", "Madrid", "Paris", "Rome"]);
        }
    }

    #[test]
    fn positions_actually_move() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut positions = std::collections::HashSet::new();
        for _ in 0..40 {
            let mut q = question("q?", &["a", "b", "c", "d"], 0);
            shuffle_question(&mut q, &mut rng);
            positions.insert(q.correct_index);
        }
        assert!(positions.len() > 1);
    }

    #[test]
    fn whole_quiz_is_shuffled() {
        let mut quiz = Quiz {
            title: "t".into(),
            questions: vec![question("one?", &["a", "b"], 0), question("two?", &["c", "d", "e"], 2)],
        };
        shuffle_answers(&mut quiz, &mut StdRng::seed_from_u64(1));

        assert_eq!(quiz.questions[0].correct_option(), Some("a"));
        assert_eq!(quiz.questions[1].correct_option(), Some("e"));
    }

    #[test]
    fn empty_options_are_left_alone() {
        let mut q = question("q?", &[], 0);
        shuffle_question(&mut q, &mut StdRng::seed_from_u64(3));
        assert!(q.options.is_empty());
        assert_eq!(q.correct_index, 0);
    }
}

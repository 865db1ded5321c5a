//! Read-only view over the question catalog.
//!
//! The engine never edits pools, questions, or answers; it only needs
//! existence checks, authoritative correct-answer sets, and random sampling.

use std::collections::HashSet;

use crate::errors::Result;

pub trait ContentRepositoryTrait: Send + Sync {
    fn pool_exists(&self, pool_id: &str) -> Result<bool>;

    /// Pool a question belongs to, if the question exists.
    fn question_pool(&self, question_id: &str) -> Result<Option<String>>;

    /// Authoritative correct-answer id set for a question. `None` when the
    /// question does not exist; an existing question may legitimately have
    /// an empty set.
    fn correct_answer_ids(&self, question_id: &str) -> Result<Option<HashSet<String>>>;

    /// Up to `count` random question ids from the pool. May return fewer
    /// than requested; the caller decides whether that is acceptable.
    fn sample_question_ids(&self, pool_id: &str, count: usize) -> Result<Vec<String>>;

    /// All question ids in a pool, in stable id order.
    fn pool_question_ids(&self, pool_id: &str) -> Result<Vec<String>>;
}

/// Grading rule shared by training, exams, and duels: a submission is
/// correct iff the selected set equals the correct set exactly. A question
/// with no correct answers can never be answered correctly.
pub fn exact_set_match(selected: &[String], correct: &HashSet<String>) -> bool {
    if correct.is_empty() {
        return false;
    }
    let selected: HashSet<&str> = selected.iter().map(String::as_str).collect();
    selected.len() == correct.len() && correct.iter().all(|c| selected.contains(c.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn vec(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_match_required() {
        let correct = set(&["a", "c"]);
        assert!(exact_set_match(&vec(&["a", "c"]), &correct));
        assert!(exact_set_match(&vec(&["c", "a"]), &correct));
        assert!(!exact_set_match(&vec(&["a"]), &correct));
        assert!(!exact_set_match(&vec(&["a", "b", "c"]), &correct));
        assert!(!exact_set_match(&vec(&[]), &correct));
    }

    #[test]
    fn duplicate_selections_collapse() {
        assert!(exact_set_match(&vec(&["a", "a"]), &set(&["a"])));
    }

    #[test]
    fn empty_correct_set_never_matches() {
        assert!(!exact_set_match(&vec(&[]), &set(&[])));
        assert!(!exact_set_match(&vec(&["a"]), &set(&[])));
    }
}

use crate::util::round_to;

/// Characters per "word" in the wpm convention.
pub const CHARS_PER_WORD: f64 = 5.0;

#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Incorrect,
    /// typed past the end of the reference; not scored, but counted as typed
    Extra,
}

/// Score of a typed buffer against its reference at one instant.
#[derive(Clone, Debug, Copy, PartialEq)]
pub struct Score {
    pub correct_chars: usize,
    pub typed_chars: usize,
    pub accuracy: f64,
    pub wpm: f64,
}

impl Default for Score {
    fn default() -> Self {
        Self {
            correct_chars: 0,
            typed_chars: 0,
            accuracy: 100.0,
            wpm: 0.0,
        }
    }
}

impl Score {
    /// Values as they are reported and persisted: wpm to 2 decimals, accuracy to 1.
    pub fn rounded(&self) -> (f64, f64) {
        (round_to(self.wpm, 2), round_to(self.accuracy, 1))
    }
}

/// Per-position classification of `typed` against `reference`.
///
/// Uses the same index comparison as [`score`], so the number of
/// [`Outcome::Correct`] entries always equals `Score::correct_chars`.
pub fn classify(reference: &str, typed: &str) -> Vec<Outcome> {
    let mut expected = reference.chars();
    typed
        .chars()
        .map(|c| match expected.next() {
            Some(e) if e == c => Outcome::Correct,
            Some(_) => Outcome::Incorrect,
            None => Outcome::Extra,
        })
        .collect()
}

/// Computes correct characters, accuracy and words-per-minute.
///
/// Accuracy is `100` for an empty buffer. Wpm counts only correct
/// characters and is `0` until some time has elapsed.
pub fn score(reference: &str, typed: &str, elapsed_secs: f64) -> Score {
    let outcomes = classify(reference, typed);
    let typed_chars = outcomes.len();
    let correct_chars = outcomes
        .iter()
        .filter(|o| **o == Outcome::Correct)
        .count();

    let accuracy = if typed_chars == 0 {
        100.0
    } else {
        (correct_chars as f64 / typed_chars as f64) * 100.0
    };

    let wpm = if elapsed_secs.is_finite() && elapsed_secs > 0.0 {
        (correct_chars as f64 / CHARS_PER_WORD) / (elapsed_secs / 60.0)
    } else {
        0.0
    };

    Score {
        correct_chars,
        typed_chars,
        accuracy,
        wpm,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_input_is_fully_accurate() {
        let s = score("cat", "", 3.0);
        assert_eq!(s.correct_chars, 0);
        assert_eq!(s.typed_chars, 0);
        assert_eq!(s.accuracy, 100.0);
        assert_eq!(s.wpm, 0.0);
    }

    #[test]
    fn test_cat_typed_correctly_in_six_seconds() {
        let s = score("cat", "cat", 6.0);
        assert_eq!(s.correct_chars, 3);
        assert_eq!(s.accuracy, 100.0);
        assert!((s.wpm - 6.0).abs() < 1e-9);
        assert_eq!(s.rounded(), (6.0, 100.0));
    }

    #[test]
    fn test_cat_with_one_mistake() {
        let s = score("cat", "cbt", 6.0);
        assert_eq!(s.correct_chars, 2);
        assert!((s.wpm - 4.0).abs() < 1e-9);
        assert_eq!(s.rounded(), (4.0, 66.7));
    }

    #[test]
    fn test_zero_elapsed_gives_zero_wpm() {
        assert_eq!(score("cat", "cat", 0.0).wpm, 0.0);
        assert_eq!(score("cat", "cat", -1.0).wpm, 0.0);
        assert_eq!(score("cat", "cat", f64::NAN).wpm, 0.0);
    }

    #[test]
    fn test_extra_chars_dilute_accuracy() {
        let s = score("cat", "catxyz", 6.0);
        assert_eq!(s.correct_chars, 3);
        assert_eq!(s.typed_chars, 6);
        assert_eq!(s.accuracy, 50.0);
    }

    #[test]
    fn test_classify_matches_index_comparison() {
        assert_eq!(
            classify("cat", "cbtz"),
            vec![
                Outcome::Correct,
                Outcome::Incorrect,
                Outcome::Correct,
                Outcome::Extra
            ]
        );
    }

    #[test]
    fn test_positions_are_chars_not_bytes() {
        let s = score("héllo", "héllo", 60.0);
        assert_eq!(s.correct_chars, 5);
        assert_eq!(s.typed_chars, 5);
        assert_eq!(s.accuracy, 100.0);
        assert!((s.wpm - 1.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prefix_of_reference_is_always_accurate(reference in "[a-zA-Z .,]{1,60}", cut in 0usize..60) {
            let typed: String = reference.chars().take(cut).collect();
            let s = score(&reference, &typed, 10.0);
            prop_assert_eq!(s.correct_chars, typed.chars().count());
            prop_assert_eq!(s.accuracy, 100.0);
        }

        #[test]
        fn a_mismatch_lowers_accuracy(reference in "[a-z]{1,40}", idx in 0usize..40) {
            let len = reference.chars().count();
            let idx = idx % len;
            let typed: String = reference
                .chars()
                .enumerate()
                .map(|(i, c)| if i == idx { if c == 'z' { 'a' } else { 'z' } } else { c })
                .collect();
            let s = score(&reference, &typed, 10.0);
            prop_assert!(s.accuracy < 100.0);
        }

        #[test]
        fn accuracy_and_wpm_stay_in_bounds(reference in ".{0,40}", typed in ".{0,80}", elapsed in -10.0f64..600.0) {
            let s = score(&reference, &typed, elapsed);
            prop_assert!((0.0..=100.0).contains(&s.accuracy));
            prop_assert!(s.wpm >= 0.0);
            let correct = classify(&reference, &typed)
                .into_iter()
                .filter(|o| *o == Outcome::Correct)
                .count();
            prop_assert_eq!(correct, s.correct_chars);
        }
    }
}

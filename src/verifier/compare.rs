//! Fixed-work equality for password material.
//!
//! The comparison always performs [`COMPARE_ROUNDS`] character comparisons,
//! wrapping around both inputs, so the time taken does not depend on where
//! the first difference is. A length difference is still decided up front;
//! that residual leak is accepted.

use std::hint::black_box;

pub const COMPARE_ROUNDS: usize = 0x400;

/// Returns `true` only if both inputs have the same length and the same
/// characters. Empty inputs never match.
#[must_use]
pub fn fixed_work_eq(computed: &[char], expected: &[char]) -> bool {
    compare(computed, expected).0
}

// Returns the verdict and the number of comparisons performed.
fn compare(computed: &[char], expected: &[char]) -> (bool, usize) {
    if computed.is_empty() || expected.is_empty() {
        return (false, 0);
    }

    let mut equal = computed.len() == expected.len();
    let mut rounds = 0;
    for i in 0..COMPARE_ROUNDS {
        if black_box(computed[i % computed.len()]) != black_box(expected[i % expected.len()]) {
            equal = false;
        }
        rounds += 1;
    }

    (equal, rounds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn equal_inputs_match() {
        assert!(fixed_work_eq(&chars("hunter2"), &chars("hunter2")));
    }

    #[test]
    fn content_difference_is_detected_anywhere() {
        let expected = chars("hunter2");
        assert!(!fixed_work_eq(&chars("Xunter2"), &expected));
        assert!(!fixed_work_eq(&chars("hunXer2"), &expected));
        assert!(!fixed_work_eq(&chars("hunter3"), &expected));
    }

    #[test]
    fn length_difference_never_matches() {
        // "abab" wraps onto "ab" perfectly, only the length check rejects it
        assert!(!fixed_work_eq(&chars("abab"), &chars("ab")));
        assert!(!fixed_work_eq(&chars("ab"), &chars("abab")));
        assert!(!fixed_work_eq(&chars("hunter"), &chars("hunter2")));
    }

    #[test]
    fn empty_inputs_never_match() {
        assert!(!fixed_work_eq(&[], &[]));
        assert!(!fixed_work_eq(&chars("a"), &[]));
        assert!(!fixed_work_eq(&[], &chars("a")));
    }

    #[test]
    fn round_count_is_independent_of_mismatch_position() {
        let expected = chars("correct horse battery staple");
        let mut first = expected.clone();
        first[0] = '#';
        let mut last = expected.clone();
        let end = last.len() - 1;
        last[end] = '#';

        assert_eq!(compare(&first, &expected), (false, COMPARE_ROUNDS));
        assert_eq!(compare(&last, &expected), (false, COMPARE_ROUNDS));
        assert_eq!(compare(&expected, &expected), (true, COMPARE_ROUNDS));
        assert_eq!(compare(&chars("short"), &expected), (false, COMPARE_ROUNDS));
    }

    #[test]
    fn inputs_longer_than_round_count_are_truncated() {
        // only the first COMPARE_ROUNDS characters take part
        let expected: Vec<char> = std::iter::repeat('a').take(COMPARE_ROUNDS + 1).collect();
        let mut computed = expected.clone();
        computed[COMPARE_ROUNDS] = 'b';
        assert!(fixed_work_eq(&computed, &expected));
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Token-level text comparison.
//
// Both operations align whitespace-separated tokens with a longest common
// subsequence table. `diff_tokens` compares tokens exactly and reports the
// edit script; `ratio` case-folds first and weights every matched token by
// its character length, so a changed digit in a short amount counts for more
// than a changed name in a long sentence.

use pruefwerk_core::{ChangeTag, SimilarityReport, TokenChange};
use tracing::{debug, instrument};

/// Line shown by [`SimilarityEngine::render_changes`] for an empty diff.
pub const NO_MODIFICATIONS: &str = "No modifications detected.";

/// Text similarity scoring and token diffs.
pub struct SimilarityEngine;

impl SimilarityEngine {
    /// Ordered edit script turning `original` into `candidate`.
    ///
    /// Only insertions and deletions are reported; within a replaced run the
    /// removals come first. Empty exactly when the token sequences are equal.
    pub fn diff_tokens(original: &str, candidate: &str) -> Vec<TokenChange> {
        let a: Vec<&str> = original.split_whitespace().collect();
        let b: Vec<&str> = candidate.split_whitespace().collect();
        let table = suffix_lcs(&a, &b, |_| 1);

        let mut changes = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            if a[i] == b[j] {
                i += 1;
                j += 1;
            } else if table[i + 1][j] >= table[i][j + 1] {
                changes.push(TokenChange::removed(a[i]));
                i += 1;
            } else {
                changes.push(TokenChange::added(b[j]));
                j += 1;
            }
        }
        changes.extend(a[i..].iter().map(|t| TokenChange::removed(*t)));
        changes.extend(b[j..].iter().map(|t| TokenChange::added(*t)));
        changes
    }

    /// Similarity of `a` and `b` in `[0, 1]`.
    ///
    /// `2 * M / T`, where `M` is the character length of the best common
    /// token subsequence (after case folding) and `T` the character length
    /// of all tokens on both sides. Two empty inputs are identical.
    pub fn ratio(a: &str, b: &str) -> f64 {
        let a = fold(a);
        let b = fold(b);
        let total: usize = a.iter().chain(b.iter()).map(|t| weight(t)).sum();
        if total == 0 {
            return 1.0;
        }

        let matched = lcs_weight(&a, &b, weight);
        (2 * matched) as f64 / total as f64
    }

    /// Full comparison of a reference text against extracted text.
    #[instrument(skip_all, fields(reference_len = reference.len(), candidate_len = candidate.len()))]
    pub fn report(reference: &str, candidate: &str) -> SimilarityReport {
        let changes = Self::diff_tokens(reference, candidate);
        let ratio = Self::ratio(reference, candidate);

        let mut added_tokens = Vec::new();
        let mut removed_tokens = Vec::new();
        for change in &changes {
            match change.tag {
                ChangeTag::Added => added_tokens.push(change.token.clone()),
                ChangeTag::Removed => removed_tokens.push(change.token.clone()),
            }
        }

        debug!(
            ratio,
            added = added_tokens.len(),
            removed = removed_tokens.len(),
            "Texts compared"
        );
        SimilarityReport {
            ratio,
            added_tokens,
            removed_tokens,
            changes,
        }
    }

    /// One `+ token` / `- token` line per change, or [`NO_MODIFICATIONS`].
    pub fn render_changes(changes: &[TokenChange]) -> String {
        if changes.is_empty() {
            return NO_MODIFICATIONS.to_string();
        }
        changes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn fold(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

fn weight<T: AsRef<str>>(token: &T) -> usize {
    token.as_ref().chars().count()
}

/// `table[i][j]` is the best total weight of a common subsequence of
/// `a[i..]` and `b[j..]`.
fn suffix_lcs<T, W>(a: &[T], b: &[T], weight: W) -> Vec<Vec<usize>>
where
    T: PartialEq,
    W: Fn(&T) -> usize,
{
    let mut table = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for i in (0..a.len()).rev() {
        for j in (0..b.len()).rev() {
            table[i][j] = if a[i] == b[j] {
                table[i + 1][j + 1] + weight(&a[i])
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }
    table
}

/// Best total weight of a common subsequence of `a` and `b`, the same value
/// as `suffix_lcs(a, b, weight)[0][0]` but kept to two rows of the table.
fn lcs_weight<T, W>(a: &[T], b: &[T], weight: W) -> usize
where
    T: PartialEq,
    W: Fn(&T) -> usize,
{
    let mut below = vec![0usize; b.len() + 1];
    let mut row = vec![0usize; b.len() + 1];
    for item in a.iter().rev() {
        for j in (0..b.len()).rev() {
            row[j] = if *item == b[j] {
                below[j + 1] + weight(item)
            } else {
                below[j].max(row[j + 1])
            };
        }
        std::mem::swap(&mut below, &mut row);
    }
    below[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGINAL: &str = "Certificate of Completion John Doe";
    const EDITED: &str = "Certificate of Completion Jane Doe";

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn changed_name_is_one_removal_and_one_addition() {
        let changes = SimilarityEngine::diff_tokens(ORIGINAL, EDITED);
        assert_eq!(
            changes,
            vec![TokenChange::removed("John"), TokenChange::added("Jane")]
        );
        assert!(close(SimilarityEngine::ratio(ORIGINAL, EDITED), 52.0 / 60.0));
    }

    #[test]
    fn changed_amount_weighs_heavily() {
        let ratio = SimilarityEngine::ratio("Amount: 1000", "Amount: 10000");
        assert!(close(ratio, 14.0 / 23.0));
        assert!(ratio < 0.85);
    }

    #[test]
    fn ratio_is_symmetric() {
        let pairs = [
            (ORIGINAL, EDITED),
            ("Amount: 1000", "Amount: 10000"),
            ("a b c d", "d c b a"),
            ("", "something"),
        ];
        for (a, b) in pairs {
            assert_eq!(SimilarityEngine::ratio(a, b), SimilarityEngine::ratio(b, a));
        }
    }

    #[test]
    fn identical_text_scores_one_with_no_changes() {
        assert_eq!(SimilarityEngine::ratio(ORIGINAL, ORIGINAL), 1.0);
        assert!(SimilarityEngine::diff_tokens(ORIGINAL, ORIGINAL).is_empty());
        assert_eq!(SimilarityEngine::ratio("", ""), 1.0);
        assert_eq!(SimilarityEngine::ratio("  \n", "\t"), 1.0);
    }

    #[test]
    fn ratio_ignores_case_but_diff_preserves_it() {
        assert_eq!(SimilarityEngine::ratio("JOHN doe", "john DOE"), 1.0);
        assert_eq!(
            SimilarityEngine::diff_tokens("John", "JOHN"),
            vec![TokenChange::removed("John"), TokenChange::added("JOHN")]
        );
    }

    #[test]
    fn whitespace_layout_does_not_matter() {
        assert!(SimilarityEngine::diff_tokens("a  b\nc", "a b c").is_empty());
        assert_eq!(SimilarityEngine::ratio("a  b\nc", "a b c"), 1.0);
    }

    #[test]
    fn one_side_empty_scores_zero() {
        assert_eq!(SimilarityEngine::ratio("", "text"), 0.0);
        assert_eq!(
            SimilarityEngine::diff_tokens("", "new words"),
            vec![TokenChange::added("new"), TokenChange::added("words")]
        );
        assert_eq!(
            SimilarityEngine::diff_tokens("old", ""),
            vec![TokenChange::removed("old")]
        );
    }

    #[test]
    fn replaced_run_lists_removals_before_additions() {
        let changes = SimilarityEngine::diff_tokens("pay 10 dollars now", "pay 99 euros now");
        assert_eq!(
            changes,
            vec![
                TokenChange::removed("10"),
                TokenChange::removed("dollars"),
                TokenChange::added("99"),
                TokenChange::added("euros"),
            ]
        );
    }

    #[test]
    fn rolling_rows_agree_with_the_full_table() {
        let pairs = [
            (ORIGINAL, EDITED),
            ("a b c d e", "e d c b a"),
            ("pay 10 dollars now please", "pay 99 euros now"),
            ("x y x y x", "y x y"),
            ("", "something"),
        ];
        for (a, b) in pairs {
            let a = fold(a);
            let b = fold(b);
            assert_eq!(lcs_weight(&a, &b, weight), suffix_lcs(&a, &b, weight)[0][0]);
        }
    }

    #[test]
    fn long_noisy_texts_are_scored() {
        let a: String = (0..4000).map(|i| format!("w{} ", i % 97)).collect();
        let b: String = (0..4000).map(|i| format!("w{} ", (i * 7) % 97)).collect();
        let ratio = SimilarityEngine::ratio(&a, &b);
        assert!(ratio > 0.0 && ratio < 1.0);
    }

    #[test]
    fn report_splits_changes_by_direction() {
        let report = SimilarityEngine::report(ORIGINAL, EDITED);
        assert_eq!(report.removed_tokens, vec!["John".to_string()]);
        assert_eq!(report.added_tokens, vec!["Jane".to_string()]);
        assert_eq!(report.changes.len(), 2);
        assert!(report.ratio > 0.85);
    }

    #[test]
    fn render_changes_lists_edits() {
        let changes = SimilarityEngine::diff_tokens(ORIGINAL, EDITED);
        assert_eq!(SimilarityEngine::render_changes(&changes), "- John\n+ Jane");
        assert_eq!(SimilarityEngine::render_changes(&[]), NO_MODIFICATIONS);
    }
}

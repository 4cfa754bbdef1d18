//! Line diffs of pretty-printed values, used in assertion failures.

use std::fmt::{Debug, Write};

/// Diff the pretty `Debug` renderings of two values
///
/// Lines only in `expected` are prefixed with `-`, lines only in `actual`
/// with `+`, shared lines with two spaces.
#[must_use]
pub fn diff_debug<T: Debug + ?Sized>(expected: &T, actual: &T) -> String {
    diff_lines(&format!("{expected:#?}"), &format!("{actual:#?}"))
}

/// Line diff of two texts (longest common subsequence)
#[must_use]
pub fn diff_lines(expected: &str, actual: &str) -> String {
    let old: Vec<&str> = expected.lines().collect();
    let new: Vec<&str> = actual.lines().collect();

    // common[i][j]: length of the LCS of old[i..] and new[j..]
    let mut common = vec![vec![0_usize; new.len() + 1]; old.len() + 1];
    for i in (0..old.len()).rev() {
        for j in (0..new.len()).rev() {
            common[i][j] = if old[i] == new[j] {
                common[i + 1][j + 1] + 1
            } else {
                common[i + 1][j].max(common[i][j + 1])
            };
        }
    }

    let mut out = String::new();
    let (mut i, mut j) = (0, 0);
    while i < old.len() && j < new.len() {
        if old[i] == new[j] {
            let _ = writeln!(out, "  {}", old[i]);
            i += 1;
            j += 1;
        } else if common[i + 1][j] >= common[i][j + 1] {
            let _ = writeln!(out, "- {}", old[i]);
            i += 1;
        } else {
            let _ = writeln!(out, "+ {}", new[j]);
            j += 1;
        }
    }
    for line in &old[i..] {
        let _ = writeln!(out, "- {line}");
    }
    for line in &new[j..] {
        let _ = writeln!(out, "+ {line}");
    }
    out
}

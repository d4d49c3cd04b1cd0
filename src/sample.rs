//! Row-shape validation.
//!
//! [`looks_like_csv`] is a spot check: it compares the separator count of a
//! few randomly chosen lines against the first line. A malformed line that is
//! never drawn goes unnoticed, so `samples` trades latency for coverage.
//! [`first_shape_mismatch`] is the exhaustive counterpart.

use log::debug;
use rand::{Rng, thread_rng};

use crate::split;

/// Number of lines drawn when the caller has no preference.
pub const DEFAULT_SAMPLES: usize = 10;

/// A line whose separator count disagrees with the first line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeMismatch {
    /// 0-based line index.
    pub line: usize,
    pub expected: usize,
    pub found: usize,
}

pub fn count_separators(line: &str, separator: u8) -> usize {
    line.matches(char::from(separator)).count()
}

/// Spot-checks `content` using the thread-local random generator.
pub fn looks_like_csv(content: &str, separator: u8, samples: usize) -> bool {
    looks_like_csv_with(content, separator, samples, &mut thread_rng())
}

/// Spot-checks `content`, drawing line indices from `rng`.
///
/// One line is always valid. Two lines are compared directly. Otherwise
/// `samples` indices are drawn uniformly from `1..lines` and each drawn line
/// must match the first line's separator count.
pub fn looks_like_csv_with<R>(content: &str, separator: u8, samples: usize, rng: &mut R) -> bool
where
    R: Rng,
{
    let lines = split::split_views(content, b'\n');
    if lines.len() <= 1 {
        return true;
    }
    let baseline = count_separators(lines[0].as_str(), separator);
    if lines.len() == 2 {
        return baseline == count_separators(lines[1].as_str(), separator);
    }

    for _ in 0..samples {
        let line = rng.gen_range(1..lines.len());
        let found = count_separators(lines[line].as_str(), separator);
        if found != baseline {
            debug!("Sampled line {line} has {found} separator(s), expected {baseline}");
            return false;
        }
    }
    true
}

/// Scans every line and reports the first one whose shape differs from the
/// first line.
pub fn first_shape_mismatch(content: &str, separator: u8) -> Option<ShapeMismatch> {
    let mut lines = split::views(content, b'\n');
    let expected = count_separators(lines.next()?.as_str(), separator);
    lines
        .enumerate()
        .map(|(idx, line)| (idx + 1, count_separators(line.as_str(), separator)))
        .find(|(_, found)| *found != expected)
        .map(|(line, found)| ShapeMismatch {
            line,
            expected,
            found,
        })
}

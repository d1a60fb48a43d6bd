//! Approximate substring search
//!
//! Bounded edit-distance matching over char sequences, plus the similarity
//! and context scoring used to rank candidate anchors.

use super::types::Locator;

/// Context shorter than half of what was captured scores this flat value
const TRUNCATED_CONTEXT_SCORE: f64 = 0.3;

const PREFIX_WEIGHT: f64 = 0.4;
const SUFFIX_WEIGHT: f64 = 0.4;
const PROXIMITY_WEIGHT: f64 = 0.2;

/// One occurrence of a pattern in a text, in char offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub start: usize,
    pub end: usize,
    pub errors: usize,
}

impl Match {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Find every occurrence of `needle` in `haystack` within `max_errors` edits
pub fn search(haystack: &str, needle: &str, max_errors: usize) -> Vec<Match> {
    let text: Vec<char> = haystack.chars().collect();
    let pattern: Vec<char> = needle.chars().collect();
    search_chars(&text, &pattern, max_errors)
}

/// Char-slice variant of `search`. With `max_errors == 0` only exact
/// occurrences are reported; otherwise one match is reported per end
/// position whose best alignment stays within budget.
pub fn search_chars(text: &[char], pattern: &[char], max_errors: usize) -> Vec<Match> {
    let m = pattern.len();
    if m == 0 || text.is_empty() {
        return Vec::new();
    }
    if max_errors == 0 {
        return exact_matches(text, pattern);
    }

    let k = max_errors.min(m);
    let cap = k + 1;
    let mut cost: Vec<usize> = (0..=m).map(|i| i.min(cap)).collect();
    let mut start: Vec<usize> = vec![0; m + 1];
    let mut next_cost = vec![cap; m + 1];
    let mut next_start = vec![0; m + 1];
    let mut matches = Vec::new();

    for (j, c) in text.iter().enumerate() {
        next_cost[0] = 0;
        next_start[0] = j + 1;
        for i in 1..=m {
            let mut best = (
                cost[i - 1] + usize::from(pattern[i - 1] != *c),
                start[i - 1],
            );
            if cost[i] + 1 < best.0 {
                best = (cost[i] + 1, start[i]);
            }
            if next_cost[i - 1] + 1 < best.0 {
                best = (next_cost[i - 1] + 1, next_start[i - 1]);
            }
            next_cost[i] = best.0.min(cap);
            next_start[i] = best.1;
        }
        if next_cost[m] <= k && next_start[m] < j + 1 {
            matches.push(Match {
                start: next_start[m],
                end: j + 1,
                errors: next_cost[m],
            });
        }
        std::mem::swap(&mut cost, &mut next_cost);
        std::mem::swap(&mut start, &mut next_start);
    }
    matches
}

fn exact_matches(text: &[char], pattern: &[char]) -> Vec<Match> {
    if pattern.len() > text.len() {
        return Vec::new();
    }
    text.windows(pattern.len())
        .enumerate()
        .filter(|(_, window)| *window == pattern)
        .map(|(i, _)| Match {
            start: i,
            end: i + pattern.len(),
            errors: 0,
        })
        .collect()
}

/// Similarity in `[0, 1]` of `expected` to the best approximate occurrence
/// of it inside `actual`. An empty `expected` is a perfect match.
pub fn similarity(expected: &str, actual: &str) -> f64 {
    let expected: Vec<char> = expected.chars().collect();
    let actual: Vec<char> = actual.chars().collect();
    similarity_chars(&expected, &actual)
}

fn similarity_chars(expected: &[char], actual: &[char]) -> f64 {
    if expected.is_empty() {
        return 1.0;
    }
    let budget = expected.len().div_ceil(2);
    search_chars(actual, expected, budget)
        .iter()
        .map(|m| m.errors)
        .min()
        .map(|errors| 1.0 - errors as f64 / expected.len() as f64)
        .unwrap_or(0.0)
}

fn context_score(expected: &[char], actual: &[char]) -> f64 {
    if expected.is_empty() {
        return 1.0;
    }
    if actual.len() * 2 < expected.len() {
        return TRUNCATED_CONTEXT_SCORE;
    }
    similarity_chars(expected, actual)
}

/// Score a candidate occurrence of `locator.exact` against the captured
/// context and position hint
pub fn score_candidate(candidate: &Match, locator: &Locator, text: &[char]) -> f64 {
    let prefix: Vec<char> = locator.prefix.chars().collect();
    let suffix: Vec<char> = locator.suffix.chars().collect();

    let start = candidate.start.min(text.len());
    let end = candidate.end.min(text.len()).max(start);
    let actual_prefix = &text[start.saturating_sub(prefix.len())..start];
    let actual_suffix = &text[end..(end + suffix.len()).min(text.len())];

    let prefix_score = context_score(&prefix, actual_prefix);
    let suffix_score = context_score(&suffix, actual_suffix);

    let expected_mid = (locator.position_start + locator.position_end) as f64 / 2.0;
    let actual_mid = (start + end) as f64 / 2.0;
    let half_len = (text.len() as f64 / 2.0).max(1.0);
    let proximity = 1.0 - ((expected_mid - actual_mid).abs() / half_len).min(1.0);

    PREFIX_WEIGHT * prefix_score + SUFFIX_WEIGHT * suffix_score + PROXIMITY_WEIGHT * proximity
}

//! Typo-tolerant text matching for the person bank
//!
//! A query matches a field when some substring of the field is within a small
//! edit distance of the query (approximate substring matching, Sellers'
//! dynamic programme). Matching is case-insensitive.

/// Matcher for one search query
#[derive(Debug, Clone)]
pub struct FuzzyMatcher {
    pattern: Vec<char>,
    max_errors: usize,
}

impl FuzzyMatcher {
    /// Build a matcher; returns `None` for a blank query (everything matches)
    pub fn new(query: &str) -> Option<Self> {
        let pattern: Vec<char> = query.trim().to_lowercase().chars().collect();
        if pattern.is_empty() {
            return None;
        }
        let max_errors = (pattern.len() + 1) / 4;
        Some(Self {
            pattern,
            max_errors,
        })
    }

    /// Best (lowest) distance across `fields`, if any is within tolerance
    pub fn score<'a>(&self, fields: impl IntoIterator<Item = &'a str>) -> Option<usize> {
        fields
            .into_iter()
            .map(|field| {
                let text: Vec<char> = field.to_lowercase().chars().collect();
                substring_distance(&self.pattern, &text)
            })
            .filter(|d| *d <= self.max_errors)
            .min()
    }

    pub fn matches<'a>(&self, fields: impl IntoIterator<Item = &'a str>) -> bool {
        self.score(fields).is_some()
    }
}

/// Minimum edit distance between `pattern` and any substring of `text`
fn substring_distance(pattern: &[char], text: &[char]) -> usize {
    let m = pattern.len();
    let mut prev: Vec<usize> = (0..=m).collect();
    let mut best = prev[m];

    for &tc in text {
        let mut curr = vec![0usize; m + 1];
        for i in 1..=m {
            let substitution = prev[i - 1] + usize::from(pattern[i - 1] != tc);
            curr[i] = substitution.min(prev[i] + 1).min(curr[i - 1] + 1);
        }
        best = best.min(curr[m]);
        prev = curr;
    }

    best
}

//! String distance helpers for fuzzy model-name matching.

/// Calculate Levenshtein (edit) distance between two strings.
///
/// Returns the minimum number of single-character edits (insertions,
/// deletions, or substitutions) required to change one string into another.
pub fn distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Calculate normalized similarity between two strings (0.0 to 1.0).
pub fn similarity(a: &str, b: &str) -> f32 {
    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return 1.0;
    }
    let dist = distance(a, b);
    1.0 - (dist as f32 / max_len as f32)
}

/// Find the best matches for a query from a list of candidates.
///
/// Returns candidates sorted by similarity (best first), filtered by threshold.
pub fn find_similar(
    query: &str,
    candidates: &[&str],
    top_k: usize,
    min_similarity: f32,
) -> Vec<(String, f32)> {
    let query_lower = query.to_lowercase();

    let mut matches: Vec<(String, f32)> = candidates
        .iter()
        .map(|&c| {
            let sim = similarity(&query_lower, &c.to_lowercase());
            (c.to_string(), sim)
        })
        .filter(|(_, sim)| *sim >= min_similarity)
        .collect();

    matches.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    matches.truncate(top_k);
    matches
}

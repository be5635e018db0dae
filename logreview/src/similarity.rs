use std::collections::HashSet;

/// Token-set Jaccard similarity over whitespace-delimited tokens.
/// Returns 0.0 when either side has no tokens.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let left: HashSet<&str> = a.trim().split_whitespace().collect();
    let right: HashSet<&str> = b.trim().split_whitespace().collect();
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let shared = left.intersection(&right).count();
    let union = left.union(&right).count();
    shared as f64 / union as f64
}

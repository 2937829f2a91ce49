//! Scoring primitives shared by the knowledge index and the content cache.
//!
//! Lexical word-overlap scoring runs first on every query because it is
//! free — no external calls. Embedding cosine similarity is the semantic
//! safety net for paraphrased queries that share no words with any
//! document.

/// Lexical scores are capped below 1.0 so an exact-ish word overlap never
/// reads as a perfect semantic match.
pub const LEXICAL_SCORE_CAP: f32 = 0.95;

/// Lowercase alphanumeric word tokenization.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(String::from)
        .collect()
}

/// Word-overlap score of a query against one document.
///
/// Each query word matching a title word counts double; a body-word match
/// counts once. The sum is normalized by query word count and capped at
/// [`LEXICAL_SCORE_CAP`]. An empty query scores 0.
pub fn lexical_score(query_words: &[String], title: &str, body: &str) -> f32 {
    if query_words.is_empty() {
        return 0.0;
    }
    let title_words = tokenize(title);
    let body_words = tokenize(body);

    let mut hits = 0.0f32;
    for word in query_words {
        if title_words.iter().any(|w| w == word) {
            hits += 2.0;
        } else if body_words.iter().any(|w| w == word) {
            hits += 1.0;
        }
    }
    (hits / query_words.len() as f32).min(LEXICAL_SCORE_CAP)
}

/// Cosine similarity with a small epsilon so zero vectors score 0 instead
/// of dividing by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    dot / (norm_a * norm_b + 1e-10)
}

/// Top-k positive scores, descending, ties broken by insertion order
/// (stable sort). Returns `(index, score)` pairs.
pub fn rank_top_k(scores: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = scores
        .iter()
        .enumerate()
        .filter(|(_, s)| **s > 0.0)
        .map(|(i, s)| (i, *s))
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(k);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_strips_punctuation() {
        assert_eq!(tokenize("Refund  Policy?!"), vec!["refund", "policy"]);
        assert!(tokenize("  ...  ").is_empty());
    }

    #[test]
    fn test_title_match_weighted_double() {
        let q = tokenize("refund policy");
        // Both words in title: (2 + 2) / 2 = 2.0 → capped at 0.95
        assert_eq!(lexical_score(&q, "Refund Policy", "details"), 0.95);
        // Both words only in body: (1 + 1) / 2 = 1.0 → capped
        assert_eq!(lexical_score(&q, "Guarantee", "refund policy text"), 0.95);
        // One body match out of two query words: 0.5
        let one = lexical_score(&q, "Shipping", "our refund terms");
        assert!((one - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_lexical_score_no_overlap() {
        let q = tokenize("quantum entanglement");
        assert_eq!(lexical_score(&q, "Refund Policy", "60 day guarantee"), 0.0);
    }

    #[test]
    fn test_empty_query_scores_zero() {
        assert_eq!(lexical_score(&[], "Title", "body"), 0.0);
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0];
        let c = vec![0.0, 1.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-5);
        assert!(cosine_similarity(&a, &c).abs() < 1e-5);
        assert_eq!(cosine_similarity(&a, &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_rank_top_k_stable_ties() {
        let scores = vec![0.5, 0.9, 0.5, 0.0];
        let ranked = rank_top_k(&scores, 3);
        // 0.0 filtered out; equal 0.5s keep insertion order
        assert_eq!(ranked, vec![(1, 0.9), (0, 0.5), (2, 0.5)]);
    }
}

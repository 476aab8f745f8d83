// Percentile Ranker
//
// Higher score is better. Stable descending sort; position i (0-based) of N
// receives round((N - i) / N * 100), so the best animal gets 100 and the
// worst gets round(100 / N). Ties keep input order and get distinct
// percentiles.

use serde::Serialize;

/// One ranked score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedScore<K> {
    pub key: K,
    pub score: f64,
    /// 1-based position, best first
    pub rank: usize,
    pub percentile: u8,
}

/// Percentile for 0-based descending `position` among `total`
pub fn percentile_at(position: usize, total: usize) -> u8 {
    if total == 0 || position >= total {
        return 0;
    }
    let fraction = (total - position) as f64 / total as f64;
    (fraction * 100.0).round() as u8
}

/// Rank scores best-first
///
/// Non-finite scores are not ranked.
pub fn rank_percentiles<K>(scores: Vec<(K, f64)>) -> Vec<RankedScore<K>> {
    let mut valid: Vec<(K, f64)> = scores.into_iter().filter(|(_, s)| s.is_finite()).collect();
    valid.sort_by(|a, b| b.1.total_cmp(&a.1));

    let total = valid.len();
    valid
        .into_iter()
        .enumerate()
        .map(|(position, (key, score))| RankedScore {
            key,
            score,
            rank: position + 1,
            percentile: percentile_at(position, total),
        })
        .collect()
}

//! Post-run cost estimate for paid classification calls.
//!
//! Only new calls are billed; cache hits and pre-filter skips are free.

use crate::models::CostStats;

/// Discount applied to every new call when running in batch mode.
pub const BATCH_DISCOUNT: f64 = 0.5;

/// Approximate price of one call (~800 input + ~500 output tokens) by model tier.
pub fn per_call_usd(model: &str) -> f64 {
    if model.contains("haiku") {
        0.001
    } else if model.contains("sonnet") {
        0.005
    } else {
        0.03
    }
}

/// Compute the estimated cost, store it (rounded to 4 decimals) in `stats`, and return it.
pub fn estimate_cost(stats: &mut CostStats) -> f64 {
    let mut cost = stats.new_api_calls as f64 * per_call_usd(&stats.model_used);
    if stats.batch_mode {
        cost *= BATCH_DISCOUNT;
    }
    stats.estimated_cost_usd = (cost * 10_000.0).round() / 10_000.0;
    stats.estimated_cost_usd
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(model: &str, calls: u64, batch: bool) -> CostStats {
        let mut stats = CostStats::new(model, true, true, batch);
        stats.new_api_calls = calls;
        stats
    }

    #[test]
    fn test_per_call_tiers() {
        assert_eq!(per_call_usd("claude-3-5-haiku-20241022"), 0.001);
        assert_eq!(per_call_usd("claude-sonnet-4"), 0.005);
        assert_eq!(per_call_usd("claude-opus-4-5-20250220"), 0.03);
    }

    #[test]
    fn test_estimate_haiku() {
        let mut s = stats("claude-3-5-haiku-20241022", 12, false);
        assert!((estimate_cost(&mut s) - 0.012).abs() < 1e-9);
        assert!((s.estimated_cost_usd - 0.012).abs() < 1e-9);
    }

    #[test]
    fn test_batch_discount() {
        let mut s = stats("claude-opus-4-5-20250220", 10, true);
        assert!((estimate_cost(&mut s) - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_hits_and_skips_are_free() {
        let mut s = stats("claude-sonnet-4", 0, false);
        s.cache_hits = 40;
        s.prefilter_skipped = 100;
        assert_eq!(estimate_cost(&mut s), 0.0);
    }
}

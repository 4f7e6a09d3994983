use crate::models::{AggregatedModelStats, ModelTarget, RunRecord};
use std::collections::BTreeMap;
use tracing::debug;

/// Fold all runs on one side into per-model sample series, keyed by
/// "{provider}:{model}". Series order follows the input run order, so
/// identical input always produces identical aggregates.
pub fn aggregate_runs(runs: &[RunRecord]) -> BTreeMap<String, AggregatedModelStats> {
    let mut aggregated: BTreeMap<String, AggregatedModelStats> = BTreeMap::new();

    for run in runs {
        for stats in &run.model_stats {
            let key = format!("{}:{}", stats.provider_name, stats.model_id);
            let entry = aggregated
                .entry(key)
                .or_insert_with(|| AggregatedModelStats::new(&stats.provider_name, &stats.model_id));

            entry.latency_p50_ms.push(stats.latency_p50_ms);
            entry.latency_p95_ms.push(stats.latency_p95_ms);
            entry.latency_p99_ms.push(stats.latency_p99_ms);
            // Missing throughput falls back to 0 here, at the aggregation
            // boundary, so downstream arithmetic never sees an absent value
            entry
                .tokens_per_second
                .push(stats.avg_tokens_per_second.unwrap_or(0.0));
            entry.success_rate.push(stats.success_rate);
            entry.cost_per_request_usd.push(stats.avg_cost_per_request_usd);
            entry.execution_ids.push(run.execution_id.clone());
            entry.total_executions += stats.total_executions;
        }
    }

    aggregated
}

/// Intersect the baseline and candidate key sets, optionally restricted to a
/// caller-supplied allow-list. Blank filter entries are dropped; an empty (or
/// all-blank) filter means no restriction. Result order is the baseline map's
/// key iteration order.
pub fn match_models(
    baseline: &BTreeMap<String, AggregatedModelStats>,
    candidate: &BTreeMap<String, AggregatedModelStats>,
    filter: &[ModelTarget],
) -> Vec<String> {
    let allowed: Vec<String> = filter
        .iter()
        .filter(|t| !t.is_blank())
        .map(|t| t.key())
        .collect();

    let matched: Vec<String> = baseline
        .keys()
        .filter(|key| candidate.contains_key(*key))
        .filter(|key| allowed.is_empty() || allowed.iter().any(|a| a == *key))
        .cloned()
        .collect();

    debug!(
        baseline_models = baseline.len(),
        candidate_models = candidate.len(),
        matched = matched.len(),
        "matched models across sides"
    );

    matched
}

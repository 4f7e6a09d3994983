use crate::config::StatisticalConfig;
use crate::models::{ModelRegressionResult, RegressionSummary};
use serde::{Deserialize, Serialize};

/// One weighted input to the confidence score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceFactor {
    pub factor: String,
    pub weight: f64,
    pub value: f64,
}

/// How much the analysis outcome should be trusted, with the factors that
/// produced the number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScore {
    /// Weighted score in [0, 1]
    pub confidence: f64,
    pub factors: Vec<ConfidenceFactor>,
}

/// Scores how trustworthy an analysis outcome is. The exact weighting is a
/// deployment concern, so callers may swap in their own implementation.
pub trait ConfidenceScorer {
    fn score(
        &self,
        summary: &RegressionSummary,
        models: &[ModelRegressionResult],
        config: &StatisticalConfig,
    ) -> ConfidenceScore;
}

/// Default scorer: a weighted sum over sample size, run coverage, and effect
/// clarity
pub struct WeightedConfidenceScorer;

const SAMPLE_SIZE_WEIGHT: f64 = 0.4;
const RUN_COVERAGE_WEIGHT: f64 = 0.3;
const EFFECT_CLARITY_WEIGHT: f64 = 0.3;

impl ConfidenceScorer for WeightedConfidenceScorer {
    fn score(
        &self,
        _summary: &RegressionSummary,
        models: &[ModelRegressionResult],
        config: &StatisticalConfig,
    ) -> ConfidenceScore {
        let factors = vec![
            ConfidenceFactor {
                factor: "sample_size".to_string(),
                weight: SAMPLE_SIZE_WEIGHT,
                value: sample_size_value(models, config.min_sample_size),
            },
            ConfidenceFactor {
                factor: "run_coverage".to_string(),
                weight: RUN_COVERAGE_WEIGHT,
                value: run_coverage_value(models),
            },
            ConfidenceFactor {
                factor: "effect_clarity".to_string(),
                weight: EFFECT_CLARITY_WEIGHT,
                value: effect_clarity_value(models, config.effect_size_threshold),
            },
        ];

        let total_weight: f64 = factors.iter().map(|f| f.weight).sum();
        let weighted: f64 = factors.iter().map(|f| f.weight * f.value).sum();
        let confidence = (weighted / total_weight).clamp(0.0, 1.0);

        ConfidenceScore { confidence, factors }
    }
}

/// Smallest per-side sample count across all comparisons, relative to the
/// advisory minimum. Undersized samples pull this below 1.
fn sample_size_value(models: &[ModelRegressionResult], min_sample_size: usize) -> f64 {
    let smallest = models
        .iter()
        .flat_map(|m| m.metric_regressions.iter())
        .map(|m| m.baseline_sample_count.min(m.candidate_sample_count))
        .min();

    match smallest {
        Some(n) if min_sample_size > 0 => (n as f64 / min_sample_size as f64).min(1.0),
        Some(_) => 1.0,
        None => 0.0,
    }
}

/// 1.0 when every model on both sides aggregates at least two runs, 0.5 when
/// any side rests on a single run
fn run_coverage_value(models: &[ModelRegressionResult]) -> f64 {
    if models.is_empty() {
        return 0.0;
    }

    let all_multi_run = models.iter().all(|m| {
        m.baseline_execution_ids.len() >= 2 && m.candidate_execution_ids.len() >= 2
    });

    if all_multi_run { 1.0 } else { 0.5 }
}

/// Share of detected regressions whose effect size clears the configured
/// threshold; 1.0 when nothing regressed
fn effect_clarity_value(models: &[ModelRegressionResult], effect_size_threshold: f64) -> f64 {
    let regressions: Vec<f64> = models
        .iter()
        .flat_map(|m| m.metric_regressions.iter())
        .filter(|m| m.is_regression)
        .map(|m| m.statistical_test.effect_size.abs())
        .collect();

    if regressions.is_empty() {
        return 1.0;
    }

    let clear = regressions
        .iter()
        .filter(|d| **d >= effect_size_threshold)
        .count();
    clear as f64 / regressions.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ChangeDirection, MetricRegression, Severity, StatisticalTestResult,
    };

    fn metric(samples: usize, is_regression: bool, effect_size: f64) -> MetricRegression {
        MetricRegression {
            metric_name: "latency_p95".to_string(),
            baseline_value: 100.0,
            baseline_stddev: 2.0,
            baseline_sample_count: samples,
            candidate_value: 130.0,
            candidate_stddev: 2.0,
            candidate_sample_count: samples,
            absolute_change: 30.0,
            percentage_change: 0.30,
            change_direction: ChangeDirection::Degraded,
            statistical_test: StatisticalTestResult {
                test_name: "Welch's t-test".to_string(),
                statistic: 10.0,
                p_value: 0.0001,
                is_significant: true,
                effect_size,
                effect_size_interpretation: "large".to_string(),
                degrees_of_freedom: 8.0,
            },
            severity: if is_regression { Severity::Major } else { Severity::None },
            is_regression,
            unit: "ms".to_string(),
        }
    }

    fn model(samples: usize, runs: usize, is_regression: bool, effect_size: f64) -> ModelRegressionResult {
        let ids: Vec<String> = (0..runs).map(|i| format!("run-{i}")).collect();
        ModelRegressionResult {
            provider_name: "openai".to_string(),
            model_id: "gpt-4".to_string(),
            overall_severity: if is_regression { Severity::Major } else { Severity::None },
            has_regression: is_regression,
            regression_count: usize::from(is_regression),
            metric_regressions: vec![metric(samples, is_regression, effect_size)],
            summary: String::new(),
            baseline_execution_ids: ids.clone(),
            candidate_execution_ids: ids,
        }
    }

    fn summary() -> RegressionSummary {
        RegressionSummary {
            total_models_analyzed: 1,
            models_with_regressions: 0,
            models_with_critical: 0,
            models_with_major: 0,
            models_with_minor: 0,
            worst_severity: Severity::None,
            total_baseline_executions: 100,
            total_candidate_executions: 100,
            any_regressions_detected: false,
            summary_text: String::new(),
        }
    }

    #[test]
    fn test_full_confidence_with_healthy_inputs() {
        let scorer = WeightedConfidenceScorer;
        let models = vec![model(5, 5, true, 2.0)];
        let score = scorer.score(&summary(), &models, &StatisticalConfig::default());

        assert!((score.confidence - 1.0).abs() < 1e-12);
        assert_eq!(score.factors.len(), 3);
        assert!(score.factors.iter().all(|f| f.value == 1.0));
    }

    #[test]
    fn test_no_models_scores_low() {
        let scorer = WeightedConfidenceScorer;
        let score = scorer.score(&summary(), &[], &StatisticalConfig::default());

        assert!(score.confidence < 0.5);
        let sample = score.factors.iter().find(|f| f.factor == "sample_size").unwrap();
        assert_eq!(sample.value, 0.0);
    }

    #[test]
    fn test_small_samples_lower_confidence() {
        let scorer = WeightedConfidenceScorer;
        let models = vec![model(2, 2, false, 0.0)];
        let score = scorer.score(&summary(), &models, &StatisticalConfig::default());

        let sample = score.factors.iter().find(|f| f.factor == "sample_size").unwrap();
        assert!((sample.value - 0.4).abs() < 1e-12, "2 of 5 advisory samples");
        assert!(score.confidence < 1.0);
    }

    #[test]
    fn test_single_run_side_halves_run_coverage() {
        let scorer = WeightedConfidenceScorer;
        let models = vec![model(1, 1, false, 0.0)];
        let score = scorer.score(&summary(), &models, &StatisticalConfig::default());

        let coverage = score.factors.iter().find(|f| f.factor == "run_coverage").unwrap();
        assert_eq!(coverage.value, 0.5);
    }

    #[test]
    fn test_weak_effect_regressions_lower_clarity() {
        let scorer = WeightedConfidenceScorer;
        let models = vec![model(5, 5, true, 0.1)];
        let score = scorer.score(&summary(), &models, &StatisticalConfig::default());

        let clarity = score.factors.iter().find(|f| f.factor == "effect_clarity").unwrap();
        assert_eq!(clarity.value, 0.0);
        assert!(score.confidence < 1.0);
    }

    #[test]
    fn test_confidence_stays_in_unit_interval() {
        let scorer = WeightedConfidenceScorer;
        for (samples, runs, regression, effect) in
            [(0usize, 0usize, false, 0.0), (100, 50, true, 10.0), (1, 1, true, 0.0)]
        {
            let models = vec![model(samples.max(1), runs.max(1), regression, effect)];
            let score = scorer.score(&summary(), &models, &StatisticalConfig::default());
            assert!((0.0..=1.0).contains(&score.confidence));
        }
    }
}

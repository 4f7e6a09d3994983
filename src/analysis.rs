use crate::aggregate::{aggregate_runs, match_models};
use crate::config::{AnalysisConfig, StatisticalConfig, ThresholdTriple, Thresholds};
use crate::confidence::{ConfidenceScorer, WeightedConfidenceScorer};
use crate::models::{
    AggregatedModelStats, AnalysisConstraint, ChangeDirection, MetricRegression, ModelRegressionResult,
    ModelTarget, RegressionReport, RegressionSummary, RunRecord, Severity, StatisticalTestResult,
};
use crate::stats;
use anyhow::{Result, bail};
use tracing::{debug, info, warn};

/// Analysis policy for one metric: which sample series it reads, which
/// threshold triple applies, and what "worse" means for it
pub struct MetricSpec {
    pub name: &'static str,
    pub unit: &'static str,
    pub higher_is_worse: bool,
    /// Compare thresholds against the absolute change instead of the
    /// relative change
    pub absolute_threshold: bool,
    series: fn(&AggregatedModelStats) -> &[f64],
    thresholds: fn(&Thresholds) -> ThresholdTriple,
}

impl MetricSpec {
    pub fn series<'a>(&self, stats: &'a AggregatedModelStats) -> &'a [f64] {
        (self.series)(stats)
    }

    pub fn thresholds(&self, thresholds: &Thresholds) -> ThresholdTriple {
        (self.thresholds)(thresholds)
    }
}

fn latency_p50_series(s: &AggregatedModelStats) -> &[f64] {
    &s.latency_p50_ms
}

fn latency_p95_series(s: &AggregatedModelStats) -> &[f64] {
    &s.latency_p95_ms
}

fn latency_p99_series(s: &AggregatedModelStats) -> &[f64] {
    &s.latency_p99_ms
}

fn throughput_series(s: &AggregatedModelStats) -> &[f64] {
    &s.tokens_per_second
}

fn success_rate_series(s: &AggregatedModelStats) -> &[f64] {
    &s.success_rate
}

fn cost_series(s: &AggregatedModelStats) -> &[f64] {
    &s.cost_per_request_usd
}

/// All metrics the analyzer knows. The three latency percentiles share the
/// latency threshold triple; which entries actually run comes from
/// `AnalysisConfig::metrics`.
pub const METRIC_SPECS: &[MetricSpec] = &[
    MetricSpec {
        name: "latency_p50",
        unit: "ms",
        higher_is_worse: true,
        absolute_threshold: false,
        series: latency_p50_series,
        thresholds: |t| t.latency,
    },
    MetricSpec {
        name: "latency_p95",
        unit: "ms",
        higher_is_worse: true,
        absolute_threshold: false,
        series: latency_p95_series,
        thresholds: |t| t.latency,
    },
    MetricSpec {
        name: "latency_p99",
        unit: "ms",
        higher_is_worse: true,
        absolute_threshold: false,
        series: latency_p99_series,
        thresholds: |t| t.latency,
    },
    MetricSpec {
        name: "throughput",
        unit: "tokens/s",
        higher_is_worse: false,
        absolute_threshold: false,
        series: throughput_series,
        thresholds: |t| t.throughput,
    },
    MetricSpec {
        name: "success_rate",
        unit: "fraction",
        higher_is_worse: false,
        absolute_threshold: true,
        series: success_rate_series,
        thresholds: |t| t.success_rate,
    },
    MetricSpec {
        name: "cost",
        unit: "usd",
        higher_is_worse: true,
        absolute_threshold: false,
        series: cost_series,
        thresholds: |t| t.cost,
    },
];

/// Look up a metric spec by configured name
pub fn metric_spec(name: &str) -> Option<&'static MetricSpec> {
    METRIC_SPECS.iter().find(|s| s.name == name)
}

/// Map a change onto a severity.
///
/// Not significant, or not a degradation for the metric's direction, is
/// always `none`; otherwise the magnitude is laddered against the thresholds
/// from critical down to minor.
pub fn classify_severity(
    percentage_change: f64,
    absolute_change: f64,
    thresholds: ThresholdTriple,
    higher_is_worse: bool,
    is_significant: bool,
    use_absolute: bool,
) -> Severity {
    if !is_significant {
        return Severity::None;
    }

    let is_degradation = if higher_is_worse {
        percentage_change > 0.0
    } else {
        percentage_change < 0.0
    };
    if !is_degradation {
        return Severity::None;
    }

    let magnitude = if use_absolute {
        absolute_change.abs()
    } else {
        percentage_change.abs()
    };

    if magnitude >= thresholds.critical {
        Severity::Critical
    } else if magnitude >= thresholds.major {
        Severity::Major
    } else if magnitude >= thresholds.minor {
        Severity::Minor
    } else {
        Severity::None
    }
}

/// Compare one metric's baseline and candidate sample series.
///
/// Returns `None` when either side has no samples: the metric cannot be
/// compared and is omitted from the model result entirely.
pub fn analyze_metric(
    spec: &MetricSpec,
    baseline_values: &[f64],
    candidate_values: &[f64],
    thresholds: ThresholdTriple,
    stat_config: &StatisticalConfig,
) -> Option<MetricRegression> {
    if baseline_values.is_empty() || candidate_values.is_empty() {
        return None;
    }

    let baseline_mean = stats::mean(baseline_values);
    let baseline_stddev = stats::stddev(baseline_values);
    let candidate_mean = stats::mean(candidate_values);
    let candidate_stddev = stats::stddev(candidate_values);

    let absolute_change = candidate_mean - baseline_mean;
    let percentage_change = if baseline_mean == 0.0 {
        0.0
    } else {
        absolute_change / baseline_mean
    };

    let change_direction = if percentage_change.abs() < 0.01 {
        ChangeDirection::Unchanged
    } else if spec.higher_is_worse == (percentage_change > 0.0) {
        ChangeDirection::Degraded
    } else {
        ChangeDirection::Improved
    };

    let test = stats::two_sample_t_test(
        baseline_mean,
        baseline_stddev,
        baseline_values.len(),
        candidate_mean,
        candidate_stddev,
        candidate_values.len(),
        stat_config.use_welch_t_test,
    );
    let is_significant = test.p_value < 1.0 - stat_config.confidence_level;

    let effect_size = stats::cohens_d(
        baseline_mean,
        baseline_stddev,
        baseline_values.len(),
        candidate_mean,
        candidate_stddev,
        candidate_values.len(),
    );

    let severity = classify_severity(
        percentage_change,
        absolute_change,
        thresholds,
        spec.higher_is_worse,
        is_significant,
        spec.absolute_threshold,
    );

    let is_regression =
        change_direction == ChangeDirection::Degraded && is_significant && severity != Severity::None;

    Some(MetricRegression {
        metric_name: spec.name.to_string(),
        baseline_value: baseline_mean,
        baseline_stddev,
        baseline_sample_count: baseline_values.len(),
        candidate_value: candidate_mean,
        candidate_stddev,
        candidate_sample_count: candidate_values.len(),
        absolute_change,
        percentage_change,
        change_direction,
        statistical_test: StatisticalTestResult {
            test_name: test.test_name.to_string(),
            statistic: test.statistic,
            p_value: test.p_value,
            is_significant,
            effect_size,
            effect_size_interpretation: stats::interpret_effect_size(effect_size).to_string(),
            degrees_of_freedom: test.degrees_of_freedom,
        },
        severity,
        is_regression,
        unit: spec.unit.to_string(),
    })
}

/// Run the metric analyzer over the configured metric set for one matched
/// model and fold the verdicts into one result
pub fn analyze_model(
    baseline: &AggregatedModelStats,
    candidate: &AggregatedModelStats,
    config: &AnalysisConfig,
) -> ModelRegressionResult {
    let mut metric_regressions = Vec::new();

    for name in &config.metrics {
        let Some(spec) = metric_spec(name) else {
            warn!(metric = %name, "unknown metric in configuration, skipping");
            continue;
        };

        let result = analyze_metric(
            spec,
            spec.series(baseline),
            spec.series(candidate),
            spec.thresholds(&config.thresholds),
            &config.statistical,
        );

        match result {
            Some(regression) => {
                debug!(
                    provider = %baseline.provider_name,
                    model = %baseline.model_id,
                    metric = %spec.name,
                    severity = %regression.severity,
                    p_value = regression.statistical_test.p_value,
                    "metric analyzed"
                );
                metric_regressions.push(regression);
            }
            None => {
                debug!(
                    provider = %baseline.provider_name,
                    model = %baseline.model_id,
                    metric = %spec.name,
                    "metric omitted: no samples on one side"
                );
            }
        }
    }

    let overall_severity = metric_regressions
        .iter()
        .map(|m| m.severity)
        .max()
        .unwrap_or(Severity::None);
    let regression_count = metric_regressions.iter().filter(|m| m.is_regression).count();
    let has_regression = regression_count > 0;

    let summary = model_summary(
        &baseline.provider_name,
        &baseline.model_id,
        overall_severity,
        &metric_regressions,
    );

    ModelRegressionResult {
        provider_name: baseline.provider_name.clone(),
        model_id: baseline.model_id.clone(),
        overall_severity,
        has_regression,
        regression_count,
        metric_regressions,
        summary,
        baseline_execution_ids: baseline.execution_ids.clone(),
        candidate_execution_ids: candidate.execution_ids.clone(),
    }
}

/// Human-readable one-liner covering only the regressing metrics
fn model_summary(
    provider: &str,
    model: &str,
    overall_severity: Severity,
    metric_regressions: &[MetricRegression],
) -> String {
    let regressing: Vec<String> = metric_regressions
        .iter()
        .filter(|m| m.is_regression)
        .map(|m| format!("{} ({:+.1}%)", m.metric_name, m.percentage_change * 100.0))
        .collect();

    if regressing.is_empty() {
        format!(
            "No statistically significant regressions detected for {}/{}.",
            provider, model
        )
    } else {
        format!(
            "{} regression detected for {}/{}: {}",
            overall_severity.to_string().to_uppercase(),
            provider,
            model,
            regressing.join(", ")
        )
    }
}

/// Fold all model results into the run-level summary
pub fn summarize_run(
    models: &[ModelRegressionResult],
    baseline_runs: &[RunRecord],
    candidate_runs: &[RunRecord],
) -> RegressionSummary {
    let total_models_analyzed = models.len();
    let models_with_regressions = models.iter().filter(|m| m.has_regression).count();
    let models_with_critical = models
        .iter()
        .filter(|m| m.overall_severity == Severity::Critical)
        .count();
    let models_with_major = models
        .iter()
        .filter(|m| m.overall_severity == Severity::Major)
        .count();
    let models_with_minor = models
        .iter()
        .filter(|m| m.overall_severity == Severity::Minor)
        .count();

    // Worst severity over the union of every metric verdict, not just each
    // model's own roll-up
    let worst_severity = models
        .iter()
        .flat_map(|m| m.metric_regressions.iter())
        .map(|m| m.severity)
        .max()
        .unwrap_or(Severity::None);

    let any_regressions_detected = models_with_regressions > 0;

    let summary_text = if any_regressions_detected {
        format!(
            "Detected regressions in {} of {} model(s). Severity breakdown: {} critical, {} major, {} minor.",
            models_with_regressions,
            total_models_analyzed,
            models_with_critical,
            models_with_major,
            models_with_minor
        )
    } else {
        format!(
            "No regressions detected across {} model(s).",
            total_models_analyzed
        )
    };

    RegressionSummary {
        total_models_analyzed,
        models_with_regressions,
        models_with_critical,
        models_with_major,
        models_with_minor,
        worst_severity,
        total_baseline_executions: baseline_runs.iter().map(|r| r.total_executions).sum(),
        total_candidate_executions: candidate_runs.iter().map(|r| r.total_executions).sum(),
        any_regressions_detected,
        summary_text,
    }
}

/// The regression-detection engine: one invocation owns all intermediate
/// state and produces a fresh report, so concurrent invocations need no
/// coordination
pub struct RegressionEngine {
    config: AnalysisConfig,
    scorer: Box<dyn ConfidenceScorer>,
}

impl RegressionEngine {
    /// Create an engine with the default confidence scorer
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            scorer: Box::new(WeightedConfidenceScorer),
        }
    }

    /// Create an engine with a caller-supplied confidence scorer
    pub fn with_scorer(config: AnalysisConfig, scorer: Box<dyn ConfidenceScorer>) -> Self {
        Self { config, scorer }
    }

    /// Compare candidate runs against baseline runs for every matched model.
    ///
    /// Empty run lists are a hard validation failure; everything else
    /// anomalous (no common models, single-run sides) is recorded as a soft
    /// constraint on the report.
    pub fn analyze(
        &self,
        baseline_runs: &[RunRecord],
        candidate_runs: &[RunRecord],
        filter: &[ModelTarget],
    ) -> Result<RegressionReport> {
        if baseline_runs.is_empty() {
            bail!("at least one baseline run is required");
        }
        if candidate_runs.is_empty() {
            bail!("at least one candidate run is required");
        }

        let mut constraints = Vec::new();
        if baseline_runs.len() == 1 {
            constraints.push(AnalysisConstraint::SingleBaselineRun);
        }
        if candidate_runs.len() == 1 {
            constraints.push(AnalysisConstraint::SingleCandidateRun);
        }

        let baseline = aggregate_runs(baseline_runs);
        let candidate = aggregate_runs(candidate_runs);
        let matched = match_models(&baseline, &candidate, filter);

        if matched.is_empty() {
            warn!("no common models between baseline and candidate");
            constraints.push(AnalysisConstraint::NoCommonModels);
        }

        let models: Vec<ModelRegressionResult> = matched
            .iter()
            .map(|key| analyze_model(&baseline[key], &candidate[key], &self.config))
            .collect();

        let summary = summarize_run(&models, baseline_runs, candidate_runs);
        info!(
            models = summary.total_models_analyzed,
            with_regressions = summary.models_with_regressions,
            worst = %summary.worst_severity,
            "analysis complete"
        );

        let confidence = self.scorer.score(&summary, &models, &self.config.statistical);

        Ok(RegressionReport {
            summary,
            models,
            constraints,
            confidence,
        })
    }
}

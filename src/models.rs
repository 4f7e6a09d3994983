use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Per-model aggregate statistics reported by the benchmark runner for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerModelStats {
    /// Provider that served the model (e.g. "openai", "anthropic")
    pub provider_name: String,
    /// Model identifier within the provider
    pub model_id: String,
    /// Median request latency in milliseconds
    pub latency_p50_ms: f64,
    /// 95th percentile request latency in milliseconds
    pub latency_p95_ms: f64,
    /// 99th percentile request latency in milliseconds
    pub latency_p99_ms: f64,
    /// Average generation throughput; absent when the runner could not measure it
    pub avg_tokens_per_second: Option<f64>,
    /// Fraction of requests that succeeded (0.0 to 1.0)
    pub success_rate: f64,
    /// Average cost per request in USD
    pub avg_cost_per_request_usd: f64,
    /// Requests executed against this model in this run
    pub total_executions: u64,
}

/// One executed benchmark run, as produced by the external benchmark runner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Unique identifier of the execution
    pub execution_id: String,
    /// Total requests executed across all models in this run
    pub total_executions: u64,
    /// Aggregate statistics per (provider, model) target
    pub model_stats: Vec<PerModelStats>,
}

impl RunRecord {
    /// Load a run record from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read run record: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse run record JSON: {}", path.display()))
    }

    /// Load run records from a list of JSON files, in the given order
    pub fn load_all(paths: &[std::path::PathBuf]) -> Result<Vec<Self>> {
        paths.iter().map(|p| Self::from_file(p)).collect()
    }
}

/// A (provider, model) pair used to restrict the analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTarget {
    pub provider_name: String,
    pub model_id: String,
}

impl ModelTarget {
    /// Parse a "provider:model" argument; blank parts yield a blank target
    /// which the matcher drops
    pub fn parse(s: &str) -> Self {
        let (provider, model) = s.split_once(':').unwrap_or((s, ""));
        Self {
            provider_name: provider.trim().to_string(),
            model_id: model.trim().to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.provider_name.is_empty() || self.model_id.is_empty()
    }

    pub fn key(&self) -> String {
        format!("{}:{}", self.provider_name, self.model_id)
    }
}

/// Sample series accumulated for one (provider, model) pair across all runs
/// on one side of the comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedModelStats {
    pub provider_name: String,
    pub model_id: String,
    /// One entry per contributing run, in input order
    pub latency_p50_ms: Vec<f64>,
    pub latency_p95_ms: Vec<f64>,
    pub latency_p99_ms: Vec<f64>,
    pub tokens_per_second: Vec<f64>,
    pub success_rate: Vec<f64>,
    pub cost_per_request_usd: Vec<f64>,
    /// Execution ids of the runs that contributed samples
    pub execution_ids: Vec<String>,
    /// Summed per-model request count across contributing runs
    pub total_executions: u64,
}

impl AggregatedModelStats {
    pub fn new(provider_name: &str, model_id: &str) -> Self {
        Self {
            provider_name: provider_name.to_string(),
            model_id: model_id.to_string(),
            latency_p50_ms: Vec::new(),
            latency_p95_ms: Vec::new(),
            latency_p99_ms: Vec::new(),
            tokens_per_second: Vec::new(),
            success_rate: Vec::new(),
            cost_per_request_usd: Vec::new(),
            execution_ids: Vec::new(),
            total_executions: 0,
        }
    }
}

/// Ordinal regression severity; the derived ordering is total:
/// none < minor < major < critical
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Minor,
    Major,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::None => "none",
            Severity::Minor => "minor",
            Severity::Major => "major",
            Severity::Critical => "critical",
        };
        f.pad(s)
    }
}

/// Direction of a metric change relative to what "worse" means for the metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeDirection {
    Improved,
    Degraded,
    Unchanged,
}

impl fmt::Display for ChangeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeDirection::Improved => "improved",
            ChangeDirection::Degraded => "degraded",
            ChangeDirection::Unchanged => "unchanged",
        };
        f.pad(s)
    }
}

/// Outcome of the two-sample hypothesis test for one metric comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticalTestResult {
    pub test_name: String,
    /// t-statistic
    pub statistic: f64,
    /// Two-tailed p-value
    pub p_value: f64,
    pub is_significant: bool,
    /// Cohen's d
    pub effect_size: f64,
    pub effect_size_interpretation: String,
    pub degrees_of_freedom: f64,
}

/// Full comparison verdict for one (model, metric) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRegression {
    pub metric_name: String,
    /// Baseline sample mean
    pub baseline_value: f64,
    pub baseline_stddev: f64,
    pub baseline_sample_count: usize,
    /// Candidate sample mean
    pub candidate_value: f64,
    pub candidate_stddev: f64,
    pub candidate_sample_count: usize,
    pub absolute_change: f64,
    /// Fractional change relative to the baseline mean; 0 when the baseline
    /// mean is 0
    pub percentage_change: f64,
    pub change_direction: ChangeDirection,
    pub statistical_test: StatisticalTestResult,
    pub severity: Severity,
    pub is_regression: bool,
    pub unit: String,
}

/// Roll-up of all metric verdicts for one matched model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRegressionResult {
    pub provider_name: String,
    pub model_id: String,
    pub overall_severity: Severity,
    pub has_regression: bool,
    pub regression_count: usize,
    pub metric_regressions: Vec<MetricRegression>,
    pub summary: String,
    pub baseline_execution_ids: Vec<String>,
    pub candidate_execution_ids: Vec<String>,
}

/// Run-level roll-up across all analyzed models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionSummary {
    pub total_models_analyzed: usize,
    pub models_with_regressions: usize,
    pub models_with_critical: usize,
    pub models_with_major: usize,
    pub models_with_minor: usize,
    pub worst_severity: Severity,
    /// Run-level execution counts as reported by each run record
    pub total_baseline_executions: u64,
    pub total_candidate_executions: u64,
    pub any_regressions_detected: bool,
    pub summary_text: String,
}

/// Anomalous-but-non-fatal conditions observed during an analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisConstraint {
    NoCommonModels,
    SingleBaselineRun,
    SingleCandidateRun,
}

impl fmt::Display for AnalysisConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnalysisConstraint::NoCommonModels => "no_common_models",
            AnalysisConstraint::SingleBaselineRun => "single_baseline_run",
            AnalysisConstraint::SingleCandidateRun => "single_candidate_run",
        };
        write!(f, "{s}")
    }
}

/// Final output of one engine invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionReport {
    pub summary: RegressionSummary,
    pub models: Vec<ModelRegressionResult>,
    pub constraints: Vec<AnalysisConstraint>,
    pub confidence: crate::confidence::ConfidenceScore,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_run_record_parsing() {
        let json = r#"{
            "execution_id": "run-1",
            "total_executions": 120,
            "model_stats": [{
                "provider_name": "openai",
                "model_id": "gpt-4",
                "latency_p50_ms": 420.0,
                "latency_p95_ms": 910.5,
                "latency_p99_ms": 1400.0,
                "avg_tokens_per_second": 55.2,
                "success_rate": 0.991,
                "avg_cost_per_request_usd": 0.0021,
                "total_executions": 120
            }]
        }"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", json).unwrap();

        let record = RunRecord::from_file(temp_file.path()).unwrap();
        assert_eq!(record.execution_id, "run-1");
        assert_eq!(record.total_executions, 120);
        assert_eq!(record.model_stats.len(), 1);
        assert_eq!(record.model_stats[0].provider_name, "openai");
        assert_eq!(record.model_stats[0].avg_tokens_per_second, Some(55.2));
    }

    #[test]
    fn test_run_record_nullable_throughput() {
        let json = r#"{
            "execution_id": "run-2",
            "total_executions": 10,
            "model_stats": [{
                "provider_name": "anthropic",
                "model_id": "claude-3",
                "latency_p50_ms": 300.0,
                "latency_p95_ms": 700.0,
                "latency_p99_ms": 900.0,
                "avg_tokens_per_second": null,
                "success_rate": 1.0,
                "avg_cost_per_request_usd": 0.003,
                "total_executions": 10
            }]
        }"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", json).unwrap();

        let record = RunRecord::from_file(temp_file.path()).unwrap();
        assert_eq!(record.model_stats[0].avg_tokens_per_second, None);
    }

    #[test]
    fn test_run_record_invalid_json() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "not json").unwrap();

        assert!(RunRecord::from_file(temp_file.path()).is_err());
    }

    #[test]
    fn test_model_target_parse() {
        let target = ModelTarget::parse("openai:gpt-4");
        assert_eq!(target.provider_name, "openai");
        assert_eq!(target.model_id, "gpt-4");
        assert_eq!(target.key(), "openai:gpt-4");
        assert!(!target.is_blank());
    }

    #[test]
    fn test_model_target_blank() {
        assert!(ModelTarget::parse("openai:").is_blank());
        assert!(ModelTarget::parse(":gpt-4").is_blank());
        assert!(ModelTarget::parse("gpt-4").is_blank());
        assert!(ModelTarget::parse(" : ").is_blank());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::None < Severity::Minor);
        assert!(Severity::Minor < Severity::Major);
        assert!(Severity::Major < Severity::Critical);
        assert_eq!(
            [Severity::Major, Severity::None, Severity::Critical]
                .into_iter()
                .max(),
            Some(Severity::Critical)
        );
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(Severity::Critical.to_string(), "critical");
        assert_eq!(Severity::None.to_string(), "none");
    }
}

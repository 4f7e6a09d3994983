use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Severity thresholds for one metric category, compared against the change
/// magnitude in order critical, major, minor
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ThresholdTriple {
    pub critical: f64,
    pub major: f64,
    pub minor: f64,
}

/// Per-metric-category severity thresholds. Latency, throughput and cost
/// triples are relative fractional changes; success_rate is an absolute
/// fraction (a drop of 0.10 triggers critical regardless of the baseline)
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct Thresholds {
    #[serde(default = "default_relative_thresholds")]
    pub latency: ThresholdTriple,
    #[serde(default = "default_relative_thresholds")]
    pub throughput: ThresholdTriple,
    #[serde(default = "default_success_rate_thresholds")]
    pub success_rate: ThresholdTriple,
    #[serde(default = "default_relative_thresholds")]
    pub cost: ThresholdTriple,
}

fn default_relative_thresholds() -> ThresholdTriple {
    ThresholdTriple {
        critical: 0.50,
        major: 0.25,
        minor: 0.10,
    }
}

fn default_success_rate_thresholds() -> ThresholdTriple {
    ThresholdTriple {
        critical: 0.10,
        major: 0.05,
        minor: 0.02,
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            latency: default_relative_thresholds(),
            throughput: default_relative_thresholds(),
            success_rate: default_success_rate_thresholds(),
            cost: default_relative_thresholds(),
        }
    }
}

/// Configuration of the hypothesis testing performed per metric comparison
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct StatisticalConfig {
    /// Confidence level for significance; a p-value below 1 - confidence_level
    /// counts as significant
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,
    /// Advisory minimum sample count per side; smaller samples lower the
    /// reported confidence but are still analyzed
    #[serde(default = "default_min_sample_size")]
    pub min_sample_size: usize,
    /// Welch's t-test (unequal variances) when true, pooled-variance
    /// Student's t-test when false
    #[serde(default = "default_use_welch")]
    pub use_welch_t_test: bool,
    /// Cohen's d magnitude considered a clear effect by the confidence scorer
    #[serde(default = "default_effect_size_threshold")]
    pub effect_size_threshold: f64,
}

fn default_confidence_level() -> f64 {
    0.95
}

fn default_min_sample_size() -> usize {
    5
}

fn default_use_welch() -> bool {
    true
}

fn default_effect_size_threshold() -> f64 {
    0.5
}

impl Default for StatisticalConfig {
    fn default() -> Self {
        Self {
            confidence_level: default_confidence_level(),
            min_sample_size: default_min_sample_size(),
            use_welch_t_test: default_use_welch(),
            effect_size_threshold: default_effect_size_threshold(),
        }
    }
}

/// Full analysis configuration: process-wide defaults merged with any values
/// a caller supplies in a TOML file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub statistical: StatisticalConfig,
    /// Names of the metrics to analyze, in report order
    #[serde(default = "default_metrics")]
    pub metrics: Vec<String>,
}

fn default_metrics() -> Vec<String> {
    vec![
        "latency_p95".to_string(),
        "throughput".to_string(),
        "success_rate".to_string(),
        "cost".to_string(),
    ]
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            statistical: StatisticalConfig::default(),
            metrics: default_metrics(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a TOML file, falling back to defaults for
    /// anything the file omits
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.thresholds.latency.critical, 0.50);
        assert_eq!(config.thresholds.latency.major, 0.25);
        assert_eq!(config.thresholds.latency.minor, 0.10);
        assert_eq!(config.thresholds.success_rate.critical, 0.10);
        assert_eq!(config.thresholds.success_rate.minor, 0.02);
        assert_eq!(config.statistical.confidence_level, 0.95);
        assert_eq!(config.statistical.min_sample_size, 5);
        assert!(config.statistical.use_welch_t_test);
        assert_eq!(config.statistical.effect_size_threshold, 0.5);
        assert_eq!(
            config.metrics,
            vec!["latency_p95", "throughput", "success_rate", "cost"]
        );
    }

    #[test]
    fn test_config_partial_override() {
        let toml_content = r#"
[thresholds.latency]
critical = 0.80
major = 0.40
minor = 0.15

[statistical]
confidence_level = 0.99
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", toml_content).unwrap();

        let config = AnalysisConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.thresholds.latency.critical, 0.80);
        assert_eq!(config.thresholds.latency.minor, 0.15);
        // Untouched categories keep their defaults
        assert_eq!(config.thresholds.cost.critical, 0.50);
        assert_eq!(config.thresholds.success_rate.critical, 0.10);
        assert_eq!(config.statistical.confidence_level, 0.99);
        assert!(config.statistical.use_welch_t_test);
        assert_eq!(config.metrics.len(), 4);
    }

    #[test]
    fn test_config_metric_set_override() {
        let toml_content = r#"
metrics = ["latency_p50", "latency_p99", "cost"]
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", toml_content).unwrap();

        let config = AnalysisConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.metrics, vec!["latency_p50", "latency_p99", "cost"]);
    }

    #[test]
    fn test_config_empty_file_is_all_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "").unwrap();

        let config = AnalysisConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.thresholds.throughput.major, 0.25);
        assert_eq!(config.metrics.len(), 4);
    }
}

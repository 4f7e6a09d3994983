use crate::models::{ModelRegressionResult, RegressionReport, Severity};
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum, Serialize, Deserialize)]
pub enum OutputFormat {
    Plain,
    Json,
    Summary,
}

/// Print the regression report in the specified format
pub fn print_report(report: &RegressionReport, format: OutputFormat) {
    match format {
        OutputFormat::Plain => print_plain(report),
        OutputFormat::Json => print_json(report),
        OutputFormat::Summary => print_summary(report),
    }
}

/// Print the full report in plain text format
fn print_plain(report: &RegressionReport) {
    println!("=== Regression Analysis ===");
    println!();

    println!("📊 SUMMARY");
    println!("----------");
    println!("{}", report.summary.summary_text);
    println!(
        "Models analyzed: {} | baseline executions: {} | candidate executions: {}",
        report.summary.total_models_analyzed,
        report.summary.total_baseline_executions,
        report.summary.total_candidate_executions
    );
    println!("Worst severity: {}", report.summary.worst_severity);
    println!("Confidence: {:.2}", report.confidence.confidence);
    if !report.constraints.is_empty() {
        let constraints: Vec<String> =
            report.constraints.iter().map(|c| c.to_string()).collect();
        println!("Constraints: {}", constraints.join(", "));
    }
    println!();

    if report.models.is_empty() {
        return;
    }

    println!("📝 MODEL RESULTS");
    println!("----------------");
    for model in &report.models {
        print_model_plain(model);
        println!();
    }
}

/// Print one model's metric table
fn print_model_plain(model: &ModelRegressionResult) {
    println!(
        "{}/{} - {}",
        model.provider_name,
        model.model_id,
        model.overall_severity.to_string().to_uppercase()
    );
    println!("{}", model.summary);

    if model.metric_regressions.is_empty() {
        println!("No comparable metrics.");
        return;
    }

    println!(
        "{:<14} {:>12} {:>12} {:>9} {:<10} {:>9} {:<9}",
        "Metric", "Baseline", "Candidate", "Change", "Direction", "p-value", "Severity"
    );
    println!("{}", "-".repeat(80));

    for metric in &model.metric_regressions {
        println!(
            "{:<14} {:>12.4} {:>12.4} {:>8.1}% {:<10} {:>9.4} {:<9}",
            metric.metric_name,
            metric.baseline_value,
            metric.candidate_value,
            metric.percentage_change * 100.0,
            metric.change_direction,
            metric.statistical_test.p_value,
            metric.severity
        );
    }
}

/// Print only the run and model summary lines
fn print_summary(report: &RegressionReport) {
    println!("{}", report.summary.summary_text);
    for model in &report.models {
        println!("{}", model.summary);
    }
}

/// Print the report in JSON format
fn print_json(report: &RegressionReport) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing report to JSON: {}", e),
    }
}

/// Persist the report as pretty JSON, creating parent directories as needed
pub fn store_report(report: &RegressionReport, path: &Path) -> Result<()> {
    let json_content =
        serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    std::fs::write(path, json_content)
        .with_context(|| format!("Failed to write report to: {}", path.display()))?;

    info!(path = %path.display(), "report stored");
    Ok(())
}

/// True when the CI pipeline should fail: regressions were detected and the
/// worst severity meets or exceeds the caller-chosen threshold
pub fn should_fail(report: &RegressionReport, fail_on: Option<Severity>) -> bool {
    match fail_on {
        Some(threshold) => {
            report.summary.any_regressions_detected && report.summary.worst_severity >= threshold
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::RegressionEngine;
    use crate::config::AnalysisConfig;
    use crate::models::{PerModelStats, RunRecord};
    use tempfile::tempdir;

    fn run(id: &str, p95: f64) -> RunRecord {
        RunRecord {
            execution_id: id.to_string(),
            total_executions: 20,
            model_stats: vec![PerModelStats {
                provider_name: "openai".to_string(),
                model_id: "gpt-4".to_string(),
                latency_p50_ms: p95 * 0.5,
                latency_p95_ms: p95,
                latency_p99_ms: p95 * 1.4,
                avg_tokens_per_second: Some(50.0),
                success_rate: 0.99,
                avg_cost_per_request_usd: 0.002,
                total_executions: 20,
            }],
        }
    }

    fn regressed_report() -> RegressionReport {
        let engine = RegressionEngine::new(AnalysisConfig::default());
        let baseline = vec![run("b-0", 100.0), run("b-1", 101.0), run("b-2", 99.0)];
        let candidate = vec![run("c-0", 160.0), run("c-1", 161.0), run("c-2", 159.0)];
        engine.analyze(&baseline, &candidate, &[]).unwrap()
    }

    fn clean_report() -> RegressionReport {
        let engine = RegressionEngine::new(AnalysisConfig::default());
        let baseline = vec![run("b-0", 100.0), run("b-1", 101.0), run("b-2", 99.0)];
        let candidate = vec![run("c-0", 100.0), run("c-1", 99.0), run("c-2", 101.0)];
        engine.analyze(&baseline, &candidate, &[]).unwrap()
    }

    #[test]
    fn test_plain_output_does_not_panic() {
        print_report(&regressed_report(), OutputFormat::Plain);
        print_report(&clean_report(), OutputFormat::Plain);
    }

    #[test]
    fn test_json_output_does_not_panic() {
        print_report(&regressed_report(), OutputFormat::Json);
    }

    #[test]
    fn test_summary_output_does_not_panic() {
        print_report(&regressed_report(), OutputFormat::Summary);
        print_report(&clean_report(), OutputFormat::Summary);
    }

    #[test]
    fn test_store_report() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("report.json");

        store_report(&regressed_report(), &path).unwrap();

        assert!(path.exists());
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("summary"));
        assert!(content.contains("gpt-4"));
        assert!(content.contains("confidence"));
    }

    #[test]
    fn test_should_fail_threshold_met() {
        let report = regressed_report();
        assert_eq!(report.summary.worst_severity, Severity::Critical);
        assert!(should_fail(&report, Some(Severity::Minor)));
        assert!(should_fail(&report, Some(Severity::Critical)));
    }

    #[test]
    fn test_should_fail_without_threshold() {
        assert!(!should_fail(&regressed_report(), None));
    }

    #[test]
    fn test_should_fail_clean_run() {
        let report = clean_report();
        assert!(!report.summary.any_regressions_detected);
        assert!(!should_fail(&report, Some(Severity::Minor)));
    }
}

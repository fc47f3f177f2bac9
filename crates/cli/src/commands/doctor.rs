use procura_core::config::{AppConfig, LoadOptions};
use procura_core::directory::Directory;
use serde::Serialize;
use tracing::info;

use crate::commands::{escape_json, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    findings: Vec<String>,
}

impl DoctorCheck {
    fn new(name: &'static str, status: CheckStatus, details: impl Into<String>) -> Self {
        Self { name, status, details: details.into(), findings: Vec::new() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Fail { 1 } else { 0 };
    info!(
        event_name = "cli.doctor.completed",
        overall_status = ?report.overall_status,
        checks = report.checks.len(),
        "doctor checks completed"
    );

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\
                 \"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::new(
                "config_validation",
                CheckStatus::Pass,
                "configuration loaded and validated",
            ));
            match config.directory.load() {
                Ok(directory) => {
                    checks.push(DoctorCheck::new(
                        "org_chart_load",
                        CheckStatus::Pass,
                        format!(
                            "loaded {} people from `{}` (version {})",
                            directory.len(),
                            config.directory.path.display(),
                            directory.version()
                        ),
                    ));
                    checks.push(check_data_quality(&directory));
                }
                Err(error) => {
                    checks.push(DoctorCheck::new(
                        "org_chart_load",
                        CheckStatus::Fail,
                        error.to_string(),
                    ));
                    checks.push(DoctorCheck::new(
                        "org_chart_data_quality",
                        CheckStatus::Skipped,
                        "skipped because the org chart did not load",
                    ));
                }
            }
        }
        Err(error) => {
            checks.push(DoctorCheck::new(
                "config_validation",
                CheckStatus::Fail,
                error.to_string(),
            ));
            for name in ["org_chart_load", "org_chart_data_quality"] {
                checks.push(DoctorCheck::new(
                    name,
                    CheckStatus::Skipped,
                    "skipped because configuration did not load",
                ));
            }
        }
    }

    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let warned = checks.iter().any(|check| check.status == CheckStatus::Warn);
    let (overall_status, summary) = match (failed, warned) {
        (true, _) => (CheckStatus::Fail, "doctor: one or more readiness checks failed"),
        (false, true) => {
            (CheckStatus::Warn, "doctor: ready, but the org chart has data-quality findings")
        }
        (false, false) => (CheckStatus::Pass, "doctor: all readiness checks passed"),
    };

    DoctorReport { overall_status, summary: summary.to_string(), checks }
}

/// Findings degrade individual steps to unresolved approvers; they never
/// block loading, so they are reported as warnings.
fn check_data_quality(directory: &Directory) -> DoctorCheck {
    let findings: Vec<String> =
        directory.data_quality_findings().iter().map(|finding| finding.describe()).collect();

    if findings.is_empty() {
        return DoctorCheck::new(
            "org_chart_data_quality",
            CheckStatus::Pass,
            "no dangling references, unassigned roles or reporting cycles",
        );
    }

    DoctorCheck {
        name: "org_chart_data_quality",
        status: CheckStatus::Warn,
        details: format!(
            "{} finding(s); affected approval steps will be unresolved",
            findings.len()
        ),
        findings,
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
        for finding in &check.findings {
            lines.push(format!("    * {finding}"));
        }
    }

    lines.join("\n")
}

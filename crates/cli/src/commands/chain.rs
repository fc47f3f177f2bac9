use anyhow::Context;
use clap::Args;
use procura_core::approvals::{summary, ChainSummary, Subject};
use procura_core::config::{AppConfig, LoadOptions};
use procura_core::directory::DirectoryHandle;
use procura_core::workflow::{Initiation, WorkflowKind, WorkflowOrchestrator};
use serde::Serialize;
use tracing::info;

use crate::commands::CommandResult;

#[derive(Debug, Clone, Args)]
pub struct ChainArgs {
    #[arg(long, help = "Workflow kind, e.g. purchase_requisition or budget_code")]
    pub kind: WorkflowKind,
    #[arg(long, conflicts_with = "department", help = "Subject employee email")]
    pub employee: Option<String>,
    #[arg(long, help = "Subject department name")]
    pub department: Option<String>,
    #[arg(long, help = "Document creator email")]
    pub creator: Option<String>,
    #[arg(long, help = "Emit machine-readable JSON output")]
    pub json: bool,
}

impl ChainArgs {
    fn subject(&self) -> Subject {
        match (&self.employee, &self.department) {
            (Some(email), _) => Subject::Employee(email.clone()),
            (None, Some(department)) => Subject::Department(department.clone()),
            (None, None) => Subject::Unassigned,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChainReport<'a> {
    command: &'static str,
    kind: WorkflowKind,
    directory_version: String,
    #[serde(flatten)]
    initiation: &'a Initiation,
    summary: ChainSummary,
}

pub fn run(args: &ChainArgs) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("chain", "config_validation", error.to_string(), 2)
        }
    };
    let directory = match config.directory.load() {
        Ok(directory) => directory,
        Err(error) => {
            return CommandResult::failure("chain", "org_chart_load", error.to_string(), 3)
        }
    };
    let directory_version = directory.version().to_string();

    let orchestrator = WorkflowOrchestrator::new(DirectoryHandle::new(directory), config.workflow);
    let initiation = orchestrator.initiate(&args.subject(), args.creator.as_deref(), args.kind);
    info!(
        event_name = "cli.chain.previewed",
        kind = %args.kind,
        steps = initiation.chain.len(),
        fallback = initiation.fallback_reason.is_some(),
        directory_version = %directory_version,
        "approval chain preview built"
    );
    let report = ChainReport {
        command: "chain",
        kind: args.kind,
        directory_version,
        summary: summary(&initiation.chain),
        initiation: &initiation,
    };

    let rendered = if args.json { render_json(&report) } else { Ok(render_human(&report)) };
    match rendered {
        Ok(output) => CommandResult { exit_code: 0, output },
        Err(error) => CommandResult::failure("chain", "serialization", format!("{error:#}"), 4),
    }
}

fn render_json(report: &ChainReport<'_>) -> anyhow::Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize chain report")
}

fn render_human(report: &ChainReport<'_>) -> String {
    let initiation = report.initiation;
    let mut lines = vec![format!(
        "{} chain ({} steps, directory {}): {}",
        report.kind,
        initiation.chain.len(),
        report.directory_version,
        initiation.status_label
    )];

    if let Some(reason) = &initiation.fallback_reason {
        lines.push(format!("fallback chain used: {reason}"));
    }

    for step in initiation.chain.steps() {
        let who = match step.approver.email.as_deref() {
            Some(email) => format!("{} <{email}>", step.approver.name),
            None => format!("<unresolved {}>", step.approver.role),
        };
        let status = step.status.as_str();
        let mut line = format!("- level {} [{status}] {who} ({})", step.level, step.approver.role);
        if let Some(reason) = &step.skip_reason {
            line.push_str(&format!(": {reason}"));
        }
        lines.push(line);
    }

    match &initiation.notify {
        Some(target) => lines.push(format!("notify: {} <{}>", target.name, target.email)),
        None => lines.push("notify: nobody".to_string()),
    }

    lines.join("\n")
}

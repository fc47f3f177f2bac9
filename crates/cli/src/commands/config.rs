use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use procura_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let escalation_tail = config
        .workflow
        .escalation_tail
        .iter()
        .map(|role| role.key())
        .collect::<Vec<_>>()
        .join(", ");

    let lines = vec![
        "effective config (source precedence: env > file > default):".to_string(),
        render_line(
            "directory.path",
            &config.directory.path.display().to_string(),
            source("directory.path", &["PROCURA_DIRECTORY_PATH"]),
        ),
        render_line(
            "workflow.escalation_tail",
            &format!("[{escalation_tail}]"),
            source("workflow.escalation_tail", &["PROCURA_WORKFLOW_ESCALATION_TAIL"]),
        ),
        render_line(
            "workflow.grade_min",
            &config.workflow.grade_min.to_string(),
            source("workflow.grade_min", &["PROCURA_WORKFLOW_GRADE_MIN"]),
        ),
        render_line(
            "workflow.grade_max",
            &config.workflow.grade_max.to_string(),
            source("workflow.grade_max", &["PROCURA_WORKFLOW_GRADE_MAX"]),
        ),
        render_line(
            "logging.level",
            &config.logging.level,
            source("logging.level", &["PROCURA_LOGGING_LEVEL", "PROCURA_LOG_LEVEL"]),
        ),
        render_line(
            "logging.format",
            &format!("{:?}", config.logging.format),
            source("logging.format", &["PROCURA_LOGGING_FORMAT", "PROCURA_LOG_FORMAT"]),
        ),
    ];

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("procura.toml"), PathBuf::from("config/procura.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

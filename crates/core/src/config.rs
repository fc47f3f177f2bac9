use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::directory::{Directory, DirectoryError, OrgChart, Role};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub directory: DirectoryConfig,
    pub workflow: WorkflowConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryConfig {
    pub path: PathBuf,
}

impl DirectoryConfig {
    /// Reads and validates the org chart this configuration points at.
    pub fn load(&self) -> Result<Directory, DirectoryError> {
        Directory::from_org_chart(OrgChart::load(&self.path)?)
    }
}

/// Tunables shared by every workflow kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Roles appended after the supervisory walk, in order.
    pub escalation_tail: Vec<Role>,
    pub grade_min: Decimal,
    pub grade_max: Decimal,
}

impl WorkflowConfig {
    pub fn grade_in_range(&self, grade: Decimal) -> bool {
        grade >= self.grade_min && grade <= self.grade_max
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            escalation_tail: vec![Role::Finance, Role::Coordinator, Role::TopApprover],
            grade_min: Decimal::ZERO,
            grade_max: Decimal::ONE_HUNDRED,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub directory_path: Option<PathBuf>,
    pub escalation_tail: Option<Vec<Role>>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            directory: DirectoryConfig { path: PathBuf::from("config/org_chart.toml") },
            workflow: WorkflowConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("procura.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(directory) = patch.directory {
            if let Some(path) = directory.path {
                self.directory.path = path;
            }
        }

        if let Some(workflow) = patch.workflow {
            if let Some(escalation_tail) = workflow.escalation_tail {
                self.workflow.escalation_tail = escalation_tail;
            }
            if let Some(grade_min) = workflow.grade_min {
                self.workflow.grade_min = grade_min;
            }
            if let Some(grade_max) = workflow.grade_max {
                self.workflow.grade_max = grade_max;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("PROCURA_DIRECTORY_PATH") {
            self.directory.path = PathBuf::from(value);
        }

        if let Some(value) = read_env("PROCURA_WORKFLOW_ESCALATION_TAIL") {
            self.workflow.escalation_tail =
                parse_roles("PROCURA_WORKFLOW_ESCALATION_TAIL", &value)?;
        }
        if let Some(value) = read_env("PROCURA_WORKFLOW_GRADE_MIN") {
            self.workflow.grade_min = parse_decimal("PROCURA_WORKFLOW_GRADE_MIN", &value)?;
        }
        if let Some(value) = read_env("PROCURA_WORKFLOW_GRADE_MAX") {
            self.workflow.grade_max = parse_decimal("PROCURA_WORKFLOW_GRADE_MAX", &value)?;
        }

        let log_level =
            read_env("PROCURA_LOGGING_LEVEL").or_else(|| read_env("PROCURA_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PROCURA_LOGGING_FORMAT").or_else(|| read_env("PROCURA_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(directory_path) = overrides.directory_path {
            self.directory.path = directory_path;
        }
        if let Some(escalation_tail) = overrides.escalation_tail {
            self.workflow.escalation_tail = escalation_tail;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_directory(&self.directory)?;
        validate_workflow(&self.workflow)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("procura.toml"), PathBuf::from("config/procura.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_directory(directory: &DirectoryConfig) -> Result<(), ConfigError> {
    if directory.path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "directory.path must point at an org chart TOML file".to_string(),
        ));
    }
    Ok(())
}

fn validate_workflow(workflow: &WorkflowConfig) -> Result<(), ConfigError> {
    if let Some(role) = workflow.escalation_tail.iter().find(|role| role.is_subject_specific()) {
        return Err(ConfigError::Validation(format!(
            "workflow.escalation_tail cannot contain `{role}`: it depends on the subject's \
             department and the supervisory walk already covers it"
        )));
    }

    if workflow.grade_min >= workflow.grade_max {
        return Err(ConfigError::Validation(format!(
            "workflow.grade_min ({}) must be lower than workflow.grade_max ({})",
            workflow.grade_min, workflow.grade_max
        )));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value.trim().parse::<Decimal>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_roles(key: &str, value: &str) -> Result<Vec<Role>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry.parse::<Role>().map_err(|_| ConfigError::InvalidEnvOverride {
                key: key.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    directory: Option<DirectoryPatch>,
    workflow: Option<WorkflowPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DirectoryPatch {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct WorkflowPatch {
    escalation_tail: Option<Vec<Role>>,
    grade_min: Option<Decimal>,
    grade_max: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

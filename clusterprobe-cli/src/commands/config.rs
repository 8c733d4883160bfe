//! `clusterprobe config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use clusterprobe_core::config::ScenarioConfig;
use clusterprobe_core::{ClusterprobeConfig, Infrastructure};

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Environment keys containing one of these fragments are redacted by `config show`.
const SENSITIVE_KEY_FRAGMENTS: &[&str] = &["SECRET", "TOKEN", "PASSWORD", "KEY", "CREDENTIAL"];

const REDACTED: &str = "***REDACTED***";

const SECTIONS: &[&str] = &[
    "general",
    "binary",
    "runner",
    "tunnel",
    "readiness",
    "conformance",
    "generator",
    "infrastructures",
    "scenarios",
];

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

/// Load and validate the configuration file, reporting any errors.
///
/// # Errors
///
/// Returns `CliError::Config` if loading or validation fails.
async fn execute_validate(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let report = match ClusterprobeConfig::load(config_path).await {
        Ok(config) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: true,
            scenarios: config.scenarios.len(),
            infrastructures: config.infrastructures.len(),
            errors: Vec::new(),
        },
        Err(e) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: false,
            scenarios: 0,
            infrastructures: 0,
            errors: vec![e.to_string()],
        },
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }
    Ok(())
}

/// Show the effective configuration (file + env overrides + defaults),
/// with sensitive infrastructure environment values redacted.
async fn execute_show(
    config_path: &Path,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "loading configuration");

    let mut config = ClusterprobeConfig::load(config_path).await?;
    redact_environ(&mut config);

    let config_toml = match section.as_deref() {
        None => to_toml(&config),
        Some("general") => to_toml(&config.general),
        Some("binary") => to_toml(&config.binary),
        Some("runner") => to_toml(&config.runner),
        Some("tunnel") => to_toml(&config.tunnel),
        Some("readiness") => to_toml(&config.readiness),
        Some("conformance") => to_toml(&config.conformance),
        Some("generator") => to_toml(&config.generator),
        Some("infrastructures") => to_toml(&InfrastructuresSection {
            infrastructures: &config.infrastructures,
        }),
        Some("scenarios") => to_toml(&ScenariosSection {
            scenarios: &config.scenarios,
        }),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {} (expected: {})",
                other,
                SECTIONS.join(", ")
            )));
        }
    };

    writer.render(&ConfigReport {
        source: config_path.display().to_string(),
        section,
        config_toml,
    })?;
    Ok(())
}

/// Array sections are wrapped in a table to serialize as TOML.
#[derive(Serialize)]
struct InfrastructuresSection<'a> {
    infrastructures: &'a [Infrastructure],
}

#[derive(Serialize)]
struct ScenariosSection<'a> {
    scenarios: &'a [ScenarioConfig],
}

fn to_toml<T: Serialize + ?Sized>(value: &T) -> String {
    toml::to_string_pretty(value).unwrap_or_else(|e| format!("(serialization error: {})", e))
}

fn is_sensitive(key: &str) -> bool {
    let upper = key.to_ascii_uppercase();
    SENSITIVE_KEY_FRAGMENTS.iter().any(|f| upper.contains(f))
}

/// Replace sensitive infrastructure environment values with a placeholder.
fn redact_environ(config: &mut ClusterprobeConfig) {
    for infra in &mut config.infrastructures {
        for (key, value) in infra.environ.iter_mut() {
            if is_sensitive(key) && !value.is_empty() {
                *value = REDACTED.to_owned();
            }
        }
    }
}

/// Configuration display report.
///
/// `config_toml` is only used for text rendering.
#[derive(Serialize)]
pub struct ConfigReport {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{}]", section);
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;
        Ok(())
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    pub source: String,
    pub valid: bool,
    pub scenarios: usize,
    pub infrastructures: usize,
    /// Empty if valid
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
            writeln!(
                w,
                "  Catalog: {} scenario(s), {} infrastructure(s)",
                self.scenarios, self.infrastructures
            )?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }
        Ok(())
    }
}

//! `clusterprobe generate` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use clusterprobe_core::{ClusterprobeConfig, Registry};
use clusterprobe_generator::{GenerateRequest, Generator, GeneratorMode, write_artifact};

use crate::cli::GenerateArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `generate` command.
///
/// All job specs are parsed and validated before anything is rendered or written.
pub async fn execute(
    args: GenerateArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let mode: GeneratorMode = args.mode.parse()?;
    let requests = args
        .jobs
        .iter()
        .map(|job| job.parse::<GenerateRequest>())
        .collect::<Result<Vec<_>, _>>()?;

    let config = ClusterprobeConfig::load(config_path).await?;
    let registry = Registry::from_config(&config)?;
    let artifact = Generator::new(&registry, &config.generator).generate(&requests, mode)?;

    let report = match args.output {
        Some(path) => {
            write_artifact(&path, &artifact)?;
            info!(path = %path.display(), mode = %mode, "artifact written");
            GenerateReport {
                mode: mode.as_str(),
                jobs: requests.len(),
                output: Some(path.display().to_string()),
                content: None,
            }
        }
        None => GenerateReport {
            mode: mode.as_str(),
            jobs: requests.len(),
            output: None,
            content: Some(artifact),
        },
    };

    writer.render(&report)?;
    Ok(())
}

/// Generation result.
///
/// Without `--output`, text format prints the artifact verbatim so it can be
/// redirected into a file.
#[derive(Serialize)]
pub struct GenerateReport {
    pub mode: &'static str,
    pub jobs: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl Render for GenerateReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        match (&self.content, &self.output) {
            (Some(content), _) => write!(w, "{content}"),
            (None, Some(path)) => writeln!(
                w,
                "Generated {} {} artifact(s) -> {}",
                self.jobs,
                self.mode,
                path.bold()
            ),
            (None, None) => Ok(()),
        }
    }
}

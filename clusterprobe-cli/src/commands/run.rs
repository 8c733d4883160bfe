//! `clusterprobe run` command handler

use std::io::Write;
use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use clusterprobe_core::{ClusterprobeConfig, Registry};
use clusterprobe_scenario::{ScenarioDriver, ScenarioReport};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `run` command.
///
/// Binding errors (unknown names, wrong version count, malformed versions)
/// are reported before the management binary is invoked. Ctrl-C cancels the
/// run and waits for the proxy tunnel to shut down; a second Ctrl-C stops
/// waiting.
pub async fn execute(
    args: RunArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = ClusterprobeConfig::load(config_path).await?;
    let registry = Registry::from_config(&config)?;
    let scenario = registry.bind(&args.scenario, &args.infra, &args.versions)?;

    info!(
        scenario = %args.scenario,
        infra = %args.infra,
        versions = %args.versions.join(","),
        "starting scenario"
    );

    let cancel = CancellationToken::new();
    let driver = ScenarioDriver::from_config(&config)?.with_cancellation(cancel.clone());

    let run = driver.run(&scenario);
    tokio::pin!(run);

    let report = tokio::select! {
        result = &mut run => result?,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupt received, stopping scenario");
            cancel.cancel();
            tokio::select! {
                result = &mut run => result?,
                _ = tokio::signal::ctrl_c() => {
                    warn!("second interrupt received, not waiting for tunnel shutdown");
                    return Err(CliError::Command("scenario interrupted".to_owned()));
                }
            }
        }
    };

    writer.render(&report)?;
    Ok(())
}

impl Render for ScenarioReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "Scenario {} on {}: {} ({:.1}s, run {})",
            self.scenario.bold(),
            self.infra.bold(),
            "PASSED".green().bold(),
            self.elapsed_secs,
            self.run_id
        )?;

        writeln!(w)?;
        writeln!(w, "{:<6} {:<10} {:<20}", "Step", "Operation", "Version")?;
        writeln!(w, "{}", "-".repeat(38))?;
        for op in &self.operations {
            writeln!(w, "{:<6} {:<10} {:<20}", op.step, op.operation, op.version)?;
        }

        let nodes = &self.validation.nodes;
        let ready = nodes.iter().filter(|n| n.ready).count();
        writeln!(w)?;
        writeln!(w, "Final version: {}", self.final_version)?;
        writeln!(w, "Nodes ready:   {}/{}", ready, nodes.len())?;

        let conformance = &self.validation.conformance;
        writeln!(
            w,
            "Conformance:   {} ({} mode, {} passed, {} failed, {} skipped)",
            conformance.status,
            conformance.mode,
            conformance.passed,
            conformance.failed,
            conformance.skipped
        )?;
        Ok(())
    }
}

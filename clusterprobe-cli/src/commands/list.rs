//! `clusterprobe list` command handler

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use clusterprobe_core::{ClusterprobeConfig, Registry};

use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `list` command.
pub async fn execute(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    let config = ClusterprobeConfig::load(config_path).await?;
    let registry = Registry::from_config(&config)?;
    writer.render(&CatalogReport::from_registry(&registry))?;
    Ok(())
}

#[derive(Serialize)]
pub struct ScenarioEntry {
    pub name: String,
    pub title: String,
    pub kind: &'static str,
    pub manifest_template: String,
}

#[derive(Serialize)]
pub struct InfrastructureEntry {
    pub name: String,
    pub provider: &'static str,
    pub labels: BTreeMap<String, String>,
}

/// Registered catalog, sorted by name.
#[derive(Serialize)]
pub struct CatalogReport {
    pub scenarios: Vec<ScenarioEntry>,
    pub infrastructures: Vec<InfrastructureEntry>,
}

impl CatalogReport {
    pub fn from_registry(registry: &Registry) -> Self {
        Self {
            scenarios: registry
                .scenarios()
                .map(|s| ScenarioEntry {
                    name: s.name().to_owned(),
                    title: s.title(),
                    kind: s.kind().as_str(),
                    manifest_template: s.manifest_template().display().to_string(),
                })
                .collect(),
            infrastructures: registry
                .infrastructures()
                .map(|i| InfrastructureEntry {
                    name: i.name.clone(),
                    provider: i.provider.as_str(),
                    labels: i.labels.clone(),
                })
                .collect(),
        }
    }
}

impl Render for CatalogReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "{}", "Scenarios".bold())?;
        writeln!(w, "{:<28} {:<10} {:<40}", "Name", "Kind", "Manifest")?;
        writeln!(w, "{}", "-".repeat(78))?;
        for s in &self.scenarios {
            writeln!(w, "{:<28} {:<10} {:<40}", s.name, s.kind, s.manifest_template)?;
        }

        writeln!(w)?;
        writeln!(w, "{}", "Infrastructures".bold())?;
        writeln!(w, "{:<28} {:<14} {:<36}", "Name", "Provider", "Labels")?;
        writeln!(w, "{}", "-".repeat(78))?;
        for i in &self.infrastructures {
            let labels = i
                .labels
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(",");
            writeln!(w, "{:<28} {:<14} {:<36}", i.name, i.provider, labels)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clusterprobe_core::{Infrastructure, Provider, Scenario, ScenarioKind};

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register_infrastructure(
                Infrastructure::new("hetzner", Provider::Hetzner, "/tf/hetzner")
                    .with_label("preset-hetzner", "true"),
            )
            .unwrap();
        registry
            .register_infrastructure(Infrastructure::new("aws_default", Provider::Aws, "/tf/aws"))
            .unwrap();
        registry
            .register_scenario(Scenario::new(
                "upgrade_containerd",
                ScenarioKind::Upgrade,
                "manifests/upgrade.yaml",
            ))
            .unwrap();
        registry
    }

    #[test]
    fn catalog_is_sorted_by_name() {
        let report = CatalogReport::from_registry(&registry());
        let infra: Vec<_> = report.infrastructures.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(infra, vec!["aws_default", "hetzner"]);
        assert_eq!(report.scenarios[0].title, "UpgradeContainerd");
        assert_eq!(report.scenarios[0].kind, "upgrade");
    }

    #[test]
    fn text_lists_labels() {
        colored::control::set_override(false);
        let mut buffer = Vec::new();
        CatalogReport::from_registry(&registry())
            .render_text(&mut buffer)
            .unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert!(output.contains("upgrade_containerd"));
        assert!(output.contains("preset-hetzner=true"));
    }
}

//! Command summaries in human-readable or JSON form
//!
//! ```
//! use buildgen::cli::output::{OutputFormat, OutputFormatter};
//! use buildgen::identity::KeyMaterial;
//!
//! let material = KeyMaterial::from_key_bytes(&buildgen::identity::ECMA_KEY).unwrap();
//! let text = OutputFormatter::new(OutputFormat::Human).format_key(&material).unwrap();
//! assert!(text.contains("b77a5c561934e089"));
//! ```

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write;

use crate::archive::ArchiveSummary;
use crate::identity::KeyMaterial;
use crate::patch::PatchSummary;
use crate::script::GenerationReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

fn to_json<T: Serialize>(value: &T, what: &str) -> Result<String> {
    serde_json::to_string_pretty(value).with_context(|| format!("Failed to serialize {} to JSON", what))
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_report(&self, report: &GenerationReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(report, "generation report"),
            OutputFormat::Human => Ok(self.format_report_human(report)),
        }
    }

    pub fn format_key(&self, material: &KeyMaterial) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(material, "key material"),
            OutputFormat::Human => Ok(format!(
                "Public key: {}\nPublic key token: {}",
                material.public_key, material.token
            )),
        }
    }

    pub fn format_patch(&self, summary: &PatchSummary) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(summary, "patch summary"),
            OutputFormat::Human => {
                let mut out = String::new();
                let _ = writeln!(
                    out,
                    "Patched {} file(s), {} already up to date",
                    summary.rewritten.len(),
                    summary.unchanged.len()
                );
                for path in &summary.rewritten {
                    let _ = writeln!(out, "  {}", path.display());
                }
                Ok(out.trim_end().to_string())
            }
        }
    }

    pub fn format_archive(&self, summary: &ArchiveSummary) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(summary, "archive summary"),
            OutputFormat::Human => Ok(format!(
                "Created {} with {} entr{}",
                summary.archive.display(),
                summary.entries.len(),
                if summary.entries.len() == 1 { "y" } else { "ies" }
            )),
        }
    }

    fn format_report_human(&self, report: &GenerationReport) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Build script: {}", report.output.display());
        let _ = writeln!(out);

        let _ = writeln!(out, "Projects:");
        if report.partitions.is_empty() {
            let _ = writeln!(out, "  (none found)");
        }
        for partition in &report.partitions {
            let _ = write!(out, "  {:<10} {:>5} to build", partition.platform.to_string(), partition.built);
            if !partition.dropped.is_empty() {
                let _ = write!(out, ", {} dropped", partition.dropped.len());
            }
            if partition.cycles > 0 {
                let _ = write!(out, ", {} cycle edge(s)", partition.cycles);
            }
            let _ = writeln!(out);
        }
        let _ = writeln!(out, "  Total      {:>5}", report.total_built());

        if !report.filtered.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Filtered out ({}):", report.filtered.len());
            for unit in &report.filtered {
                let _ = writeln!(out, "  {} ({})", unit.name, unit.reason);
            }
        }

        let dropped: Vec<&String> = report.partitions.iter().flat_map(|p| &p.dropped).collect();
        if !dropped.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Dropped because of excluded dependencies ({}):", dropped.len());
            for name in dropped {
                let _ = writeln!(out, "  {}", name);
            }
        }

        if !report.skipped_descriptors.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Unreadable project files ({}):", report.skipped_descriptors.len());
            for path in &report.skipped_descriptors {
                let _ = writeln!(out, "  {}", path.display());
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "References: {} external name(s), {} file(s)",
            report.external_refs.len(),
            report.reference_files.len()
        );
        match &report.task_assembly {
            Some(path) => {
                let _ = writeln!(
                    out,
                    "Build tasks: {} ({} targets file(s) updated)",
                    path.display(),
                    report.retargeted.len()
                );
            }
            None => {
                let _ = writeln!(out, "Build tasks: not found");
            }
        }
        let _ = writeln!(out, "Identity marker files: {}", report.patch_files.len());
        if let Some(path) = &report.assembly_folders_file {
            let _ = writeln!(out, "Assembly folders: {}", path.display());
        }

        out.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::Platform;
    use crate::script::{FilterReason, FilteredUnit, PartitionSummary};
    use std::path::PathBuf;

    fn report() -> GenerationReport {
        GenerationReport {
            output: PathBuf::from("/out/build.proj"),
            partitions: vec![
                PartitionSummary {
                    platform: Platform::Standard,
                    built: 3,
                    dropped: vec![],
                    cycles: 0,
                },
                PartitionSummary {
                    platform: Platform::Windows,
                    built: 10,
                    dropped: vec!["DevExpress.App".to_string()],
                    cycles: 1,
                },
            ],
            filtered: vec![FilteredUnit {
                name: "DevExpress.Tests".to_string(),
                reason: FilterReason::Test,
            }],
            external_refs: vec!["DevExpress.Data".to_string()],
            reference_files: vec![PathBuf::from("/refs/DevExpress.Data.dll")],
            ..Default::default()
        }
    }

    #[test]
    fn test_human_report() {
        let text = OutputFormatter::new(OutputFormat::Human)
            .format_report(&report())
            .unwrap();
        assert!(text.starts_with("Build script: /out/build.proj"));
        assert!(text.contains("Windows       10 to build, 1 dropped, 1 cycle edge(s)"));
        assert!(text.contains("Total         13"));
        assert!(text.contains("DevExpress.Tests (test project)"));
        assert!(text.contains("Dropped because of excluded dependencies (1):\n  DevExpress.App"));
        assert!(text.contains("Build tasks: not found"));
    }

    #[test]
    fn test_json_report() {
        let text = OutputFormatter::new(OutputFormat::Json)
            .format_report(&report())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["partitions"][1]["platform"], "Windows");
        assert_eq!(value["filtered"][0]["reason"], "test");
        assert_eq!(value["external_refs"][0], "DevExpress.Data");
    }

    #[test]
    fn test_key_formats() {
        let material = KeyMaterial {
            public_key: "0024".to_string(),
            token: "b77a5c561934e089".to_string(),
        };
        let human = OutputFormatter::new(OutputFormat::Human).format_key(&material).unwrap();
        assert_eq!(human, "Public key: 0024\nPublic key token: b77a5c561934e089");
        let json = OutputFormatter::new(OutputFormat::Json).format_key(&material).unwrap();
        assert!(json.contains("\"token\": \"b77a5c561934e089\""));
    }

    #[test]
    fn test_archive_summary() {
        let summary = ArchiveSummary {
            archive: PathBuf::from("a.zip"),
            entries: vec!["x".to_string()],
        };
        let text = OutputFormatter::new(OutputFormat::Human)
            .format_archive(&summary)
            .unwrap();
        assert_eq!(text, "Created a.zip with 1 entry");
    }
}

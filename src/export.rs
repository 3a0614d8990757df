use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::dns::ResolvedEntry;
use crate::scanner::DiscoveryReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One `subdomain -> ip` line per entry
    Txt,
    /// The full discovery report
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Txt => "txt",
            OutputFormat::Json => "json",
        }
    }
}

/// `<dir>/subdomains_<domain>.<ext>`
pub fn default_output_path(output_dir: &Path, domain: &str, format: OutputFormat) -> PathBuf {
    output_dir.join(format!("subdomains_{}.{}", domain, format.extension()))
}

pub fn export_txt(entries: &[ResolvedEntry], output_path: &Path) -> Result<()> {
    debug!("Exporting {} subdomains to TXT: {}", entries.len(), output_path.display());

    let file = File::create(output_path)
        .with_context(|| format!("Failed to create {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);

    for entry in entries {
        writeln!(writer, "{} -> {}", entry.subdomain, entry.ip)?;
    }

    writer.flush()?;
    info!("Exported {} subdomains to TXT: {}", entries.len(), output_path.display());
    Ok(())
}

#[derive(Serialize)]
struct JsonExport<'a> {
    generated_at: DateTime<Utc>,
    #[serde(flatten)]
    report: &'a DiscoveryReport,
}

pub fn export_json(report: &DiscoveryReport, output_path: &Path) -> Result<()> {
    debug!("Exporting {} subdomains to JSON: {}", report.subdomains.len(), output_path.display());

    let export = JsonExport {
        generated_at: Utc::now(),
        report,
    };
    let json_string = serde_json::to_string_pretty(&export)?;

    let mut file = File::create(output_path)
        .with_context(|| format!("Failed to create {}", output_path.display()))?;
    file.write_all(json_string.as_bytes())?;
    file.write_all(b"\n")?;

    info!("Exported {} subdomains to JSON: {}", report.subdomains.len(), output_path.display());
    Ok(())
}

/// Write the report in `format`, creating the parent directory if needed.
pub fn export_report(
    report: &DiscoveryReport,
    format: OutputFormat,
    output_path: &Path,
) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
    }

    match format {
        OutputFormat::Txt => export_txt(&report.subdomains, output_path),
        OutputFormat::Json => export_json(report, output_path),
    }
}

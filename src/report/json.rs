//! JSON output formatting

use super::DispatchReport;
use crate::Result;
use anyhow::Context;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Serialize a report to a JSON string
pub fn to_json_string(report: &DispatchReport, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };
    Ok(json)
}

/// Write a report to a JSON file
pub fn write_json_file(path: &Path, report: &DispatchReport, pretty: bool) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create report file: {}", path.display()))?;
    let writer = BufWriter::new(file);

    if pretty {
        serde_json::to_writer_pretty(writer, report)?;
    } else {
        serde_json::to_writer(writer, report)?;
    }
    Ok(())
}

/// Read a report back from a JSON file
pub fn read_json_file(path: &Path) -> Result<DispatchReport> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read report file: {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse report file: {}", path.display()))
}

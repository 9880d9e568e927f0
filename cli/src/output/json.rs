use anyhow::Result;
use pbix_inspect::{ArchiveEntry, Model, ModelOutcome, PbixPackage};
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    file: String,
    entries: &'a [ArchiveEntry],
    total_files: usize,
    model_status: &'static str,
    model: Option<&'a Model>,
}

pub fn write_json_report<W: Write>(
    w: &mut W,
    pkg: &PbixPackage,
    outcome: Option<&ModelOutcome>,
) -> Result<()> {
    let report = JsonReport {
        file: pkg.file_name(),
        entries: pkg.entries(),
        total_files: pkg.total_files(),
        model_status: model_status(outcome),
        model: outcome.and_then(ModelOutcome::model),
    };
    serde_json::to_writer_pretty(&mut *w, &report)?;
    writeln!(w)?;
    Ok(())
}

fn model_status(outcome: Option<&ModelOutcome>) -> &'static str {
    match outcome {
        None => "skipped",
        Some(ModelOutcome::Loaded(_)) => "loaded",
        Some(ModelOutcome::NotEmbedded) => "notEmbedded",
        Some(ModelOutcome::Failed(_)) => "failed",
    }
}

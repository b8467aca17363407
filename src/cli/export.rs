use std::path::PathBuf;

use crate::cli::today;
use crate::error::Result;
use crate::export::{export_filename, DocumentRenderer, ExportFormat, SpreadsheetRenderer};
use crate::report::Report;
use crate::settings::load_settings;

fn default_path(report: &Report, format: ExportFormat) -> PathBuf {
    load_settings()
        .exports_dir()
        .join(export_filename(report.kind.as_str(), today(), format))
}

fn write_file(bytes: &[u8], path: &PathBuf) -> Result<String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    let display = format!("{}", path.display());
    println!("Wrote {display}");
    Ok(display)
}

fn title_for(report: &Report) -> String {
    let company = load_settings().company_name;
    if company.is_empty() {
        report.kind.title().to_string()
    } else {
        format!("{company} {}", report.kind.title())
    }
}

/// Render `report` and write it to `output` or the exports directory.
/// Returns the written path.
pub fn write_report(
    report: &Report,
    format: ExportFormat,
    output: Option<String>,
    summary_sheet: bool,
) -> Result<String> {
    let title = title_for(report);
    let bytes = match format {
        ExportFormat::Spreadsheet => {
            let renderer = if summary_sheet {
                SpreadsheetRenderer::new().with_summary_sheet()
            } else {
                SpreadsheetRenderer::new()
            };
            renderer.render(report, &title)?
        }
        ExportFormat::Document => DocumentRenderer::new().render(report, &title)?,
    };
    let path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| default_path(report, format));
    write_file(&bytes, &path)
}

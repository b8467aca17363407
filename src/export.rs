use std::fmt;
use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use chrono::NaiveDate;
use docx_rs::{Docx, Paragraph, Run, Table, TableCell, TableRow};
use rust_xlsxwriter::{Format, FormatBorder, Workbook, Worksheet};

use crate::error::{PayrollError, Result};
use crate::fmt::{money, number};
use crate::report::{total_label, CellValue, Column, ColumnKind, Report, NOT_AVAILABLE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Spreadsheet,
    Document,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "spreadsheet" | "xlsx" => Ok(ExportFormat::Spreadsheet),
            "document" | "docx" => Ok(ExportFormat::Document),
            _ => Err(PayrollError::UnsupportedFormat(s.to_string())),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Spreadsheet => "xlsx",
            ExportFormat::Document => "docx",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Spreadsheet => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Document => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Spreadsheet => f.write_str("spreadsheet"),
            ExportFormat::Document => f.write_str("document"),
        }
    }
}

/// `<report-type>-<YYYY-MM-DD>.<extension>`
pub fn export_filename(report_type: &str, date: NaiveDate, format: ExportFormat) -> String {
    format!(
        "{report_type}-{}.{}",
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

/// Serializes an assembled report. Never mutates the report.
pub fn render(report: &Report, format: ExportFormat, title: &str) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Spreadsheet => SpreadsheetRenderer::new().render(report, title),
        ExportFormat::Document => DocumentRenderer::new().render(report, title),
    }
}

/// Stringifies a cell the way both renderers show it to people.
pub fn display_cell(cell: &CellValue, column: &Column) -> String {
    match (cell, column.kind) {
        (CellValue::Number(n), ColumnKind::Money) => money(*n),
        (CellValue::Number(n), _) => number(*n),
        (CellValue::Empty, _) => NOT_AVAILABLE.to_string(),
        (other, _) => other.to_string(),
    }
}

fn summary_line(report: &Report) -> String {
    report
        .ordered_totals()
        .into_iter()
        .map(|(key, value)| {
            let label = total_label(report.columns, key);
            if report.is_money(key) {
                format!("{label}: {}", money(value))
            } else {
                format!("{label}: {}", number(value))
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

// ---------------------------------------------------------------------------
// Spreadsheet
// ---------------------------------------------------------------------------

const SUMMARY_SHEET: &str = "Summary";

fn xlsx_err(e: rust_xlsxwriter::XlsxError) -> PayrollError {
    PayrollError::Spreadsheet(e.to_string())
}

/// Sheet names are capped at 31 characters, may not contain `[]:*?/\` and
/// may not start or end with an apostrophe.
fn sheet_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .collect();
    let cleaned: String = cleaned.trim().trim_matches('\'').trim().chars().take(31).collect();
    let cleaned = cleaned.trim_end().trim_end_matches('\'').trim_end();
    if cleaned.is_empty() {
        "Report".to_string()
    } else {
        cleaned.to_string()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpreadsheetRenderer {
    include_summary: bool,
}

impl SpreadsheetRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a second sheet holding the report totals.
    pub fn with_summary_sheet(mut self) -> Self {
        self.include_summary = true;
        self
    }

    pub fn render(&self, report: &Report, title: &str) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let header = Format::new().set_bold().set_border(FormatBorder::Thin);
        let currency = Format::new().set_num_format("#,##0.00");

        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name(title)).map_err(xlsx_err)?;
        write_rows(sheet, report, &header, &currency)?;

        if self.include_summary {
            let summary = workbook.add_worksheet();
            summary.set_name(SUMMARY_SHEET).map_err(xlsx_err)?;
            write_summary(summary, report, &header, &currency)?;
        }

        workbook.save_to_buffer().map_err(xlsx_err)
    }
}

fn write_rows(sheet: &mut Worksheet, report: &Report, header: &Format, currency: &Format) -> Result<()> {
    for (col, column) in report.columns.iter().enumerate() {
        let col = col as u16;
        sheet
            .write_string_with_format(0, col, column.header, header)
            .map_err(xlsx_err)?;
        let width = if column.kind == ColumnKind::Text { 22 } else { 14 };
        sheet.set_column_width(col, width).map_err(xlsx_err)?;
    }

    for (i, row) in report.rows.iter().enumerate() {
        let r = i as u32 + 1;
        for (col, (cell, column)) in row.iter().zip(report.columns).enumerate() {
            let col = col as u16;
            match cell {
                CellValue::Number(n) if column.kind == ColumnKind::Money => {
                    sheet.write_number_with_format(r, col, *n, currency).map_err(xlsx_err)?;
                }
                CellValue::Number(n) => {
                    sheet.write_number(r, col, *n).map_err(xlsx_err)?;
                }
                CellValue::Empty => {}
                other => {
                    sheet.write_string(r, col, other.to_string()).map_err(xlsx_err)?;
                }
            }
        }
    }
    Ok(())
}

fn write_summary(sheet: &mut Worksheet, report: &Report, header: &Format, currency: &Format) -> Result<()> {
    sheet.write_string_with_format(0, 0, "Period", header).map_err(xlsx_err)?;
    sheet.write_string(0, 1, report.range.to_string()).map_err(xlsx_err)?;
    sheet.set_column_width(0, 24).map_err(xlsx_err)?;
    sheet.set_column_width(1, 24).map_err(xlsx_err)?;

    for (i, (key, value)) in report.ordered_totals().into_iter().enumerate() {
        let r = i as u32 + 1;
        sheet
            .write_string_with_format(r, 0, total_label(report.columns, key), header)
            .map_err(xlsx_err)?;
        if report.is_money(key) {
            sheet.write_number_with_format(r, 1, value, currency).map_err(xlsx_err)?;
        } else {
            sheet.write_number(r, 1, value).map_err(xlsx_err)?;
        }
    }
    Ok(())
}

/// Contents of one sheet read back from a workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetContents {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

/// Parses every sheet of an xlsx workbook; the first row of each sheet is
/// taken as its header.
pub fn read_spreadsheet(bytes: &[u8]) -> Result<Vec<SheetContents>> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes.to_vec()))
        .map_err(|e| PayrollError::Spreadsheet(e.to_string()))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| PayrollError::Spreadsheet(e.to_string()))?;
        let mut rows = range.rows();
        let headers = rows
            .next()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .unwrap_or_default();
        let rows = rows
            .map(|r| {
                r.iter()
                    .map(|c| match c {
                        Data::Float(f) => CellValue::Number(*f),
                        Data::Int(i) => CellValue::Number(*i as f64),
                        Data::String(s) => CellValue::Text(s.clone()),
                        Data::Empty => CellValue::Empty,
                        other => CellValue::Text(other.to_string()),
                    })
                    .collect()
            })
            .collect();
        sheets.push(SheetContents {
            name,
            headers,
            rows,
        });
    }
    Ok(sheets)
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

const TITLE_SIZE: usize = 32;
const SUBTITLE_SIZE: usize = 22;

fn docx_err<E: fmt::Debug>(e: E) -> PayrollError {
    PayrollError::Document(format!("{e:?}"))
}

fn text_cell(text: &str, bold: bool) -> TableCell {
    let run = Run::new().add_text(text);
    let run = if bold { run.bold() } else { run };
    TableCell::new().add_paragraph(Paragraph::new().add_run(run))
}

#[derive(Debug, Clone, Default)]
pub struct DocumentRenderer;

impl DocumentRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, report: &Report, title: &str) -> Result<Vec<u8>> {
        let header_row = TableRow::new(
            report
                .columns
                .iter()
                .map(|c| text_cell(c.header, true))
                .collect(),
        );
        let mut rows = vec![header_row];
        for row in &report.rows {
            rows.push(TableRow::new(
                report
                    .columns
                    .iter()
                    .enumerate()
                    .map(|(i, column)| {
                        let text = row
                            .get(i)
                            .map(|cell| display_cell(cell, column))
                            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
                        text_cell(&text, false)
                    })
                    .collect(),
            ));
        }

        let mut summary = summary_line(report);
        if report.rows.is_empty() {
            summary = format!("No records in this period. {summary}");
        }

        let docx = Docx::new()
            .add_paragraph(
                Paragraph::new().add_run(Run::new().add_text(title).bold().size(TITLE_SIZE)),
            )
            .add_paragraph(
                Paragraph::new()
                    .add_run(Run::new().add_text(report.range.to_string()).size(SUBTITLE_SIZE)),
            )
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text(summary)))
            .add_table(Table::new(rows));

        let mut buf = Cursor::new(Vec::new());
        docx.build().pack(&mut buf).map_err(docx_err)?;
        Ok(buf.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Employee, SalaryEntry};
    use crate::report::{assemble_report, DateRange, ReportContext, ReportKind};
    use docx_rs::{DocumentChild, ParagraphChild, RunChild, TableCellContent, TableChild, TableRowChild};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn salary_report(with_rows: bool) -> Report {
        let employees = vec![Employee {
            id: 1,
            full_name: "Nimal Perera".to_string(),
            department: "Finance".to_string(),
            role: "staff".to_string(),
            basic_salary: 50000.0,
            is_active: true,
            kpi_score: 0.0,
            satisfaction_score: 0.0,
        }];
        let mut records = vec![SalaryEntry {
            id: Some(1),
            employee_id: 1,
            basic_salary: 50000.0,
            ot_pay: 2000.0,
            bonus_pay: 5000.0,
            increment_pay: 2000.0,
            no_pay_deduction: 0.0,
            total_salary: 59000.0,
            salary_date: date(2025, 1, 31),
            processed_by: None,
            processed_at: None,
        }];
        if !with_rows {
            records.clear();
        }
        assemble_report(
            &records,
            &ReportContext::new(&employees),
            DateRange::month(2025, 1).unwrap(),
        )
    }

    fn multi_row_report() -> Report {
        let employees: Vec<Employee> = [(1, "Nimal Perera"), (2, "Sunethra Silva"), (3, "Kamal Fernando")]
            .into_iter()
            .map(|(id, name)| Employee {
                id,
                full_name: name.to_string(),
                department: "Finance".to_string(),
                role: "staff".to_string(),
                basic_salary: 40000.0,
                is_active: true,
                kpi_score: 0.0,
                satisfaction_score: 0.0,
            })
            .collect();
        let entry = |employee_id: i64, total: f64, d: NaiveDate| SalaryEntry {
            id: None,
            employee_id,
            basic_salary: total,
            ot_pay: 0.0,
            bonus_pay: 0.0,
            increment_pay: 0.0,
            no_pay_deduction: 0.0,
            total_salary: total,
            salary_date: d,
            processed_by: Some("Dilani".to_string()),
            processed_at: None,
        };
        let records = vec![
            entry(1, 40500.25, date(2025, 1, 31)),
            entry(2, 61250.0, date(2025, 1, 31)),
            entry(3, 38999.75, date(2025, 1, 15)),
            entry(1, 40000.0, date(2025, 2, 28)),
        ];
        assemble_report(
            &records,
            &ReportContext::new(&employees),
            DateRange::month(2025, 1).unwrap(),
        )
    }

    fn paragraph_text(p: &docx_rs::Paragraph) -> String {
        p.children
            .iter()
            .filter_map(|c| match c {
                ParagraphChild::Run(run) => Some(run_text(run)),
                _ => None,
            })
            .collect()
    }

    fn run_text(run: &docx_rs::Run) -> String {
        run.children
            .iter()
            .filter_map(|c| match c {
                RunChild::Text(t) => Some(t.text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn paragraph_is_bold(p: &docx_rs::Paragraph) -> bool {
        p.children
            .iter()
            .any(|c| matches!(c, ParagraphChild::Run(run) if run.run_property.bold.is_some()))
    }

    /// Each table row as (text, bold) cells.
    #[allow(unreachable_patterns)]
    fn table_cells(table: &docx_rs::Table) -> Vec<Vec<(String, bool)>> {
        let mut out = Vec::new();
        for row in &table.rows {
            let TableChild::TableRow(row) = row else { continue };
            let mut cells = Vec::new();
            for cell in &row.cells {
                let TableRowChild::TableCell(cell) = cell else { continue };
                let mut text = String::new();
                let mut bold = false;
                for content in &cell.children {
                    if let TableCellContent::Paragraph(p) = content {
                        text.push_str(&paragraph_text(p));
                        bold |= paragraph_is_bold(p);
                    }
                }
                cells.push((text, bold));
            }
            out.push(cells);
        }
        out
    }

    #[test]
    fn test_parse_format() {
        assert_eq!(ExportFormat::parse("spreadsheet").unwrap(), ExportFormat::Spreadsheet);
        assert_eq!(ExportFormat::parse("Document").unwrap(), ExportFormat::Document);
        assert!(matches!(
            ExportFormat::parse("pdf"),
            Err(PayrollError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_export_filename() {
        let name = export_filename("salary", date(2025, 2, 3), ExportFormat::Spreadsheet);
        assert_eq!(name, "salary-2025-02-03.xlsx");
        let name = export_filename("epf", date(2025, 2, 3), ExportFormat::Document);
        assert_eq!(name, "epf-2025-02-03.docx");
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(
            ExportFormat::Spreadsheet.mime_type(),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        assert!(ExportFormat::Document.mime_type().ends_with("wordprocessingml.document"));
    }

    #[test]
    fn test_spreadsheet_reads_back() {
        let report = salary_report(true);
        let bytes = render(&report, ExportFormat::Spreadsheet, "Salary Report").unwrap();
        let sheets = read_spreadsheet(&bytes).unwrap();
        assert_eq!(sheets.len(), 1);
        let sheet = &sheets[0];
        assert_eq!(sheet.name, "Salary Report");
        assert_eq!(sheet.headers, report.headers());
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.rows[0][0], CellValue::Text("Nimal Perera".to_string()));
        assert_eq!(sheet.rows[0][8], CellValue::Number(59000.0));
        assert_eq!(sheet.rows[0][9], CellValue::Text("pending".to_string()));
    }

    #[test]
    fn test_spreadsheet_summary_sheet() {
        let report = salary_report(true);
        let bytes = SpreadsheetRenderer::new()
            .with_summary_sheet()
            .render(&report, "Salary Report")
            .unwrap();
        let sheets = read_spreadsheet(&bytes).unwrap();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[1].name, SUMMARY_SHEET);
        let total = sheets[1]
            .rows
            .iter()
            .find(|r| r[0] == CellValue::Text("Total Salary".to_string()))
            .unwrap();
        assert_eq!(total[1], CellValue::Number(59000.0));
    }

    #[test]
    fn test_empty_report_still_has_headers() {
        let report = salary_report(false);
        let bytes = render(&report, ExportFormat::Spreadsheet, "Salary Report").unwrap();
        let sheets = read_spreadsheet(&bytes).unwrap();
        assert_eq!(sheets[0].headers.len(), report.columns.len());
        assert!(sheets[0].rows.is_empty());
    }

    #[test]
    fn test_render_does_not_mutate_report() {
        let report = salary_report(true);
        let before = report.clone();
        render(&report, ExportFormat::Spreadsheet, "Salary Report").unwrap();
        render(&report, ExportFormat::Document, "Salary Report").unwrap();
        assert_eq!(report, before);
    }

    #[test]
    fn test_document_is_a_docx_package() {
        let report = salary_report(true);
        let bytes = render(&report, ExportFormat::Document, "Salary Report").unwrap();
        assert_eq!(&bytes[..2], b"PK");
        assert!(bytes
            .windows(b"word/document.xml".len())
            .any(|w| w == b"word/document.xml"));
    }

    #[test]
    fn test_document_layout() {
        let report = salary_report(true);
        let bytes = render(&report, ExportFormat::Document, "Salary Report").unwrap();
        let docx = docx_rs::read_docx(&bytes).unwrap();
        let children = &docx.document.children;

        let paragraphs: Vec<_> = children
            .iter()
            .filter_map(|c| match c {
                DocumentChild::Paragraph(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(paragraphs.len(), 3);
        assert_eq!(paragraph_text(paragraphs[0]), "Salary Report");
        assert!(paragraph_is_bold(paragraphs[0]));
        assert_eq!(paragraph_text(paragraphs[1]), "2025-01-01 to 2025-01-31");
        assert!(!paragraph_is_bold(paragraphs[1]));
        let summary = paragraph_text(paragraphs[2]);
        assert!(summary.starts_with("Total Basic Salary: 50,000.00"));
        assert!(summary.contains("Total Salary: 59,000.00"));

        // Title, range and summary come before the table.
        let table_at = children
            .iter()
            .position(|c| matches!(c, DocumentChild::Table(_)))
            .unwrap();
        assert_eq!(table_at, 3);
        let DocumentChild::Table(table) = &children[table_at] else {
            unreachable!()
        };
        let rows = table_cells(table);
        assert_eq!(rows.len(), 2);
        let headers: Vec<&str> = rows[0].iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(headers, report.headers());
        assert!(rows[0].iter().all(|(_, bold)| *bold));
        assert_eq!(rows[1][0], ("Nimal Perera".to_string(), false));
        assert_eq!(rows[1][8].0, "59,000.00");
        assert_eq!(rows[1][10].0, "N/A");
    }

    #[test]
    fn test_empty_document_says_so() {
        let report = salary_report(false);
        let bytes = render(&report, ExportFormat::Document, "Salary Report").unwrap();
        let docx = docx_rs::read_docx(&bytes).unwrap();
        let summary = docx
            .document
            .children
            .iter()
            .filter_map(|c| match c {
                DocumentChild::Paragraph(p) => Some(paragraph_text(p)),
                _ => None,
            })
            .nth(2)
            .unwrap();
        assert!(summary.starts_with("No records in this period."));
    }

    #[test]
    fn test_multi_row_spreadsheet_totals_match() {
        let report = multi_row_report();
        assert_eq!(report.rows.len(), 3);
        let bytes = SpreadsheetRenderer::new()
            .with_summary_sheet()
            .render(&report, "Salary Report")
            .unwrap();
        let sheets = read_spreadsheet(&bytes).unwrap();
        assert_eq!(sheets[0].rows.len(), report.rows.len());

        let column = report
            .columns
            .iter()
            .position(|c| c.key == "total_salary")
            .unwrap();
        let sum: f64 = sheets[0]
            .rows
            .iter()
            .map(|row| match &row[column] {
                CellValue::Number(n) => *n,
                other => panic!("expected a number, got {other:?}"),
            })
            .sum();
        assert!((sum - report.totals["total_salary"]).abs() < 1e-6);
        assert!((sum - 140750.0).abs() < 1e-6);

        // Summary rows follow column order, then counts, then the record count.
        let labels: Vec<String> = sheets[1]
            .rows
            .iter()
            .map(|r| r[0].to_string())
            .collect();
        assert_eq!(labels.first().map(String::as_str), Some("Total Basic Salary"));
        assert_eq!(labels.last().map(String::as_str), Some("Records"));
        let total_at = labels.iter().position(|l| l == "Total Salary").unwrap();
        let processed_at = labels.iter().position(|l| l == "Processed").unwrap();
        assert!(total_at < processed_at);
    }

    #[test]
    fn test_summary_line_order() {
        let line = summary_line(&salary_report(true));
        let parts: Vec<&str> = line.split("; ").collect();
        assert_eq!(parts.first(), Some(&"Total Basic Salary: 50,000.00"));
        assert_eq!(parts[5], "Total Salary: 59,000.00");
        assert_eq!(parts.last(), Some(&"Records: 1"));
    }

    #[test]
    fn test_display_cell_substitutes_na() {
        let columns = ReportKind::Salary.columns();
        let processed_by = &columns[10];
        assert_eq!(display_cell(&CellValue::Empty, processed_by), "N/A");
        assert_eq!(display_cell(&CellValue::Number(59000.0), &columns[8]), "59,000.00");
    }

    #[test]
    fn test_sheet_name_is_sanitized() {
        assert_eq!(sheet_name("EPF: Jan/Feb"), "EPF JanFeb");
        assert_eq!(sheet_name("???"), "Report");
        assert_eq!(sheet_name(&"x".repeat(40)).len(), 31);
        assert_eq!(sheet_name("'Acme' Salary Report"), "Acme' Salary Report");
        assert_eq!(sheet_name("Report of 'Acme'"), "Report of 'Acme");
        assert_eq!(sheet_name("''"), "Report");
        // Truncation can expose an apostrophe at the end.
        let long = format!("{}'x", "y".repeat(30));
        assert_eq!(sheet_name(&long), "y".repeat(30));
    }

    #[test]
    fn test_apostrophe_title_still_exports() {
        let report = salary_report(true);
        let bytes = render(&report, ExportFormat::Spreadsheet, "'Acme' Salary Report").unwrap();
        let sheets = read_spreadsheet(&bytes).unwrap();
        assert_eq!(sheets[0].name, "Acme' Salary Report");
        assert_eq!(sheets[0].rows.len(), 1);
    }
}
